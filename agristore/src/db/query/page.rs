//! Pagination requests and results

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A zero-based page index and a page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl PageRequest {
    pub const DEFAULT_SIZE: u64 = 20;

    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn first(size: u64) -> Self {
        Self::new(0, size)
    }

    pub fn next(&self) -> Self {
        Self::new(self.page + 1, self.size)
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(StoreError::validation("page size must be at least 1"));
        }
        Ok(())
    }
}

/// One slice of a result set plus the size of the whole set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            total_elements.div_ceil(request.size)
        };

        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    pub fn is_first(&self) -> bool {
        self.page == 0
    }

    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages
    }

    pub fn has_next(&self) -> bool {
        !self.is_last()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
