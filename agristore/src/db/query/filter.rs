//! Predicate trees for WHERE clauses
//!
//! [`Filter`] wraps a sea-query [`Condition`]. The `_opt` builders take an
//! `Option`; `None` adds no clause at all, so an absent criterion leaves the
//! column unconstrained instead of filtering out NULLs.
//!
//! Range builders keep their boundary semantics explicit: `between`, `gte` and
//! `lte` include the bound, `gt` and `lt` exclude it.

use sea_query::{
    Alias, Cond, Condition, Expr, Func, IntoColumnRef, IntoCondition, LikeExpr, SimpleExpr, Value,
};

use super::functions::UNICODE_LOWER;

const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone)]
pub struct Filter {
    cond: Condition,
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl IntoCondition for Filter {
    fn into_condition(self) -> Condition {
        self.cond
    }
}

impl Filter {
    /// Clauses joined with AND; an empty filter matches every row
    pub fn all() -> Self {
        Self { cond: Cond::all() }
    }

    /// Clauses joined with OR
    pub fn any() -> Self {
        Self { cond: Cond::any() }
    }

    /// Add an arbitrary expression or nested condition
    pub fn and<E: IntoCondition>(mut self, expr: E) -> Self {
        self.cond = self.cond.add(expr.into_condition());
        self
    }

    /// Add the clause built from `value` when it is present
    pub fn and_opt<T, F>(self, value: Option<T>, build: F) -> Self
    where
        F: FnOnce(T) -> SimpleExpr,
    {
        match value {
            Some(value) => self.and(build(value)),
            None => self,
        }
    }

    /// Nest an OR group
    pub fn any_of(self, group: Filter) -> Self {
        self.and(group.cond)
    }

    pub fn eq<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).eq(val(value)))
    }

    pub fn eq_opt<C, V>(self, col: C, value: Option<V>) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and_opt(value, |v| Expr::col(col).eq(val(v)))
    }

    pub fn ne<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).ne(val(value)))
    }

    /// Strictly greater than
    pub fn gt<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).gt(val(value)))
    }

    /// Greater than or equal
    pub fn gte<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).gte(val(value)))
    }

    pub fn gte_opt<C, V>(self, col: C, value: Option<V>) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and_opt(value, |v| Expr::col(col).gte(val(v)))
    }

    /// Strictly less than
    pub fn lt<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).lt(val(value)))
    }

    /// Less than or equal
    pub fn lte<C, V>(self, col: C, value: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).lte(val(value)))
    }

    pub fn lte_opt<C, V>(self, col: C, value: Option<V>) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and_opt(value, |v| Expr::col(col).lte(val(v)))
    }

    /// Inclusive on both bounds
    pub fn between<C, V>(self, col: C, min: V, max: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.and(Expr::col(col).between(val(min), val(max)))
    }

    pub fn is_in<C, V, I>(self, col: C, values: I) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.and(Expr::col(col).is_in(values.into_iter().map(val)))
    }

    pub fn not_in<C, V, I>(self, col: C, values: I) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.and(Expr::col(col).is_not_in(values.into_iter().map(val)))
    }

    pub fn is_null<C: IntoColumnRef>(self, col: C) -> Self {
        self.and(Expr::col(col).is_null())
    }

    pub fn is_not_null<C: IntoColumnRef>(self, col: C) -> Self {
        self.and(Expr::col(col).is_not_null())
    }

    /// `left <= right` between two columns of the same row
    pub fn col_lte<L, R>(self, left: L, right: R) -> Self
    where
        L: IntoColumnRef,
        R: IntoColumnRef,
    {
        self.and(Expr::col(left).lte(Expr::col(right)))
    }

    /// Case-insensitive substring match
    pub fn contains<C: IntoColumnRef>(self, col: C, term: &str) -> Self {
        self.and(contains_ignore_case(col, term))
    }

    pub fn contains_opt<C: IntoColumnRef>(self, col: C, term: Option<&str>) -> Self {
        self.and_opt(term, |t| contains_ignore_case(col, t))
    }

    /// Case-insensitive suffix match
    pub fn ends_with_ignore_case<C: IntoColumnRef>(self, col: C, suffix: &str) -> Self {
        let pattern = format!("%{}", escape_like(&suffix.to_lowercase()));
        self.and(lower(col).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)))
    }

    /// Case-insensitive equality
    pub fn eq_ignore_case<C: IntoColumnRef>(self, col: C, value: &str) -> Self {
        self.and(lower(col).eq(val(value.to_lowercase())))
    }

    pub fn eq_ignore_case_opt<C: IntoColumnRef>(self, col: C, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.eq_ignore_case(col, value),
            None => self,
        }
    }

    /// Case-insensitive substring match against any of `cols`
    pub fn search_any<C, I>(self, cols: I, term: &str) -> Self
    where
        C: IntoColumnRef,
        I: IntoIterator<Item = C>,
    {
        let group = cols
            .into_iter()
            .fold(Cond::any(), |group, col| group.add(contains_ignore_case(col, term)));
        self.and(group)
    }
}

/// `unicode_lower(col) LIKE '%term%'` with the term lower-cased and LIKE wildcards escaped
pub fn contains_ignore_case<C: IntoColumnRef>(col: C, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    lower(col).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// `unicode_lower(col)`, registered on every connection by [`super::functions::register`]
fn lower<C: IntoColumnRef>(col: C) -> Expr {
    Expr::expr(Func::cust(Alias::new(UNICODE_LOWER)).arg(Expr::col(col)))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

fn val<V: Into<Value>>(value: V) -> SimpleExpr {
    SimpleExpr::Value(value.into())
}
