//! Agricultural policies

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use sea_query::{Iden, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::query::codec::{self, RowExt};
use crate::db::query::Entity;

string_enum! {
    pub enum PolicyType {
        Subsidy => "SUBSIDY",
        Tax => "TAX",
        Regulation => "REGULATION",
        SupportProgram => "SUPPORT_PROGRAM",
        TradePolicy => "TRADE_POLICY",
        LandReform => "LAND_REFORM",
        CreditProgram => "CREDIT_PROGRAM",
        Insurance => "INSURANCE",
        ResearchFunding => "RESEARCH_FUNDING",
    }
}

string_enum! {
    pub enum PolicyCategory {
        Production => "PRODUCTION",
        Market => "MARKET",
        Environment => "ENVIRONMENT",
        Social => "SOCIAL",
        Technology => "TECHNOLOGY",
        Infrastructure => "INFRASTRUCTURE",
    }
}

string_enum! {
    pub enum GeographicScope {
        National => "NATIONAL",
        Provincial => "PROVINCIAL",
        District => "DISTRICT",
        Sector => "SECTOR",
        Local => "LOCAL",
    }
}

string_enum! {
    pub enum PolicyStatus {
        Draft => "DRAFT",
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
        Expired => "EXPIRED",
        Cancelled => "CANCELLED",
        UnderReview => "UNDER_REVIEW",
    }
}

/// An agricultural policy or programme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyData {
    pub id: String,
    pub policy_code: String,
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub policy_category: PolicyCategory,
    pub description: Option<String>,
    pub geographic_scope: GeographicScope,
    /// Comma separated region names
    pub affected_regions: Option<String>,
    pub effective_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub total_budget: Option<f64>,
    pub budget_utilized: Option<f64>,
    /// Percentage of the budget spent
    pub utilization_rate: Option<f64>,
    pub implementing_agency: Option<String>,
    pub beneficiaries_count: Option<i32>,
    pub status: PolicyStatus,
    pub climate_smart: bool,
    pub youth_focus: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyData {
    /// Create a new policy data with a fresh id
    pub fn new(
        policy_code: impl Into<String>,
        policy_name: impl Into<String>,
        policy_type: PolicyType,
        policy_category: PolicyCategory,
        effective_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            policy_code: policy_code.into(),
            policy_name: policy_name.into(),
            policy_type,
            policy_category,
            description: None,
            geographic_scope: GeographicScope::National,
            affected_regions: None,
            effective_date,
            expiry_date: None,
            total_budget: None,
            budget_utilized: None,
            utilization_rate: None,
            implementing_agency: None,
            beneficiaries_count: None,
            status: PolicyStatus::Draft,
            climate_smart: false,
            youth_focus: false,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Iden, Clone, Copy, Debug)]
pub enum PolicyDataIden {
    #[iden = "policy_data"]
    Table,
    Id,
    PolicyCode,
    PolicyName,
    PolicyType,
    PolicyCategory,
    Description,
    GeographicScope,
    AffectedRegions,
    EffectiveDate,
    ExpiryDate,
    TotalBudget,
    BudgetUtilized,
    UtilizationRate,
    ImplementingAgency,
    BeneficiariesCount,
    Status,
    ClimateSmart,
    YouthFocus,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

impl Entity for PolicyData {
    type Column = PolicyDataIden;

    const NAME: &'static str = "policy data";
    const TABLE: PolicyDataIden = PolicyDataIden::Table;
    const ID: PolicyDataIden = PolicyDataIden::Id;
    const COLUMNS: &'static [PolicyDataIden] = &[
        PolicyDataIden::Id,
        PolicyDataIden::PolicyCode,
        PolicyDataIden::PolicyName,
        PolicyDataIden::PolicyType,
        PolicyDataIden::PolicyCategory,
        PolicyDataIden::Description,
        PolicyDataIden::GeographicScope,
        PolicyDataIden::AffectedRegions,
        PolicyDataIden::EffectiveDate,
        PolicyDataIden::ExpiryDate,
        PolicyDataIden::TotalBudget,
        PolicyDataIden::BudgetUtilized,
        PolicyDataIden::UtilizationRate,
        PolicyDataIden::ImplementingAgency,
        PolicyDataIden::BeneficiariesCount,
        PolicyDataIden::Status,
        PolicyDataIden::ClimateSmart,
        PolicyDataIden::YouthFocus,
        PolicyDataIden::CreatedBy,
        PolicyDataIden::CreatedAt,
        PolicyDataIden::UpdatedAt,
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.policy_code.clone().into(),
            self.policy_name.clone().into(),
            self.policy_type.into(),
            self.policy_category.into(),
            self.description.clone().into(),
            self.geographic_scope.into(),
            self.affected_regions.clone().into(),
            codec::date(self.effective_date).into(),
            codec::opt_date(self.expiry_date).into(),
            self.total_budget.into(),
            self.budget_utilized.into(),
            self.utilization_rate.into(),
            self.implementing_agency.clone().into(),
            self.beneficiaries_count.into(),
            self.status.into(),
            self.climate_smart.into(),
            self.youth_focus.into(),
            self.created_by.clone().into(),
            codec::ts(self.created_at).into(),
            codec::ts(self.updated_at).into(),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            policy_code: row.get("policy_code")?,
            policy_name: row.get("policy_name")?,
            policy_type: row.get("policy_type")?,
            policy_category: row.get("policy_category")?,
            description: row.get("description")?,
            geographic_scope: row.get("geographic_scope")?,
            affected_regions: row.get("affected_regions")?,
            effective_date: row.date("effective_date")?,
            expiry_date: row.opt_date("expiry_date")?,
            total_budget: row.get("total_budget")?,
            budget_utilized: row.get("budget_utilized")?,
            utilization_rate: row.get("utilization_rate")?,
            implementing_agency: row.get("implementing_agency")?,
            beneficiaries_count: row.get("beneficiaries_count")?,
            status: row.get("status")?,
            climate_smart: row.get("climate_smart")?,
            youth_focus: row.get("youth_focus")?,
            created_by: row.get("created_by")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}
