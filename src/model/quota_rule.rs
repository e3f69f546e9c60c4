use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::leave_request::LeaveCategory;

/// Cap on the days usable for one leave subtype, keyed by (category, subtype).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct QuotaRule {
    pub category: LeaveCategory,
    #[schema(example = "wedding")]
    pub subtype: String,
    #[schema(example = "3", value_type = String)]
    pub day_limit: Decimal,
    /// true: the limit resets every month, false: every year.
    pub per_month: bool,
    pub description: Option<String>,
}
