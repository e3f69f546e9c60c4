use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Running leave account for one employee and calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveLedger {
    pub employee_id: u64,
    pub year: i32,
    #[schema(value_type = String, example = "12")]
    pub annual_total: Decimal,
    #[schema(value_type = String, example = "1.5")]
    pub annual_used: Decimal,
    #[schema(value_type = String, example = "0")]
    pub unpaid_used: Decimal,
    /// Hours, credited from overtime elsewhere.
    #[schema(value_type = String, example = "16")]
    pub compensatory_balance: Decimal,
}

impl LeaveLedger {
    pub fn empty(employee_id: u64, year: i32) -> Self {
        Self {
            employee_id,
            year,
            annual_total: Decimal::ZERO,
            annual_used: Decimal::ZERO,
            unpaid_used: Decimal::ZERO,
            compensatory_balance: Decimal::ZERO,
        }
    }

    pub fn annual_remaining(&self) -> Decimal {
        self.annual_total - self.annual_used
    }
}
