use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmploymentType {
    Probation,
    Official,
    Intern,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    Invited,
    Active,
    Inactive,
}

/// Roster entry as the leave engine sees it. Rows are owned by the HR
/// module; the engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "role": "employee",
        "employment_type": "official",
        "status": "active",
        "hire_date": "2024-01-01"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    pub role: Role,

    pub employment_type: EmploymentType,

    pub status: EmployeeStatus,

    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,
}

impl Employee {
    pub fn is_official(&self) -> bool {
        self.employment_type == EmploymentType::Official
    }

    /// Active probationary and official staff hired on or before `today`
    /// accrue annual leave; interns do not.
    pub fn accrues_leave(&self, today: NaiveDate) -> bool {
        self.status == EmployeeStatus::Active
            && matches!(
                self.employment_type,
                EmploymentType::Probation | EmploymentType::Official
            )
            && self.hire_date.is_some_and(|d| d <= today)
    }
}
