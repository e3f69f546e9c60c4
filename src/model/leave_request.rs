use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LeaveError;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveCategory {
    /// Time off paid back from overtime hours.
    Compensatory,
    /// Annual paid leave.
    Paid,
    Unpaid,
    /// Paid personal leave (wedding, bereavement), capped per subtype.
    PersonalPaid,
    /// Social-insurance leave (sickness, prenatal checkups), capped per subtype.
    Insurance,
}

impl LeaveCategory {
    /// Categories that must name a subtype and are capped by a quota rule.
    pub fn uses_subtype(self) -> bool {
        matches!(self, LeaveCategory::PersonalPaid | LeaveCategory::Insurance)
    }

    /// Categories only official employees may draw on.
    pub fn requires_official(self) -> bool {
        matches!(self, LeaveCategory::Paid | LeaveCategory::Insurance)
    }
}

/// Which part of a boundary day the absence covers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HalfDay {
    #[default]
    Full,
    Morning,
    Afternoon,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Pending is the only state with outgoing transitions.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        self == LeaveStatus::Pending && next != LeaveStatus::Pending
    }

    pub fn is_terminal(self) -> bool {
        self != LeaveStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub category: LeaveCategory,
    #[schema(example = "wedding", nullable = true)]
    pub subtype: Option<String>,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub start_half: HalfDay,
    pub end_half: HalfDay,
    #[schema(example = "Family event")]
    pub reason: String,
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
    pub approver_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<NaiveDateTime>,
    /// Days charged to annual paid leave, fixed at creation.
    #[schema(value_type = String, example = "1")]
    pub paid_deduction: Decimal,
    /// Days charged as unpaid leave, fixed at creation.
    #[schema(value_type = String, example = "0")]
    pub unpaid_deduction: Decimal,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl LeaveRequest {
    fn transition(&mut self, next: LeaveStatus) -> Result<(), LeaveError> {
        if !self.status.can_transition_to(next) {
            return Err(LeaveError::InvalidTransition(format!(
                "Leave request {} is {} and can no longer be {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn approve(&mut self, approver_id: u64, at: NaiveDateTime) -> Result<(), LeaveError> {
        self.transition(LeaveStatus::Approved)?;
        self.approver_id = Some(approver_id);
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, approver_id: u64, reason: String) -> Result<(), LeaveError> {
        self.transition(LeaveStatus::Rejected)?;
        self.approver_id = Some(approver_id);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), LeaveError> {
        self.transition(LeaveStatus::Cancelled)
    }
}

/// Row to insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub category: LeaveCategory,
    pub subtype: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_half: HalfDay,
    pub end_half: HalfDay,
    pub reason: String,
    pub paid_deduction: Decimal,
    pub unpaid_deduction: Decimal,
    pub created_at: NaiveDateTime,
}

impl NewLeaveRequest {
    pub fn into_request(self, id: u64) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: self.employee_id,
            category: self.category,
            subtype: self.subtype,
            start_date: self.start_date,
            end_date: self.end_date,
            start_half: self.start_half,
            end_half: self.end_half,
            reason: self.reason,
            status: LeaveStatus::Pending,
            rejection_reason: None,
            approver_id: None,
            approved_at: None,
            paid_deduction: self.paid_deduction,
            unpaid_deduction: self.unpaid_deduction,
            created_at: self.created_at,
        }
    }
}
