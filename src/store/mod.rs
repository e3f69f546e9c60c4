//! Persistence boundary.
//!
//! Every public engine call opens exactly one [`UnitOfWork`], runs all of its
//! reads and writes through it, and ends it with `commit` or `rollback`.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::LeaveError,
    model::{
        employee::Employee,
        leave_attachment::{LeaveAttachment, NewLeaveAttachment},
        leave_ledger::LeaveLedger,
        leave_request::{LeaveCategory, LeaveRequest, LeaveStatus, NewLeaveRequest},
        quota_rule::QuotaRule,
    },
};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Criteria for reading many leave requests. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
    /// Department of the request owner.
    pub department: Option<String>,
    pub statuses: Vec<LeaveStatus>,
    pub category: Option<LeaveCategory>,
    pub subtype: Option<String>,
    /// Inclusive bounds on the start date.
    pub start_from: Option<NaiveDate>,
    pub start_to: Option<NaiveDate>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RequestFilter {
    pub fn for_employee(employee_id: u64) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[LeaveStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn page(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// In-process evaluation, used where no SQL engine does it for us.
    pub fn matches(&self, request: &LeaveRequest, owner_department: Option<&str>) -> bool {
        if self.employee_id.is_some_and(|id| id != request.employee_id) {
            return false;
        }
        if let Some(dept) = &self.department {
            if owner_department != Some(dept.as_str()) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&request.status) {
            return false;
        }
        if self.category.is_some_and(|c| c != request.category) {
            return false;
        }
        if let Some(subtype) = &self.subtype {
            if request.subtype.as_deref() != Some(subtype.as_str()) {
                return false;
            }
        }
        if self.start_from.is_some_and(|d| request.start_date < d) {
            return false;
        }
        if self.start_to.is_some_and(|d| request.start_date > d) {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads the employee and holds a write lock on the row until the unit
    /// of work ends. Serialises create and approve calls per employee.
    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError>;

    async fn find_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError>;

    async fn find_department_lead(
        &mut self,
        department: &str,
    ) -> Result<Option<Employee>, LeaveError>;

    /// All employees; callers filter for accrual eligibility.
    async fn list_employees(&mut self) -> Result<Vec<Employee>, LeaveError>;

    async fn find_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError>;

    /// Latest committed version of the request, write-locked until the unit
    /// of work ends.
    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError>;

    /// Matching requests, newest first.
    async fn list_requests(
        &mut self,
        filter: &RequestFilter,
    ) -> Result<Vec<LeaveRequest>, LeaveError>;

    /// Number of matching requests, ignoring `limit`/`offset`.
    async fn count_requests(&mut self, filter: &RequestFilter) -> Result<u64, LeaveError>;

    async fn insert_request(
        &mut self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, LeaveError>;

    /// Writes the mutable columns: status, rejection reason, approver and
    /// approval time.
    async fn update_request(&mut self, request: &LeaveRequest) -> Result<(), LeaveError>;

    async fn insert_attachment(
        &mut self,
        attachment: NewLeaveAttachment,
    ) -> Result<LeaveAttachment, LeaveError>;

    async fn list_attachments(
        &mut self,
        request_id: u64,
    ) -> Result<Vec<LeaveAttachment>, LeaveError>;

    async fn find_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError>;

    /// Like `find_ledger`, but holds a write lock on the row.
    async fn lock_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError>;

    /// Insert or overwrite the row for (employee, year).
    async fn save_ledger(&mut self, ledger: &LeaveLedger) -> Result<(), LeaveError>;

    async fn find_quota_rule(
        &mut self,
        category: LeaveCategory,
        subtype: &str,
    ) -> Result<Option<QuotaRule>, LeaveError>;

    async fn list_quota_rules(&mut self) -> Result<Vec<QuotaRule>, LeaveError>;

    async fn insert_quota_rule(&mut self, rule: &QuotaRule) -> Result<(), LeaveError>;

    async fn commit(self: Box<Self>) -> Result<(), LeaveError>;

    async fn rollback(self: Box<Self>) -> Result<(), LeaveError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LeaveError>;
}
