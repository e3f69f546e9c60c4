//! In-process store for development without MySQL, and for tests.
//!
//! A unit of work holds the store-wide lock from `begin` until it ends, so
//! units of work are fully serialised. Writes go to a private copy of the
//! state that replaces the shared one on commit.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LeaveStore, RequestFilter, UnitOfWork};
use crate::{
    error::LeaveError,
    model::{
        employee::{Employee, EmployeeStatus},
        leave_attachment::{LeaveAttachment, NewLeaveAttachment},
        leave_ledger::LeaveLedger,
        leave_request::{LeaveCategory, LeaveRequest, NewLeaveRequest},
        quota_rule::QuotaRule,
        role::Role,
    },
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    employees: BTreeMap<u64, Employee>,
    requests: BTreeMap<u64, LeaveRequest>,
    attachments: BTreeMap<u64, LeaveAttachment>,
    ledgers: BTreeMap<(u64, i32), LeaveLedger>,
    quota_rules: Vec<QuotaRule>,
    last_request_id: u64,
    last_attachment_id: u64,
}

impl MemoryState {
    fn department_of(&self, employee_id: u64) -> Option<&str> {
        self.employees
            .get(&employee_id)
            .and_then(|e| e.department.as_deref())
    }

    fn matching(&self, filter: &RequestFilter) -> Vec<LeaveRequest> {
        let mut rows: Vec<LeaveRequest> = self
            .requests
            .values()
            .filter(|r| filter.matches(r, self.department_of(r.employee_id)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a roster entry; the roster is owned outside the engine.
    pub async fn put_employee(&self, employee: Employee) {
        self.state.lock().await.employees.insert(employee.id, employee);
    }

    pub async fn put_ledger(&self, ledger: LeaveLedger) {
        self.state
            .lock()
            .await
            .ledgers
            .insert((ledger.employee_id, ledger.year), ledger);
    }

    pub async fn ledger(&self, employee_id: u64, year: i32) -> Option<LeaveLedger> {
        self.state.lock().await.ledgers.get(&(employee_id, year)).cloned()
    }

    pub async fn request(&self, id: u64) -> Option<LeaveRequest> {
        self.state.lock().await.requests.get(&id).cloned()
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    pub async fn attachment_count(&self) -> usize {
        self.state.lock().await.attachments.len()
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LeaveError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, work }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        // the store-wide guard already excludes every other unit of work
        self.find_employee(id).await
    }

    async fn find_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        Ok(self.work.employees.get(&id).cloned())
    }

    async fn find_department_lead(
        &mut self,
        department: &str,
    ) -> Result<Option<Employee>, LeaveError> {
        Ok(self
            .work
            .employees
            .values()
            .find(|e| {
                e.role == Role::DepartmentLead
                    && e.status == EmployeeStatus::Active
                    && e.department.as_deref() == Some(department)
            })
            .cloned())
    }

    async fn list_employees(&mut self) -> Result<Vec<Employee>, LeaveError> {
        Ok(self.work.employees.values().cloned().collect())
    }

    async fn find_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        Ok(self.work.requests.get(&id).cloned())
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        self.find_request(id).await
    }

    async fn list_requests(
        &mut self,
        filter: &RequestFilter,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(self
            .work
            .matching(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_requests(&mut self, filter: &RequestFilter) -> Result<u64, LeaveError> {
        Ok(self.work.matching(filter).len() as u64)
    }

    async fn insert_request(
        &mut self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, LeaveError> {
        self.work.last_request_id += 1;
        let row = request.into_request(self.work.last_request_id);
        self.work.requests.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_request(&mut self, request: &LeaveRequest) -> Result<(), LeaveError> {
        let row = self
            .work
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| LeaveError::not_found(format!("Leave request {} not found", request.id)))?;
        row.status = request.status;
        row.rejection_reason = request.rejection_reason.clone();
        row.approver_id = request.approver_id;
        row.approved_at = request.approved_at;
        Ok(())
    }

    async fn insert_attachment(
        &mut self,
        attachment: NewLeaveAttachment,
    ) -> Result<LeaveAttachment, LeaveError> {
        if !self.work.requests.contains_key(&attachment.leave_request_id) {
            return Err(LeaveError::not_found(format!(
                "Leave request {} not found",
                attachment.leave_request_id
            )));
        }
        self.work.last_attachment_id += 1;
        let row = LeaveAttachment {
            id: self.work.last_attachment_id,
            leave_request_id: attachment.leave_request_id,
            original_name: attachment.original_name,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            mime_type: attachment.mime_type,
            size: attachment.size,
            uploaded_at: attachment.uploaded_at,
        };
        self.work.attachments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_attachments(
        &mut self,
        request_id: u64,
    ) -> Result<Vec<LeaveAttachment>, LeaveError> {
        Ok(self
            .work
            .attachments
            .values()
            .filter(|a| a.leave_request_id == request_id)
            .cloned()
            .collect())
    }

    async fn find_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError> {
        Ok(self.work.ledgers.get(&(employee_id, year)).cloned())
    }

    async fn lock_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError> {
        self.find_ledger(employee_id, year).await
    }

    async fn save_ledger(&mut self, ledger: &LeaveLedger) -> Result<(), LeaveError> {
        self.work
            .ledgers
            .insert((ledger.employee_id, ledger.year), ledger.clone());
        Ok(())
    }

    async fn find_quota_rule(
        &mut self,
        category: LeaveCategory,
        subtype: &str,
    ) -> Result<Option<QuotaRule>, LeaveError> {
        Ok(self
            .work
            .quota_rules
            .iter()
            .find(|r| r.category == category && r.subtype == subtype)
            .cloned())
    }

    async fn list_quota_rules(&mut self) -> Result<Vec<QuotaRule>, LeaveError> {
        Ok(self.work.quota_rules.clone())
    }

    async fn insert_quota_rule(&mut self, rule: &QuotaRule) -> Result<(), LeaveError> {
        let exists = self
            .work
            .quota_rules
            .iter()
            .any(|r| r.category == rule.category && r.subtype == rule.subtype);
        if exists {
            return Err(LeaveError::invalid(format!(
                "Quota rule {}/{} already exists",
                rule.category, rule.subtype
            )));
        }
        self.work.quota_rules.push(rule.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LeaveError> {
        let MemoryUnitOfWork { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LeaveError> {
        Ok(())
    }
}
