//! Decision path: approve, reject and cancel pending requests.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::{
    LeaveEngine, finish,
    create::HOURS_PER_DAY,
    ledger::get_or_create_ledger,
    policy::{Action, ActorContext, Subject},
    require_employee,
    slots::LeaveSpan,
};
use crate::{
    error::LeaveError,
    model::{
        employee::Employee,
        leave_ledger::LeaveLedger,
        leave_request::{LeaveCategory, LeaveRequest},
    },
    store::UnitOfWork,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalOutcome {
    pub request: LeaveRequest,
    pub ledger: LeaveLedger,
    /// Set when the employee's unpaid days reach the warning threshold.
    /// Sent beside `data` in HTTP responses.
    #[serde(skip)]
    pub warning: Option<String>,
}

/// Applies the deductions fixed at creation to the ledger.
pub fn apply_to_ledger(ledger: &mut LeaveLedger, request: &LeaveRequest) {
    if request.category == LeaveCategory::Compensatory {
        ledger.compensatory_balance -= LeaveSpan::from(request).days() * HOURS_PER_DAY;
    } else {
        ledger.annual_used += request.paid_deduction;
        ledger.unpaid_used += request.unpaid_deduction;
    }
}

fn request_not_found(id: u64) -> LeaveError {
    LeaveError::not_found(format!("Leave request {id} not found"))
}

impl LeaveEngine {
    pub async fn approve(
        &self,
        actor_id: u64,
        request_id: u64,
    ) -> Result<ApprovalOutcome, LeaveError> {
        let mut uow = self.begin().await?;
        let result = self.approve_in(uow.as_mut(), actor_id, request_id).await;
        let outcome = finish(uow, result).await?;

        info!(
            request_id,
            approver_id = actor_id,
            employee_id = outcome.request.employee_id,
            "Leave request approved"
        );
        Ok(outcome)
    }

    async fn approve_in(
        &self,
        uow: &mut dyn UnitOfWork,
        actor_id: u64,
        request_id: u64,
    ) -> Result<ApprovalOutcome, LeaveError> {
        let (actor, owner, mut request) = self
            .load_for_decision(uow, actor_id, request_id, Action::Approve)
            .await?;

        request.approve(actor.id, self.clock.now())?;

        let mut ledger = get_or_create_ledger(uow, &owner, self.clock.today()).await?;
        apply_to_ledger(&mut ledger, &request);

        uow.update_request(&request).await?;
        uow.save_ledger(&ledger).await?;

        let threshold = Decimal::from(self.settings.unpaid_warning_days);
        let warning = (ledger.unpaid_used >= threshold).then(|| {
            format!(
                "{} has taken {} unpaid day(s) this year",
                owner.name, ledger.unpaid_used
            )
        });

        Ok(ApprovalOutcome {
            request,
            ledger,
            warning,
        })
    }

    pub async fn reject(
        &self,
        actor_id: u64,
        request_id: u64,
        reason: &str,
    ) -> Result<LeaveRequest, LeaveError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LeaveError::invalid("rejection_reason must not be empty"));
        }

        let mut uow = self.begin().await?;
        let result = async {
            let (actor, _, mut request) = self
                .load_for_decision(uow.as_mut(), actor_id, request_id, Action::Reject)
                .await?;
            request.reject(actor.id, reason.to_string())?;
            uow.update_request(&request).await?;
            Ok::<_, LeaveError>(request)
        }
        .await;
        let request = finish(uow, result).await?;

        info!(request_id, approver_id = actor_id, "Leave request rejected");
        Ok(request)
    }

    /// Withdraws a pending request. Only its owner may do this.
    pub async fn cancel(&self, employee_id: u64, request_id: u64) -> Result<LeaveRequest, LeaveError> {
        let mut uow = self.begin().await?;
        let result = async {
            let found = uow
                .find_request(request_id)
                .await?
                .ok_or_else(|| request_not_found(request_id))?;
            if found.employee_id != employee_id {
                return Err(LeaveError::Forbidden(
                    "Only the owner can cancel a leave request".into(),
                ));
            }

            uow.lock_employee(employee_id).await?;
            let mut request = uow
                .lock_request(request_id)
                .await?
                .ok_or_else(|| request_not_found(request_id))?;
            request.cancel()?;
            uow.update_request(&request).await?;
            Ok::<_, LeaveError>(request)
        }
        .await;
        let request = finish(uow, result).await?;

        info!(request_id, employee_id, "Leave request cancelled");
        Ok(request)
    }

    /// Loads actor, owner and the locked request, and checks that the actor
    /// may take `action` on it. The owner row is locked first so decisions
    /// serialise with request creation for the same employee.
    async fn load_for_decision(
        &self,
        uow: &mut dyn UnitOfWork,
        actor_id: u64,
        request_id: u64,
        action: Action,
    ) -> Result<(Employee, Employee, LeaveRequest), LeaveError> {
        let actor = require_employee(uow, actor_id).await?;

        let owner_id = uow
            .find_request(request_id)
            .await?
            .ok_or_else(|| request_not_found(request_id))?
            .employee_id;
        let owner = uow
            .lock_employee(owner_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("Employee {owner_id} not found")))?;
        let request = uow
            .lock_request(request_id)
            .await?
            .ok_or_else(|| request_not_found(request_id))?;

        if !self
            .policy
            .can_perform(&ActorContext::from(&actor), action, &Subject::from(&owner))
        {
            return Err(LeaveError::Forbidden(format!(
                "You are not allowed to {} this leave request",
                action.to_string().to_lowercase()
            )));
        }

        Ok((actor, owner, request))
    }
}
