//! Annual ledger: lazy creation with backfill, and monthly accrual.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{LeaveEngine, finish, policy::ActorContext, require_employee};
use crate::{
    error::LeaveError,
    model::{employee::Employee, leave_ledger::LeaveLedger},
    store::UnitOfWork,
};

/// Annual leave days an employee can accrue in one year.
pub const ANNUAL_CAP: u32 = 12;

/// Months of this year an employee hired on `hire_date` has worked as of
/// `today`, counting the hire month and the current month, clamped to
/// `0..=12`. Employees hired in an earlier year count from January.
pub fn months_to_accrue(hire_date: NaiveDate, today: NaiveDate) -> u32 {
    let first_month = if hire_date.year() < today.year() {
        1
    } else {
        hire_date.month() as i64
    };
    let months = today.month() as i64 - first_month + 1;
    months.clamp(0, ANNUAL_CAP as i64) as u32
}

/// Outcome of one accrual run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccrualReport {
    pub accrued: u32,
    pub skipped_at_cap: u32,
    pub failed: u32,
}

/// Creates the row for `employee` and `today`'s year if missing, or raises
/// its total to the months worked so far. Never lowers an existing total.
pub(crate) async fn backfill_in(
    uow: &mut dyn UnitOfWork,
    employee: &Employee,
    today: NaiveDate,
) -> Result<LeaveLedger, LeaveError> {
    let hire_date = employee.hire_date.ok_or_else(|| {
        LeaveError::invalid(format!("Employee {} has no hire date", employee.id))
    })?;
    if hire_date > today {
        return Err(LeaveError::invalid(format!(
            "Employee {} has a hire date in the future ({hire_date})",
            employee.id
        )));
    }

    let year = today.year();
    let months = Decimal::from(months_to_accrue(hire_date, today));

    let mut ledger = uow
        .lock_ledger(employee.id, year)
        .await?
        .unwrap_or_else(|| LeaveLedger::empty(employee.id, year));
    ledger.annual_total = ledger.annual_total.max(months);
    uow.save_ledger(&ledger).await?;

    info!(
        employee_id = employee.id,
        year,
        %months,
        annual_total = %ledger.annual_total,
        "Ledger backfilled"
    );
    Ok(ledger)
}

/// The ledger row for `employee` in `today`'s year, write-locked, backfilled
/// first when it does not exist yet.
pub(crate) async fn get_or_create_ledger(
    uow: &mut dyn UnitOfWork,
    employee: &Employee,
    today: NaiveDate,
) -> Result<LeaveLedger, LeaveError> {
    match uow.lock_ledger(employee.id, today.year()).await? {
        Some(ledger) => Ok(ledger),
        None => backfill_in(uow, employee, today).await,
    }
}

enum Accrual {
    Accrued(Decimal),
    AtCap,
}

async fn accrue_one(
    uow: &mut dyn UnitOfWork,
    employee_id: u64,
    year: i32,
) -> Result<Accrual, LeaveError> {
    let mut ledger = uow
        .lock_ledger(employee_id, year)
        .await?
        .unwrap_or_else(|| LeaveLedger::empty(employee_id, year));

    if ledger.annual_total >= Decimal::from(ANNUAL_CAP) {
        return Ok(Accrual::AtCap);
    }

    ledger.annual_total += Decimal::ONE;
    uow.save_ledger(&ledger).await?;
    Ok(Accrual::Accrued(ledger.annual_total))
}

impl LeaveEngine {
    /// Backfill entry point for the roster workflow, run when an employee
    /// becomes active.
    pub async fn backfill(&self, employee_id: u64) -> Result<LeaveLedger, LeaveError> {
        let today = self.clock.today();
        let mut uow = self.begin().await?;
        let result = async {
            let employee = uow
                .lock_employee(employee_id)
                .await?
                .ok_or_else(|| LeaveError::not_found(format!("Employee {employee_id} not found")))?;
            backfill_in(uow.as_mut(), &employee, today).await
        }
        .await;
        finish(uow, result).await
    }

    /// Backfill requested by `actor_id`, whose stored role must allow
    /// managing ledgers.
    pub async fn backfill_for(
        &self,
        actor_id: u64,
        employee_id: u64,
    ) -> Result<LeaveLedger, LeaveError> {
        let today = self.clock.today();
        let mut uow = self.begin().await?;
        let result = async {
            let actor = require_employee(uow.as_mut(), actor_id).await?;
            if !self.policy.can_manage_ledger(&ActorContext::from(&actor)) {
                return Err(LeaveError::Forbidden("HR/Admin only".into()));
            }
            let employee = uow
                .lock_employee(employee_id)
                .await?
                .ok_or_else(|| LeaveError::not_found(format!("Employee {employee_id} not found")))?;
            backfill_in(uow.as_mut(), &employee, today).await
        }
        .await;
        finish(uow, result).await
    }

    /// Grants one annual leave day to every eligible employee, up to the
    /// yearly cap. Each employee is handled in its own unit of work.
    pub async fn run_monthly_accrual(&self) -> Result<AccrualReport, LeaveError> {
        let today = self.clock.today();
        let year = today.year();

        let candidates: Vec<Employee> = {
            let mut uow = self.begin().await?;
            let result = uow.list_employees().await;
            finish(uow, result).await?
        }
        .into_iter()
        .filter(|e| e.accrues_leave(today))
        .collect();

        info!(month = today.month(), year, candidates = candidates.len(), "Monthly accrual started");

        let mut report = AccrualReport::default();
        for employee in &candidates {
            let mut uow = match self.begin().await {
                Ok(uow) => uow,
                Err(e) => {
                    warn!(employee_id = employee.id, error = %e, "Accrual failed");
                    report.failed += 1;
                    continue;
                }
            };
            let result = accrue_one(uow.as_mut(), employee.id, year).await;
            match finish(uow, result).await {
                Ok(Accrual::Accrued(total)) => {
                    debug!(employee_id = employee.id, annual_total = %total, "Leave accrued");
                    report.accrued += 1;
                }
                Ok(Accrual::AtCap) => {
                    debug!(employee_id = employee.id, "Already at annual cap, skipped");
                    report.skipped_at_cap += 1;
                }
                Err(e) => {
                    warn!(employee_id = employee.id, error = %e, "Accrual failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            accrued = report.accrued,
            skipped_at_cap = report.skipped_at_cap,
            failed = report.failed,
            "Monthly accrual finished"
        );
        Ok(report)
    }
}
