//! Leave accounting and approval engine.
//!
//! [`LeaveEngine`] owns no state of its own. Every public method opens one
//! unit of work on the store, runs its reads and writes through it, and
//! commits or rolls back before returning.

pub mod clock;
pub mod create;
pub mod decision;
pub mod ledger;
pub mod policy;
pub mod queries;
pub mod quota;
pub mod slots;

use std::sync::Arc;

use tracing::warn;

use crate::{
    error::LeaveError,
    model::employee::Employee,
    notify::Notifier,
    storage::FileStorage,
    store::{LeaveStore, UnitOfWork},
};

use clock::{Clock, SystemClock};
use policy::{AccessPolicy, RolePolicy};

pub use create::{CreateLeave, CreatedLeave, DeductionBreakdown};
pub use decision::ApprovalOutcome;
pub use ledger::AccrualReport;
pub use queries::{BalanceSummary, LeaveListQuery, Page};

/// Tunables read from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
    /// Unpaid days per year at which approvals carry a warning.
    pub unpaid_warning_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attachments: 5,
            max_attachment_bytes: 5 * 1024 * 1024,
            unpaid_warning_days: 30,
        }
    }
}

#[derive(Clone)]
pub struct LeaveEngine {
    store: Arc<dyn LeaveStore>,
    storage: Arc<dyn FileStorage>,
    notifier: Arc<dyn Notifier>,
    policy: Arc<dyn AccessPolicy>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl LeaveEngine {
    pub fn new(
        store: Arc<dyn LeaveStore>,
        storage: Arc<dyn FileStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            storage,
            notifier,
            policy: Arc::new(RolePolicy),
            clock: Arc::new(SystemClock),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LeaveError> {
        self.store.begin().await
    }
}

/// Commits on success; on failure rolls back and hands back the original
/// error.
async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, LeaveError>,
) -> Result<T, LeaveError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = uow.rollback().await {
                warn!(error = %rb, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn require_employee(uow: &mut dyn UnitOfWork, id: u64) -> Result<Employee, LeaveError> {
    uow.find_employee(id)
        .await?
        .ok_or_else(|| LeaveError::not_found(format!("Employee {id} not found")))
}
