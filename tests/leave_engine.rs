//! End-to-end engine flows on the in-memory store.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use hrm_leave::{
    error::LeaveError,
    leave::{CreateLeave, EngineSettings, LeaveEngine, LeaveListQuery, clock::FixedClock},
    model::{
        employee::{Employee, EmployeeStatus, EmploymentType},
        leave_attachment::{LeaveAttachment, NewLeaveAttachment},
        leave_ledger::LeaveLedger,
        leave_request::{HalfDay, LeaveCategory, LeaveRequest, LeaveStatus, NewLeaveRequest},
        quota_rule::QuotaRule,
        role::Role,
    },
    notify::{LeaveSubmitted, Notifier},
    storage::{AttachmentUpload, FileStorage, LocalFileStorage, StoredFile},
    store::{LeaveStore, MemoryStore, RequestFilter, UnitOfWork},
};

const LEAD: u64 = 1;
const ALICE: u64 = 2;
const BOB: u64 = 3;
const HR: u64 = 4;
const SALES_LEAD: u64 = 5;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn employee(
    id: u64,
    name: &str,
    department: &str,
    role: Role,
    employment_type: EmploymentType,
    hire_date: NaiveDate,
) -> Employee {
    Employee {
        id,
        name: name.into(),
        email: format!("{}@company.com", name.to_lowercase()),
        department: Some(department.into()),
        role,
        employment_type,
        status: EmployeeStatus::Active,
        hire_date: Some(hire_date),
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<LeaveSubmitted>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<LeaveSubmitted> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_leave_submitted(&self, event: &LeaveSubmitted) -> Result<(), LeaveError> {
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Local storage whose second write fails.
struct FlakyStorage {
    inner: LocalFileStorage,
    saves: AtomicUsize,
}

#[async_trait]
impl FileStorage for FlakyStorage {
    async fn save_file(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredFile, LeaveError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(LeaveError::DependencyFailure("disk full".into()));
        }
        self.inner.save_file(bytes, suggested_name).await
    }

    async fn delete_file(&self, stored_path: &str) -> Result<(), LeaveError> {
        self.inner.delete_file(stored_path).await
    }
}

/// Memory store whose commits fail once `armed` is set. A failed commit
/// discards the unit of work.
struct FailingCommitStore {
    inner: MemoryStore,
    armed: Arc<AtomicBool>,
}

#[async_trait]
impl LeaveStore for FailingCommitStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LeaveError> {
        Ok(Box::new(FailingCommit {
            inner: self.inner.begin().await?,
            fail: self.armed.load(Ordering::SeqCst),
        }))
    }
}

struct FailingCommit {
    inner: Box<dyn UnitOfWork>,
    fail: bool,
}

#[async_trait]
impl UnitOfWork for FailingCommit {
    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        self.inner.lock_employee(id).await
    }

    async fn find_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        self.inner.find_employee(id).await
    }

    async fn find_department_lead(&mut self, department: &str) -> Result<Option<Employee>, LeaveError> {
        self.inner.find_department_lead(department).await
    }

    async fn list_employees(&mut self) -> Result<Vec<Employee>, LeaveError> {
        self.inner.list_employees().await
    }

    async fn find_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        self.inner.find_request(id).await
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        self.inner.lock_request(id).await
    }

    async fn list_requests(&mut self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>, LeaveError> {
        self.inner.list_requests(filter).await
    }

    async fn count_requests(&mut self, filter: &RequestFilter) -> Result<u64, LeaveError> {
        self.inner.count_requests(filter).await
    }

    async fn insert_request(&mut self, request: NewLeaveRequest) -> Result<LeaveRequest, LeaveError> {
        self.inner.insert_request(request).await
    }

    async fn update_request(&mut self, request: &LeaveRequest) -> Result<(), LeaveError> {
        self.inner.update_request(request).await
    }

    async fn insert_attachment(
        &mut self,
        attachment: NewLeaveAttachment,
    ) -> Result<LeaveAttachment, LeaveError> {
        self.inner.insert_attachment(attachment).await
    }

    async fn list_attachments(&mut self, request_id: u64) -> Result<Vec<LeaveAttachment>, LeaveError> {
        self.inner.list_attachments(request_id).await
    }

    async fn find_ledger(&mut self, employee_id: u64, year: i32) -> Result<Option<LeaveLedger>, LeaveError> {
        self.inner.find_ledger(employee_id, year).await
    }

    async fn lock_ledger(&mut self, employee_id: u64, year: i32) -> Result<Option<LeaveLedger>, LeaveError> {
        self.inner.lock_ledger(employee_id, year).await
    }

    async fn save_ledger(&mut self, ledger: &LeaveLedger) -> Result<(), LeaveError> {
        self.inner.save_ledger(ledger).await
    }

    async fn find_quota_rule(
        &mut self,
        category: LeaveCategory,
        subtype: &str,
    ) -> Result<Option<QuotaRule>, LeaveError> {
        self.inner.find_quota_rule(category, subtype).await
    }

    async fn list_quota_rules(&mut self) -> Result<Vec<QuotaRule>, LeaveError> {
        self.inner.list_quota_rules().await
    }

    async fn insert_quota_rule(&mut self, rule: &QuotaRule) -> Result<(), LeaveError> {
        self.inner.insert_quota_rule(rule).await
    }

    async fn commit(self: Box<Self>) -> Result<(), LeaveError> {
        let this = *self;
        if this.fail {
            this.inner.rollback().await?;
            return Err(LeaveError::DependencyFailure("connection lost during commit".into()));
        }
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), LeaveError> {
        self.inner.rollback().await
    }
}

fn local_storage(dir: PathBuf) -> Arc<dyn FileStorage> {
    Arc::new(LocalFileStorage::new(dir))
}

struct Harness {
    engine: LeaveEngine,
    store: MemoryStore,
    notifier: Arc<RecordingNotifier>,
    uploads: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::with(local_storage, EngineSettings::default()).await
    }

    async fn with(
        storage: impl FnOnce(PathBuf) -> Arc<dyn FileStorage>,
        settings: EngineSettings,
    ) -> Self {
        Self::build(storage, settings, |store| -> Arc<dyn LeaveStore> { Arc::new(store) }).await
    }

    /// `wrap` decides what the engine sees in front of the memory store.
    async fn build(
        storage: impl FnOnce(PathBuf) -> Arc<dyn FileStorage>,
        settings: EngineSettings,
        wrap: impl FnOnce(MemoryStore) -> Arc<dyn LeaveStore>,
    ) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());

        for e in [
            employee(LEAD, "Lena", "Engineering", Role::DepartmentLead, EmploymentType::Official, date(2025, 1, 6)),
            employee(ALICE, "Alice", "Engineering", Role::Employee, EmploymentType::Official, date(2026, 2, 2)),
            employee(BOB, "Bob", "Engineering", Role::Employee, EmploymentType::Probation, date(2026, 3, 2)),
            employee(HR, "Hana", "People", Role::Hr, EmploymentType::Official, date(2024, 5, 1)),
            employee(SALES_LEAD, "Sam", "Sales", Role::DepartmentLead, EmploymentType::Official, date(2024, 5, 1)),
        ] {
            store.put_employee(e).await;
        }

        let engine = LeaveEngine::new(
            wrap(store.clone()),
            storage(uploads.path().to_path_buf()),
            notifier.clone(),
        )
        .with_clock(Arc::new(FixedClock::on(date(2026, 4, 15))))
        .with_settings(settings);
        engine.seed_quota_catalog().await.unwrap();

        Self {
            engine,
            store,
            notifier,
            uploads,
        }
    }

    fn stored_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

fn leave(category: LeaveCategory, start: NaiveDate, end: NaiveDate) -> CreateLeave {
    CreateLeave {
        category,
        subtype: None,
        start_date: start,
        end_date: end,
        start_half: HalfDay::Full,
        end_half: HalfDay::Full,
        reason: "Personal matters".into(),
    }
}

fn with_subtype(mut input: CreateLeave, subtype: &str) -> CreateLeave {
    input.subtype = Some(subtype.into());
    input
}

fn pdf(name: &str) -> AttachmentUpload {
    AttachmentUpload {
        original_name: name.into(),
        mime_type: "application/pdf".into(),
        bytes: b"%PDF-1.4 checkup note".to_vec(),
    }
}

#[tokio::test]
async fn paid_leave_is_charged_on_approval() {
    let h = Harness::new().await;

    let ledger = h.engine.backfill(ALICE).await.unwrap();
    assert_eq!(ledger.annual_total, dec!(3));
    assert_eq!(ledger.annual_used, dec!(0));

    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();
    assert_eq!(created.days, dec!(1));
    assert_eq!(created.request.paid_deduction, dec!(1));
    assert_eq!(created.request.status, LeaveStatus::Pending);

    let outcome = h.engine.approve(LEAD, created.request.id).await.unwrap();
    assert_eq!(outcome.request.status, LeaveStatus::Approved);
    assert_eq!(outcome.request.approver_id, Some(LEAD));
    assert_eq!(outcome.ledger.annual_used, dec!(1));
    assert!(outcome.warning.is_none());

    let stored = h.store.ledger(ALICE, 2026).await.unwrap();
    assert_eq!(stored.annual_used, dec!(1));
    assert_eq!(stored.annual_total, dec!(3));
}

#[tokio::test]
async fn wedding_quota_is_spent_by_approved_requests() {
    let h = Harness::new().await;

    let first = h
        .engine
        .create_request(
            ALICE,
            with_subtype(
                leave(LeaveCategory::PersonalPaid, date(2026, 4, 20), date(2026, 4, 22)),
                "wedding",
            ),
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(first.breakdown.in_quota, dec!(3));
    h.engine.approve(LEAD, first.request.id).await.unwrap();

    let err = h
        .engine
        .create_request(
            ALICE,
            with_subtype(
                leave(LeaveCategory::PersonalPaid, date(2026, 5, 4), date(2026, 5, 4)),
                "wedding",
            ),
            vec![],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::QuotaExceeded(_)), "{err}");
    assert_eq!(h.store.request_count().await, 1);
}

#[tokio::test]
async fn adjacent_half_days_do_not_conflict() {
    let h = Harness::new().await;

    let mut first = leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 22));
    first.start_half = HalfDay::Afternoon;
    first.end_half = HalfDay::Morning;
    let first = h.engine.create_request(ALICE, first, vec![]).await.unwrap();
    assert_eq!(first.days, dec!(2));

    let mut second = leave(LeaveCategory::Unpaid, date(2026, 4, 22), date(2026, 4, 24));
    second.start_half = HalfDay::Afternoon;
    h.engine.create_request(ALICE, second, vec![]).await.unwrap();

    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 21), date(2026, 4, 21)), vec![])
        .await
        .unwrap_err();
    match err {
        LeaveError::ScheduleConflict(msg) => assert!(msg.contains(&format!("#{}", first.request.id))),
        other => panic!("expected a schedule conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn probation_staff_cannot_take_paid_leave() {
    let h = Harness::new().await;

    let err = h
        .engine
        .create_request(BOB, leave(LeaveCategory::Paid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)), "{err}");
    assert_eq!(h.store.request_count().await, 0);
    // refused before the ledger was touched
    assert!(h.store.ledger(BOB, 2026).await.is_none());
}

#[tokio::test]
async fn second_approval_is_rejected() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();

    h.engine.approve(LEAD, created.request.id).await.unwrap();
    let err = h.engine.approve(LEAD, created.request.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidTransition(_)));

    // charged once only
    assert_eq!(h.store.ledger(ALICE, 2026).await.unwrap().unpaid_used, dec!(1));
}

#[tokio::test]
async fn leads_only_decide_for_their_department() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();

    let err = h.engine.approve(SALES_LEAD, created.request.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)));
    let err = h.engine.approve(HR, created.request.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)));

    let rejected = h
        .engine
        .reject(LEAD, created.request.id, "Release week")
        .await
        .unwrap();
    assert_eq!(rejected.status, LeaveStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Release week"));
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();

    let err = h.engine.reject(LEAD, created.request.id, "  ").await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)));
    assert_eq!(
        h.store.request(created.request.id).await.unwrap().status,
        LeaveStatus::Pending
    );
}

#[tokio::test]
async fn only_the_owner_can_cancel() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();

    let err = h.engine.cancel(BOB, created.request.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)));

    let cancelled = h.engine.cancel(ALICE, created.request.id).await.unwrap();
    assert_eq!(cancelled.status, LeaveStatus::Cancelled);

    // the freed slot can be booked again
    h.engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();
}

#[tokio::test]
async fn backfill_never_lowers_the_total() {
    let h = Harness::new().await;
    let mut ledger = LeaveLedger::empty(ALICE, 2026);
    ledger.annual_total = dec!(10);
    ledger.annual_used = dec!(2);
    h.store.put_ledger(ledger).await;

    let ledger = h.engine.backfill(ALICE).await.unwrap();
    assert_eq!(ledger.annual_total, dec!(10));
    assert_eq!(ledger.annual_used, dec!(2));

    let err = h.engine.backfill(99).await.unwrap_err();
    assert!(matches!(err, LeaveError::NotFound(_)));
}

#[tokio::test]
async fn monthly_accrual_stops_at_the_cap() {
    let h = Harness::new().await;
    let mut full = LeaveLedger::empty(LEAD, 2026);
    full.annual_total = dec!(12);
    h.store.put_ledger(full).await;

    h.store
        .put_employee(employee(6, "Ivan", "Engineering", Role::Employee, EmploymentType::Intern, date(2026, 1, 5)))
        .await;

    let report = h.engine.run_monthly_accrual().await.unwrap();
    // alice, bob, hr and the sales lead accrue; the engineering lead is capped
    assert_eq!(report.accrued, 4);
    assert_eq!(report.skipped_at_cap, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(h.store.ledger(LEAD, 2026).await.unwrap().annual_total, dec!(12));
    assert_eq!(h.store.ledger(BOB, 2026).await.unwrap().annual_total, dec!(1));
    assert!(h.store.ledger(6, 2026).await.is_none());
}

#[tokio::test]
async fn department_lead_is_notified_of_new_requests() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 21)), vec![])
        .await
        .unwrap();

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_id, created.request.id);
    assert_eq!(sent[0].recipient_email, "lena@company.com");
    assert_eq!(sent[0].employee_name, "Alice");

    // a lead's own request does not notify the lead
    h.engine
        .create_request(LEAD, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn unpaid_warning_is_raised_at_the_threshold() {
    let settings = EngineSettings {
        unpaid_warning_days: 2,
        ..EngineSettings::default()
    };
    let h = Harness::with(local_storage, settings).await;

    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 21)), vec![])
        .await
        .unwrap();
    let outcome = h.engine.approve(LEAD, created.request.id).await.unwrap();
    assert_eq!(outcome.ledger.unpaid_used, dec!(2));
    assert!(outcome.warning.is_some_and(|w| w.contains("Alice")));
}

#[tokio::test]
async fn insurance_leave_stores_its_documents() {
    let h = Harness::new().await;
    let checkup = with_subtype(
        leave(LeaveCategory::Insurance, date(2026, 4, 20), date(2026, 4, 20)),
        "maternity_checkup",
    );

    let err = h
        .engine
        .create_request(ALICE, checkup.clone(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)));

    let created = h
        .engine
        .create_request(ALICE, checkup, vec![pdf("Checkup.PDF")])
        .await
        .unwrap();
    assert_eq!(created.attachments.len(), 1);
    assert!(created.attachments[0].file_name.ends_with(".pdf"));
    assert_eq!(h.store.attachment_count().await, 1);
    assert_eq!(h.stored_files(), 1);

    let detail = h.engine.request_detail(LEAD, created.request.id).await.unwrap();
    assert_eq!(detail.attachments.len(), 1);
    let err = h.engine.request_detail(BOB, created.request.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)));
}

#[tokio::test]
async fn failed_upload_leaves_nothing_behind() {
    let h = Harness::with(
        |dir| -> Arc<dyn FileStorage> {
            Arc::new(FlakyStorage {
                inner: LocalFileStorage::new(dir),
                saves: AtomicUsize::new(0),
            })
        },
        EngineSettings::default(),
    )
    .await;

    let checkup = with_subtype(
        leave(LeaveCategory::Insurance, date(2026, 4, 20), date(2026, 4, 20)),
        "maternity_checkup",
    );
    let err = h
        .engine
        .create_request(ALICE, checkup, vec![pdf("a.pdf"), pdf("b.pdf")])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::DependencyFailure(_)));

    assert_eq!(h.store.request_count().await, 0);
    assert_eq!(h.store.attachment_count().await, 0);
    assert_eq!(h.stored_files(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn hr_lists_approved_requests_only() {
    let h = Harness::new().await;
    let approved = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();
    h.engine.approve(LEAD, approved.request.id).await.unwrap();
    h.engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 27), date(2026, 4, 27)), vec![])
        .await
        .unwrap();

    let page = h.engine.list_requests(HR, &LeaveListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, approved.request.id);

    let pending_only = LeaveListQuery {
        status: Some(LeaveStatus::Pending),
        ..Default::default()
    };
    let page = h.engine.list_requests(HR, &pending_only).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.data.is_empty());

    // the engineering lead sees both, the sales lead neither
    let page = h.engine.list_requests(LEAD, &LeaveListQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    let page = h.engine.list_requests(SALES_LEAD, &LeaveListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);

    let mine = h.engine.my_requests(ALICE, &LeaveListQuery::default()).await.unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.per_page, 10);
}

#[tokio::test]
async fn balance_reflects_backfill_and_usage() {
    let h = Harness::new().await;
    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 20), date(2026, 4, 21)), vec![])
        .await
        .unwrap();
    h.engine.approve(LEAD, created.request.id).await.unwrap();

    let balance = h.engine.my_balance(ALICE).await.unwrap();
    assert_eq!(balance.year, 2026);
    assert_eq!(balance.annual_total, dec!(3));
    assert_eq!(balance.annual_used, dec!(2));
    assert_eq!(balance.annual_remaining, dec!(1));

    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 27), date(2026, 4, 28)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::QuotaExceeded(_)));
}

#[tokio::test]
async fn pending_paid_requests_hold_their_days() {
    let h = Harness::new().await;
    assert_eq!(h.engine.backfill(ALICE).await.unwrap().annual_total, dec!(3));

    let first = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 20), date(2026, 4, 21)), vec![])
        .await
        .unwrap();

    // two of three days are already waiting for approval
    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 22), date(2026, 4, 23)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::QuotaExceeded(_)), "{err}");

    let second = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Paid, date(2026, 4, 22), date(2026, 4, 22)), vec![])
        .await
        .unwrap();

    h.engine.approve(LEAD, first.request.id).await.unwrap();
    let outcome = h.engine.approve(LEAD, second.request.id).await.unwrap();
    assert_eq!(outcome.ledger.annual_used, dec!(3));
    assert!(outcome.ledger.annual_used <= outcome.ledger.annual_total);
}

#[tokio::test]
async fn compensatory_leave_spends_banked_hours() {
    let h = Harness::new().await;
    let mut ledger = LeaveLedger::empty(ALICE, 2026);
    ledger.annual_total = dec!(3);
    ledger.compensatory_balance = dec!(16);
    h.store.put_ledger(ledger).await;

    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Compensatory, date(2026, 4, 20), date(2026, 4, 22)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::QuotaExceeded(_)), "{err}");

    let first = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Compensatory, date(2026, 4, 20), date(2026, 4, 20)), vec![])
        .await
        .unwrap();
    assert_eq!(first.request.paid_deduction, dec!(0));
    h.engine
        .create_request(ALICE, leave(LeaveCategory::Compensatory, date(2026, 4, 21), date(2026, 4, 21)), vec![])
        .await
        .unwrap();

    // both pending days together use all sixteen hours
    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Compensatory, date(2026, 4, 22), date(2026, 4, 22)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::QuotaExceeded(_)), "{err}");

    let outcome = h.engine.approve(LEAD, first.request.id).await.unwrap();
    assert_eq!(outcome.ledger.compensatory_balance, dec!(8));
    assert_eq!(outcome.ledger.annual_used, dec!(0));
    assert_eq!(
        h.store.ledger(ALICE, 2026).await.unwrap().compensatory_balance,
        dec!(8)
    );
}

#[tokio::test]
async fn subtypes_are_checked_against_the_category() {
    let h = Harness::new().await;
    // enough balance that only the subtype can fail
    let mut ledger = LeaveLedger::empty(ALICE, 2026);
    ledger.annual_total = dec!(3);
    ledger.compensatory_balance = dec!(16);
    h.store.put_ledger(ledger).await;

    for category in [LeaveCategory::Paid, LeaveCategory::Unpaid, LeaveCategory::Compensatory] {
        let err = h
            .engine
            .create_request(
                ALICE,
                with_subtype(leave(category, date(2026, 4, 20), date(2026, 4, 20)), "wedding"),
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)), "{category}: {err}");
    }

    let err = h
        .engine
        .create_request(
            ALICE,
            with_subtype(leave(LeaveCategory::PersonalPaid, date(2026, 4, 20), date(2026, 4, 20)), "honeymoon"),
            vec![],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)), "{err}");

    // a known subtype the catalog has no rule for
    let err = h
        .engine
        .create_request(
            ALICE,
            with_subtype(leave(LeaveCategory::Insurance, date(2026, 4, 20), date(2026, 4, 20)), "sick"),
            vec![pdf("note.pdf")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::NotFound(_)), "{err}");

    assert_eq!(h.store.request_count().await, 0);
    assert_eq!(h.stored_files(), 0);
}

#[tokio::test]
async fn backfill_refuses_a_future_hire_date() {
    let h = Harness::new().await;
    h.store
        .put_employee(employee(7, "Nora", "Engineering", Role::Employee, EmploymentType::Official, date(2026, 6, 1)))
        .await;

    let err = h.engine.backfill(7).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)), "{err}");
    assert!(h.store.ledger(7, 2026).await.is_none());
}

#[tokio::test]
async fn late_filing_is_limited_to_the_current_month() {
    let h = Harness::new().await;

    let err = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 3, 30), date(2026, 3, 30)), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)), "{err}");

    let created = h
        .engine
        .create_request(ALICE, leave(LeaveCategory::Unpaid, date(2026, 4, 2), date(2026, 4, 2)), vec![])
        .await
        .unwrap();
    assert_eq!(created.request.status, LeaveStatus::Pending);
}

#[tokio::test]
async fn failed_commit_removes_written_files() {
    let armed = Arc::new(AtomicBool::new(false));
    let flag = armed.clone();
    let h = Harness::build(local_storage, EngineSettings::default(), move |store| {
        Arc::new(FailingCommitStore { inner: store, armed: flag }) as Arc<dyn LeaveStore>
    })
    .await;
    armed.store(true, Ordering::SeqCst);

    let checkup = with_subtype(
        leave(LeaveCategory::Insurance, date(2026, 4, 20), date(2026, 4, 20)),
        "maternity_checkup",
    );
    let err = h
        .engine
        .create_request(ALICE, checkup, vec![pdf("checkup.pdf")])
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::DependencyFailure(_)), "{err}");

    assert_eq!(h.store.request_count().await, 0);
    assert_eq!(h.store.attachment_count().await, 0);
    assert_eq!(h.stored_files(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn ledger_backfill_goes_by_the_stored_role() {
    let h = Harness::new().await;

    let err = h.engine.backfill_for(ALICE, ALICE).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)), "{err}");
    let err = h.engine.backfill_for(LEAD, ALICE).await.unwrap_err();
    assert!(matches!(err, LeaveError::Forbidden(_)), "{err}");
    assert!(h.store.ledger(ALICE, 2026).await.is_none());

    let ledger = h.engine.backfill_for(HR, ALICE).await.unwrap();
    assert_eq!(ledger.annual_total, dec!(3));

    let err = h.engine.backfill_for(99, ALICE).await.unwrap_err();
    assert!(matches!(err, LeaveError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn out_of_range_page_is_invalid_input() {
    let h = Harness::new().await;
    let query = LeaveListQuery {
        page: Some(u64::MAX),
        ..LeaveListQuery::default()
    };

    let err = h.engine.my_requests(ALICE, &query).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidInput(_)), "{err}");
}
