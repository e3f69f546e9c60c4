//! Creation path: validate, price and persist a new leave request.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{
    LeaveEngine, finish,
    ledger::get_or_create_ledger,
    policy::{Action, ActorContext, Subject},
    quota::{known_subtypes, used_days},
    slots::{LeaveSpan, find_conflict},
};
use crate::{
    error::LeaveError,
    model::{
        employee::Employee,
        leave_attachment::{LeaveAttachment, NewLeaveAttachment},
        leave_request::{HalfDay, LeaveCategory, LeaveRequest, LeaveStatus, NewLeaveRequest},
    },
    notify::LeaveSubmitted,
    storage::{AttachmentUpload, StoredFile, validate_upload},
    store::{RequestFilter, UnitOfWork},
};

/// Hours of compensatory balance one leave day costs.
pub const HOURS_PER_DAY: Decimal = dec!(8);

/// Fields of a new request as submitted by the employee.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLeave {
    pub category: LeaveCategory,
    #[schema(example = "wedding")]
    pub subtype: Option<String>,
    #[schema(example = "2026-05-04", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-05-06", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub start_half: HalfDay,
    #[serde(default)]
    pub end_half: HalfDay,
    #[schema(example = "Family event")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DeductionBreakdown {
    /// Days drawn from a subtype quota.
    #[schema(value_type = String)]
    pub in_quota: Decimal,
    #[schema(value_type = String)]
    pub paid_deduction: Decimal,
    #[schema(value_type = String)]
    pub unpaid_deduction: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedLeave {
    pub request: LeaveRequest,
    pub attachments: Vec<LeaveAttachment>,
    #[schema(value_type = String, example = "2.5")]
    pub days: Decimal,
    pub breakdown: DeductionBreakdown,
}

impl CreateLeave {
    fn span(&self) -> LeaveSpan {
        LeaveSpan::new(self.start_date, self.end_date, self.start_half, self.end_half)
    }

    fn normalized_subtype(&self) -> Option<String> {
        self.subtype
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Date-range rules that need nothing but the input and today's date.
pub fn check_dates(input: &CreateLeave, today: NaiveDate) -> Result<(), LeaveError> {
    if input.start_date > input.end_date {
        return Err(LeaveError::invalid("start_date must not be after end_date"));
    }

    if input.start_date == input.end_date
        && input.start_half == HalfDay::Afternoon
        && input.end_half == HalfDay::Morning
    {
        return Err(LeaveError::invalid(
            "A single-day request cannot start in the afternoon and end in the morning",
        ));
    }

    // late filing is accepted inside the current month only
    if input.start_date < today
        && (input.start_date.year() != today.year() || input.start_date.month() != today.month())
    {
        return Err(LeaveError::invalid(
            "Past dates are only accepted within the current month",
        ));
    }

    Ok(())
}

impl LeaveEngine {
    /// Validates and stores a new pending request for `employee_id`.
    ///
    /// Attachment files are written inside the unit of work and deleted
    /// again when anything after the first write fails, commit included.
    /// The department lead is notified once the request is committed.
    pub async fn create_request(
        &self,
        employee_id: u64,
        input: CreateLeave,
        uploads: Vec<AttachmentUpload>,
    ) -> Result<CreatedLeave, LeaveError> {
        if input.reason.trim().is_empty() {
            return Err(LeaveError::invalid("reason must not be empty"));
        }
        if uploads.len() > self.settings.max_attachments {
            return Err(LeaveError::invalid(format!(
                "At most {} attachments are allowed",
                self.settings.max_attachments
            )));
        }
        for upload in &uploads {
            validate_upload(upload, self.settings.max_attachment_bytes)?;
        }

        let mut written: Vec<StoredFile> = Vec::new();
        let mut uow = self.begin().await?;
        let result = self
            .create_in(uow.as_mut(), employee_id, &input, &uploads, &mut written)
            .await;
        let outcome = finish(uow, result).await;

        let (created, notice) = match outcome {
            Ok(done) => done,
            Err(e) => {
                self.discard_files(&written).await;
                return Err(e);
            }
        };

        info!(
            request_id = created.request.id,
            employee_id,
            category = %created.request.category,
            days = %created.days,
            "Leave request created"
        );

        if let Some(notice) = notice {
            if let Err(e) = self.notifier.notify_leave_submitted(&notice).await {
                warn!(request_id = created.request.id, error = %e, "Leave notification failed");
            }
        }

        Ok(created)
    }

    async fn create_in(
        &self,
        uow: &mut dyn UnitOfWork,
        employee_id: u64,
        input: &CreateLeave,
        uploads: &[AttachmentUpload],
        written: &mut Vec<StoredFile>,
    ) -> Result<(CreatedLeave, Option<LeaveSubmitted>), LeaveError> {
        let today = self.clock.today();

        let employee = uow
            .lock_employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("Employee {employee_id} not found")))?;

        if !self.policy.can_perform(
            &ActorContext::from(&employee),
            Action::Create,
            &Subject::from(&employee),
        ) {
            return Err(LeaveError::Forbidden(
                "You are not allowed to create leave requests".into(),
            ));
        }

        if input.category == LeaveCategory::Insurance && uploads.is_empty() {
            return Err(LeaveError::invalid(
                "Insurance leave requires at least one supporting document",
            ));
        }

        if input.category.requires_official() && !employee.is_official() {
            return Err(LeaveError::invalid(
                "Paid and insurance leave are available to official employees only. \
                 Annual leave keeps accruing and becomes usable once you are made official",
            ));
        }

        check_dates(input, today)?;

        let span = input.span();
        check_overlap(uow, employee_id, &span).await?;

        let days = span.days();
        let subtype = input.normalized_subtype();
        let breakdown = self
            .price_request(uow, &employee, input.category, subtype.as_deref(), &span, today)
            .await?;

        if !input.category.uses_subtype() && subtype.is_some() {
            return Err(LeaveError::invalid(format!(
                "{} leave does not take a subtype",
                input.category
            )));
        }

        let request = uow
            .insert_request(NewLeaveRequest {
                employee_id,
                category: input.category,
                subtype,
                start_date: input.start_date,
                end_date: input.end_date,
                start_half: input.start_half,
                end_half: input.end_half,
                reason: input.reason.trim().to_string(),
                paid_deduction: breakdown.paid_deduction,
                unpaid_deduction: breakdown.unpaid_deduction,
                created_at: self.clock.now(),
            })
            .await?;

        let mut attachments = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let stored = self
                .storage
                .save_file(&upload.bytes, &upload.original_name)
                .await?;
            written.push(stored.clone());

            let row = uow
                .insert_attachment(NewLeaveAttachment {
                    leave_request_id: request.id,
                    original_name: upload.original_name.clone(),
                    file_name: stored.file_name,
                    file_path: stored.file_path,
                    mime_type: upload.mime_type.clone(),
                    size: upload.size(),
                    uploaded_at: self.clock.now(),
                })
                .await?;
            attachments.push(row);
        }

        let notice = lead_notice(uow, &employee, &request).await?;

        Ok((
            CreatedLeave {
                request,
                attachments,
                days,
                breakdown,
            },
            notice,
        ))
    }

    /// Checks the quota the category draws on and decides what approval will
    /// charge to the ledger.
    async fn price_request(
        &self,
        uow: &mut dyn UnitOfWork,
        employee: &Employee,
        category: LeaveCategory,
        subtype: Option<&str>,
        span: &LeaveSpan,
        today: NaiveDate,
    ) -> Result<DeductionBreakdown, LeaveError> {
        let days = span.days();
        let mut breakdown = DeductionBreakdown {
            in_quota: Decimal::ZERO,
            paid_deduction: Decimal::ZERO,
            unpaid_deduction: Decimal::ZERO,
        };

        match category {
            LeaveCategory::PersonalPaid | LeaveCategory::Insurance => {
                let subtype = subtype.ok_or_else(|| {
                    LeaveError::invalid(format!("{category} leave requires a subtype"))
                })?;
                if !known_subtypes(category).contains(&subtype) {
                    return Err(LeaveError::invalid(format!(
                        "Unknown {category} subtype {subtype}"
                    )));
                }
                let rule = uow.find_quota_rule(category, subtype).await?.ok_or_else(|| {
                    LeaveError::not_found(format!("No quota rule for {category}/{subtype}"))
                })?;

                let used = used_days(uow, employee.id, &rule, span.start).await?;
                let remaining = rule.day_limit - used;
                debug!(employee_id = employee.id, subtype, %used, %remaining, %days, "Quota check");
                if days > remaining {
                    return Err(LeaveError::QuotaExceeded(format!(
                        "Only {} day(s) of {subtype} leave remain, {days} requested",
                        remaining.max(Decimal::ZERO)
                    )));
                }
                breakdown.in_quota = days;
            }
            LeaveCategory::Paid => {
                let ledger = get_or_create_ledger(uow, employee, today).await?;
                let reserved = pending_days(uow, employee.id, category).await?;
                let remaining = ledger.annual_remaining() - reserved;
                debug!(employee_id = employee.id, %remaining, %reserved, %days, "Annual leave check");
                if remaining < days {
                    return Err(LeaveError::QuotaExceeded(format!(
                        "Only {} day(s) of annual leave remain, {days} requested. \
                         Please file unpaid leave instead",
                        remaining.max(Decimal::ZERO)
                    )));
                }
                breakdown.paid_deduction = days;
            }
            LeaveCategory::Unpaid => {
                breakdown.unpaid_deduction = days;
            }
            LeaveCategory::Compensatory => {
                let ledger = get_or_create_ledger(uow, employee, today).await?;
                let reserved = pending_days(uow, employee.id, category).await? * HOURS_PER_DAY;
                let available = ledger.compensatory_balance - reserved;
                let hours = days * HOURS_PER_DAY;
                if hours > available {
                    return Err(LeaveError::QuotaExceeded(format!(
                        "Only {} compensatory hour(s) remain, {hours} required",
                        available.max(Decimal::ZERO)
                    )));
                }
            }
        }

        Ok(breakdown)
    }

    async fn discard_files(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = self.storage.delete_file(&file.file_path).await {
                warn!(path = %file.file_path, error = %e, "Could not remove orphaned attachment");
            }
        }
    }
}

/// Rejects `span` if it claims a half-day slot already held by one of the
/// employee's pending or approved requests.
async fn check_overlap(
    uow: &mut dyn UnitOfWork,
    employee_id: u64,
    span: &LeaveSpan,
) -> Result<(), LeaveError> {
    let filter = RequestFilter::for_employee(employee_id)
        .with_statuses(&[LeaveStatus::Pending, LeaveStatus::Approved]);

    for existing in uow.list_requests(&filter).await? {
        if let Some(day) = find_conflict(span, &LeaveSpan::from(&existing)) {
            return Err(LeaveError::ScheduleConflict(format!(
                "Overlaps leave request #{} ({} {} - {} {}) on {day}",
                existing.id,
                existing.start_date,
                existing.start_half,
                existing.end_date,
                existing.end_half
            )));
        }
    }
    Ok(())
}

/// Days held by the employee's pending requests of `category`, not yet
/// charged to the ledger.
async fn pending_days(
    uow: &mut dyn UnitOfWork,
    employee_id: u64,
    category: LeaveCategory,
) -> Result<Decimal, LeaveError> {
    let filter = RequestFilter {
        category: Some(category),
        ..RequestFilter::for_employee(employee_id)
    }
    .with_statuses(&[LeaveStatus::Pending]);

    let pending = uow.list_requests(&filter).await?;
    Ok(pending
        .iter()
        .map(|r| match category {
            LeaveCategory::Paid => r.paid_deduction,
            _ => LeaveSpan::from(r).days(),
        })
        .sum())
}

async fn lead_notice(
    uow: &mut dyn UnitOfWork,
    employee: &Employee,
    request: &LeaveRequest,
) -> Result<Option<LeaveSubmitted>, LeaveError> {
    let Some(department) = employee.department.as_deref() else {
        return Ok(None);
    };

    let lead = uow
        .find_department_lead(department)
        .await?
        .filter(|lead| lead.id != employee.id);

    Ok(lead.map(|lead| LeaveSubmitted {
        request_id: request.id,
        recipient_email: lead.email,
        employee_name: employee.name.clone(),
        department: department.to_string(),
        start_date: request.start_date,
        end_date: request.end_date,
    }))
}
