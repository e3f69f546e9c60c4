//! Read side: the caller's own requests and balance, scoped listings and
//! request detail.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    LeaveEngine, finish,
    ledger::get_or_create_ledger,
    policy::{Action, ActorContext, Scope, Subject},
    require_employee,
};
use crate::{
    error::LeaveError,
    model::{
        leave_attachment::LeaveAttachment,
        leave_request::{LeaveCategory, LeaveRequest, LeaveStatus},
    },
    store::{RequestFilter, UnitOfWork},
};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct LeaveListQuery {
    /// Only requests in this status
    pub status: Option<LeaveStatus>,
    pub category: Option<LeaveCategory>,
    /// Requests of one employee
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Department of the request owner
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    /// Earliest start date, inclusive
    #[schema(value_type = Option<String>, format = "date")]
    pub start_from: Option<NaiveDate>,
    /// Latest start date, inclusive
    #[schema(value_type = Option<String>, format = "date")]
    pub start_to: Option<NaiveDate>,
    /// Month (1-12) of the start date; uses `year`, or the current year
    pub month: Option<u32>,
    pub year: Option<i32>,
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Page size, 1 to 100
    #[schema(example = 10)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(LeaveRequestPage = Page<LeaveRequest>)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

impl<T> Page<T> {
    fn empty(page: u64, per_page: u64) -> Self {
        Self {
            data: Vec::new(),
            page,
            per_page,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BalanceSummary {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(value_type = String, example = "12")]
    pub annual_total: Decimal,
    #[schema(value_type = String, example = "2")]
    pub annual_used: Decimal,
    #[schema(value_type = String, example = "10")]
    pub annual_remaining: Decimal,
    #[schema(value_type = String, example = "0")]
    pub unpaid_used: Decimal,
    /// Hours.
    #[schema(value_type = String, example = "8")]
    pub compensatory_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetail {
    pub request: LeaveRequest,
    pub attachments: Vec<LeaveAttachment>,
}

/// Validated `(page, limit, offset)`.
fn paging(query: &LeaveListQuery) -> Result<(u64, u64, u64), LeaveError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if page < 1 {
        return Err(LeaveError::invalid("page must be at least 1"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(LeaveError::invalid(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| LeaveError::invalid("page is out of range"))?;
    Ok((page, limit, offset))
}

/// Start-date bounds from `month`/`year`, falling back to the explicit
/// range when neither is set.
fn start_window(
    query: &LeaveListQuery,
    today: NaiveDate,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), LeaveError> {
    let bad_period = || LeaveError::invalid("month must be between 1 and 12");

    match (query.month, query.year) {
        (None, None) => Ok((query.start_from, query.start_to)),
        (None, Some(year)) => {
            let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(bad_period)?;
            let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(bad_period)?;
            Ok((Some(first), Some(last)))
        }
        (Some(month), year) => {
            let year = year.unwrap_or(today.year());
            let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(bad_period)?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            };
            let last = next.and_then(|d| d.pred_opt()).ok_or_else(bad_period)?;
            Ok((Some(first), Some(last)))
        }
    }
}

async fn fetch_page(
    uow: &mut dyn UnitOfWork,
    filter: RequestFilter,
    page: u64,
    limit: u64,
    offset: u64,
) -> Result<Page<LeaveRequest>, LeaveError> {
    let total = uow.count_requests(&filter).await?;
    let data = uow.list_requests(&filter.page(limit, offset)).await?;
    Ok(Page {
        data,
        page,
        per_page: limit,
        total,
    })
}

impl LeaveEngine {
    /// The caller's own requests, newest first.
    pub async fn my_requests(
        &self,
        employee_id: u64,
        query: &LeaveListQuery,
    ) -> Result<Page<LeaveRequest>, LeaveError> {
        let (page, limit, offset) = paging(query)?;
        let (start_from, start_to) = start_window(query, self.clock.today())?;

        let filter = RequestFilter {
            category: query.category,
            start_from,
            start_to,
            ..RequestFilter::for_employee(employee_id)
        }
        .with_statuses(query.status.as_slice());

        let mut uow = self.begin().await?;
        let result = async {
            require_employee(uow.as_mut(), employee_id).await?;
            fetch_page(uow.as_mut(), filter, page, limit, offset).await
        }
        .await;
        finish(uow, result).await
    }

    /// This year's balance, creating the ledger row if needed.
    pub async fn my_balance(&self, employee_id: u64) -> Result<BalanceSummary, LeaveError> {
        let today = self.clock.today();
        let mut uow = self.begin().await?;
        let result = async {
            let employee = require_employee(uow.as_mut(), employee_id).await?;
            get_or_create_ledger(uow.as_mut(), &employee, today).await
        }
        .await;
        let ledger = finish(uow, result).await?;

        Ok(BalanceSummary {
            year: ledger.year,
            annual_total: ledger.annual_total,
            annual_used: ledger.annual_used,
            annual_remaining: ledger.annual_remaining(),
            unpaid_used: ledger.unpaid_used,
            compensatory_balance: ledger.compensatory_balance,
        })
    }

    /// Requests visible to `actor_id`: employees see their own, department
    /// leads their department, HR approved requests, admins everything.
    pub async fn list_requests(
        &self,
        actor_id: u64,
        query: &LeaveListQuery,
    ) -> Result<Page<LeaveRequest>, LeaveError> {
        let (page, limit, offset) = paging(query)?;
        let (start_from, start_to) = start_window(query, self.clock.today())?;

        let mut uow = self.begin().await?;
        let result = async {
            let actor = ActorContext::from(&require_employee(uow.as_mut(), actor_id).await?);
            let scope = self.policy.list_scope(&actor).ok_or_else(|| {
                LeaveError::Forbidden("You are not allowed to list leave requests".into())
            })?;

            let mut filter = RequestFilter {
                employee_id: query.employee_id,
                department: query.department.clone(),
                category: query.category,
                start_from,
                start_to,
                ..Default::default()
            };

            match scope.scope {
                Scope::All => {}
                Scope::Department => {
                    let department = actor.department.clone().ok_or_else(|| {
                        LeaveError::Forbidden("You are not assigned to a department".into())
                    })?;
                    filter.department = Some(department);
                }
                Scope::Own => {
                    filter.employee_id = Some(actor.id);
                }
            }

            filter.statuses = match (scope.status, query.status) {
                (Some(fixed), Some(asked)) if fixed != asked => {
                    return Ok(Page::empty(page, limit));
                }
                (Some(status), _) | (None, Some(status)) => vec![status],
                (None, None) => Vec::new(),
            };

            fetch_page(uow.as_mut(), filter, page, limit, offset).await
        }
        .await;
        finish(uow, result).await
    }

    pub async fn request_detail(
        &self,
        actor_id: u64,
        request_id: u64,
    ) -> Result<RequestDetail, LeaveError> {
        let mut uow = self.begin().await?;
        let result = async {
            let actor = require_employee(uow.as_mut(), actor_id).await?;
            let request = uow.find_request(request_id).await?.ok_or_else(|| {
                LeaveError::not_found(format!("Leave request {request_id} not found"))
            })?;
            let owner = require_employee(uow.as_mut(), request.employee_id).await?;

            if !self.policy.can_perform(
                &ActorContext::from(&actor),
                Action::Read,
                &Subject::from(&owner),
            ) {
                return Err(LeaveError::Forbidden(
                    "You are not allowed to view this leave request".into(),
                ));
            }

            let attachments = uow.list_attachments(request.id).await?;
            Ok::<_, LeaveError>(RequestDetail {
                request,
                attachments,
            })
        }
        .await;
        finish(uow, result).await
    }
}
