//! Per-subtype quota catalog.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use super::{LeaveEngine, finish, slots::LeaveSpan};
use crate::{
    error::LeaveError,
    model::{
        leave_request::{LeaveCategory, LeaveStatus},
        quota_rule::QuotaRule,
    },
    store::{RequestFilter, UnitOfWork},
};

pub const PERSONAL_PAID_SUBTYPES: &[&str] = &[
    "wedding",
    "child_wedding",
    "parent_death",
    "spouse_death",
    "child_death",
];

pub const INSURANCE_SUBTYPES: &[&str] = &["maternity", "maternity_checkup", "sick"];

/// Subtypes a category accepts. Empty for categories without subtypes.
pub fn known_subtypes(category: LeaveCategory) -> &'static [&'static str] {
    match category {
        LeaveCategory::PersonalPaid => PERSONAL_PAID_SUBTYPES,
        LeaveCategory::Insurance => INSURANCE_SUBTYPES,
        LeaveCategory::Paid | LeaveCategory::Unpaid | LeaveCategory::Compensatory => &[],
    }
}

/// Rules written to an empty catalog at startup.
pub fn default_catalog() -> Vec<QuotaRule> {
    let rule = |category, subtype: &str, day_limit: Decimal, per_month, description: &str| {
        QuotaRule {
            category,
            subtype: subtype.to_string(),
            day_limit,
            per_month,
            description: Some(description.to_string()),
        }
    };

    vec![
        rule(LeaveCategory::PersonalPaid, "wedding", dec!(3), false, "Own wedding"),
        rule(LeaveCategory::PersonalPaid, "child_wedding", dec!(1), false, "Wedding of a child"),
        rule(LeaveCategory::PersonalPaid, "parent_death", dec!(3), false, "Death of a parent"),
        rule(LeaveCategory::PersonalPaid, "spouse_death", dec!(3), false, "Death of a spouse"),
        rule(LeaveCategory::PersonalPaid, "child_death", dec!(3), false, "Death of a child"),
        rule(LeaveCategory::Insurance, "maternity_checkup", dec!(5), true, "Prenatal checkups"),
    ]
}

/// Inclusive start-date window a rule counts usage over: the month or the
/// year containing `start`.
pub fn quota_window(rule: &QuotaRule, start: NaiveDate) -> (NaiveDate, NaiveDate) {
    let year = start.year();
    if rule.per_month {
        let first = start.with_day(1).unwrap_or(start);
        let next = if start.month() == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, start.month() + 1, 1)
        };
        let last = next.and_then(|d| d.pred_opt()).unwrap_or(start);
        (first, last)
    } else {
        (
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(start),
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(start),
        )
    }
}

/// Days of approved leave already drawn against `rule` by one employee in
/// the window containing `start`.
pub(crate) async fn used_days(
    uow: &mut dyn UnitOfWork,
    employee_id: u64,
    rule: &QuotaRule,
    start: NaiveDate,
) -> Result<Decimal, LeaveError> {
    let (from, to) = quota_window(rule, start);
    let filter = RequestFilter {
        category: Some(rule.category),
        subtype: Some(rule.subtype.clone()),
        start_from: Some(from),
        start_to: Some(to),
        ..RequestFilter::for_employee(employee_id)
    }
    .with_statuses(&[LeaveStatus::Approved]);

    let approved = uow.list_requests(&filter).await?;
    Ok(approved.iter().map(|r| LeaveSpan::from(r).days()).sum())
}

impl LeaveEngine {
    /// Writes the default catalog when the quota table is empty. Returns the
    /// number of rules inserted.
    pub async fn seed_quota_catalog(&self) -> Result<usize, LeaveError> {
        let mut uow = self.begin().await?;
        let result = seed_into(uow.as_mut()).await;
        let inserted = finish(uow, result).await?;
        if inserted > 0 {
            info!(inserted, "Quota catalog seeded");
        }
        Ok(inserted)
    }

    pub async fn quota_rules(&self) -> Result<Vec<QuotaRule>, LeaveError> {
        let mut uow = self.begin().await?;
        let result = uow.list_quota_rules().await;
        finish(uow, result).await
    }
}

async fn seed_into(uow: &mut dyn UnitOfWork) -> Result<usize, LeaveError> {
    if !uow.list_quota_rules().await?.is_empty() {
        return Ok(0);
    }
    let catalog = default_catalog();
    for rule in &catalog {
        uow.insert_quota_rule(rule).await?;
    }
    Ok(catalog.len())
}
