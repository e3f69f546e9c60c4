//! Monthly accrual timer: fires at 00:05 on the first day of every month.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{error, info};

use crate::leave::LeaveEngine;

/// First 00:05 on the 1st of a month strictly after `now`.
pub fn next_run_after(now: NaiveDateTime) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN);

    let this_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).map(|d| d.and_time(at));
    if let Some(candidate) = this_month.filter(|c| *c > now) {
        return candidate;
    }

    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_time(at))
        .unwrap_or(now)
}

/// Runs the accrual job every month until the process exits.
pub async fn run_accrual_loop(engine: LeaveEngine) {
    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, "Monthly accrual scheduled");

        tokio::time::sleep(wait).await;

        match engine.run_monthly_accrual().await {
            Ok(report) => info!(?report, "Monthly accrual completed"),
            Err(e) => error!(error = %e, "Monthly accrual failed"),
        }
    }
}
