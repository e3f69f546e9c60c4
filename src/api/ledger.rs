use actix_web::{Responder, web};
use tracing::instrument;

use crate::{
    api::response::ok, auth::auth::AuthUser, error::LeaveError, leave::LeaveEngine,
    model::leave_ledger::LeaveLedger,
};

/// Called by the roster workflow when an employee becomes active.
#[utoipa::path(
    post,
    path = "/api/v1/ledger/{employee_id}/backfill",
    params(
        ("employee_id" = u64, Path, description = "Employee whose current-year ledger is rebuilt")
    ),
    responses(
        (status = 200, description = "Ledger after backfill", body = LeaveLedger),
        (status = 400, description = "Employee has no hire date, or one in the future"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Ledger"
)]
#[instrument(name = "ledger_backfill", skip(engine, path), fields(user_id = auth.user_id))]
pub async fn backfill(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let ledger = engine
        .backfill_for(auth.employee()?, path.into_inner())
        .await?;
    Ok(ok(ledger))
}
