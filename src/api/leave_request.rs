use actix_multipart::Multipart;
use actix_web::{Responder, web};
use futures_util::TryStreamExt;
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    api::response::{ApiResponse, created, ok},
    auth::auth::AuthUser,
    error::LeaveError,
    leave::{
        ApprovalOutcome, BalanceSummary, CreateLeave, CreatedLeave, LeaveEngine, LeaveListQuery,
        queries::{LeaveRequestPage, RequestDetail},
    },
    model::leave_request::LeaveRequest,
    storage::AttachmentUpload,
};

/// Largest accepted `payload` part, in bytes.
const MAX_PAYLOAD_PART: usize = 64 * 1024;

#[derive(Deserialize, ToSchema)]
pub struct RejectLeave {
    #[schema(example = "Team is short-staffed that week")]
    pub rejection_reason: String,
}

/// Multipart form for `POST /leave`, documented for Swagger.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateLeaveForm {
    /// JSON encoded `CreateLeave`
    #[schema(value_type = String)]
    payload: String,
    /// Supporting documents (PDF, PNG, JPEG)
    #[schema(value_type = Vec<String>, format = Binary)]
    attachments: Vec<Vec<u8>>,
}

async fn read_part(
    field: &mut actix_multipart::Field,
    limit: usize,
) -> Result<Vec<u8>, LeaveError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| LeaveError::invalid(format!("Malformed multipart body: {e}")))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(LeaveError::invalid(format!(
                "Part {} exceeds the {limit} byte limit",
                field.name()
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Splits the form into the JSON payload and the uploaded files.
async fn read_create_form(
    mut form: Multipart,
    max_file_bytes: usize,
) -> Result<(CreateLeave, Vec<AttachmentUpload>), LeaveError> {
    let mut input: Option<CreateLeave> = None;
    let mut uploads = Vec::new();

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| LeaveError::invalid(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().to_string();
        match name.as_str() {
            "payload" => {
                let bytes = read_part(&mut field, MAX_PAYLOAD_PART).await?;
                let parsed = serde_json::from_slice(&bytes)
                    .map_err(|e| LeaveError::invalid(format!("Invalid payload: {e}")))?;
                input = Some(parsed);
            }
            "attachments" => {
                let original_name = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or_default()
                    .to_string();
                let mime_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_default();
                // one byte over the limit is enough to reject the file
                let bytes = read_part(&mut field, max_file_bytes.saturating_add(1)).await?;
                uploads.push(AttachmentUpload {
                    original_name,
                    mime_type,
                    bytes,
                });
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let input = input.ok_or_else(|| LeaveError::invalid("Missing payload part"))?;
    Ok((input, uploads))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeaveForm,
        description = "`payload` holds the request as JSON, `attachments` the supporting files",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "Leave request created", body = CreatedLeave),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee or quota rule not found"),
        (status = 409, description = "Overlaps an existing request"),
        (status = 422, description = "Quota exceeded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_create", skip(engine, form), fields(user_id = auth.user_id))]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    form: Multipart,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth.employee()?;
    let max_bytes = usize::try_from(engine.settings().max_attachment_bytes).unwrap_or(usize::MAX);
    let (input, uploads) = read_create_form(form, max_bytes).await?;

    let created_leave = engine.create_request(employee_id, input, uploads).await?;
    Ok(created(created_leave))
}

/* =========================
List leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Paginated leave list, scoped to the caller's role", body = LeaveRequestPage),
        (status = 400, description = "Invalid filter or paging"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_list", skip(engine, query), fields(user_id = auth.user_id))]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveListQuery>,
) -> Result<impl Responder, LeaveError> {
    let actor_id = auth.employee()?;
    let page = engine.list_requests(actor_id, &query).await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/my-requests",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "The caller's own requests, newest first", body = LeaveRequestPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_my_requests", skip(engine, query), fields(user_id = auth.user_id))]
pub async fn my_requests(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveListQuery>,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth.employee()?;
    let page = engine.my_requests(employee_id, &query).await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/my-balance",
    responses(
        (status = 200, description = "Current year balance", body = BalanceSummary),
        (status = 400, description = "Employee has no usable hire date"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_my_balance", skip(engine), fields(user_id = auth.user_id))]
pub async fn my_balance(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth.employee()?;
    Ok(ok(engine.my_balance(employee_id).await?))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request with its attachments", body = RequestDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_get", skip(engine, path), fields(user_id = auth.user_id))]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let actor_id = auth.employee()?;
    let detail = engine.request_detail(actor_id, path.into_inner()).await?;
    Ok(ok(detail))
}

/* =========================
Approve leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved; `warning` is set when unpaid days reach the threshold", body = ApprovalOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is no longer pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_approve", skip(engine, path), fields(user_id = auth.user_id))]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let actor_id = auth.employee()?;
    let mut outcome = engine.approve(actor_id, path.into_inner()).await?;
    let warning = outcome.warning.take();
    Ok(web::Json(ApiResponse::new(outcome).with_warning(warning)))
}

/* =========================
Reject leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = RejectLeave,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Missing rejection reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is no longer pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_reject", skip(engine, path, body), fields(user_id = auth.user_id))]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    body: web::Json<RejectLeave>,
) -> Result<impl Responder, LeaveError> {
    let actor_id = auth.employee()?;
    let request = engine
        .reject(actor_id, path.into_inner(), &body.rejection_reason)
        .await?;
    Ok(ok(request))
}

/* =========================
Cancel own leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the caller's leave request")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is no longer pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
#[instrument(name = "leave_cancel", skip(engine, path), fields(user_id = auth.user_id))]
pub async fn cancel_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let employee_id = auth.employee()?;
    let request = engine.cancel(employee_id, path.into_inner()).await?;
    Ok(ok(request))
}
