use crate::api::leave_request::{CreateLeaveForm, RejectLeave};
use crate::leave::{
    AccrualReport, ApprovalOutcome, BalanceSummary, CreateLeave, CreatedLeave, DeductionBreakdown,
    LeaveListQuery,
    queries::{LeaveRequestPage, RequestDetail},
};
use crate::model::{
    employee::{Employee, EmployeeStatus, EmploymentType},
    leave_attachment::LeaveAttachment,
    leave_ledger::LeaveLedger,
    leave_request::{HalfDay, LeaveCategory, LeaveRequest, LeaveStatus},
    quota_rule::QuotaRule,
    role::Role,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `bearer_auth` scheme the paths refer to.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave accounting and approval

Employees file leave requests with supporting documents; department leads and
administrators approve or reject them; every approval is charged exactly once
to the employee's yearly ledger.

### 🔹 Key Features
- **Leave requests**
  - Half-day precision, overlap detection, per-subtype quotas
- **Approvals**
  - Department-scoped decisions, unpaid-leave warnings
- **Ledger**
  - Monthly accrual of annual leave and backfill for new employees

### 🔐 Security
All endpoints require a **JWT Bearer** access token.

### 📦 Response Format
- `{"success": true, "data": ...}` on success
- `{"success": false, "statusCode", "code", "message", "timestamp"}` on failure

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::my_balance,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::ledger::backfill
    ),
    components(
        schemas(
            CreateLeave,
            CreateLeaveForm,
            CreatedLeave,
            DeductionBreakdown,
            RejectLeave,
            ApprovalOutcome,
            BalanceSummary,
            RequestDetail,
            LeaveListQuery,
            LeaveRequestPage,
            AccrualReport,
            LeaveRequest,
            LeaveAttachment,
            LeaveLedger,
            QuotaRule,
            LeaveCategory,
            LeaveStatus,
            HalfDay,
            Employee,
            EmploymentType,
            EmployeeStatus,
            Role
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request APIs"),
        (name = "Ledger", description = "Leave ledger APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_leave_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/v1/ledger/{employee_id}/backfill"));
        let schemes = &doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
