use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::Utc;
use derive_more::Display;
use serde_json::json;

/// Every failure the leave engine can surface to a caller.
#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    InvalidInput(String),
    #[display(fmt = "{}", _0)]
    QuotaExceeded(String),
    #[display(fmt = "{}", _0)]
    ScheduleConflict(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    InvalidTransition(String),
    #[display(fmt = "{}", _0)]
    DependencyFailure(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for LeaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LeaveError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        LeaveError::Database(e)
    }
}

impl From<std::io::Error> for LeaveError {
    fn from(e: std::io::Error) -> Self {
        LeaveError::DependencyFailure(format!("storage error: {e}"))
    }
}

impl LeaveError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LeaveError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        LeaveError::InvalidInput(msg.into())
    }

    /// Stable machine-readable code included in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LeaveError::NotFound(_) => "NOT_FOUND",
            LeaveError::InvalidInput(_) => "INVALID_INPUT",
            LeaveError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            LeaveError::ScheduleConflict(_) => "SCHEDULE_CONFLICT",
            LeaveError::Forbidden(_) => "FORBIDDEN",
            LeaveError::InvalidTransition(_) => "INVALID_TRANSITION",
            LeaveError::DependencyFailure(_) => "DEPENDENCY_FAILURE",
            LeaveError::Database(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LeaveError::QuotaExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::ScheduleConflict(_) => StatusCode::CONFLICT,
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::InvalidTransition(_) => StatusCode::CONFLICT,
            LeaveError::DependencyFailure(_) => StatusCode::BAD_GATEWAY,
            LeaveError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // database details stay in the log
        let message = match self {
            LeaveError::Database(e) => {
                tracing::error!(error = %e, "Database failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(json!({
            "success": false,
            "statusCode": status.as_u16(),
            "code": self.code(),
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
