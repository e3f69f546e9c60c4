use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveAttachment {
    pub id: u64,
    pub leave_request_id: u64,
    #[schema(example = "medical-note.pdf")]
    pub original_name: String,
    #[schema(example = "1b4e28ba-2fa1-11d2-883f-0016d3cca427.pdf")]
    pub file_name: String,
    pub file_path: String,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    pub size: u64,
    #[schema(value_type = String, format = "date-time")]
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewLeaveAttachment {
    pub leave_request_id: u64,
    pub original_name: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: NaiveDateTime,
}
