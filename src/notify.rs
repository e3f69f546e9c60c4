//! Notifications sent when a leave request is submitted.
//!
//! Delivery happens after the request is committed; failures are logged by
//! the caller and never undo the request.

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::error::LeaveError;

/// What the department lead is told about a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveSubmitted {
    pub request_id: u64,
    pub recipient_email: String,
    pub employee_name: String,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl LeaveSubmitted {
    pub fn subject(&self) -> String {
        format!("Leave request from {}", self.employee_name)
    }

    pub fn body(&self) -> String {
        format!(
            "{} ({}) has requested leave from {} to {}.\nRequest #{} is waiting for your decision.",
            self.employee_name, self.department, self.start_date, self.end_date, self.request_id
        )
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_leave_submitted(&self, event: &LeaveSubmitted) -> Result<(), LeaveError>;
}

/// SMTP settings, loaded by `Config`.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

/// Sends plain-text mail over SMTP with STARTTLS.
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, event: &LeaveSubmitted) -> Result<Message, LeaveError> {
        let from = self
            .config
            .from_address
            .parse()
            .map_err(|e| LeaveError::DependencyFailure(format!("bad sender address: {e}")))?;
        let to = event
            .recipient_email
            .parse()
            .map_err(|e| LeaveError::DependencyFailure(format!("bad recipient address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(event.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(event.body())
            .map_err(|e| LeaveError::DependencyFailure(format!("email build error: {e}")))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify_leave_submitted(&self, event: &LeaveSubmitted) -> Result<(), LeaveError> {
        let email = self.build_message(event)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| LeaveError::DependencyFailure(format!("SMTP transport error: {e}")))?
            .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        builder
            .build()
            .send(email)
            .await
            .map_err(|e| LeaveError::DependencyFailure(format!("SMTP transport error: {e}")))?;

        info!(to = %event.recipient_email, request_id = event.request_id, "Leave notification sent");
        Ok(())
    }
}

/// Writes the notification to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_leave_submitted(&self, event: &LeaveSubmitted) -> Result<(), LeaveError> {
        info!(
            to = %event.recipient_email,
            request_id = event.request_id,
            subject = %event.subject(),
            "SMTP not configured, notification logged only"
        );
        Ok(())
    }
}
