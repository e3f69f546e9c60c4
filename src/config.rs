use std::{env, str::FromStr};

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::{leave::EngineSettings, notify::EmailConfig};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@hrm.local";

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// Unset runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub upload_dir: String,
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
    pub unpaid_warning_days: u32,
    pub accrual_enabled: bool,

    pub log_dir: String,
    pub log_level: String,

    /// Unset logs notifications instead of mailing them.
    pub email: Option<EmailConfig>,
}

/// Typed reads over one source of variables.
struct Vars<F> {
    get: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and non-blank.
    fn opt(&self, key: &str) -> Option<String> {
        (self.get)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.opt(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{key} has an invalid value: {raw}")),
            None => Ok(default),
        }
    }

    fn email(&self) -> Result<Option<EmailConfig>> {
        let Some(smtp_host) = self.opt("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(EmailConfig {
            smtp_host,
            smtp_port: self.parse_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            from_address: self.or("SMTP_FROM", DEFAULT_FROM_ADDRESS),
            smtp_user: self.opt("SMTP_USER"),
            smtp_password: self.opt("SMTP_PASSWORD"),
        }))
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `get`, which returns a variable's raw value.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { get };

        Ok(Self {
            server_addr: vars.or("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: vars.opt("DATABASE_URL"),
            db_max_connections: vars.parse_or("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: vars.opt("JWT_SECRET").context("JWT_SECRET must be set")?,
            api_prefix: vars.or("API_PREFIX", "/api"),

            rate_protected_per_min: vars.parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            upload_dir: vars.or("UPLOAD_DIR", "uploads/leave"),
            max_attachments: vars.parse_or("MAX_ATTACHMENTS", 5)?,
            max_attachment_bytes: vars.parse_or("MAX_ATTACHMENT_BYTES", 5 * 1024 * 1024)?,
            unpaid_warning_days: vars.parse_or("UNPAID_WARNING_DAYS", 30)?,
            accrual_enabled: vars.parse_or("ACCRUAL_ENABLED", true)?,

            log_dir: vars.or("LOG_DIR", "logs"),
            log_level: vars.or("LOG_LEVEL", "debug"),

            email: vars.email()?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_attachments: self.max_attachments,
            max_attachment_bytes: self.max_attachment_bytes,
            unpaid_warning_days: self.unpaid_warning_days,
        }
    }
}
