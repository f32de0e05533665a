use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

mod ledger;

pub use ledger::{ErrorKind, LedgerError, LedgerResult};

/// The error shape every request reply carries on failure.
///
/// `code` is stable and namespaced (`NOT_FOUND/INVOICE`, `JSON/SYNTAX`, ...);
/// `message` is for people. Storage failures keep the driver error as `cause`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[ts(type = "Record<string, string>")]
    pub context: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub const VALIDATION_CODE: &'static str = "VALIDATION/INVALID_FIELD";
    pub const NOT_FOUND_COMPANY: &'static str = "NOT_FOUND/COMPANY";
    pub const NOT_FOUND_INVOICE: &'static str = "NOT_FOUND/INVOICE";
    pub const CONFLICT_COMPANY_HAS_INVOICES: &'static str = "CONFLICT/COMPANY_HAS_INVOICES";
    pub const STORAGE_CODE: &'static str = "STORAGE/FAILURE";
    pub const PANIC_CODE: &'static str = "RUNTIME/PANIC";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: AppError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Whether the error was caused by the caller's input rather than the store.
    pub fn is_caller_error(&self) -> bool {
        ["VALIDATION/", "NOT_FOUND/", "CONFLICT/", "JSON/"]
            .iter()
            .any(|prefix| self.code.starts_with(prefix))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            let mut pairs: Vec<_> = self.context.iter().collect();
            pairs.sort();
            for (key, value) in pairs {
                write!(f, " {key}={value}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let app = AppError::new(format!("IO/{:?}", err.kind()), err.to_string());
        match err.raw_os_error() {
            Some(os_code) => app.with_context("os_code", os_code.to_string()),
            None => app,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let code = match err.classify() {
            Category::Data => "JSON/DATA",
            Category::Syntax => "JSON/SYNTAX",
            Category::Eof => "JSON/EOF",
            Category::Io => "JSON/IO",
        };
        let app = AppError::new(code, err.to_string());
        if err.line() == 0 {
            return app;
        }
        app.with_context("line", err.line().to_string())
            .with_context("column", err.column().to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error;

        match err {
            Error::Database(db) => {
                let code = db
                    .code()
                    .map(|code| format!("Sqlite/{code}"))
                    .unwrap_or_else(|| "SQLX/DATABASE".to_string());
                let app = AppError::new(code, db.message());
                match db.constraint() {
                    Some(constraint) => app.with_context("constraint", constraint),
                    None => app,
                }
            }
            Error::ColumnDecode { index, source } => {
                AppError::new("SQLX/COLUMN_DECODE", source.to_string()).with_context("column", index)
            }
            Error::Io(io) => AppError::from(io).with_context("source", "sqlx"),
            Error::PoolTimedOut => AppError::new("SQLX/POOL_TIMEOUT", "Timed out waiting for a connection"),
            Error::PoolClosed => AppError::new("SQLX/POOL_CLOSED", "Database pool is closed"),
            Error::RowNotFound => AppError::new("SQLX/ROW_NOT_FOUND", "Row not found"),
            other => AppError::new("SQLX/ERROR", other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation { field, reason } => {
                AppError::new(AppError::VALIDATION_CODE, format!("{field} {reason}"))
                    .with_context("field", field)
            }
            LedgerError::NotFound { entity, id } => {
                let code = match entity {
                    "invoice" => AppError::NOT_FOUND_INVOICE,
                    _ => AppError::NOT_FOUND_COMPANY,
                };
                AppError::new(code, format!("No {entity} with id {id}"))
                    .with_context("id", id.to_string())
            }
            LedgerError::Conflict(message) => {
                AppError::new(AppError::CONFLICT_COMPANY_HAS_INVOICES, message)
            }
            LedgerError::Storage(err) => AppError::new(AppError::STORAGE_CODE, err.to_string())
                .with_cause(AppError::from(err)),
        }
    }
}
