use thiserror::Error;

/// Failures raised by ledger store operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{field} {reason}")]
    Validation { field: String, reason: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    StorageFailure,
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn company_not_found(id: i64) -> Self {
        LedgerError::NotFound {
            entity: "company",
            id,
        }
    }

    pub fn invoice_not_found(id: i64) -> Self {
        LedgerError::NotFound {
            entity: "invoice",
            id,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}
