//! Error types for the reminder engine.

/// Input rejected by the controller before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,

    #[error("date is required")]
    MissingDate,

    #[error("time is required")]
    MissingTime,

    #[error("invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', use HH:mm")]
    InvalidTime(String),
}

/// Top-level error type for the reminder engine.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// User-correctable input problem. Nothing was mutated.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No record with the given id.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// An abbreviated id matched more than one record.
    #[error("{kind} id prefix '{prefix}' is ambiguous")]
    AmbiguousId { kind: &'static str, prefix: String },

    /// Substrate I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Substrate serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ReminderError>;
