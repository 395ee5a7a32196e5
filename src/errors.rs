//! Typed error taxonomy for wolfies-blitz.
//!
//! - `ValidationError` - contact file ingestion (aborts ingestion entirely)
//! - `AttemptError` - one send attempt (recovered by the bounded retry)
//! - `TransportError` - transport readiness (fatal for `start`)
//! - `SendError` - campaign start failures
//! - `StoreError` - persistence failures
//! - `ConfigError` - configuration loading
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial error hierarchy

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning tabular rows into contacts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("File must contain at least a header row and one data row")]
    EmptyInput,

    #[error("No valid contacts found in file")]
    NoValidContacts,

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Why a single send attempt failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Contact not found: {phone}")]
    ContactNotFound { phone: String },

    #[error("Delivery failed: {reason}")]
    DeliveryFailed { reason: String },
}

/// The messaging surface could not be used at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Messaging surface unavailable: {0}")]
    Unavailable(String),

    #[error("Messaging surface did not become ready within {0:?}")]
    Timeout(Duration),
}

/// Errors from `SendOrchestrator::start`. Store failures during a run are
/// logged, never fatal, so they do not appear here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("No contacts queued. Process a contact file first.")]
    EmptyQueue,

    #[error(transparent)]
    TransportUnavailable(#[from] TransportError),
}

/// Errors from a `PersistenceStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to prepare store directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Errors loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_columns() {
        let err = ValidationError::MissingColumns(vec!["phone".into(), "message".into()]);
        assert_eq!(err.to_string(), "Missing required columns: phone, message");
    }

    #[test]
    fn test_send_error_wraps_transport_error() {
        let err: SendError = TransportError::Unavailable("no chat.db".into()).into();
        assert_eq!(err.to_string(), "Messaging surface unavailable: no chat.db");
    }

    #[test]
    fn test_send_error_is_comparable() {
        let timeout = Duration::from_secs(10);
        assert_eq!(
            SendError::from(TransportError::Timeout(timeout)),
            SendError::TransportUnavailable(TransportError::Timeout(timeout))
        );
        assert_ne!(SendError::EmptyQueue, SendError::from(TransportError::Timeout(timeout)));
    }
}
