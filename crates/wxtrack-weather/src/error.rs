//! Tracker error types.

use thiserror::Error;
use wxtrack_core::{DatabaseError, RusqliteErrorExt};

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Message for operator-facing output.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Invalid location: {}", msg),
            Self::NotFound(key) => format!("Location {} is not tracked", key),
            Self::Database(e) => e.user_message().to_string(),
            Self::Other(_) => "Unexpected tracker error".to_string(),
        }
    }

    /// Whether the caller may retry the same call.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into_database_error())
    }
}

impl From<TrackerError> for wxtrack_core::AppError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Database(db) => Self::Database(db),
            TrackerError::Other(other) => Self::Other(other),
            other => Self::Tracking(other.user_message()),
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = TrackerError::validation("city name is empty");
        assert!(err.user_message().contains("city name is empty"));

        let err = TrackerError::not_found("messina,za");
        assert!(err.user_message().contains("messina,za"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(!TrackerError::validation("x").is_retryable());
        assert!(TrackerError::Database(DatabaseError::ConnectionFailed("x".into())).is_retryable());
        assert!(!TrackerError::Database(DatabaseError::QueryFailed("x".into())).is_retryable());
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err: TrackerError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, TrackerError::Database(DatabaseError::QueryFailed(_))));
    }

    #[test]
    fn test_app_error_mapping() {
        let app: wxtrack_core::AppError = TrackerError::not_found("durban,za").into();
        assert!(matches!(app, wxtrack_core::AppError::Tracking(_)));
        assert_eq!(app.user_message(), "Location durban,za is not tracked");

        let app: wxtrack_core::AppError = TrackerError::validation("country code is empty").into();
        assert_eq!(app.user_message(), "Invalid location: country code is empty");

        let app: wxtrack_core::AppError =
            TrackerError::Database(DatabaseError::Corruption("x".into())).into();
        assert!(matches!(app, wxtrack_core::AppError::Database(_)));
    }
}
