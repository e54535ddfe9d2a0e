//! Typed errors for the sync core.
//!
//! Uses `thiserror` for the library error taxonomy (not `anyhow`) so callers
//! can match on the kind without parsing strings.

use thiserror::Error;

/// Errors that can occur across the acquirer, streamer, and engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Network/HTTP failure, DB deadlock/serialization failure — retried
    /// once in-run before being surfaced.
    #[error("transient error: {0}")]
    Transient(String),

    /// Malformed JSON or a missing required field — non-retryable.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// Archive is truncated, unreadable, or otherwise physically corrupt —
    /// permanent, never retried.
    #[error("file corruption: {0}")]
    FileCorruption(String),

    /// Archive opened fine but the expected payload member is absent —
    /// permanent, never retried.
    #[error("file missing: {0}")]
    FileMissing(String),

    /// A downloaded artifact's hash matches an existing non-deleted
    /// Source File; not an error, the run short-circuits to COMPLETED.
    #[error("duplicate artifact (hash already recorded)")]
    DuplicateArtifact,

    /// The opposite job kind is already RUNNING; the run is a no-op.
    #[error("already busy")]
    AlreadyBusy,

    /// Surfaced only at the external read surface.
    #[error("not found: {0}")]
    NotFound(String),

    /// Surfaced only at the external read surface.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Uncategorized I/O failure (e.g. write to disk failed).
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CoreError {
    /// The `failure_category` string this error maps to on a Source File row,
    /// or `None` for errors that never touch Source File state.
    pub fn failure_category(&self) -> Option<&'static str> {
        match self {
            CoreError::Transient(_) => Some("NETWORK_ERROR"),
            CoreError::DataFormat(_) => Some("SCHEMA_ERROR"),
            CoreError::FileCorruption(_) => Some("FILE_CORRUPTION"),
            CoreError::FileMissing(_) => Some("FILE_MISSING"),
            CoreError::Unknown(_) => Some("UNKNOWN"),
            CoreError::DuplicateArtifact
            | CoreError::AlreadyBusy
            | CoreError::NotFound(_)
            | CoreError::InvalidInput(_) => None,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                CoreError::Transient(err.to_string())
            }
            sqlx::Error::Database(db_err) if is_serialization_failure(db_err.code().as_deref()) => {
                CoreError::Transient(err.to_string())
            }
            _ => CoreError::Unknown(err.to_string()),
        }
    }
}

fn is_serialization_failure(code: Option<&str>) -> bool {
    // Postgres serialization_failure / deadlock_detected SQLSTATE codes.
    matches!(code, Some("40001") | Some("40P01"))
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            CoreError::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            CoreError::Transient(format!("HTTP status {status}"))
        } else {
            CoreError::Transient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::DataFormat(err.to_string())
    }
}

impl From<zip::result::ZipError> for CoreError {
    fn from(err: zip::result::ZipError) -> Self {
        CoreError::FileCorruption(format!("archive error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_maps_to_network_error_category() {
        let err = CoreError::Transient("connection reset".into());
        assert_eq!(err.failure_category(), Some("NETWORK_ERROR"));
    }

    #[test]
    fn data_format_maps_to_schema_error_category() {
        let err = CoreError::DataFormat("missing LEI field".into());
        assert_eq!(err.failure_category(), Some("SCHEMA_ERROR"));
    }

    #[test]
    fn duplicate_artifact_has_no_failure_category() {
        assert_eq!(CoreError::DuplicateArtifact.failure_category(), None);
        assert_eq!(CoreError::AlreadyBusy.failure_category(), None);
    }

    #[test]
    fn file_corruption_and_file_missing_map_to_permanent_categories() {
        let corruption = CoreError::FileCorruption("truncated archive".into());
        assert_eq!(corruption.failure_category(), Some("FILE_CORRUPTION"));

        let missing = CoreError::FileMissing("no .json member".into());
        assert_eq!(missing.failure_category(), Some("FILE_MISSING"));
    }
}
