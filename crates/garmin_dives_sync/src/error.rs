//! Fatal error taxonomy for a sync run.
//!
//! Recoverable conditions never surface here: skipped activities are a
//! [`Transformed::Skip`](crate::transforms::Transformed::Skip), duplicate writes are
//! [`WriteOutcome::AlreadyExists`](garmin_dives_client::WriteOutcome::AlreadyExists)
//! and telemetry problems are a [`TelemetryError`](crate::telemetry::TelemetryError).

use garmin_dives_client::GarminDivesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid cursor format: {0:?} does not start with a YYYY-MM-DD date")]
    InvalidCursorFormat(String),

    #[error("unexpected write failure for activity {activity_id} (HTTP {status}): {body}")]
    UnexpectedWriteFailure {
        activity_id: String,
        status: u16,
        body: String,
    },

    #[error("API error: {0}")]
    Api(GarminDivesError),
}

impl From<GarminDivesError> for SyncError {
    fn from(err: GarminDivesError) -> Self {
        match err {
            GarminDivesError::Config(msg) => SyncError::Configuration(msg),
            GarminDivesError::Auth(msg) | GarminDivesError::Unauthorized(msg) => {
                SyncError::Authentication(msg)
            }
            other => SyncError::Api(other),
        }
    }
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
