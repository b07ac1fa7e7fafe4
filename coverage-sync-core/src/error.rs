//! Error taxonomy for a coverage synchronisation run.
//!
//! Fatal categories (`ConfigMissing`, `ConfigInvalid`, `DataSource`) stop the run.
//! Everything else is scoped to one commit or one (commit, language) pair and is
//! recorded in the run report instead of being propagated.

use thiserror::Error;

/// A coverage blob could not be turned into structured data.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("coverage blob is missing")]
    Missing,
    #[error("coverage blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure while reading one of the bulk inputs.
#[derive(Debug, Error)]
#[error("{source_name}: {message}")]
pub struct DataSourceError {
    /// Which logical source failed (e.g. `projects`, `coverage`).
    pub source_name: String,
    pub message: String,
}

impl DataSourceError {
    pub fn new(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

/// Transport-level failure of the publish sink. HTTP statuses are not errors here.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid publish url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("required configuration value {variable} is not set")]
    ConfigMissing { variable: String },
    #[error("configuration value {variable} is invalid: {reason}")]
    ConfigInvalid { variable: String, reason: String },
    #[error("data source failure: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("coverage decode failure: {0}")]
    Decode(#[from] DecodeError),
    #[error("no project found for project id {project_id:?}")]
    ProjectNotFound { project_id: Option<i64> },
    #[error("publish failure: {0}")]
    Publish(#[from] PublishError),
}

impl SyncError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigMissing { .. }
                | SyncError::ConfigInvalid { .. }
                | SyncError::DataSource(_)
        )
    }
}
