//! Error taxonomy for the ingestion pipeline.
//!
//! Parse-phase errors are fatal and abort the current pass. Persistence
//! errors from asynchronous batch writers are collected via the writer's
//! sticky failure flag and surfaced as [`LoadError::Persistence`] after
//! the pool drains.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Wrong field count or a non-numeric required field in an input line.
    #[error("malformed record ({reason}): [{line}]")]
    MalformedRecord { line: String, reason: String },

    /// A referenced file does not exist or a required side-file is empty.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// Invalid run configuration (bad app name, empty prefix set, etc.).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// One or more asynchronous batch inserts failed during the run.
    #[error("one or more batch inserts failed")]
    Persistence,

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;

impl LoadError {
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        LoadError::MalformedRecord {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
