//! Result documents returned to whoever invoked a run.

use std::fmt::Display;

use serde::Serialize;

/// Outcome of one invocation, tagged by a `status` field.
///
/// `success` flattens the payload into the document. `error` carries a
/// message and, when the run got far enough to produce one, the payload
/// describing what it did before failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunReport<T> {
    Success(T),
    Error {
        message: String,
        #[serde(flatten)]
        details: Option<T>,
    },
}

impl<T> RunReport<T> {
    /// An error report with no payload, for runs that aborted.
    pub fn failure(err: &impl Display) -> Self {
        RunReport::Error {
            message: err.to_string(),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunReport::Success(_))
    }
}
