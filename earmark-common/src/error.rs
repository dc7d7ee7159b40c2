//! Common error types for Earmark

use thiserror::Error;
use uuid::Uuid;

/// Common result type for Earmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by all Earmark components
///
/// Every variant is recoverable at the workflow level: the workflow reverts
/// to a safe stage and the error is surfaced to the presentation collaborator
/// as a `WorkflowError` event. `InvalidTaskConfig` and `NoSolutionSet` can
/// only occur at task load, before any workflow activity.
#[derive(Error, Debug)]
pub enum Error {
    /// Region interval is empty, inverted, or outside the track bounds
    #[error("invalid interval [{start}, {end}) for track of {track_duration}s")]
    InvalidInterval {
        start: f64,
        end: f64,
        track_duration: f64,
    },

    /// Overlapping regions are disallowed by the task's overlap policy
    #[error("interval [{start}, {end}) overlaps existing region {existing}")]
    OverlapConflict {
        start: f64,
        end: f64,
        existing: Uuid,
    },

    /// Referenced region id is not present in the store
    #[error("unknown region: {0}")]
    UnknownRegion(Uuid),

    /// Tag is not part of the task's tag vocabulary
    #[error("tag not in vocabulary: {0:?}")]
    InvalidTag(String),

    /// Feedback is enabled but no solution set was provided
    #[error("feedback mode requires a non-empty solution set")]
    NoSolutionSet,

    /// Task configuration failed validation at load
    #[error("invalid task config: {0}")]
    InvalidTaskConfig(String),

    /// Configuration file loading or parsing error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable kind string for presentation-layer error signals
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInterval { .. } => "InvalidInterval",
            Error::OverlapConflict { .. } => "OverlapConflict",
            Error::UnknownRegion(_) => "UnknownRegion",
            Error::InvalidTag(_) => "InvalidTag",
            Error::NoSolutionSet => "NoSolutionSet",
            Error::InvalidTaskConfig(_) => "InvalidTaskConfig",
            Error::Config(_) => "Config",
            Error::Io(_) => "Io",
        }
    }
}
