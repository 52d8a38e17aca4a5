//! Error types for toob-core.

use core::fmt;
use thiserror::Error;

/// Error type for toob-core operations.
///
/// Only construction and configuration paths return these. The audio thread
/// reports transient conditions as data ([`NotifyError`], [`SubmitError`],
/// [`crate::Completion::Failed`]) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Required host feature missing: {0}")]
    MissingFeature(&'static str),

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    #[error("Worker thread disconnected")]
    WorkerDisconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Rejected write to the outbound notify buffer.
///
/// Not fatal: the message is dropped for this block and the next scheduled
/// publish retries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notify buffer full: need {needed} bytes, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    #[error("frame {frame} is earlier than last written frame {last}")]
    OutOfOrder { frame: u64, last: u64 },

    /// A value with no wire form, such as a path that isn't valid UTF-8.
    #[error("message could not be encoded")]
    Unencodable,
}

/// Rejected worker submission. The payload is handed back to the caller so
/// nothing heavyweight is dropped on the audio thread.
#[derive(Error)]
pub enum SubmitError<T> {
    #[error("worker slot already has a request in flight")]
    Busy(T),

    #[error("worker host is gone")]
    Disconnected(T),
}

impl<T> SubmitError<T> {
    /// Recover the rejected payload.
    pub fn into_inner(self) -> T {
        match self {
            SubmitError::Busy(t) | SubmitError::Disconnected(t) => t,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SubmitError::Busy(_))
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Busy(_) => f.write_str("Busy(..)"),
            SubmitError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}
