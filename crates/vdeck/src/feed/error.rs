use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain the list text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error! Status: {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

/// Fatal initialization failure. The feed stays unusable afterwards.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("the list is empty or contains no valid URLs")]
    Empty,
}

/// Failure of an explicit navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("please enter a valid line number (1 to {max})")]
    InvalidLine { line: usize, max: usize },

    #[error("please enter a valid line number (1 to {max})")]
    NotANumber { input: String, max: usize },

    #[error("cannot find the video for line {line} in the current order; try switching mode")]
    Unresolvable { line: usize },

    #[error("jump failed: target slide for line {line} is not mounted")]
    TargetMissing { line: usize, active_index: usize },

    #[error("a jump is already in progress")]
    Busy,

    #[error("the feed is not loaded")]
    NotLoaded,
}

/// The media element refused to start playback (autoplay policy or
/// decoding failure).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("playback rejected: {reason}")]
pub struct PlayRejected {
    pub reason: String,
}

impl PlayRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
