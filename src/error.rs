#![forbid(unsafe_code)]

//! Failure taxonomy shared by every step of the next-videos lookup.

use thiserror::Error;

/// Broad classes callers use to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadInput,
    NotFound,
    Upstream,
}

#[derive(Error, Debug)]
pub enum NextVideosError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Count must be between 1 and 15")]
    InvalidCount(i64),

    #[error("Video not found")]
    VideoNotFound,

    #[error("Channel not found")]
    ChannelNotFound,

    /// Transport or decoding failure while talking to the platform.
    #[error("YouTube API request failed: {0:#}")]
    Platform(#[from] anyhow::Error),
}

impl NextVideosError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl | Self::InvalidCount(_) => ErrorCategory::BadInput,
            Self::VideoNotFound | Self::ChannelNotFound => ErrorCategory::NotFound,
            Self::Platform(_) => ErrorCategory::Upstream,
        }
    }
}

pub type LookupResult<T> = std::result::Result<T, NextVideosError>;
