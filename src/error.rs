//! Errors that end a run.
//!
//! Per-frame problems are [`FrameError`](crate::FrameError)s and never show
//! up here; they are turned into blank frames by the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// ffmpeg is missing or could not extract frames.
    #[error("frame extraction failed: {0}")]
    Extraction(String),

    /// The extracted frames cannot be listed at all.
    #[error("frame source {} is unusable: {reason}", path.display())]
    FrameSource { path: PathBuf, reason: String },

    /// Audio could not be extracted or started.
    #[error("audio failed: {0}")]
    Audio(String),

    /// Writing to the terminal failed during playback.
    #[error("render failed: {0}")]
    Render(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("playback is not ready: {0}")]
    NotReady(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}
