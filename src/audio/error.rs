//! Audio error types
//!
//! None of these are fatal to gameplay: the announcer logs them and moves on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by playback backends and clip loading
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),

    #[error("audio backend has been released")]
    Released,

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create audio cache directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write tone file {path}")]
    WriteWav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("invalid clip manifest")]
    Manifest(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}
