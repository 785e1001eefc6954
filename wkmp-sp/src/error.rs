//! Error types for wkmp-sp
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use crate::audio::DecoderError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for wkmp-sp
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid player configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// `init()` called on a player that is already running
    #[error("Stream player already initialized")]
    AlreadyInitialized,

    /// Audio output subsystem or channel errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// The worker thread could not be created
    #[error("Failed to spawn stream worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The worker reached its terminal failure state (no output channel)
    #[error("Stream worker failed to acquire an output channel")]
    WorkerFailed,

    /// A play request arrived while a stream is open
    #[error("Already playing a stream")]
    AlreadyPlaying,

    /// A stop or queue request arrived while nothing is playing
    #[error("Nothing is playing")]
    NotPlaying,

    /// The source could not be opened as an Opus stream
    #[error("Cannot open stream {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: DecoderError,
    },

    /// A bounded wait expired before the worker reached the awaited state
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// Shared configuration loading errors
    #[error(transparent)]
    Common(#[from] wkmp_common::Error),
}

impl Error {
    /// Integer status code for hosts that expect the classic C-style contract
    ///
    /// `-1` for rejected requests, `-2` for open failures, `-3` otherwise.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::AlreadyInitialized | Error::AlreadyPlaying | Error::NotPlaying => -1,
            Error::Open { .. } => -2,
            _ => -3,
        }
    }
}

/// Convenience Result type using wkmp-sp Error
pub type Result<T> = std::result::Result<T, Error>;
