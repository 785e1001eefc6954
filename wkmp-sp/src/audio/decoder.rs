//! Decoder interface consumed by the playback core
//!
//! A decoder hands out interleaved stereo i16 frames, one call at a time.
//! Returning zero frames is the end-of-stream signal. Dropping the decoder
//! closes it.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by decoder implementations
#[derive(Error, Debug)]
pub enum DecoderError {
    /// Source file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Reading the source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container could not be recognized
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Container holds no Opus track
    #[error("No Opus track found")]
    NoOpusTrack,

    /// Codec setup or a non-recoverable decode failure
    #[error("Codec error: {0}")]
    Codec(String),

    /// Repositioning the stream failed
    #[error("Seek failed: {0}")]
    Seek(String),
}

/// An open, decodable stream
///
/// Owned by the stream worker for the whole session, so it must be `Send`.
pub trait StreamDecoder: Send {
    /// Decode up to `out.len() / 2` stereo frames into `out`
    ///
    /// Returns the number of frames written; `0` means end of stream.
    fn decode_stereo(&mut self, out: &mut [i16]) -> Result<usize, DecoderError>;

    /// Reposition to `position` (in frames); `0` is the stream origin
    fn seek(&mut self, position: u64) -> Result<(), DecoderError>;
}

/// Opens sources into decoders
pub trait DecoderFactory: Send + Sync {
    fn open(&self, source: &Path) -> Result<Box<dyn StreamDecoder>, DecoderError>;
}
