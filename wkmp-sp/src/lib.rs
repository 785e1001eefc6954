//! # WKMP Stream Player (wkmp-sp)
//!
//! Streams one Ogg Opus source at a time to an audio output channel.
//! A dedicated worker thread owns the output channel and all decode work;
//! [`StreamPlayer`] is the thread-safe control surface in front of it.
//!
//! Supports loop mode (seamless restart at end of stream), volume control
//! and queued start, where a stream is primed ahead of time and made
//! audible with [`StreamPlayer::queue_go`].

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use config::{Config, OutputConfig, PlayerConfig};
pub use error::{Error, Result};
pub use playback::{Status, StreamPlayer};
