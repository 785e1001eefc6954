//! Output subsystem interface consumed by the playback core
//!
//! Mirrors a pull-model streaming driver: the worker owns one channel,
//! arms it for pull mode, starts it (optionally in queued mode, where the
//! channel primes its buffers but stays silent until triggered), and polls
//! it. The channel asks for audio only during `start` and `poll`, through
//! the [`PullSource`] handed to those calls, so all decode work happens on
//! the worker thread.

use crate::error::Result;

/// Supplier of PCM for an output channel
///
/// Bytes are interleaved stereo i16, little-endian.
pub trait PullSource {
    /// Request `bytes` of audio
    ///
    /// Returns up to `bytes` valid bytes (fewer means a partial fill), or
    /// `None` when the stream has no more data.
    fn pull(&mut self, bytes: usize) -> Option<&[u8]>;
}

/// Result of polling a started channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Channel is fed (or did not need data); keep polling
    Pending,
    /// The pull source reported end of stream; nothing left to do
    Exhausted,
}

/// The audio output driver
pub trait OutputSubsystem: Send + Sync {
    /// One-time driver initialization, called from `StreamPlayer::init`
    fn init(&self) -> Result<()>;

    /// Allocate a streaming channel (called on the worker thread)
    fn alloc_channel(&self) -> Result<Box<dyn OutputChannel>>;
}

/// A streaming channel owned by the worker thread
pub trait OutputChannel {
    /// Reset the channel for a new pull-mode stream
    fn reinit(&mut self);

    /// Make the next `start` prime the channel without producing sound
    fn enable_queued_start(&mut self);

    /// Start streaming at the given format, priming from `source`
    fn start(&mut self, source: &mut dyn PullSource, sample_rate: u32, channels: u16) -> Result<()>;

    /// Begin audible playback of a channel started in queued mode
    fn trigger_queued_start(&mut self);

    /// Apply a volume level (0-255)
    fn set_volume(&mut self, level: u8);

    /// Feed the channel from `source` if it needs data
    fn poll(&mut self, source: &mut dyn PullSource) -> PollStatus;

    /// Stop streaming; the channel can be started again after `reinit`
    fn stop(&mut self);

    /// Release the channel's driver resources
    fn destroy(&mut self);
}
