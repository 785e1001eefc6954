//! Audio collaborators: decoder and output subsystem
//!
//! The playback core only sees the traits in [`decoder`] and [`output`].
//! [`opus`] and [`cpal_output`] are the production implementations.

pub mod cpal_output;
pub mod decoder;
pub mod opus;
pub mod output;

pub use cpal_output::CpalOutput;
pub use decoder::{DecoderError, DecoderFactory, StreamDecoder};
pub use opus::{OpusFileDecoder, OpusFiles};
pub use output::{OutputChannel, OutputSubsystem, PollStatus, PullSource};
