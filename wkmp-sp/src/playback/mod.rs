//! Playback core: PCM buffering, decode driving and the stream worker

pub mod decode_driver;
pub mod engine;
pub mod pcm_buffer;
pub mod signal;
pub mod status;
mod worker;

pub use engine::StreamPlayer;
pub use status::Status;
