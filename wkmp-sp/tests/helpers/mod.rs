//! Test helpers for wkmp-sp integration tests
//!
//! Provides in-memory collaborators for the stream player:
//! - FakeFactory / FakeDecoder: scripted streams with controllable seek
//! - FakeOutput / FakeChannel: records every channel call and pulled byte

#![allow(dead_code)]

pub mod fake_decoder;
pub mod fake_output;

pub use fake_decoder::{FakeFactory, FakeTrack};
pub use fake_output::{Call, FakeOutput};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use wkmp_sp::{PlayerConfig, StreamPlayer};

/// Generous bound for anything the worker should do quickly
pub const WAIT: Duration = Duration::from_secs(5);

/// Small buffers and a tight poll loop so tests run fast
pub fn test_config() -> PlayerConfig {
    PlayerConfig {
        buffer_bytes: 4096,
        chunk_frames: 64,
        poll_interval_ms: 1,
        ..PlayerConfig::default()
    }
}

/// Player wired to the given fakes, not yet initialized
pub fn new_player(output: &Arc<FakeOutput>, codec: &Arc<FakeFactory>) -> StreamPlayer {
    StreamPlayer::new(output.clone(), codec.clone(), test_config())
}

/// Poll `cond` until it holds or `timeout` elapses
pub fn wait_until<F: FnMut() -> bool>(mut cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}
