//! Drives a [`StreamDecoder`] in fixed-size chunks
//!
//! Handles end-of-stream looping and converts frames to little-endian
//! bytes for the PCM buffer.

use crate::audio::decoder::StreamDecoder;
use crate::audio::output::PullSource;
use crate::playback::pcm_buffer::{ChunkSource, PcmBuffer, BYTES_PER_FRAME};
use tracing::{debug, error, warn};

pub struct DecodeDriver {
    decoder: Box<dyn StreamDecoder>,
    looping: bool,
    chunk_frames: usize,
    scratch: Vec<i16>,
    frames_decoded: u64,
    loop_restarts: u64,
}

impl DecodeDriver {
    pub fn new(decoder: Box<dyn StreamDecoder>, looping: bool, chunk_frames: usize) -> Self {
        Self {
            decoder,
            looping,
            chunk_frames,
            scratch: vec![0; chunk_frames * 2],
            frames_decoded: 0,
            loop_restarts: 0,
        }
    }

    /// Total frames produced over the session
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Times the stream wrapped back to its origin
    pub fn loop_restarts(&self) -> u64 {
        self.loop_restarts
    }

    fn decode(&mut self, max_frames: usize) -> usize {
        match self.decoder.decode_stereo(&mut self.scratch[..max_frames * 2]) {
            Ok(frames) => frames.min(max_frames),
            Err(e) => {
                warn!("Decode failed, ending stream: {}", e);
                0
            }
        }
    }
}

impl ChunkSource for DecodeDriver {
    fn next_chunk(&mut self, out: &mut [u8]) -> usize {
        let max_frames = (out.len() / BYTES_PER_FRAME).min(self.chunk_frames);
        if max_frames == 0 {
            return 0;
        }

        let mut frames = self.decode(max_frames);

        if frames == 0 && self.looping {
            if let Err(e) = self.decoder.seek(0) {
                error!("Failed to rewind looping stream: {}", e);
                return 0;
            }
            self.loop_restarts += 1;
            debug!("Looping stream restarted ({} restarts)", self.loop_restarts);
            // One retry; an empty stream must not spin
            frames = self.decode(max_frames);
        }

        let samples = frames * 2;
        for (dst, sample) in out
            .chunks_exact_mut(2)
            .zip(&self.scratch[..samples])
        {
            dst.copy_from_slice(&sample.to_le_bytes());
        }

        self.frames_decoded += frames as u64;
        frames * BYTES_PER_FRAME
    }
}

/// Pull source that refills a [`PcmBuffer`] from a [`DecodeDriver`]
pub struct StreamFeed<'a> {
    pub pcm: &'a mut PcmBuffer,
    pub driver: &'a mut DecodeDriver,
}

impl PullSource for StreamFeed<'_> {
    fn pull(&mut self, bytes: usize) -> Option<&[u8]> {
        let fill = self.pcm.produce_into(bytes, &mut *self.driver);
        if fill.exhausted {
            return None;
        }
        Some(&self.pcm.data()[..fill.available])
    }
}
