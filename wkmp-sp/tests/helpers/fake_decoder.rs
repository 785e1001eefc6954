//! Scripted decoders

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wkmp_sp::audio::{DecoderError, DecoderFactory, StreamDecoder};

/// Shape of the streams handed out by [`FakeFactory`]
#[derive(Debug, Clone, Copy)]
pub struct FakeTrack {
    /// Stereo frames before end of stream; `None` never ends
    pub frames: Option<usize>,
    /// Whether `seek` succeeds
    pub seekable: bool,
}

impl FakeTrack {
    pub fn finite(frames: usize) -> Self {
        Self {
            frames: Some(frames),
            seekable: true,
        }
    }

    pub fn endless() -> Self {
        Self {
            frames: None,
            seekable: true,
        }
    }

    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }
}

pub struct FakeDecoder {
    track: FakeTrack,
    position: usize,
    seeks: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StreamDecoder for FakeDecoder {
    fn decode_stereo(&mut self, out: &mut [i16]) -> Result<usize, DecoderError> {
        let max_frames = out.len() / 2;
        let frames = match self.track.frames {
            Some(total) => max_frames.min(total.saturating_sub(self.position)),
            None => max_frames,
        };

        for (i, frame) in out[..frames * 2].chunks_exact_mut(2).enumerate() {
            let value = ((self.position + i) % 1000) as i16;
            frame[0] = value;
            frame[1] = -value;
        }
        self.position += frames;
        Ok(frames)
    }

    fn seek(&mut self, position: u64) -> Result<(), DecoderError> {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        if !self.track.seekable {
            return Err(DecoderError::Seek("fake stream is not seekable".to_string()));
        }
        self.position = position as usize;
        Ok(())
    }
}

/// Opens every path as the configured [`FakeTrack`]
///
/// Paths whose file name starts with `missing` fail with `FileNotFound`.
pub struct FakeFactory {
    track: Mutex<FakeTrack>,
    opened: AtomicUsize,
    seeks: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn new(track: FakeTrack) -> Arc<Self> {
        Arc::new(Self {
            track: Mutex::new(track),
            opened: AtomicUsize::new(0),
            seeks: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn set_track(&self, track: FakeTrack) {
        *self.track.lock().unwrap() = track;
    }

    /// Decoders successfully opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Decoders opened and not yet dropped
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Seeks across all decoders
    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::SeqCst)
    }
}

impl DecoderFactory for FakeFactory {
    fn open(&self, source: &Path) -> Result<Box<dyn StreamDecoder>, DecoderError> {
        let missing = source
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with("missing"));
        if missing {
            return Err(DecoderError::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDecoder {
            track: *self.track.lock().unwrap(),
            position: 0,
            seeks: Arc::clone(&self.seeks),
            live: Arc::clone(&self.live),
        }))
    }
}
