//! Ogg Opus decoder using symphonia
//!
//! Demuxes Ogg with symphonia's format reader and decodes with libopus via
//! `symphonia-adapter-libopus`. Opus always decodes at 48 kHz. Output is
//! interleaved stereo i16: mono is duplicated, extra channels are dropped.

use crate::audio::decoder::{DecoderError, DecoderFactory, StreamDecoder};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecRegistry, Decoder, DecoderOptions, CODEC_TYPE_OPUS};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia_adapter_libopus::OpusDecoder;
use tracing::{debug, warn};

/// Consecutive corrupt packets tolerated before decoding gives up
const MAX_DECODE_RETRIES: usize = 3;

/// Codec registry holding only the libopus decoder
fn get_codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        registry.register_all::<OpusDecoder>();
        registry
    })
}

/// Factory producing [`OpusFileDecoder`]s from paths on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct OpusFiles;

impl DecoderFactory for OpusFiles {
    fn open(&self, source: &Path) -> Result<Box<dyn StreamDecoder>, DecoderError> {
        Ok(Box::new(OpusFileDecoder::open(source)?))
    }
}

/// Incremental Ogg Opus decoder
///
/// Keeps the most recently decoded packet and hands it out across as many
/// `decode_stereo` calls as needed.
pub struct OpusFileDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    path: PathBuf,
    /// Interleaved stereo samples of the current packet
    pending: Vec<i16>,
    /// Read position in `pending` (samples)
    cursor: usize,
    sample_buf: Option<SampleBuffer<i16>>,
}

impl OpusFileDecoder {
    /// Open `path` and prepare the first Opus track for decoding
    pub fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DecoderError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => DecoderError::Io(e),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(
            path.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("opus"),
        );

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec == CODEC_TYPE_OPUS)
            .ok_or(DecoderError::NoOpusTrack)?;

        let track_id = track.id;
        let decoder = get_codec_registry()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderError::Codec(e.to_string()))?;

        debug!(
            "Opened Opus stream {} (track {}, channels={:?})",
            path.display(),
            track_id,
            track.codec_params.channels.map(|c| c.count())
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            path: path.to_path_buf(),
            pending: Vec::new(),
            cursor: 0,
            sample_buf: None,
        })
    }

    /// Decode the next packet of our track into `pending`
    ///
    /// Returns `false` at end of stream.
    fn refill(&mut self) -> Result<bool, DecoderError> {
        let mut decode_errors = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of {}", self.path.display());
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(DecoderError::Codec(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    decode_errors += 1;
                    warn!("Skipping corrupt packet in {}: {}", self.path.display(), msg);
                    if decode_errors > MAX_DECODE_RETRIES {
                        return Err(DecoderError::Codec(msg.to_string()));
                    }
                    continue;
                }
                Err(e) => return Err(DecoderError::Codec(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let frames = decoded.frames();
            if frames == 0 || channels == 0 {
                continue;
            }

            let needs_alloc = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < frames * channels);
            if needs_alloc {
                self.sample_buf = Some(SampleBuffer::<i16>::new(decoded.capacity() as u64, spec));
            }
            let Some(sample_buf) = self.sample_buf.as_mut() else {
                continue;
            };
            sample_buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.cursor = 0;
            for frame in sample_buf.samples().chunks_exact(channels) {
                let left = frame[0];
                let right = if channels > 1 { frame[1] } else { left };
                self.pending.push(left);
                self.pending.push(right);
            }

            return Ok(true);
        }
    }
}

impl StreamDecoder for OpusFileDecoder {
    fn decode_stereo(&mut self, out: &mut [i16]) -> Result<usize, DecoderError> {
        let max_frames = out.len() / 2;
        if max_frames == 0 {
            return Ok(0);
        }

        while self.cursor >= self.pending.len() {
            if !self.refill()? {
                return Ok(0);
            }
        }

        let available = (self.pending.len() - self.cursor) / 2;
        let frames = available.min(max_frames);
        let samples = frames * 2;
        out[..samples].copy_from_slice(&self.pending[self.cursor..self.cursor + samples]);
        self.cursor += samples;

        Ok(frames)
    }

    fn seek(&mut self, position: u64) -> Result<(), DecoderError> {
        self.format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: position,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| DecoderError::Seek(e.to_string()))?;

        self.decoder.reset();
        self.pending.clear();
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_nonexistent_file() {
        let result = OpusFileDecoder::open(Path::new("/nonexistent/track.opus"));
        assert!(matches!(result, Err(DecoderError::FileNotFound { .. })));
    }

    #[test]
    fn test_open_garbage_file() {
        let mut file = tempfile::Builder::new().suffix(".opus").tempfile().unwrap();
        file.write_all(&[0xAB; 4096]).unwrap();

        let result = OpusFiles.open(file.path());
        assert!(matches!(result, Err(DecoderError::UnsupportedFormat(_))));
    }
}
