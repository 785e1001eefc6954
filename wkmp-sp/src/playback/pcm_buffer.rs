//! PCM ring buffer between the decode driver and the output pull
//!
//! Holds interleaved stereo i16 (little-endian) bytes. Each production
//! round first compacts away what the previous pull consumed, then appends
//! decoded chunks until the request is satisfied or the source runs dry.
//! Storage carries one decode chunk of slack past the nominal capacity so
//! the final chunk of a round never has to be split.

use tracing::trace;

/// Bytes per interleaved stereo i16 frame
pub const BYTES_PER_FRAME: usize = 4;

/// Producer of decoded PCM chunks
pub trait ChunkSource {
    /// Append at most one chunk into `out`, returning the bytes written
    ///
    /// Zero means the source is exhausted.
    fn next_chunk(&mut self, out: &mut [u8]) -> usize;
}

/// Outcome of one production round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Bytes at the buffer origin handed to the consumer (at most the request)
    pub available: usize,
    /// A chunk request in this round returned nothing
    pub exhausted: bool,
}

pub struct PcmBuffer {
    data: Vec<u8>,
    capacity: usize,
    chunk_bytes: usize,
    valid: usize,
    last_read: usize,
}

impl PcmBuffer {
    /// `capacity` bytes of buffering plus `chunk_bytes` of slack
    pub fn new(capacity: usize, chunk_bytes: usize) -> Self {
        Self {
            data: vec![0; capacity + chunk_bytes],
            capacity,
            chunk_bytes,
            valid: 0,
            last_read: 0,
        }
    }

    /// Bytes currently buffered (including those handed out last round)
    pub fn valid_len(&self) -> usize {
        self.valid
    }

    /// Bytes the consumer took in the last round
    pub fn last_read(&self) -> usize {
        self.last_read
    }

    /// Buffered bytes, starting at the origin
    pub fn data(&self) -> &[u8] {
        &self.data[..self.valid]
    }

    /// Drop everything; the next round starts from an empty buffer
    pub fn reset(&mut self) {
        self.valid = 0;
        self.last_read = 0;
    }

    /// Shift bytes not consumed last round to the origin
    fn compact(&mut self) {
        if self.last_read == 0 {
            return;
        }

        let consumed = self.last_read.min(self.valid);
        self.data.copy_within(consumed..self.valid, 0);
        self.valid -= consumed;
        self.last_read = 0;
    }

    /// Produce until `request` bytes are buffered or `source` is exhausted
    pub fn produce_into<S: ChunkSource + ?Sized>(&mut self, request: usize, source: &mut S) -> Fill {
        let request = request.min(self.capacity);
        self.compact();

        let mut exhausted = false;
        while self.valid < request {
            let end = (self.valid + self.chunk_bytes).min(self.data.len());
            let written = source.next_chunk(&mut self.data[self.valid..end]);
            if written == 0 {
                exhausted = true;
                break;
            }
            self.valid += written;
        }

        let available = self.valid.min(request);
        self.last_read = available;

        trace!(
            request,
            available,
            buffered = self.valid,
            exhausted,
            "PCM production round"
        );

        Fill { available, exhausted }
    }
}
