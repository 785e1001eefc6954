//! Stream worker thread
//!
//! Owns the output channel, the PCM buffer and the active session. All
//! decode work and channel operations happen here. The facade talks to the
//! worker only through [`Shared`]: it publishes requests by moving the
//! status and signalling, and hands decoders over through the pending slot.

use crate::audio::decoder::StreamDecoder;
use crate::audio::output::{OutputChannel, OutputSubsystem, PollStatus};
use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::decode_driver::{DecodeDriver, StreamFeed};
use crate::playback::pcm_buffer::PcmBuffer;
use crate::playback::signal::Signal;
use crate::playback::status::{Status, StatusCell};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

/// A stream opened by the facade, waiting for the worker to pick it up
pub(crate) struct PendingStream {
    pub decoder: Box<dyn StreamDecoder>,
    pub looping: bool,
    pub path: PathBuf,
}

/// State shared between the facade and the worker
pub(crate) struct Shared {
    pub status: StatusCell,
    pub wake: Signal,
    volume: AtomicU8,
    volume_dirty: AtomicBool,
    pub queue_enabled: AtomicBool,
    pending: Mutex<Option<PendingStream>>,
}

impl Shared {
    pub fn new(initial_volume: u8) -> Self {
        Self {
            status: StatusCell::new(Status::Zombie),
            wake: Signal::new(),
            volume: AtomicU8::new(initial_volume),
            volume_dirty: AtomicBool::new(false),
            queue_enabled: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    pub fn set_volume(&self, level: u8) {
        self.volume.store(level, Ordering::SeqCst);
        self.volume_dirty.store(true, Ordering::SeqCst);
    }

    pub fn pending(&self) -> MutexGuard<'_, Option<PendingStream>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn take_pending(&self) -> Option<PendingStream> {
        self.pending().take()
    }
}

/// The stream currently bound to the channel
struct Session {
    driver: DecodeDriver,
    queued: bool,
    path: PathBuf,
}

pub(crate) struct StreamWorker {
    shared: Arc<Shared>,
    output: Arc<dyn OutputSubsystem>,
    channel: Option<Box<dyn OutputChannel>>,
    session: Option<Session>,
    pcm: PcmBuffer,
    config: PlayerConfig,
}

impl StreamWorker {
    pub fn new(shared: Arc<Shared>, output: Arc<dyn OutputSubsystem>, config: PlayerConfig) -> Self {
        Self {
            pcm: PcmBuffer::new(config.buffer_bytes, config.chunk_bytes()),
            shared,
            output,
            channel: None,
            session: None,
            config,
        }
    }

    /// Run until the status becomes terminal; dropping the worker releases everything
    pub fn run(mut self) {
        info!("Stream worker started");

        loop {
            let observed = self.shared.status.get();
            if observed.is_terminal() {
                break;
            }

            self.apply_volume();

            let next = self.step(observed);
            if next != observed && !self.shared.status.advance(observed, next) {
                debug!(
                    "Status changed to {} while handling {}; dropping {}",
                    self.shared.status.get(),
                    observed,
                    next
                );
            }
        }
    }

    fn step(&mut self, observed: Status) -> Status {
        match observed {
            Status::Init => self.alloc_channel(),
            Status::Ready | Status::Queued => {
                self.shared.wake.wait();
                observed
            }
            Status::Queueing => match self.begin_session(true) {
                Ok(()) => Status::Queued,
                Err(e) => {
                    error!("Failed to start queued stream: {}", e);
                    Status::Stopping
                }
            },
            Status::Starting => match self.start_playing() {
                Ok(()) => Status::Playing,
                Err(e) => {
                    error!("Failed to start stream: {}", e);
                    Status::Stopping
                }
            },
            Status::Playing => self.poll(),
            Status::Stopping => {
                self.end_session();
                Status::Ready
            }
            Status::Quit | Status::Zombie => observed,
        }
    }

    fn alloc_channel(&mut self) -> Status {
        match self.output.alloc_channel() {
            Ok(mut channel) => {
                channel.set_volume(self.shared.volume());
                self.channel = Some(channel);
                debug!("Output channel allocated");
                Status::Ready
            }
            Err(e) => {
                error!("Failed to allocate output channel: {}", e);
                Status::Zombie
            }
        }
    }

    fn apply_volume(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            if self.shared.volume_dirty.swap(false, Ordering::SeqCst) {
                let level = self.shared.volume();
                channel.set_volume(level);
                debug!("Volume set to {}", level);
            }
        }
    }

    /// Bind the pending stream to the channel and start it
    fn begin_session(&mut self, queued: bool) -> Result<()> {
        let pending = self.shared.take_pending().ok_or_else(|| {
            warn!("Start requested without a pending stream");
            Error::NotPlaying
        })?;
        let channel = self.channel.as_mut().ok_or(Error::WorkerFailed)?;

        channel.reinit();
        if queued {
            channel.enable_queued_start();
        }

        let mut driver = DecodeDriver::new(pending.decoder, pending.looping, self.config.chunk_frames);
        self.pcm.reset();

        let started = {
            let mut feed = StreamFeed {
                pcm: &mut self.pcm,
                driver: &mut driver,
            };
            channel.start(&mut feed, self.config.sample_rate, self.config.channels)
        };

        // Kept even on failure so Stopping releases it
        self.session = Some(Session {
            driver,
            queued,
            path: pending.path,
        });
        started?;

        channel.set_volume(self.shared.volume());
        debug!("Stream session started (queued={})", queued);
        Ok(())
    }

    fn start_playing(&mut self) -> Result<()> {
        let queued = self.session.as_ref().map_or(false, |s| s.queued);
        if !queued {
            return self.begin_session(false);
        }

        let channel = self.channel.as_mut().ok_or(Error::WorkerFailed)?;
        channel.trigger_queued_start();
        channel.set_volume(self.shared.volume());
        debug!("Queued stream triggered");
        Ok(())
    }

    fn poll(&mut self) -> Status {
        let (Some(channel), Some(session)) = (self.channel.as_mut(), self.session.as_mut()) else {
            warn!("Playing without an active session");
            return Status::Stopping;
        };

        let mut feed = StreamFeed {
            pcm: &mut self.pcm,
            driver: &mut session.driver,
        };
        match channel.poll(&mut feed) {
            PollStatus::Pending => {
                thread::sleep(self.config.poll_interval());
                Status::Playing
            }
            PollStatus::Exhausted => {
                debug!("Stream exhausted");
                Status::Stopping
            }
        }
    }

    fn end_session(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.stop();
        }
        self.pcm.reset();

        if let Some(session) = self.session.take() {
            info!(
                "Stream ended: {} ({} frames, {} loop restarts)",
                session.path.display(),
                session.driver.frames_decoded(),
                session.driver.loop_restarts()
            );
        }

        // A stop can land before the worker picked up the requested stream
        if let Some(pending) = self.shared.take_pending() {
            debug!("Discarding unstarted stream {}", pending.path.display());
        }
    }
}

// Runs on normal exit and on panic, so waiters always see Zombie
impl Drop for StreamWorker {
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.stop();
            channel.destroy();
        }
        self.session = None;
        self.shared.status.set(Status::Zombie);
        info!("Stream worker exited");
    }
}
