//! Stream player facade
//!
//! [`StreamPlayer`] is the public control surface. It never touches the
//! output channel or decodes audio itself; every request is published to
//! the worker as a status change plus a wake-up signal, and synchronous
//! calls block on the status cell until the worker confirms.

use crate::audio::decoder::DecoderFactory;
use crate::audio::output::OutputSubsystem;
use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::status::Status;
use crate::playback::worker::{PendingStream, Shared, StreamWorker};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Name of the worker thread
const WORKER_THREAD_NAME: &str = "wkmp-sp-worker";

/// Single-stream Opus player
///
/// Construct with [`StreamPlayer::new`], then [`init`](Self::init) to
/// start the worker. Dropping an initialized player shuts it down.
pub struct StreamPlayer {
    output: Arc<dyn OutputSubsystem>,
    codec: Arc<dyn DecoderFactory>,
    config: PlayerConfig,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl StreamPlayer {
    pub fn new(
        output: Arc<dyn OutputSubsystem>,
        codec: Arc<dyn DecoderFactory>,
        config: PlayerConfig,
    ) -> Self {
        let shared = Arc::new(Shared::new(config.initial_volume));
        Self {
            output,
            codec,
            config,
            shared,
            worker: None,
        }
    }

    /// Start the worker and wait until it can accept streams
    pub fn init(&mut self) -> Result<()> {
        if self.worker.is_some() {
            warn!("Stream player already initialized");
            return Err(Error::AlreadyInitialized);
        }

        self.config.validate()?;
        self.output.init()?;

        self.shared.take_pending();
        self.shared.status.set(Status::Init);

        let shared = Arc::clone(&self.shared);
        let output = Arc::clone(&self.output);
        let config = self.config.clone();

        // Built on the worker thread: the output channel it allocates need not be Send
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || StreamWorker::new(shared, output, config).run())
            .map_err(|e| {
                self.shared.status.set(Status::Zombie);
                Error::WorkerSpawn(e)
            })?;

        let reached = self
            .shared
            .status
            .wait_for(|s| s == Status::Ready || s.is_terminal(), None);

        if reached == Some(Status::Ready) {
            self.worker = Some(handle);
            info!("Stream player initialized");
            return Ok(());
        }

        if handle.join().is_err() {
            error!("Stream worker panicked during startup");
        }
        self.shared.status.set(Status::Zombie);
        Err(Error::WorkerFailed)
    }

    /// Stop the worker and release the output channel
    ///
    /// Does nothing if the player is not initialized.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            debug!("Shutdown requested but stream player is not initialized");
            return;
        };

        self.shared.status.set(Status::Quit);
        self.shared.wake.notify();

        if handle.join().is_err() {
            error!("Stream worker panicked");
        }
        self.shared.status.set(Status::Zombie);
        self.shared.take_pending();

        info!("Stream player shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.worker.is_some()
    }

    /// Open `path` and start it, or prime it if queueing is enabled
    pub fn play(&self, path: impl AsRef<Path>, looping: bool) -> Result<()> {
        let path = path.as_ref();

        let status = self.shared.status.get();
        if status != Status::Ready {
            warn!("Play rejected for {}: player is {}", path.display(), status);
            return Err(Error::AlreadyPlaying);
        }

        let decoder = self.codec.open(path).map_err(|source| {
            warn!("Cannot open {}: {}", path.display(), source);
            Error::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let queued = self.shared.queue_enabled.load(Ordering::SeqCst);
        let next = if queued { Status::Queueing } else { Status::Starting };

        {
            // Held across the transition so a racing play cannot replace our stream
            let mut pending = self.shared.pending();
            if !self.shared.status.advance(Status::Ready, next) {
                warn!("Play rejected for {}: player is busy", path.display());
                return Err(Error::AlreadyPlaying);
            }
            *pending = Some(PendingStream {
                decoder,
                looping,
                path: path.to_path_buf(),
            });
        }
        self.shared.wake.notify();

        info!(
            "Playing {} (loop={}, queued={})",
            path.display(),
            looping,
            queued
        );
        Ok(())
    }

    /// Stop the current stream and wait until the player is idle again
    pub fn stop(&self) -> Result<()> {
        self.stop_within(None)
    }

    /// [`stop`](Self::stop) with an upper bound on the wait
    pub fn stop_timeout(&self, timeout: Duration) -> Result<()> {
        self.stop_within(Some(timeout))
    }

    fn stop_within(&self, timeout: Option<Duration>) -> Result<()> {
        if !self.is_playing() {
            debug!("Stop rejected: nothing is playing");
            return Err(Error::NotPlaying);
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let remaining = || deadline.map(|d| d.saturating_duration_since(Instant::now()));

        loop {
            let observed = self
                .shared
                .status
                .wait_for(|s| s != Status::Starting, remaining())
                .ok_or(Error::Timeout("stream start"))?;

            if !observed.is_playing() || self.shared.status.advance(observed, Status::Stopping) {
                break;
            }
        }
        self.shared.wake.notify();

        self.shared
            .status
            .wait_for(|s| s == Status::Ready || s.is_terminal(), remaining())
            .ok_or(Error::Timeout("stream stop"))?;

        debug!("Stream stopped");
        Ok(())
    }

    /// Set the output volume (0-255)
    ///
    /// Takes effect on the live stream, and on every later one.
    pub fn set_volume(&self, level: u8) {
        self.shared.set_volume(level);
        self.shared.wake.notify();
    }

    pub fn volume(&self) -> u8 {
        self.shared.volume()
    }

    pub fn status(&self) -> Status {
        self.shared.status.get()
    }

    pub fn is_playing(&self) -> bool {
        self.status().is_playing()
    }

    /// Make subsequent `play` calls prime the stream and wait for `queue_go`
    pub fn queue_enable(&self) {
        self.shared.queue_enabled.store(true, Ordering::SeqCst);
    }

    pub fn queue_disable(&self) {
        self.shared.queue_enabled.store(false, Ordering::SeqCst);
    }

    /// Block until a queued stream is primed
    pub fn queue_wait(&self) -> Result<()> {
        self.wait_queued(None)
    }

    pub fn queue_wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.wait_queued(Some(timeout))
    }

    fn wait_queued(&self, timeout: Option<Duration>) -> Result<()> {
        match self
            .shared
            .status
            .wait_for(|s| s == Status::Queued || s.is_terminal(), timeout)
        {
            Some(Status::Queued) => Ok(()),
            Some(_) => Err(Error::WorkerFailed),
            None => Err(Error::Timeout("queued stream")),
        }
    }

    /// Make a primed stream audible
    pub fn queue_go(&self) -> Result<()> {
        self.wait_queued(None)?;

        if !self.shared.status.advance(Status::Queued, Status::Starting) {
            warn!("Queued stream was stopped before it could start");
            return Err(Error::NotPlaying);
        }
        self.shared.wake.notify();

        debug!("Queued stream released");
        Ok(())
    }

    /// Block until the player is idle and able to accept a stream
    pub fn wait_start(&self) -> Result<()> {
        match self
            .shared
            .status
            .wait_for(|s| s == Status::Ready || s == Status::Zombie, None)
        {
            Some(Status::Ready) => Ok(()),
            _ => Err(Error::WorkerFailed),
        }
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
