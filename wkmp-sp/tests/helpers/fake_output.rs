//! Recording output subsystem

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wkmp_sp::audio::{OutputChannel, OutputSubsystem, PollStatus, PullSource};
use wkmp_sp::{Error, Result};

/// Bytes requested from the pull source per start/poll
pub const PULL_BYTES: usize = 512;

/// Channel operations in the order the worker issued them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Alloc,
    Reinit,
    EnableQueued,
    Start { queued: bool },
    TriggerQueued,
    Volume(u8),
    Stop,
    Destroy,
}

#[derive(Default)]
struct State {
    calls: Mutex<Vec<Call>>,
    pulled: AtomicUsize,
    polls: AtomicUsize,
    volume: AtomicU8,
    fail_init: AtomicBool,
    fail_alloc: AtomicBool,
    fail_start: AtomicBool,
}

impl State {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[derive(Default)]
pub struct FakeOutput {
    state: Arc<State>,
}

impl FakeOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn has(&self, call: Call) -> bool {
        self.count(call) > 0
    }

    /// Bytes delivered by the pull source to the channel
    pub fn pulled(&self) -> usize {
        self.state.pulled.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// Volume most recently applied to the channel
    pub fn volume(&self) -> u8 {
        self.state.volume.load(Ordering::SeqCst)
    }

    pub fn fail_init(&self, fail: bool) {
        self.state.fail_init.store(fail, Ordering::SeqCst);
    }

    pub fn fail_alloc(&self, fail: bool) {
        self.state.fail_alloc.store(fail, Ordering::SeqCst);
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }
}

impl OutputSubsystem for FakeOutput {
    fn init(&self) -> Result<()> {
        if self.state.fail_init.load(Ordering::SeqCst) {
            return Err(Error::AudioOutput("injected init failure".to_string()));
        }
        Ok(())
    }

    fn alloc_channel(&self) -> Result<Box<dyn OutputChannel>> {
        if self.state.fail_alloc.load(Ordering::SeqCst) {
            return Err(Error::AudioOutput("injected alloc failure".to_string()));
        }
        self.state.record(Call::Alloc);
        Ok(Box::new(FakeChannel {
            state: Arc::clone(&self.state),
            queued: false,
            started: false,
        }))
    }
}

struct FakeChannel {
    state: Arc<State>,
    queued: bool,
    started: bool,
}

impl FakeChannel {
    fn pull(&self, source: &mut dyn PullSource) -> PollStatus {
        match source.pull(PULL_BYTES) {
            Some(bytes) => {
                self.state.pulled.fetch_add(bytes.len(), Ordering::SeqCst);
                PollStatus::Pending
            }
            None => PollStatus::Exhausted,
        }
    }
}

impl OutputChannel for FakeChannel {
    fn reinit(&mut self) {
        self.queued = false;
        self.started = false;
        self.state.record(Call::Reinit);
    }

    fn enable_queued_start(&mut self) {
        self.queued = true;
        self.state.record(Call::EnableQueued);
    }

    fn start(&mut self, source: &mut dyn PullSource, sample_rate: u32, channels: u16) -> Result<()> {
        assert_eq!(sample_rate, 48000);
        assert_eq!(channels, 2);

        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(Error::AudioOutput("injected start failure".to_string()));
        }

        self.state.record(Call::Start { queued: self.queued });
        self.started = true;
        self.pull(source);
        Ok(())
    }

    fn trigger_queued_start(&mut self) {
        self.state.record(Call::TriggerQueued);
    }

    fn set_volume(&mut self, level: u8) {
        self.state.volume.store(level, Ordering::SeqCst);
        self.state.record(Call::Volume(level));
    }

    fn poll(&mut self, source: &mut dyn PullSource) -> PollStatus {
        self.state.polls.fetch_add(1, Ordering::SeqCst);
        if !self.started {
            return PollStatus::Exhausted;
        }
        self.pull(source)
    }

    fn stop(&mut self) {
        self.started = false;
        self.state.record(Call::Stop);
    }

    fn destroy(&mut self) {
        self.state.record(Call::Destroy);
    }
}
