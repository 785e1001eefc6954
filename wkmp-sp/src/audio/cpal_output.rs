//! Audio output using cpal
//!
//! Each channel owns a lock-free ring buffer between the stream worker and
//! the cpal device callback. The worker fills it from the pull source during
//! `start` (priming) and `poll`; the device callback only drains it, so no
//! decoding ever happens on the real-time audio thread.

use crate::audio::output::{OutputChannel, OutputSubsystem, PollStatus, PullSource};
use crate::config::OutputConfig;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// cpal-backed output subsystem
#[derive(Debug, Clone)]
pub struct CpalOutput {
    device_name: Option<String>,
    buffer_frames: usize,
}

impl CpalOutput {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            device_name: config.device.clone(),
            buffer_frames: config.buffer_frames.max(1024),
        }
    }

    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Find the configured device, falling back to the default device
    fn open_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = self.device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(device) = devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                debug!("Found requested audio device: {}", name);
                return Ok(device);
            }

            warn!("Requested device '{}' not found, falling back to default device", name);
        }

        host.default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
    }
}

impl OutputSubsystem for CpalOutput {
    fn init(&self) -> Result<()> {
        let device = self.open_device()?;
        info!(
            "Audio output ready on {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        Ok(())
    }

    fn alloc_channel(&self) -> Result<Box<dyn OutputChannel>> {
        let device = self.open_device()?;
        Ok(Box::new(CpalChannel::new(device, self.buffer_frames)))
    }
}

/// State shared with the device callback
struct CallbackShared {
    volume: AtomicU8,
    /// False while a queued start is waiting for its trigger
    audible: AtomicBool,
    error_flag: AtomicBool,
    underruns: AtomicU64,
}

struct CpalChannel {
    device: Device,
    buffer_frames: usize,
    producer: Option<HeapProd<i16>>,
    stream: Option<Stream>,
    shared: Arc<CallbackShared>,
    queued: bool,
}

impl CpalChannel {
    fn new(device: Device, buffer_frames: usize) -> Self {
        Self {
            device,
            buffer_frames,
            producer: None,
            stream: None,
            shared: Arc::new(CallbackShared {
                volume: AtomicU8::new(u8::MAX),
                audible: AtomicBool::new(false),
                error_flag: AtomicBool::new(false),
                underruns: AtomicU64::new(0),
            }),
            queued: false,
        }
    }

    /// Pick a stereo configuration at `sample_rate`, preferring f32
    fn stream_config(&self, sample_rate: u32, channels: u16) -> Result<(StreamConfig, SampleFormat)> {
        let candidates: Vec<_> = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                c.channels() == channels
                    && c.min_sample_rate().0 <= sample_rate
                    && c.max_sample_rate().0 >= sample_rate
            })
            .collect();

        for format in [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16] {
            if let Some(range) = candidates.iter().find(|c| c.sample_format() == format) {
                let config = range
                    .clone()
                    .with_sample_rate(cpal::SampleRate(sample_rate))
                    .config();
                return Ok((config, format));
            }
        }

        Err(Error::AudioOutput(format!(
            "Device does not support {} Hz with {} channels",
            sample_rate, channels
        )))
    }

    fn build_stream<T>(&self, config: &StreamConfig, mut consumer: HeapCons<i16>) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32> + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let error_shared = Arc::clone(&self.shared);

        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !shared.audible.load(Ordering::Relaxed) {
                        data.fill(T::EQUILIBRIUM);
                        return;
                    }

                    let gain = shared.volume.load(Ordering::Relaxed) as f32 / u8::MAX as f32;
                    let mut starved = false;

                    for out in data.iter_mut() {
                        *out = match consumer.try_pop() {
                            Some(sample) => T::from_sample(sample as f32 / 32768.0 * gain),
                            None => {
                                starved = true;
                                T::EQUILIBRIUM
                            }
                        };
                    }

                    if starved {
                        shared.underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_shared.error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Top up the ring buffer from `source`
    fn feed(&mut self, source: &mut dyn PullSource) -> PollStatus {
        let Some(producer) = self.producer.as_mut() else {
            return PollStatus::Exhausted;
        };

        let vacant_frames = producer.vacant_len() / 2;
        if vacant_frames < self.buffer_frames / 4 {
            return PollStatus::Pending;
        }

        match source.pull(vacant_frames * 4) {
            Some(bytes) => {
                let samples = bytes
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]));
                producer.push_iter(samples);
                PollStatus::Pending
            }
            None => PollStatus::Exhausted,
        }
    }
}

impl OutputChannel for CpalChannel {
    fn reinit(&mut self) {
        self.stop();
        self.queued = false;
        self.shared.error_flag.store(false, Ordering::SeqCst);
    }

    fn enable_queued_start(&mut self) {
        self.queued = true;
    }

    fn start(&mut self, source: &mut dyn PullSource, sample_rate: u32, channels: u16) -> Result<()> {
        let (config, sample_format) = self.stream_config(sample_rate, channels)?;

        let (producer, consumer) = HeapRb::<i16>::new(self.buffer_frames * 2).split();
        self.producer = Some(producer);

        // Prime before the device starts pulling
        if self.feed(source) == PollStatus::Exhausted {
            debug!("Stream ended while priming output buffer");
        }

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&config, consumer)?,
            SampleFormat::I16 => self.build_stream::<i16>(&config, consumer)?,
            SampleFormat::U16 => self.build_stream::<u16>(&config, consumer)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        self.shared.audible.store(!self.queued, Ordering::SeqCst);

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        info!(
            "Audio stream started: {} Hz, {} channels, {:?}{}",
            sample_rate,
            channels,
            sample_format,
            if self.queued { " (queued)" } else { "" }
        );
        Ok(())
    }

    fn trigger_queued_start(&mut self) {
        self.shared.audible.store(true, Ordering::SeqCst);
    }

    fn set_volume(&mut self, level: u8) {
        self.shared.volume.store(level, Ordering::Relaxed);
    }

    fn poll(&mut self, source: &mut dyn PullSource) -> PollStatus {
        if self.shared.error_flag.load(Ordering::SeqCst) {
            warn!("Audio stream reported an error; ending stream");
            return PollStatus::Exhausted;
        }
        self.feed(source)
    }

    fn stop(&mut self) {
        self.shared.audible.store(false, Ordering::SeqCst);

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause audio stream: {}", e);
            }
            let underruns = self.shared.underruns.swap(0, Ordering::Relaxed);
            debug!("Audio stream stopped ({} underruns)", underruns);
        }
        self.producer = None;
    }

    fn destroy(&mut self) {
        self.stop();
        debug!("Audio channel destroyed");
    }
}
