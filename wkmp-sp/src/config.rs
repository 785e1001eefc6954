//! Configuration for wkmp-sp
//!
//! Bootstrap TOML file located by [`wkmp_common::ConfigResolver`]. Every
//! field has a built-in default, so an absent file or section is fine.

use crate::error::{Error, Result};
use crate::playback::pcm_buffer::BYTES_PER_FRAME;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use wkmp_common::{ConfigResolver, LoggingConfig};

/// Module name used for config file and environment variable lookup
pub const MODULE_NAME: &str = "wkmp-sp";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from `cli_path`, the environment, or the platform config dirs
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self> {
        let config: Config = ConfigResolver::new(MODULE_NAME)
            .with_cli_path(cli_path)
            .load_or_default()?;
        config.player.validate()?;
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.player.validate()?;
        Ok(config)
    }
}

/// Stream player settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// PCM ring buffer capacity in bytes (one extra decode chunk is added as slack)
    pub buffer_bytes: usize,

    /// Stereo frames requested from the decoder per chunk
    pub chunk_frames: usize,

    /// Output sample rate; decoded audio is never resampled
    pub sample_rate: u32,

    /// Output channel count (stereo only)
    pub channels: u16,

    /// Sleep between output polls while playing
    pub poll_interval_ms: u64,

    /// Volume applied before any `set_volume` call (0-255)
    pub initial_volume: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 65536,
            chunk_frames: 2048,
            sample_rate: 48000,
            channels: 2,
            poll_interval_ms: 50,
            initial_volume: 240,
        }
    }
}

impl PlayerConfig {
    /// Bytes produced by one full decode chunk
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_frames * BYTES_PER_FRAME
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the buffering protocol cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunk_frames == 0 {
            return Err(Error::Config("chunk_frames must be greater than 0".to_string()));
        }
        if self.buffer_bytes % BYTES_PER_FRAME != 0 {
            return Err(Error::Config(format!(
                "buffer_bytes ({}) must be a multiple of {}",
                self.buffer_bytes, BYTES_PER_FRAME
            )));
        }
        if self.buffer_bytes < self.chunk_bytes() {
            return Err(Error::Config(format!(
                "buffer_bytes ({}) must hold at least one decode chunk ({} bytes)",
                self.buffer_bytes,
                self.chunk_bytes()
            )));
        }
        if self.channels != 2 {
            return Err(Error::Config(format!(
                "only stereo output is supported (channels = {})",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Audio device settings for the cpal backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,

    /// Frames held between the worker and the device callback
    pub buffer_frames: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: None,
            buffer_frames: 16384,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_bytes(), 8192);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [player]
            poll_interval_ms = 10

            [output]
            device = "USB DAC"
            "#,
        )
        .unwrap();

        assert_eq!(config.player.poll_interval_ms, 10);
        assert_eq!(config.player.buffer_bytes, 65536);
        assert_eq!(config.output.device.as_deref(), Some("USB DAC"));
        assert_eq!(config.output.buffer_frames, 16384);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_mono_output() {
        let result = Config::from_toml_str("[player]\nchannels = 1\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_buffer_smaller_than_chunk() {
        let config = PlayerConfig {
            buffer_bytes: 4096,
            chunk_frames: 2048,
            ..PlayerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unaligned_buffer() {
        let config = PlayerConfig {
            buffer_bytes: 65538,
            ..PlayerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
