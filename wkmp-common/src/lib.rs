//! # WKMP Common Library
//!
//! Shared code for WKMP services:
//! - Common error type
//! - TOML configuration file resolution and loading
//! - Logging configuration shared by service binaries

pub mod config;
pub mod error;

pub use config::{ConfigResolver, LoggingConfig};
pub use error::{Error, Result};
