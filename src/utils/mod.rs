// src/utils/mod.rs
//! Common utilities
//!
//! - **config**: engine configuration with defaults and file loading
//! - **errors**: crate-wide error type and `Result` alias

pub mod config;
pub mod errors;

pub use config::CaptureConfig;
pub use errors::{CaptureError, Result};
