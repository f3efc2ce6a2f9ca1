// src/utils/errors.rs
//! Error types for the surfcap crate
//!
//! All fallible operations return the crate-wide [`Result`] alias. Capture
//! ingestion itself never surfaces these to producers; they are used by
//! construction, configuration, and persistence paths.

use crate::device::DeviceError;
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A device capability call failed
    #[error("device operation failed: {0}")]
    Device(#[from] DeviceError),

    /// File system failure while persisting an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Observability stack could not be initialized
    #[error("observability init failed: {0}")]
    Observability(String),

    /// Background thread could not be spawned
    #[error("scheduler spawn failed: {0}")]
    SchedulerSpawn(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, CaptureError>;
