// src/lib.rs
//! Surfcap — asynchronous surface capture for GPU pipelines
//!
//! Surfcap snapshots live hardware-resident buffers ("surfaces") for
//! offline inspection without stalling the pipeline that produced them.
//! Producers hand a resource handle to [`CaptureEngine::add_task`]; the
//! engine copies the surface into a pooled shadow resource on the device,
//! queues it, and persists the bytes from a background thread, one dump at
//! a time.
//!
//! # Modules
//!
//! - **capture**: sampling gate, shadow pool, budgets, scheduler, writer
//! - **device**: the narrow capability trait the engine consumes
//! - **observability**: tracing setup for host processes
//! - **utils**: configuration and error types
//!
//! # Guarantees
//!
//! - Capture failures never propagate to producers; they become
//!   best-effort `name.<reason>` marker artifacts.
//! - Dumps are persisted in arrival order (FIFO, single-flight).
//! - Per-tier shadow memory never exceeds its configured budget.
//! - Shutdown flushes every queued capture before returning.
//!
//! With `allow_data_loss` disabled, a saturated pool applies backpressure:
//! the producer blocks until a shadow of the same shape is released.

pub mod capture;
pub mod device;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use capture::engine::{CaptureEngine, CaptureStats};
pub use capture::writer::{DropReason, TraceSink};
pub use device::{DeviceCapability, MemoryTier, ResourceHandle, SurfaceShape};
pub use utils::config::CaptureConfig;
pub use utils::errors::{CaptureError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
