// src/observability/mod.rs
//! Tracing and logging setup
//!
//! Host processes embedding the capture engine call [`init_tracing`] once
//! at startup; the filter is taken from `RUST_LOG` with an `info` fallback.

use crate::utils::errors::{CaptureError, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| CaptureError::Observability(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_init_reports_error() {
        // after one attempt a global subscriber is set (by us or another
        // test); a second attempt must fail instead of panicking
        let _ = init_tracing();
        assert!(init_tracing().is_err());
    }
}
