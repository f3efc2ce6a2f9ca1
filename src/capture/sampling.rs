// src/capture/sampling.rs
//! Time-windowed admission gate
//!
//! Captures are admitted in recurring on/off windows to bound capture
//! overhead: `duration` milliseconds on, `interval` milliseconds off,
//! repeating since engine start. Both zero means capture everything.

use std::time::{Duration, Instant};

/// Sampling gate deciding whether a capture request is admitted at all.
///
/// Reads only a monotonic clock and two constants, so it is safe to call
/// concurrently without locking.
#[derive(Debug, Clone)]
pub struct SamplingGate {
    start: Instant,
    duration: Duration,
    interval: Duration,
}

impl SamplingGate {
    pub fn new(duration: Duration, interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            duration,
            interval,
        }
    }

    /// True if a request arriving now falls inside the capture window
    pub fn admit(&self) -> bool {
        let cycle = self.duration + self.interval;
        if cycle.is_zero() {
            return true;
        }
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let cycle_ms = cycle.as_millis() as u64;
        elapsed_ms % cycle_ms <= self.duration.as_millis() as u64
    }
}
