// src/capture/mod.rs
//! Asynchronous, memory-budgeted surface capture
//!
//! This module snapshots live hardware-resident surfaces for offline
//! inspection without stalling the pipeline that produced them:
//!
//! - **Sampling Gate**: time-windowed admission filter
//! - **Memory Budget**: per-tier used/capacity bookkeeping
//! - **Shadow Pool**: reusable duplicate resources keyed by surface shape
//! - **Engine**: ingestion, single-flight scheduler thread, dump jobs
//! - **Writer**: file/trace/dual-sink persistence
//! - **Error Reporter**: fire-and-forget failure markers
//!
//! # Architecture
//!
//! ```text
//! producers ──► SamplingGate ──► ShadowPool ──► CaptureQueue (FIFO)
//!   (any #)        admit?      reuse/alloc/wait       │
//!                                   ▲                 ▼
//!                                   │          Scheduler thread
//!                                   │            (single-flight)
//!                             release+wake             │
//!                                   └────── dump job ──┘
//!                                         lock → Writer
//! ```
//!
//! One lock covers the pool, the queue, the budgets, and the scheduler
//! flags; everything else (device lock/read, file writes) runs outside it.

pub mod budget;
pub mod engine;
pub mod pool;
pub mod sampling;
pub mod writer;

// Re-export commonly used types
pub use budget::MemoryBudget;
pub use engine::{CaptureEngine, CaptureStats};
pub use pool::{PoolState, Shadow, ShadowId};
pub use sampling::SamplingGate;
pub use writer::{DropReason, ErrorReporter, TraceSink, Writer};
