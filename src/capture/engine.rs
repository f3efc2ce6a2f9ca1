// src/capture/engine.rs
//! Capture engine: ingestion, scheduling, and persistence
//!
//! [`CaptureEngine`] is the subsystem entry point. Producers call
//! [`CaptureEngine::add_task`] from any number of threads; one background
//! scheduler thread drains the capture queue and dispatches persistence
//! jobs one at a time (single-flight). Capture failures are always
//! non-fatal to the producer: they are reported through the
//! [`ErrorReporter`](crate::capture::writer::ErrorReporter) and the request
//! is dropped.
//!
//! # Data flow
//!
//! ```text
//! producer → SamplingGate → ShadowPool (reuse / allocate / wait)
//!                                │
//!                          device copy (under lock)
//!                                │
//!                          CaptureQueue (FIFO)
//!                                │
//!               Scheduler thread → dump job (lock/read → Writer)
//!                                │
//!                   shadow released, waiters woken
//! ```

use crate::capture::budget::MemoryBudget;
use crate::capture::pool::{PoolState, Shadow, ShadowId};
use crate::capture::sampling::SamplingGate;
use crate::capture::writer::{DropReason, ErrorReporter, TraceSink, Writer};
use crate::device::{DeviceCapability, MemoryTier, ResourceHandle, SurfaceShape, TileMode};
use crate::utils::config::CaptureConfig;
use crate::utils::errors::{CaptureError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Snapshot of engine bookkeeping
#[derive(Debug, Clone)]
pub struct CaptureStats {
    pub shared_used: u64,
    pub shared_cap: u64,
    pub dedicated_used: u64,
    pub dedicated_cap: u64,
    /// Shadow resources currently pooled (idle or occupied)
    pub shadow_count: usize,
    /// Entries awaiting persistence
    pub queued: usize,
    /// Dumps persisted successfully
    pub completed: u64,
    /// Requests dropped after admission
    pub dropped: u64,
}

/// Everything the scheduler thread and dump jobs share with producers
struct EngineShared {
    device: Arc<dyn DeviceCapability>,
    writer: Writer,
    reporter: ErrorReporter,
    gate: SamplingGate,
    allow_data_loss: bool,
    state: Mutex<PoolState>,
    cond: Condvar,
    completed: AtomicU64,
    dropped: AtomicU64,
}

/// Data a dump job needs once the queue head is claimed.
///
/// Copied out under the lock so the job itself never touches pool state
/// until its completion bookkeeping.
struct DumpJob {
    res: ResourceHandle,
    name: String,
    size: u64,
    offset: u64,
}

/// Asynchronous, memory-budgeted surface capture engine
pub struct CaptureEngine {
    shared: Arc<EngineShared>,
    scheduler: Option<JoinHandle<()>>,
}

impl CaptureEngine {
    /// Create an engine persisting to files and/or nothing, per config
    pub fn new(device: Arc<dyn DeviceCapability>, config: CaptureConfig) -> Result<Self> {
        Self::build(device, config, None)
    }

    /// Create an engine with a trace sink attached
    pub fn with_trace(
        device: Arc<dyn DeviceCapability>,
        config: CaptureConfig,
        trace: Arc<dyn TraceSink>,
    ) -> Result<Self> {
        Self::build(device, config, Some(trace))
    }

    fn build(
        device: Arc<dyn DeviceCapability>,
        config: CaptureConfig,
        trace: Option<Arc<dyn TraceSink>>,
    ) -> Result<Self> {
        config.validate()?;

        let memory = device.adapter_memory();
        let mut shared_cap = memory.shared_bytes / 100 * u64::from(config.max_percent_shared);
        let dedicated_cap =
            memory.dedicated_bytes / 100 * u64::from(config.max_percent_dedicated);
        if shared_cap == 0 {
            // an unknown or zero shared capacity must not disable capture
            shared_cap = u64::MAX;
        }

        let writer = Writer::new(
            config.write_to_file,
            config.write_to_trace,
            &config.output_dir,
            trace,
        )?;
        let reporter = ErrorReporter::new(writer.clone(), config.report_on_error);
        let gate = SamplingGate::new(
            Duration::from_millis(config.sampling_duration_ms),
            Duration::from_millis(config.sampling_interval_ms),
        );

        let shared = Arc::new(EngineShared {
            device,
            writer,
            reporter,
            gate,
            allow_data_loss: config.allow_data_loss,
            state: Mutex::new(PoolState::new(
                MemoryBudget::new(MemoryTier::Shared, shared_cap),
                MemoryBudget::new(MemoryTier::Dedicated, dedicated_cap),
            )),
            cond: Condvar::new(),
            completed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let scheduler_shared = Arc::clone(&shared);
        let scheduler = thread::Builder::new()
            .name("surfcap-scheduler".to_string())
            .spawn(move || scheduler_shared.run_scheduler())
            .map_err(|e| CaptureError::SchedulerSpawn(e.to_string()))?;

        info!(
            shared_cap,
            dedicated_cap,
            allow_data_loss = config.allow_data_loss,
            "capture engine started"
        );

        Ok(Self {
            shared,
            scheduler: Some(scheduler),
        })
    }

    /// Request a capture of `source`.
    ///
    /// Never fails from the producer's point of view: failures are reported
    /// as marker artifacts and the request is dropped. The only blocking is
    /// the backpressure wait when data loss is disallowed and the pool is
    /// saturated; the producer then stalls until the scheduler releases a
    /// shadow of the same shape.
    ///
    /// A `dump_size` of zero means "everything from `offset` to the end of
    /// the surface".
    pub fn add_task(&self, source: &ResourceHandle, name: String, dump_size: u64, offset: u64) {
        if !self.shared.gate.admit() {
            return;
        }

        let Some(full_size) = self.shared.device.surface_size(source) else {
            self.drop_request(&name, DropReason::GetSurfaceSizeFailed);
            return;
        };
        let wanted = offset.checked_add(dump_size);
        if wanted.map_or(true, |w| w > full_size) {
            self.drop_request(&name, DropReason::IncorrectSizeOffset);
            return;
        }

        let info = match self.shared.device.surface_info(source) {
            Ok(info) => info,
            Err(e) => {
                debug!(name = %name, error = %e, "surface introspection failed");
                self.drop_request(&name, DropReason::GetResourceInfoFailed);
                return;
            }
        };
        // shadows are always linear so locked bytes dump as-is
        let shape = SurfaceShape {
            kind: info.kind,
            width: info.width,
            height: info.height,
            tiling: TileMode::Linear,
            format: info.format,
        };

        let mut st = self.shared.state.lock();

        let mut fresh = false;
        let shadow_id = match st.find_idle(&shape) {
            Some(id) => id,
            None => match self.try_allocate(&mut st, &shape, full_size) {
                Some(id) => {
                    fresh = true;
                    id
                }
                None => {
                    if !self.shared.allow_data_loss && st.has_shadows(&shape) {
                        // backpressure: stall until the scheduler releases a
                        // shadow of this shape
                        loop {
                            self.shared.cond.wait(&mut st);
                            if let Some(id) = st.find_idle(&shape) {
                                break id;
                            }
                        }
                    } else {
                        drop(st);
                        self.drop_request(&name, DropReason::Discarded);
                        return;
                    }
                }
            },
        };

        let Some(dst) = st.shadow(shadow_id).map(|s| s.res.clone()) else {
            drop(st);
            self.drop_request(&name, DropReason::Discarded);
            return;
        };

        if let Err(e) = self.shared.device.copy_surface(source, &dst) {
            if fresh {
                // roll the allocation back so a failed copy does not hold
                // budget forever
                if let Some(shadow) = st.remove(shadow_id, &shape) {
                    st.budget_mut(shadow.tier).release(shadow.alloc_size);
                    self.shared.device.free(&shadow.res);
                }
            }
            drop(st);
            debug!(name = %name, error = %e, "surface copy failed");
            self.drop_request(&name, DropReason::SurfaceCopyFailed);
            // a reused shadow is idle again; waiters must get to rescan
            self.shared.cond.notify_all();
            return;
        }

        if let Some(shadow) = st.shadow_mut(shadow_id) {
            shadow.dump_size = if dump_size == 0 {
                full_size - offset
            } else {
                dump_size
            };
            shadow.offset = offset;
            shadow.name = name;
            shadow.occupied = true;
        }
        st.queue.push_back(shadow_id);
        drop(st);

        // the scheduler and pool waiters share one condvar; notify_all so
        // the new queue entry cannot be missed when a waiter wakes first
        self.shared.cond.notify_all();
    }

    /// Try to allocate a fresh shadow, charging the winning tier.
    ///
    /// Tier order is fixed: fast/shared first, dedicated second. A device
    /// allocation failure releases the charge and counts as exhaustion.
    fn try_allocate(
        &self,
        st: &mut PoolState,
        shape: &SurfaceShape,
        size: u64,
    ) -> Option<ShadowId> {
        let tier = if st.shared_budget.try_charge(size) {
            MemoryTier::Shared
        } else if st.dedicated_budget.try_charge(size) {
            MemoryTier::Dedicated
        } else {
            return None;
        };

        match self.shared.device.allocate(shape, size, tier) {
            Ok(res) => Some(st.insert(
                Shadow {
                    res,
                    occupied: false,
                    alloc_size: size,
                    dump_size: 0,
                    offset: 0,
                    name: String::new(),
                    tier,
                },
                *shape,
            )),
            Err(e) => {
                st.budget_mut(tier).release(size);
                debug!(error = %e, "shadow allocation failed");
                None
            }
        }
    }

    fn drop_request(&self, name: &str, reason: DropReason) {
        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        debug!(name = %name, reason = reason.as_str(), "capture request dropped");
        self.shared.reporter.report(name, reason);
    }

    /// Current bookkeeping snapshot
    pub fn stats(&self) -> CaptureStats {
        let st = self.shared.state.lock();
        CaptureStats {
            shared_used: st.shared_budget.used(),
            shared_cap: st.shared_budget.cap(),
            dedicated_used: st.dedicated_budget.used(),
            dedicated_cap: st.dedicated_budget.cap(),
            shadow_count: st.shadow_count(),
            queued: st.queue.len(),
            completed: self.shared.completed.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        {
            let mut st = self.shared.state.lock();
            st.stop = true;
        }
        self.shared.cond.notify_all();
        if let Some(handle) = self.scheduler.take() {
            if handle.join().is_err() {
                warn!("scheduler thread panicked during shutdown");
            }
        }
        // outstanding error-report tasks own a Writer clone; wait them out
        self.shared.reporter.drain();

        let shadows = self.shared.state.lock().drain_shadows();
        for shadow in &shadows {
            self.shared.device.free(&shadow.res);
        }
        info!(freed = shadows.len(), "capture engine stopped");
    }
}

impl EngineShared {
    /// Scheduler loop: single-flight dispatch, synchronous drain on stop
    fn run_scheduler(self: Arc<Self>) {
        let mut inflight: Option<JoinHandle<()>> = None;

        loop {
            let mut st = self.state.lock();
            while !(st.stop || (st.ready_for_dump && !st.queue.is_empty())) {
                self.cond.wait(&mut st);
            }
            if st.stop {
                break;
            }

            let Some(&head) = st.queue.front() else {
                continue;
            };
            let Some(job) = self.job_for(&st, head) else {
                // queue/pool divergence would be a bug; drop the entry
                st.queue.pop_front();
                continue;
            };
            st.ready_for_dump = false;
            drop(st);

            // previous job has already set ready_for_dump, so this join is
            // immediate; it just reaps the thread
            if let Some(handle) = inflight.take() {
                let _ = handle.join();
            }

            let shared = Arc::clone(&self);
            inflight = Some(thread::spawn(move || {
                shared.do_dump(&job);
                let mut st = shared.state.lock();
                if let Some(id) = st.queue.pop_front() {
                    st.set_idle(id);
                }
                st.ready_for_dump = true;
                drop(st);
                // wake pool waiters and the scheduler alike
                shared.cond.notify_all();
            }));
        }

        if let Some(handle) = inflight.take() {
            let _ = handle.join();
        }

        // deterministic shutdown: persist every queued entry synchronously
        let mut st = self.state.lock();
        while let Some(id) = st.queue.pop_front() {
            if let Some(job) = self.job_for(&st, id) {
                self.do_dump(&job);
            }
            st.set_idle(id);
        }
    }

    fn job_for(&self, st: &PoolState, id: ShadowId) -> Option<DumpJob> {
        st.shadow(id).map(|shadow| DumpJob {
            res: shadow.res.clone(),
            name: shadow.name.clone(),
            size: shadow.dump_size,
            offset: shadow.offset,
        })
    }

    /// Lock the shadow's bytes and persist them.
    ///
    /// Runs outside the pool lock except during shutdown drain; only
    /// pool/queue bookkeeping is ever serialized.
    fn do_dump(&self, job: &DumpJob) {
        match self.device.lock_read(&job.res) {
            Ok(bytes) => {
                let start = job.offset as usize;
                let end = start.saturating_add(job.size as usize).min(bytes.len());
                let data = bytes.get(start..end).unwrap_or(&[]);
                match self.writer.persist(&job.name, data) {
                    Ok(()) => {
                        self.completed.fetch_add(1, Ordering::Relaxed);
                        debug!(name = %job.name, size = data.len(), "dump persisted");
                    }
                    Err(e) => {
                        warn!(name = %job.name, error = %e, "dump persistence failed");
                    }
                }
                self.device.unlock(&job.res);
            }
            Err(e) => {
                debug!(name = %job.name, error = %e, "resource lock failed");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.reporter.report(&job.name, DropReason::LockFailed);
            }
        }
    }
}
