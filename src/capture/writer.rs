// src/capture/writer.rs
//! Persistence sinks and best-effort failure reporting
//!
//! - **Writer**: persists raw dump bytes to a file, a trace channel, both,
//!   or nowhere, selected once at construction. With both sinks configured
//!   the file write runs on a background thread while the trace write runs
//!   inline, and the two are joined before persistence is considered done.
//! - **ErrorReporter**: fire-and-forget marker artifacts (`name.<reason>`,
//!   zero-length payload) written from detached threads so a failing report
//!   can never deadlock the caller. Teardown waits for outstanding reports
//!   through a `WaitGroup`.

use crate::utils::errors::{CaptureError, Result};
use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::warn;

/// Why a capture request was dropped.
///
/// The tag becomes the marker artifact's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    GetSurfaceSizeFailed,
    IncorrectSizeOffset,
    Discarded,
    GetResourceInfoFailed,
    SurfaceCopyFailed,
    LockFailed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetSurfaceSizeFailed => "get_surface_size_failed",
            Self::IncorrectSizeOffset => "incorrect_size_offset",
            Self::Discarded => "discarded",
            Self::GetResourceInfoFailed => "get_resource_info_failed",
            Self::SurfaceCopyFailed => "surface_copy_failed",
            Self::LockFailed => "lock_failed",
        }
    }
}

/// Side channel for dumps, e.g. a driver trace ring
pub trait TraceSink: Send + Sync {
    fn dump(&self, name: &str, data: &[u8]);
}

/// Write strategy, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    File,
    Trace,
    FileAndTrace,
    Null,
}

struct WriterInner {
    mode: WriteMode,
    output_dir: PathBuf,
    trace: Option<Arc<dyn TraceSink>>,
}

/// Dump persistence sink
#[derive(Clone)]
pub struct Writer {
    inner: Arc<WriterInner>,
}

impl Writer {
    /// Build a writer from the configured sink switches.
    ///
    /// A trace switch without a trace sink downgrades to the remaining
    /// sink (or a no-op) with a warning.
    pub fn new(
        write_to_file: bool,
        write_to_trace: bool,
        output_dir: &Path,
        trace: Option<Arc<dyn TraceSink>>,
    ) -> Result<Self> {
        let trace_ok = write_to_trace && trace.is_some();
        if write_to_trace && trace.is_none() {
            warn!("trace sink requested but none provided, disabling trace output");
        }
        let mode = match (write_to_file, trace_ok) {
            (true, false) => WriteMode::File,
            (false, true) => WriteMode::Trace,
            (true, true) => WriteMode::FileAndTrace,
            (false, false) => WriteMode::Null,
        };
        if matches!(mode, WriteMode::File | WriteMode::FileAndTrace) {
            std::fs::create_dir_all(output_dir)?;
        }
        Ok(Self {
            inner: Arc::new(WriterInner {
                mode,
                output_dir: output_dir.to_path_buf(),
                trace,
            }),
        })
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> Result<()> {
        std::fs::write(dir.join(name), data).map_err(CaptureError::Io)
    }

    /// Persist one dump under `name`
    pub fn persist(&self, name: &str, data: &[u8]) -> Result<()> {
        match self.inner.mode {
            WriteMode::File => Self::write_file(&self.inner.output_dir, name, data),
            WriteMode::Trace => {
                if let Some(trace) = &self.inner.trace {
                    trace.dump(name, data);
                }
                Ok(())
            }
            WriteMode::FileAndTrace => {
                // file I/O is the slow sink: run it in the background while
                // the trace write happens inline, then join
                let dir = self.inner.output_dir.clone();
                let owned_name = name.to_string();
                let owned_data = data.to_vec();
                let file_job =
                    thread::spawn(move || Self::write_file(&dir, &owned_name, &owned_data));
                if let Some(trace) = &self.inner.trace {
                    trace.dump(name, data);
                }
                match file_job.join() {
                    Ok(result) => result,
                    Err(_) => Err(CaptureError::Io(std::io::Error::other(
                        "file writer thread panicked",
                    ))),
                }
            }
            WriteMode::Null => Ok(()),
        }
    }
}

/// Best-effort, fire-and-forget failure notification
#[derive(Clone)]
pub struct ErrorReporter {
    inner: Arc<ReporterInner>,
}

struct ReporterInner {
    writer: Writer,
    enabled: bool,
    pending: Mutex<WaitGroup>,
}

impl ErrorReporter {
    pub fn new(writer: Writer, enabled: bool) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                writer,
                enabled,
                pending: Mutex::new(WaitGroup::new()),
            }),
        }
    }

    /// Write a zero-length marker artifact named `name.<reason>`.
    ///
    /// Runs on a detached thread; never blocks or fails the caller.
    pub fn report(&self, name: &str, reason: DropReason) {
        if !self.inner.enabled {
            return;
        }
        let marker = format!("{}.{}", name, reason.as_str());
        let writer = self.inner.writer.clone();
        let guard = self.inner.pending.lock().clone();
        thread::spawn(move || {
            if let Err(e) = writer.persist(&marker, &[]) {
                warn!(marker = %marker, error = %e, "failed to write error marker");
            }
            drop(guard);
        });
    }

    /// Wait for all outstanding report tasks to finish
    pub fn drain(&self) {
        let pending = std::mem::replace(&mut *self.inner.pending.lock(), WaitGroup::new());
        pending.wait();
    }
}
