// src/device/mod.rs
//! Device capability surface
//!
//! The capture engine never talks to hardware directly. It consumes a narrow
//! capability trait covering exactly what capture needs:
//!
//! - **Introspection**: true surface size, type/dimensions/format
//! - **Allocation**: create and free shadow resources in a memory tier
//! - **Copy**: GPU-side surface-to-surface copy
//! - **Lock/Unlock**: make a resource's bytes CPU-visible for persistence
//! - **Accounting**: adapter memory capacity per tier
//!
//! The production implementation wraps the real device stack; tests use the
//! in-memory `mock::MockDevice` double.

#[cfg(test)]
pub mod mock;

use thiserror::Error;

/// Opaque handle to a hardware-resident resource.
///
/// Handles are cheap to clone and identify a resource for the lifetime of
/// the device that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// Resource category, part of the pooling key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// Linear buffer (bitstreams, metadata)
    Buffer,
    /// 2D surface (frames, reference pictures)
    Texture2d,
}

/// Surface tiling layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileMode {
    /// Row-major, CPU-friendly layout. Shadow resources are always linear
    /// so locked bytes can be written out as-is.
    Linear,
    /// Device-tiled layout
    TiledY,
}

/// Pixel format of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PixelFormat {
    /// No format (buffers)
    Invalid,
    Nv12,
    P010,
    Argb8888,
    Raw,
}

/// Memory tier a resource is allocated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    /// Fast/shared system memory
    Shared,
    /// Dedicated/local device memory
    Dedicated,
}

/// Shape signature of a surface.
///
/// Two surfaces with identical signatures are interchangeable for pooling:
/// a shadow allocated for one can hold a copy of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceShape {
    pub kind: ResourceKind,
    pub width: u32,
    pub height: u32,
    pub tiling: TileMode,
    pub format: PixelFormat,
}

/// Introspected surface properties
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInfo {
    pub kind: ResourceKind,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Adapter memory capacity per tier, in bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterMemory {
    /// System shared memory visible to the device
    pub shared_bytes: u64,
    /// Dedicated video memory
    pub dedicated_bytes: u64,
}

/// Failures surfaced by the capability trait
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("resource allocation failed: {0}")]
    AllocationFailed(String),

    #[error("surface copy failed: {0}")]
    CopyFailed(String),

    #[error("resource lock failed: {0}")]
    LockFailed(String),

    #[error("resource info unavailable: {0}")]
    InfoUnavailable(String),
}

/// Narrow device abstraction consumed by the capture engine.
///
/// Implementations must be safe to call from multiple threads: producers
/// issue copies concurrently with the dump job's lock/unlock calls.
pub trait DeviceCapability: Send + Sync {
    /// True size in bytes of the resource's main surface, if known
    fn surface_size(&self, res: &ResourceHandle) -> Option<u64>;

    /// Type, dimensions, and format of the resource
    fn surface_info(&self, res: &ResourceHandle) -> Result<SurfaceInfo, DeviceError>;

    /// Allocate a resource of the given shape and size in the given tier
    fn allocate(
        &self,
        shape: &SurfaceShape,
        size: u64,
        tier: MemoryTier,
    ) -> Result<ResourceHandle, DeviceError>;

    /// Free a previously allocated resource
    fn free(&self, res: &ResourceHandle);

    /// GPU-side copy of `src` contents into `dst`
    fn copy_surface(&self, src: &ResourceHandle, dst: &ResourceHandle)
        -> Result<(), DeviceError>;

    /// Map the resource read-only and return its bytes.
    ///
    /// Must be paired with [`DeviceCapability::unlock`].
    fn lock_read(&self, res: &ResourceHandle) -> Result<Vec<u8>, DeviceError>;

    /// Release a mapping created by [`DeviceCapability::lock_read`]
    fn unlock(&self, res: &ResourceHandle);

    /// Adapter memory capacity query
    fn adapter_memory(&self) -> AdapterMemory;
}
