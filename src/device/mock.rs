// src/device/mock.rs
//! In-memory device double for tests
//!
//! Backs every resource with a plain byte vector in a concurrent map and
//! exposes failure injection switches for the copy and lock paths.

use super::{
    AdapterMemory, DeviceCapability, DeviceError, MemoryTier, PixelFormat, ResourceHandle,
    ResourceKind, SurfaceInfo, SurfaceShape,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

struct MockSurface {
    info: SurfaceInfo,
    data: Vec<u8>,
}

/// Test device with injectable failures
pub struct MockDevice {
    surfaces: DashMap<u64, MockSurface>,
    next_id: AtomicU64,
    memory: AdapterMemory,
    fail_copy: AtomicBool,
    fail_lock: AtomicBool,
    alloc_count: AtomicU64,
    free_count: AtomicU64,
}

impl MockDevice {
    pub fn new(shared_bytes: u64, dedicated_bytes: u64) -> Self {
        Self {
            surfaces: DashMap::new(),
            next_id: AtomicU64::new(1),
            memory: AdapterMemory {
                shared_bytes,
                dedicated_bytes,
            },
            fail_copy: AtomicBool::new(false),
            fail_lock: AtomicBool::new(false),
            alloc_count: AtomicU64::new(0),
            free_count: AtomicU64::new(0),
        }
    }

    /// Register a producer-side surface with the given contents
    pub fn create_surface(
        &self,
        kind: ResourceKind,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> ResourceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.surfaces.insert(
            id,
            MockSurface {
                info: SurfaceInfo {
                    kind,
                    width,
                    height,
                    format,
                },
                data,
            },
        );
        ResourceHandle(id)
    }

    /// Remove a surface so introspection on it fails
    pub fn forget_surface(&self, res: &ResourceHandle) {
        self.surfaces.remove(&res.0);
    }

    pub fn set_fail_copy(&self, fail: bool) {
        self.fail_copy.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lock(&self, fail: bool) {
        self.fail_lock.store(fail, Ordering::SeqCst);
    }

    /// Allocations minus frees, for leak checks
    pub fn live_allocations(&self) -> u64 {
        self.alloc_count.load(Ordering::SeqCst) - self.free_count.load(Ordering::SeqCst)
    }
}

impl DeviceCapability for MockDevice {
    fn surface_size(&self, res: &ResourceHandle) -> Option<u64> {
        self.surfaces.get(&res.0).map(|s| s.data.len() as u64)
    }

    fn surface_info(&self, res: &ResourceHandle) -> Result<SurfaceInfo, DeviceError> {
        self.surfaces
            .get(&res.0)
            .map(|s| s.info)
            .ok_or_else(|| DeviceError::InfoUnavailable(format!("no surface {}", res.0)))
    }

    fn allocate(
        &self,
        shape: &SurfaceShape,
        size: u64,
        _tier: MemoryTier,
    ) -> Result<ResourceHandle, DeviceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.surfaces.insert(
            id,
            MockSurface {
                info: SurfaceInfo {
                    kind: shape.kind,
                    width: shape.width,
                    height: shape.height,
                    format: shape.format,
                },
                data: vec![0; size as usize],
            },
        );
        self.alloc_count.fetch_add(1, Ordering::SeqCst);
        Ok(ResourceHandle(id))
    }

    fn free(&self, res: &ResourceHandle) {
        if self.surfaces.remove(&res.0).is_some() {
            self.free_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn copy_surface(
        &self,
        src: &ResourceHandle,
        dst: &ResourceHandle,
    ) -> Result<(), DeviceError> {
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(DeviceError::CopyFailed("injected".to_string()));
        }
        let data = self
            .surfaces
            .get(&src.0)
            .map(|s| s.data.clone())
            .ok_or_else(|| DeviceError::CopyFailed(format!("no source {}", src.0)))?;
        let mut entry = self
            .surfaces
            .get_mut(&dst.0)
            .ok_or_else(|| DeviceError::CopyFailed(format!("no destination {}", dst.0)))?;
        let n = data.len().min(entry.data.len());
        entry.data[..n].copy_from_slice(&data[..n]);
        Ok(())
    }

    fn lock_read(&self, res: &ResourceHandle) -> Result<Vec<u8>, DeviceError> {
        if self.fail_lock.load(Ordering::SeqCst) {
            return Err(DeviceError::LockFailed("injected".to_string()));
        }
        self.surfaces
            .get(&res.0)
            .map(|s| s.data.clone())
            .ok_or_else(|| DeviceError::LockFailed(format!("no surface {}", res.0)))
    }

    fn unlock(&self, _res: &ResourceHandle) {}

    fn adapter_memory(&self) -> AdapterMemory {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_introspect() {
        let dev = MockDevice::new(1 << 20, 0);
        let res = dev.create_surface(
            ResourceKind::Texture2d,
            64,
            32,
            PixelFormat::Nv12,
            vec![7; 128],
        );
        assert_eq!(dev.surface_size(&res), Some(128));
        let info = dev.surface_info(&res).unwrap();
        assert_eq!(info.width, 64);
        assert_eq!(info.format, PixelFormat::Nv12);
    }

    #[test]
    fn test_copy_and_lock() {
        let dev = MockDevice::new(1 << 20, 0);
        let src = dev.create_surface(
            ResourceKind::Buffer,
            16,
            1,
            PixelFormat::Invalid,
            vec![1, 2, 3, 4],
        );
        let shape = SurfaceShape {
            kind: ResourceKind::Buffer,
            width: 16,
            height: 1,
            tiling: crate::device::TileMode::Linear,
            format: PixelFormat::Invalid,
        };
        let dst = dev.allocate(&shape, 4, MemoryTier::Shared).unwrap();
        dev.copy_surface(&src, &dst).unwrap();
        assert_eq!(dev.lock_read(&dst).unwrap(), vec![1, 2, 3, 4]);
        dev.unlock(&dst);
    }

    #[test]
    fn test_failure_injection() {
        let dev = MockDevice::new(0, 0);
        let src = dev.create_surface(ResourceKind::Buffer, 4, 1, PixelFormat::Invalid, vec![0; 4]);
        dev.set_fail_lock(true);
        assert!(dev.lock_read(&src).is_err());
        dev.set_fail_copy(true);
        assert!(dev.copy_surface(&src, &src).is_err());
    }
}
