// src/capture/pool.rs
//! Shadow resource pool and capture queue state
//!
//! [`PoolState`] is the single mutual-exclusion domain of the engine: the
//! shape-keyed shadow pool, the FIFO capture queue, both tier budgets, and
//! the scheduler control flags all live here and are only ever touched under
//! one `parking_lot::Mutex`. Keeping the pool and the queue in one lock
//! domain rules out lost wakeups and pool/queue divergence.
//!
//! Shadow resources are reused across captures with the same shape. They are
//! destroyed (and their hardware resource freed) only at engine teardown,
//! never per capture.

use crate::capture::budget::MemoryBudget;
use crate::device::{MemoryTier, ResourceHandle, SurfaceShape};
use std::collections::{HashMap, VecDeque};

/// Identifier of a shadow within the pool
pub type ShadowId = u64;

/// A reusable duplicate buffer holding a copied surface.
///
/// Idle while in the pool; occupied from the moment a capture is copied into
/// it until the dump job releases it.
#[derive(Debug)]
pub struct Shadow {
    pub res: ResourceHandle,
    pub occupied: bool,
    /// Bytes charged to `tier` when this shadow was allocated
    pub alloc_size: u64,
    /// Bytes of the pending dump
    pub dump_size: u64,
    pub offset: u64,
    pub name: String,
    pub tier: MemoryTier,
}

/// Everything guarded by the engine's shared lock
pub struct PoolState {
    shadows: HashMap<ShadowId, Shadow>,
    by_shape: HashMap<SurfaceShape, Vec<ShadowId>>,
    next_id: ShadowId,
    /// FIFO of occupied shadows awaiting persistence
    pub queue: VecDeque<ShadowId>,
    pub shared_budget: MemoryBudget,
    pub dedicated_budget: MemoryBudget,
    /// Cleared while a dump job is in flight; the scheduler dispatches at
    /// most one job at a time regardless of queue depth
    pub ready_for_dump: bool,
    pub stop: bool,
}

impl PoolState {
    pub fn new(shared_budget: MemoryBudget, dedicated_budget: MemoryBudget) -> Self {
        Self {
            shadows: HashMap::new(),
            by_shape: HashMap::new(),
            next_id: 0,
            queue: VecDeque::new(),
            shared_budget,
            dedicated_budget,
            ready_for_dump: true,
            stop: false,
        }
    }

    /// First idle shadow matching `shape`, if any
    pub fn find_idle(&self, shape: &SurfaceShape) -> Option<ShadowId> {
        let ids = self.by_shape.get(shape)?;
        ids.iter()
            .copied()
            .find(|id| self.shadows.get(id).is_some_and(|s| !s.occupied))
    }

    /// Whether any shadow (idle or not) exists for `shape`.
    ///
    /// An empty shape list means waiting can never succeed: nothing will
    /// ever be released for this shape.
    pub fn has_shadows(&self, shape: &SurfaceShape) -> bool {
        self.by_shape.get(shape).is_some_and(|ids| !ids.is_empty())
    }

    /// Insert a freshly allocated shadow into the shape's list
    pub fn insert(&mut self, shadow: Shadow, shape: SurfaceShape) -> ShadowId {
        let id = self.next_id;
        self.next_id += 1;
        self.shadows.insert(id, shadow);
        self.by_shape.entry(shape).or_default().push(id);
        id
    }

    /// Remove a shadow entirely (copy-failure rollback of a fresh allocation)
    pub fn remove(&mut self, id: ShadowId, shape: &SurfaceShape) -> Option<Shadow> {
        if let Some(ids) = self.by_shape.get_mut(shape) {
            ids.retain(|&i| i != id);
        }
        self.shadows.remove(&id)
    }

    pub fn shadow(&self, id: ShadowId) -> Option<&Shadow> {
        self.shadows.get(&id)
    }

    pub fn shadow_mut(&mut self, id: ShadowId) -> Option<&mut Shadow> {
        self.shadows.get_mut(&id)
    }

    pub fn set_idle(&mut self, id: ShadowId) {
        if let Some(shadow) = self.shadows.get_mut(&id) {
            shadow.occupied = false;
        }
    }

    pub fn budget_mut(&mut self, tier: MemoryTier) -> &mut MemoryBudget {
        match tier {
            MemoryTier::Shared => &mut self.shared_budget,
            MemoryTier::Dedicated => &mut self.dedicated_budget,
        }
    }

    pub fn shadow_count(&self) -> usize {
        self.shadows.len()
    }

    /// Take every shadow out of the pool for teardown
    pub fn drain_shadows(&mut self) -> Vec<Shadow> {
        self.by_shape.clear();
        self.queue.clear();
        self.shadows.drain().map(|(_, s)| s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PixelFormat, ResourceKind, TileMode};

    fn shape(width: u32) -> SurfaceShape {
        SurfaceShape {
            kind: ResourceKind::Texture2d,
            width,
            height: 32,
            tiling: TileMode::Linear,
            format: PixelFormat::Nv12,
        }
    }

    fn shadow(occupied: bool) -> Shadow {
        Shadow {
            res: ResourceHandle(1),
            occupied,
            alloc_size: 1024,
            dump_size: 0,
            offset: 0,
            name: String::new(),
            tier: MemoryTier::Shared,
        }
    }

    fn state() -> PoolState {
        PoolState::new(
            MemoryBudget::new(MemoryTier::Shared, 1 << 20),
            MemoryBudget::new(MemoryTier::Dedicated, 0),
        )
    }

    #[test]
    fn test_find_idle_skips_occupied() {
        let mut st = state();
        let busy = st.insert(shadow(true), shape(64));
        let idle = st.insert(shadow(false), shape(64));
        assert_ne!(busy, idle);
        assert_eq!(st.find_idle(&shape(64)), Some(idle));
    }

    #[test]
    fn test_find_idle_respects_shape() {
        let mut st = state();
        st.insert(shadow(false), shape(64));
        assert_eq!(st.find_idle(&shape(128)), None);
        assert!(!st.has_shadows(&shape(128)));
        assert!(st.has_shadows(&shape(64)));
    }

    #[test]
    fn test_set_idle_makes_reusable() {
        let mut st = state();
        let id = st.insert(shadow(true), shape(64));
        assert_eq!(st.find_idle(&shape(64)), None);
        st.set_idle(id);
        assert_eq!(st.find_idle(&shape(64)), Some(id));
    }

    #[test]
    fn test_remove_rolls_back_insert() {
        let mut st = state();
        let id = st.insert(shadow(false), shape(64));
        let removed = st.remove(id, &shape(64));
        assert!(removed.is_some());
        assert!(!st.has_shadows(&shape(64)));
        assert_eq!(st.shadow_count(), 0);
    }

    #[test]
    fn test_drain_shadows_empties_everything() {
        let mut st = state();
        let a = st.insert(shadow(true), shape(64));
        st.insert(shadow(false), shape(128));
        st.queue.push_back(a);
        let drained = st.drain_shadows();
        assert_eq!(drained.len(), 2);
        assert_eq!(st.shadow_count(), 0);
        assert!(st.queue.is_empty());
    }
}
