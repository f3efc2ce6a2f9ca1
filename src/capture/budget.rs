// src/capture/budget.rs
//! Per-tier memory budget tracking
//!
//! Pure bookkeeping: tracks used versus capacity bytes for one memory tier.
//! No I/O, no locking of its own; the engine mutates budgets only under the
//! shared pool lock, which makes check-then-charge atomic.

use crate::device::MemoryTier;

/// Byte budget for one memory tier
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    tier: MemoryTier,
    cap: u64,
    used: u64,
}

impl MemoryBudget {
    pub fn new(tier: MemoryTier, cap: u64) -> Self {
        Self { tier, cap, used: 0 }
    }

    /// Charge `bytes` if they fit; returns false without side effect otherwise
    pub fn try_charge(&mut self, bytes: u64) -> bool {
        match self.used.checked_add(bytes) {
            Some(next) if next <= self.cap => {
                self.used = next;
                true
            }
            _ => false,
        }
    }

    /// Return `bytes` to the budget
    pub fn release(&mut self, bytes: u64) {
        self.used = self.used.saturating_sub(bytes);
    }

    pub fn tier(&self) -> MemoryTier {
        self.tier
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }
}
