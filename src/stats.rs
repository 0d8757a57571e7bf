//! VM-wide statistics (§3, §5): a single mutex-guarded record, not atomics.
//!
//! The teacher's own `FaultStats`/`PageoutStats` use independent atomic
//! counters because each field is updated from exactly one place. Here
//! several fields change together under one decision (an eviction bumps
//! `page_outs` and `replaced` in the same step a frame is chosen), so one
//! mutex guarding the whole struct is the simpler, equally correct choice
//! (§9).

use spin::Mutex;

/// Plain counters describing the lifetime of a [`crate::lifecycle::VmContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmStatsSnapshot {
    pub pages: usize,
    pub frames: usize,
    pub disk_blocks: usize,
    pub free_frames: usize,
    pub free_disk_blocks: usize,
    pub switches: u64,
    pub faults: u64,
    pub new: u64,
    pub page_ins: u64,
    pub page_outs: u64,
    pub replaced: u64,
}

/// Mutex-guarded live statistics.
pub struct VmStats {
    inner: Mutex<VmStatsSnapshot>,
}

impl VmStats {
    pub fn new(pages: usize, frames: usize, disk_blocks: usize) -> Self {
        Self {
            inner: Mutex::new(VmStatsSnapshot {
                pages,
                frames,
                disk_blocks,
                free_frames: frames,
                free_disk_blocks: disk_blocks,
                ..VmStatsSnapshot::default()
            }),
        }
    }

    pub fn snapshot(&self) -> VmStatsSnapshot {
        *self.inner.lock()
    }

    pub fn record_switch(&self) {
        self.inner.lock().switches += 1;
    }

    pub fn record_fault(&self) {
        self.inner.lock().faults += 1;
    }

    pub fn record_new(&self) {
        self.inner.lock().new += 1;
    }

    pub fn record_page_in(&self) {
        self.inner.lock().page_ins += 1;
    }

    pub fn record_page_out(&self) {
        self.inner.lock().page_outs += 1;
    }

    /// A frame changed hands from one resident page to another, whether or
    /// not the outgoing page needed writing back (§3 `replaced`).
    pub fn record_replaced(&self) {
        self.inner.lock().replaced += 1;
    }

    pub fn set_free_frames(&self, free: usize) {
        self.inner.lock().free_frames = free;
    }

    pub fn set_free_disk_blocks(&self, free: usize) {
        self.inner.lock().free_disk_blocks = free;
    }
}
