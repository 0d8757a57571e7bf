//! Per-process VM state (§3, §4.6).
//!
//! The original source keys a fixed `Process[MAXPROC]` array by `pid %
//! MAXPROC` and stores the fault descriptor in a separate parallel slot.
//! Here the fault descriptor lives directly on [`ProcessVm`] instead (§9):
//! a process has at most one fault outstanding at a time (it's blocked on
//! its own private semaphore while waiting), so there's no benefit to a
//! separate array and a real win in not needing two indices to agree.

use alloc::sync::Arc;

use crate::fault_channel::FaultDescriptor;
use crate::host::Semaphore;
use crate::page_table::{PageTable, Pid};

/// One process's VM bookkeeping: its page table, its private wake
/// semaphore, and the descriptor of whatever fault it's currently blocked
/// on (if any).
pub struct ProcessVm {
    pub pid: Pid,
    pub page_table: PageTable,
    pub private_sem: Arc<dyn Semaphore>,
    pub fault: Option<FaultDescriptor>,
}

impl ProcessVm {
    /// A fresh process entry, as created on first fault or explicit
    /// registration (onFork, §4.6): an empty page table and a fresh
    /// private semaphore initialized to zero.
    pub fn new(pid: Pid, num_pages: usize, private_sem: Arc<dyn Semaphore>) -> Self {
        Self {
            pid,
            page_table: PageTable::new(num_pages),
            private_sem,
            fault: None,
        }
    }

    /// Records a new outstanding fault, overwriting any prior (resolved)
    /// one.
    pub fn begin_fault(&mut self, desc: FaultDescriptor) {
        self.fault = Some(desc);
    }

    /// Clears the fault descriptor once the faulter has consumed it.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Re-zeroes the page table for process quit (§4.6 onQuit). The caller
    /// is responsible for first unmapping and freeing every resident frame
    /// this page table references.
    pub fn reset(&mut self) {
        self.page_table.clear();
        self.fault = None;
    }
}
