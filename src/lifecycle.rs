//! Top-level lifecycle (§4.7): configuration, [`VmContext`] construction,
//! and teardown.
//!
//! Per §9's design note, the source's scattered module-level globals
//! (`Frames[]`, `Processes[]`, `framesMutex`, `procMutex`, `VmStats`, ...)
//! are collapsed into one struct the host kernel owns and passes by
//! reference, rather than reproduced as `static`s guarded by `spin::Once`.
//! A single encapsulated context is easier to reason about and to stand up
//! more than one of in tests.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use spin::Mutex;

use crate::error::VmError;
use crate::fault_channel::FaultChannel;
use crate::host::{Mailbox, ProcessHost, Semaphore, SimMmu, SwapDisk};
use crate::mmu::MmuHandle;
use crate::page_table::{FrameTable, Pid};
use crate::process::ProcessVm;
use crate::stats::{VmStats, VmStatsSnapshot};
use crate::swap::SwapStore;
use crate::MAXPAGERS;

/// Validated configuration for a [`VmContext`] (§4.10, replacing the
/// source's bare `(mappings, pages, frames, pagers)` tuple).
#[derive(Debug, Clone, Copy)]
pub struct VmConfig {
    pub mappings: usize,
    pub pages: usize,
    pub frames: usize,
    pub pagers: usize,
    pub disk_blocks: usize,
}

impl VmConfig {
    pub fn new(
        mappings: usize,
        pages: usize,
        frames: usize,
        pagers: usize,
        disk_blocks: usize,
    ) -> Result<Self, VmError> {
        if mappings != pages {
            return Err(VmError::MappingsPagesMismatch { mappings, pages });
        }
        if pages == 0 || frames == 0 || disk_blocks == 0 {
            return Err(VmError::ZeroSized);
        }
        if pagers > MAXPAGERS {
            return Err(VmError::TooManyPagers { requested: pagers });
        }
        Ok(Self {
            mappings,
            pages,
            frames,
            pagers,
            disk_blocks,
        })
    }
}

/// The fully wired-up VM subsystem: one instance per simulated kernel
/// (§4.7). Generic over the host's concrete MMU, swap disk, mailbox, and
/// process-control types so this crate never assumes a particular runtime.
pub struct VmContext<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost> {
    pub(crate) tag: u32,
    pub(crate) config: VmConfig,
    pub(crate) mmu: MmuHandle<M>,
    pub(crate) swap: SwapStore<D>,
    pub(crate) frames: Mutex<FrameTable>,
    pub(crate) processes: Mutex<BTreeMap<Pid, ProcessVm>>,
    pub(crate) fault_channel: FaultChannel<MB>,
    pub(crate) process_host: PH,
    pub(crate) stats: VmStats,
    /// V'd once per pager as it exits on the kill sentinel; `vmDestroyReal`
    /// P's it `config.pagers` times to know every pager has actually
    /// stopped before tearing down shared state (§4.5 step 1, §4.7).
    pub(crate) pager_shutdown: Arc<dyn Semaphore>,
}

impl<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost> VmContext<M, D, MB, PH> {
    /// `vmInitReal` (§4.7): builds the frame table, page tables are created
    /// lazily per process on first fault/fork, and wires up swap.
    pub fn init(
        config: VmConfig,
        mmu: M,
        disk: D,
        mailbox: MB,
        process_host: PH,
        pager_shutdown: Arc<dyn Semaphore>,
        tag: u32,
    ) -> Result<Self, VmError> {
        let mmu = MmuHandle::new(mmu);
        let page_size = mmu.page_size();
        let swap = SwapStore::new(disk, page_size);
        log::debug!(
            "vm_init: pages={} frames={} pagers={} disk_blocks={}",
            config.pages, config.frames, config.pagers, config.disk_blocks
        );
        Ok(Self {
            tag,
            config,
            mmu,
            swap,
            frames: Mutex::new(FrameTable::new(config.frames)),
            processes: Mutex::new(BTreeMap::new()),
            fault_channel: FaultChannel::new(mailbox),
            process_host,
            stats: VmStats::new(config.pages, config.frames, config.disk_blocks),
            pager_shutdown,
        })
    }

    pub fn stats(&self) -> VmStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    /// Registers a process's VM state (onFork, §4.6), allocating it a fresh
    /// page table and private semaphore. A no-op if the pid is already
    /// known, mirroring the source's idempotent fork hook.
    pub fn register_process(&self, pid: Pid, private_sem: Arc<dyn Semaphore>) {
        let mut procs = self.processes.lock();
        procs
            .entry(pid)
            .or_insert_with(|| ProcessVm::new(pid, self.config.pages, private_sem));
        log::debug!("onFork: pid={} registered with {} pages", pid.0, self.config.pages);
    }

    /// Tears down a process's VM state (onQuit, §4.6): frees every frame
    /// it holds resident and unmaps it, then drops the process entry.
    pub fn unregister_process(&self, pid: Pid) {
        let mut procs = self.processes.lock();
        if let Some(mut proc) = procs.remove(&pid) {
            let mut frames = self.frames.lock();
            let resident: alloc::vec::Vec<_> = proc.page_table.resident_pages().collect();
            for (page, frame) in resident {
                self.mmu.unmap(self.tag, page);
                frames.free(frame);
            }
            proc.reset();
            log::debug!("onQuit: pid={} released", pid.0);
        }
    }

    /// `vmDestroyReal` (§4.7): turns the MMU off (the host does that part;
    /// this crate only owns what's below it), kills every pager with a
    /// sentinel and waits for each to confirm it has exited, then releases
    /// process state. Any process VM state still registered at this point
    /// is a caller error (the host kernel is expected to have quit every
    /// process first); this clears it rather than leaking, since there is
    /// no invariant to enforce here.
    pub fn destroy(&self) {
        log::debug!("vm_destroy: sending {} kill sentinels", self.config.pagers);
        for _ in 0..self.config.pagers {
            self.fault_channel.notify(Pid(-1));
        }
        for _ in 0..self.config.pagers {
            self.pager_shutdown.p();
        }
        self.processes.lock().clear();
        let snap = self.stats.snapshot();
        log::debug!(
            "vm_destroy: complete; faults={} switches={} page_ins={} page_outs={} replaced={}",
            snap.faults, snap.switches, snap.page_ins, snap.page_outs, snap.replaced
        );
    }
}
