//! The fault-handling protocol and the pager pool's service loop (§4.4, §4.5).
//!
//! Both sides live here as methods on [`VmContext`]: the faulter-side
//! `handle_fault`, called from the host's page-fault interrupt handler, and
//! the pager-side `run_pager`, run by each of the `pagers` worker threads
//! the host spawns at init time until it drains a kill sentinel.

use alloc::vec;

use crate::error::FaultOutcome;
use crate::fault_channel::FaultDescriptor;
use crate::host::{AccessBits, Mailbox, ProcessHost, SimMmu, SwapDisk};
use crate::lifecycle::VmContext;
use crate::page_table::{FrameId, PageId, Pid, PteState};

impl<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost> VmContext<M, D, MB, PH> {
    /// The faulter side of §4.4: called from the host's interrupt handler
    /// once it has dispatched a trap to this subsystem. Blocks the calling
    /// process until a pager resolves or kills the fault, transparently
    /// looping through as many `failed` replies (transient frame
    /// starvation, §4.5 step 4) as it takes — the retry lives inside one
    /// hardware-fault cycle, it is never handed back to the caller (§4.4d,
    /// §8 P6).
    pub fn handle_fault(&self, pid: Pid) -> FaultOutcome {
        let addr = self.mmu.assert_fault_cause();
        let page_size = self.mmu.page_size();
        let index = (addr - self.mmu.region_base()) / page_size;

        // I6: exactly one count per delivered interrupt, not per retry —
        // including one that turns out to be out of range.
        self.stats.record_fault();

        if index >= self.config.pages {
            log::error!("pid={} faulted at addr={:#x}, beyond the mapped region", pid.0, addr);
            self.process_host.terminate(pid, 1);
            return FaultOutcome::Terminate;
        }
        let page = PageId(index);
        log::trace!("fault: pid={} addr={:#x} page={}", pid.0, addr, page.0);

        loop {
            let private_sem = {
                let mut procs = self.processes.lock();
                let proc = procs.get_mut(&pid).unwrap_or_else(|| {
                    crate::error::fatal("fault from a pid with no registered VM state")
                });
                proc.begin_fault(FaultDescriptor::for_fault(pid, addr, page));
                proc.private_sem.clone()
            };

            self.fault_channel.notify(pid);
            private_sem.p();

            let desc = {
                let mut procs = self.processes.lock();
                let proc = procs.get_mut(&pid).expect("process vanished while faulting");
                proc.fault.take().expect("pager must leave a resolved descriptor")
            };

            if desc.should_terminate {
                log::error!("pid={} terminated: swap exhausted during a required eviction", pid.0);
                return FaultOutcome::Terminate;
            }
            if desc.failed {
                log::warn!("pid={} fault retry: no frame currently available", pid.0);
                continue;
            }
            let frame = desc
                .received_frame
                .unwrap_or_else(|| crate::error::fatal("resolved fault carries no frame"));
            self.frames.lock().unlock(frame);
            log::trace!("fault resolved: pid={} page={} frame={}", pid.0, page.0, frame.0);
            return FaultOutcome::Resolved;
        }
    }

    /// One pager-pool service iteration (§4.5 steps 1-11), for the already
    /// known-live `pid` the caller received from the fault channel. Blocks
    /// only on whatever I/O the fault itself requires.
    fn service_fault(&self, pid: Pid) {
        let page_size = self.mmu.page_size();

        let (addr, page, private_sem) = {
            let mut procs = self.processes.lock();
            let proc = procs
                .get_mut(&pid)
                .unwrap_or_else(|| crate::error::fatal("pager woke for a pid with no VM state"));
            let desc = proc
                .fault
                .as_ref()
                .unwrap_or_else(|| crate::error::fatal("pager woke with no fault descriptor"));
            (desc.addr, desc.page.expect("fault descriptor always names a page"), proc.private_sem.clone())
        };

        let victim = self.frames.lock().next_victim(
            |f| self.mmu.get_access(f).contains(AccessBits::REF),
            |f| self.mmu.clear_ref(f),
        );

        let frame = match victim {
            Some(frame) => frame,
            None => {
                log::warn!("pager: no frame available for pid={} page={}", pid.0, page.0);
                self.complete_fault(pid, None, true, false);
                let _ = private_sem;
                return;
            }
        };
        log::trace!("pager: selected frame={} for pid={} page={}", frame.0, pid.0, page.0);

        let occupant = {
            let frames = self.frames.lock();
            let rec = frames.get(frame);
            rec.page.zip(rec.pid)
        };

        if let Some((owner_page, owner_pid)) = occupant {
            if let Err(()) = self.evict(frame, owner_pid, owner_page) {
                log::error!(
                    "pager: swap exhausted evicting pid={} page={} to satisfy pid={}",
                    owner_pid.0, owner_page.0, pid.0
                );
                self.frames.lock().unlock(frame);
                self.complete_fault(pid, None, false, true);
                return;
            }
        }

        let mut procs = self.processes.lock();
        let proc = procs.get_mut(&pid).expect("process vanished mid-pager");
        let pte = *proc.page_table.get(page);
        let is_new = pte.state == PteState::Unused;

        let mut buf = vec![0u8; page_size];
        if let Some(block) = pte.disk_block {
            self.swap.read_page(block, &mut buf);
            self.mmu.write_frame(frame, &buf);
            self.stats.record_page_in();
        } else {
            self.mmu.write_frame(frame, &buf);
        }
        if is_new {
            self.stats.record_new();
        }

        self.frames.lock().occupy(frame, pid, page);
        self.mmu.clear_dirty(frame);
        // Deliberately no persistent `map` here: the pager only prepares
        // the frame and the page table. Installing the faulter's TAG
        // mapping is the Context-Switch Mapping Manager's job, done when
        // the faulter is next scheduled in (§4.5 note, §4.6).

        let entry = proc.page_table.get_mut(page);
        entry.state = PteState::InMem;
        entry.frame = Some(frame);
        drop(procs);

        self.stats.set_free_frames(self.frames.lock().free_count());
        self.complete_fault(pid, Some(frame), false, false);
        let _ = addr;
    }

    /// Runs one pager worker's loop. The host spawns `config.pagers`
    /// threads each calling this; every one returns once it has drained its
    /// kill sentinel (§4.5 step 1) and signaled `pager_shutdown`, ready for
    /// `VmContext::destroy` to join them.
    pub fn run_pager(&self) {
        log::debug!("pager: starting");
        loop {
            let pid = self.fault_channel.next_fault();
            if pid.0 < 0 {
                break;
            }
            self.service_fault(pid);
        }
        log::debug!("pager: draining kill sentinel, exiting");
        self.pager_shutdown.v();
    }

    /// Evicts whatever `owner_pid`/`owner_page` currently occupies `frame`,
    /// writing it to swap first if needed. `Err(())` means swap is
    /// exhausted and the eviction could not proceed.
    fn evict(&self, frame: FrameId, owner_pid: Pid, owner_page: PageId) -> Result<(), ()> {
        let dirty = self.mmu.get_access(frame).contains(AccessBits::DIRTY);
        let mut procs = self.processes.lock();
        let owner = procs
            .get_mut(&owner_pid)
            .unwrap_or_else(|| crate::error::fatal("evicted frame's owner has no VM state"));
        let pte = *owner.page_table.get(owner_page);

        // Only a dirty page needs writing out; a clean page already on disk
        // keeps its existing block, and a clean page never written keeps
        // `disk_block = None` (§4.5 step 5, §8 S2) — it re-faults as a
        // zero-fill rather than a swap read.
        let block = if dirty {
            match pte.disk_block.or_else(|| self.swap.alloc_block()) {
                Some(block) => block,
                None => return Err(()),
            }
        } else {
            pte.disk_block
        };

        if dirty {
            let b = block.expect("checked above");
            let mut buf = vec![0u8; self.mmu.page_size()];
            self.mmu.read_frame(frame, &mut buf);
            self.swap.write_page(b, &buf);
            self.stats.record_page_out();
        }
        self.stats.record_replaced();

        self.mmu.unmap(self.tag, owner_page);
        let entry = owner.page_table.get_mut(owner_page);
        entry.state = PteState::OnDisk;
        entry.frame = None;
        entry.disk_block = block;
        drop(procs);
        self.stats.set_free_disk_blocks(self.swap.free_blocks());
        Ok(())
    }

    fn complete_fault(&self, pid: Pid, frame: Option<FrameId>, failed: bool, should_terminate: bool) {
        let private_sem = {
            let mut procs = self.processes.lock();
            let proc = procs.get_mut(&pid).expect("process vanished completing fault");
            let desc = proc.fault.get_or_insert_with(FaultDescriptor::default);
            desc.received_frame = frame;
            desc.failed = failed;
            desc.should_terminate = should_terminate;
            proc.private_sem.clone()
        };
        if should_terminate {
            // §5/§6, original_source/phase5.c: swap exhaustion is Terminate(1).
            self.process_host.terminate(pid, 1);
        }
        private_sem.v();
    }
}
