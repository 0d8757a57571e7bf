//! Context-switch mapping maintenance and fork/quit hooks (§4.6).
//!
//! The simulated MMU only ever has one process's mappings installed at a
//! time (§1, §6): switching between processes means tearing down the
//! outgoing process's mappings and reinstalling the incoming one's, using
//! the frame table as the source of truth for what's still resident.

use alloc::sync::Arc;

use crate::host::{Mailbox, ProcessHost, Prot, Semaphore, SimMmu, SwapDisk};
use crate::lifecycle::VmContext;
use crate::page_table::Pid;

impl<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost> VmContext<M, D, MB, PH> {
    /// Called when the host scheduler switches `pid` out: removes every
    /// mapping it currently has installed. Frames stay resident and
    /// locked-state untouched; only the MMU's view changes.
    pub fn on_switch_out(&self, pid: Pid) {
        let procs = self.processes.lock();
        if let Some(proc) = procs.get(&pid) {
            let frames = self.frames.lock();
            for (page, frame) in proc.page_table.resident_pages() {
                frames.assert_owns(frame, pid, page);
                self.mmu.unmap(self.tag, page);
            }
        }
        self.stats.record_switch();
        log::trace!("onSwitchOut: pid={}", pid.0);
    }

    /// Called when the host scheduler switches `pid` in: reinstalls every
    /// mapping the frame table still attributes to it, cross-checking each
    /// one against the frame table's own record (I1/I2).
    pub fn on_switch_in(&self, pid: Pid) {
        let procs = self.processes.lock();
        if let Some(proc) = procs.get(&pid) {
            let frames = self.frames.lock();
            for (page, frame) in proc.page_table.resident_pages() {
                frames.assert_owns(frame, pid, page);
                self.mmu.map(self.tag, page, frame, Prot::RW);
            }
        }
        log::trace!("onSwitchIn: pid={}", pid.0);
    }

    /// Registers VM state for a newly forked process (§4.6 onFork).
    pub fn on_fork(&self, pid: Pid, private_sem: Arc<dyn Semaphore>) {
        self.register_process(pid, private_sem);
    }

    /// Tears down `pid`'s VM state entirely (§4.6 onQuit): frees every
    /// frame it holds, unmaps them, and drops the process entry.
    pub fn on_quit(&self, pid: Pid) {
        self.unregister_process(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::{TestMailbox, TestMmu, TestProcessHost, TestSemaphore, TestSwapDisk};
    use crate::lifecycle::VmConfig;
    use crate::page_table::{FrameId, PageId, PteState};

    fn context() -> VmContext<TestMmu, TestSwapDisk, TestMailbox<Pid>, TestProcessHost> {
        let config = VmConfig::new(4, 4, 2, 1, 4).unwrap();
        VmContext::init(
            config,
            TestMmu::new(4096, 0),
            TestSwapDisk::new(512, 32, 512 * 32 * 4),
            TestMailbox::new(8),
            TestProcessHost::new(),
            Arc::new(TestSemaphore::new(0)),
            0,
        )
        .unwrap()
    }

    #[test]
    fn switch_out_then_in_restores_mappings() {
        let ctx = context();
        ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));
        {
            let mut procs = ctx.processes.lock();
            let proc = procs.get_mut(&Pid(1)).unwrap();
            let entry = proc.page_table.get_mut(PageId(0));
            entry.state = PteState::InMem;
            entry.frame = Some(FrameId(0));
        }
        ctx.frames.lock().occupy(FrameId(0), Pid(1), PageId(0));
        ctx.mmu.map(ctx.tag, PageId(0), FrameId(0), Prot::RW);

        ctx.on_switch_out(Pid(1));
        assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), None);

        ctx.on_switch_in(Pid(1));
        assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), Some((FrameId(0), Prot::RW)));
    }

    #[test]
    fn quit_frees_resident_frames() {
        let ctx = context();
        ctx.on_fork(Pid(2), Arc::new(TestSemaphore::new(0)));
        {
            let mut procs = ctx.processes.lock();
            let proc = procs.get_mut(&Pid(2)).unwrap();
            let entry = proc.page_table.get_mut(PageId(1));
            entry.state = PteState::InMem;
            entry.frame = Some(FrameId(1));
        }
        ctx.frames.lock().occupy(FrameId(1), Pid(2), PageId(1));

        ctx.on_quit(Pid(2));
        assert!(ctx.processes.lock().get(&Pid(2)).is_none());
        assert!(!ctx.frames.lock().get(FrameId(1)).is_occupied());
    }
}
