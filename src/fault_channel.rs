//! The fault-handling protocol's shared state (§4.4): a bounded mailbox of
//! pids from faulters to pagers, and the per-process fault descriptor each
//! pager fills in before waking the faulter.

use crate::host::Mailbox;
use crate::page_table::{FrameId, PageId, Pid};

/// Describes one in-flight fault, filled in by the pager and read back by
/// the faulter after its private semaphore wakes it (§4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultDescriptor {
    pub pid: Option<Pid>,
    pub addr: usize,
    pub page: Option<PageId>,
    /// Set by the pager once the frame is committed and locked.
    pub received_frame: Option<FrameId>,
    /// Set when the pager could not satisfy the fault and the faulter
    /// should retry from the top (§4.5 step 4) rather than proceed.
    pub failed: bool,
    /// Set when swap was exhausted during a required eviction; the faulter
    /// must be killed rather than resumed (§4.2, §7).
    pub should_terminate: bool,
}

impl FaultDescriptor {
    pub fn for_fault(pid: Pid, addr: usize, page: PageId) -> Self {
        Self {
            pid: Some(pid),
            addr,
            page: Some(page),
            received_frame: None,
            failed: false,
            should_terminate: false,
        }
    }
}

/// The mailbox carrying faulting pids from the fault handler to the pager
/// pool (§4.4). A thin newtype so call sites read `FaultChannel::notify`
/// rather than a bare `Mailbox<Pid>::send`.
pub struct FaultChannel<MB: Mailbox<Pid>> {
    mailbox: MB,
}

impl<MB: Mailbox<Pid>> FaultChannel<MB> {
    pub fn new(mailbox: MB) -> Self {
        Self { mailbox }
    }

    /// Called by the fault handler once it has recorded the fault
    /// descriptor for `pid`; wakes a pager to service it.
    pub fn notify(&self, pid: Pid) {
        self.mailbox.send(pid);
    }

    /// Called by a pager loop iteration; blocks until a fault is pending.
    pub fn next_fault(&self) -> Pid {
        self.mailbox.receive()
    }
}
