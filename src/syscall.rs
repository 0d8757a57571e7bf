//! Thin syscall-shaped entry points (§4.7, §6), named after the operations
//! a host kernel's trap table would dispatch into: `vm_init`, `vm_destroy`,
//! `vm_fault_handler`, `vm_pager_main`. These add nothing over the
//! [`VmContext`] methods they call; they exist so a host's syscall/trap
//! table has a flat, C-callable-shaped surface to bind against instead of
//! reaching into the context's own API.

use alloc::sync::Arc;

use crate::error::{FaultOutcome, VmError};
use crate::host::{Mailbox, ProcessHost, Semaphore, SimMmu, SwapDisk};
use crate::lifecycle::{VmConfig, VmContext};
use crate::page_table::Pid;

/// `vmInit` (§4.7): validates `config` and builds a [`VmContext`].
/// `pager_shutdown` is the semaphore `vmDestroy` waits on once per pager
/// thread; the host creates it the same way it creates any other
/// [`Semaphore`] it hands this crate.
pub fn vm_init<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost>(
    config: VmConfig,
    mmu: M,
    disk: D,
    mailbox: MB,
    process_host: PH,
    pager_shutdown: Arc<dyn Semaphore>,
    tag: u32,
) -> Result<VmContext<M, D, MB, PH>, VmError> {
    VmContext::init(config, mmu, disk, mailbox, process_host, pager_shutdown, tag)
}

/// `vmDestroy` (§4.7): releases a [`VmContext`]'s process state.
pub fn vm_destroy<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost>(
    ctx: &VmContext<M, D, MB, PH>,
) {
    ctx.destroy();
}

/// The body of the host's page-fault trap handler (§4.4): call this with
/// the faulting pid once the trap has been dispatched here.
pub fn vm_fault_handler<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost>(
    ctx: &VmContext<M, D, MB, PH>,
    pid: Pid,
) -> FaultOutcome {
    ctx.handle_fault(pid)
}

/// The body of a pager worker thread (§4.5): returns once it has drained
/// the kill sentinel `vmDestroy` sends it and signaled the shutdown
/// semaphore.
pub fn vm_pager_main<M: SimMmu, D: SwapDisk, MB: Mailbox<Pid>, PH: ProcessHost>(
    ctx: &VmContext<M, D, MB, PH>,
) {
    ctx.run_pager()
}
