//! The MMU abstraction layer (§4.1): a thin, typed wrapper over the
//! simulated, host-supplied MMU ([`crate::host::SimMmu`]).
//!
//! Every call here either succeeds or halts — per §4.1, any MMU return
//! code the design doesn't explicitly expect is fatal, so there is no
//! recoverable error type to propagate.

use crate::error::fatal;
use crate::host::{AccessBits, Cause, Prot, SimMmu};
use crate::page_table::{FrameId, PageId};

/// Typed wrapper over a [`SimMmu`]. Owns nothing the host doesn't already
/// own; it only narrows the raw interface to calls that either succeed or
/// are fatal.
pub struct MmuHandle<M: SimMmu> {
    inner: M,
}

impl<M: SimMmu> MmuHandle<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    pub fn region_base(&self) -> usize {
        self.inner.region_base()
    }

    /// Installs a `page -> frame` mapping. Fatal on any unexpected MMU
    /// return code (§4.1).
    pub fn map(&self, tag: u32, page: PageId, frame: FrameId, prot: Prot) {
        if let Err(code) = self.inner.map(tag, page, frame, prot) {
            fatal_mmu("map", code.0);
        }
    }

    /// Removes a `page` mapping. Fatal on any unexpected MMU return code.
    pub fn unmap(&self, tag: u32, page: PageId) {
        if let Err(code) = self.inner.unmap(tag, page) {
            fatal_mmu("unmap", code.0);
        }
    }

    pub fn get_map(&self, tag: u32, page: PageId) -> Option<(FrameId, Prot)> {
        self.inner.get_map(tag, page)
    }

    pub fn get_access(&self, frame: FrameId) -> AccessBits {
        self.inner.get_access(frame)
    }

    pub fn set_access(&self, frame: FrameId, bits: AccessBits) {
        self.inner.set_access(frame, bits);
    }

    /// Clears only the `DIRTY` bit, leaving `REF` as-is (§4.5 step 10).
    pub fn clear_dirty(&self, frame: FrameId) {
        let bits = self.inner.get_access(frame).without(AccessBits::DIRTY);
        self.inner.set_access(frame, bits);
    }

    /// Clears only the `REF` bit (clock algorithm, §4.3, §9: REF lifecycle
    /// belongs to the clock scan alone, so this is only ever called from
    /// [`crate::page_table::FrameTable::next_victim`]'s callback).
    pub fn clear_ref(&self, frame: FrameId) {
        let bits = self.inner.get_access(frame).without(AccessBits::REF);
        self.inner.set_access(frame, bits);
    }

    pub fn get_cause(&self) -> Cause {
        self.inner.get_cause()
    }

    /// Copies `frame`'s contents into `buf` (one page, §4.2 swap-out path).
    pub fn read_frame(&self, frame: FrameId, buf: &mut [u8]) {
        self.inner.copy_frame_out(frame, buf);
    }

    /// Copies `buf` into `frame` (one page, §4.5 page-in / zero-fill path).
    pub fn write_frame(&self, frame: FrameId, buf: &[u8]) {
        self.inner.copy_frame_in(frame, buf);
    }

    /// Asserts the trap was a page fault and returns the faulting address.
    /// Fatal otherwise (§4.4: "Assert cause = FAULT").
    pub fn assert_fault_cause(&self) -> usize {
        match self.inner.get_cause() {
            Cause::Fault { addr } => addr,
            Cause::Other(code) => fatal(&alloc::format!(
                "MMU interrupt delivered with unexpected cause code {code}, expected FAULT"
            )),
        }
    }
}

fn fatal_mmu(op: &str, code: i32) -> ! {
    fatal(&alloc::format!("MMU {op} returned unexpected code {code}"))
}
