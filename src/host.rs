//! The trait boundary for everything §6 calls "consumed": mailboxes,
//! semaphores, process control, the raw MMU, and the raw swap disk.
//!
//! None of this is implemented by the core — a real host kernel supplies
//! concrete types. [`test_support`] supplies `std`-backed reference
//! implementations used only by this crate's own tests, in the same way
//! the teacher's `mach_vm` tests drive `VmMap`/`ExternalPager` against
//! lightweight in-crate fakes rather than real hardware.

use crate::page_table::{FrameId, PageId, Pid};

/// Access bits the MMU tracks per frame: referenced and dirty (§1, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessBits(u8);

impl AccessBits {
    pub const NONE: Self = Self(0);
    pub const REF: Self = Self(0b01);
    pub const DIRTY: Self = Self(0b10);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// Mapping protection bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prot(u8);

impl Prot {
    pub const READ: Self = Self(0b01);
    pub const WRITE: Self = Self(0b10);
    pub const RW: Self = Self(0b11);

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Why the MMU trapped into the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// A page fault: the access named by `addr` is unmapped.
    Fault { addr: usize },
    /// Any other cause. Receiving this where a fault was expected is an
    /// invariant violation (§4.4).
    Other(i32),
}

/// A raw, non-`Ok` return code from the simulated MMU. Per §4.1, any code
/// the design does not explicitly expect is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmuCode(pub i32);

/// The simulated MMU, as the host kernel exposes it (§4.1, §6).
///
/// This is the *raw* interface; [`crate::mmu::MmuHandle`] is the typed,
/// in-scope wrapper built on top of it.
pub trait SimMmu: Send + Sync {
    fn page_size(&self) -> usize;
    fn region_base(&self) -> usize;
    fn map(&self, tag: u32, page: PageId, frame: FrameId, prot: Prot) -> Result<(), MmuCode>;
    fn unmap(&self, tag: u32, page: PageId) -> Result<(), MmuCode>;
    fn get_map(&self, tag: u32, page: PageId) -> Option<(FrameId, Prot)>;
    fn get_access(&self, frame: FrameId) -> AccessBits;
    fn set_access(&self, frame: FrameId, bits: AccessBits);
    fn get_cause(&self) -> Cause;
    /// Copies one page's worth of physical frame contents out, for writing
    /// to swap (§4.2). Physical memory itself is the host's, reached only
    /// through the simulated MMU's region, same as the source's
    /// `USLOSS_MmuRegion` + `memcpy` pattern.
    fn copy_frame_out(&self, frame: FrameId, buf: &mut [u8]);
    /// Copies a page's worth of bytes into a physical frame, for a page-in
    /// or zero-fill (§4.5 steps 7-8).
    fn copy_frame_in(&self, frame: FrameId, buf: &[u8]);
}

/// Blanket impl so a host (or a test) can hold its own `Arc<TestMmu>`
/// handle alongside the one moved into [`crate::lifecycle::VmContext`],
/// e.g. to poke the simulated cause register from outside.
impl<T: SimMmu + ?Sized> SimMmu for alloc::sync::Arc<T> {
    fn page_size(&self) -> usize {
        (**self).page_size()
    }
    fn region_base(&self) -> usize {
        (**self).region_base()
    }
    fn map(&self, tag: u32, page: PageId, frame: FrameId, prot: Prot) -> Result<(), MmuCode> {
        (**self).map(tag, page, frame, prot)
    }
    fn unmap(&self, tag: u32, page: PageId) -> Result<(), MmuCode> {
        (**self).unmap(tag, page)
    }
    fn get_map(&self, tag: u32, page: PageId) -> Option<(FrameId, Prot)> {
        (**self).get_map(tag, page)
    }
    fn get_access(&self, frame: FrameId) -> AccessBits {
        (**self).get_access(frame)
    }
    fn set_access(&self, frame: FrameId, bits: AccessBits) {
        (**self).set_access(frame, bits)
    }
    fn get_cause(&self) -> Cause {
        (**self).get_cause()
    }
    fn copy_frame_out(&self, frame: FrameId, buf: &mut [u8]) {
        (**self).copy_frame_out(frame, buf)
    }
    fn copy_frame_in(&self, frame: FrameId, buf: &[u8]) {
        (**self).copy_frame_in(frame, buf)
    }
}

/// The swap disk, as the host kernel exposes it (§4.2, §6): block
/// addressed by (track, sector, count), page-sized transfers.
pub trait SwapDisk: Send + Sync {
    /// Bytes per sector.
    fn sector_size(&self) -> usize;
    /// Sectors per track.
    fn track_size(&self) -> usize;
    /// Total disk size in bytes.
    fn size_bytes(&self) -> usize;
    fn read(&self, track: usize, sector: usize, sectors: usize, buf: &mut [u8]);
    fn write(&self, track: usize, sector: usize, sectors: usize, buf: &[u8]);
}

/// A counting semaphore. Exactly one [`Semaphore::p`] per fault, exactly
/// one [`Semaphore::v`] per reply (§5).
pub trait Semaphore: Send + Sync {
    fn p(&self);
    fn v(&self);
}

/// A bounded FIFO mailbox carrying pids from faulters to pagers (§4.4).
/// `send` blocks if full; `receive` blocks if empty.
pub trait Mailbox<T>: Send + Sync {
    fn send(&self, msg: T);
    fn receive(&self) -> T;
}

/// Process control the VM subsystem needs from the host kernel (§6).
pub trait ProcessHost: Send + Sync {
    /// Kills `pid` with the given status. Used for `shouldTerminate` faults
    /// (§4.4, §7) — never for invariant violations, which go through
    /// [`crate::error::fatal`] instead.
    fn terminate(&self, pid: Pid, status: i32);
}
