//! Page table entries, the frame table, and the clock replacement hand (§3, §4.3).
//!
//! Sentinel `-1` values from the source design are replaced throughout with
//! tagged optionals ([`Option<FrameId>`], [`Option<BlockId>`], ...), per the
//! design notes in §9.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::fatal;

/// A process id, as handed out by the host kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub i32);

/// A virtual page number within a process's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub usize);

/// A physical frame index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub usize);

/// A swap-block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

/// The residency state of a [`Pte`] (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PteState {
    /// Never touched.
    Unused,
    /// Resident in a physical frame.
    InMem,
    /// Evicted to swap; not resident.
    OnDisk,
}

/// One page-table entry: one per (process, virtual page).
#[derive(Debug, Clone, Copy)]
pub struct Pte {
    pub state: PteState,
    pub frame: Option<FrameId>,
    pub disk_block: Option<BlockId>,
}

impl Pte {
    /// A freshly allocated, never-touched entry (I5: `UNUSED` implies both
    /// fields are sentinel).
    pub const fn unused() -> Self {
        Self {
            state: PteState::Unused,
            frame: None,
            disk_block: None,
        }
    }
}

impl Default for Pte {
    fn default() -> Self {
        Self::unused()
    }
}

/// One frame-table record: one per physical frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecord {
    pub page: Option<PageId>,
    pub pid: Option<Pid>,
    /// Locked from the moment a pager commits the frame to a faulter up to
    /// and including that faulter's resumption (§3, I3).
    pub locked: bool,
}

impl FrameRecord {
    pub const fn empty() -> Self {
        Self {
            page: None,
            pid: None,
            locked: false,
        }
    }

    /// Whether the frame currently holds a resident page belonging to
    /// someone.
    pub fn is_occupied(&self) -> bool {
        self.page.is_some()
    }
}

/// The frame table and its clock hand.
///
/// All mutation goes through `&mut self`; callers are expected to hold this
/// behind the crate's `frames` mutex (see [`crate::lifecycle::VmContext`]),
/// matching the `framesMutex` discipline in §5.
pub struct FrameTable {
    frames: Vec<FrameRecord>,
    /// `nextCheckedFrame`: the clock hand.
    next_checked: usize,
}

impl FrameTable {
    /// Allocates a frame table of the given size, all frames free.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "frame table must be non-empty");
        Self {
            frames: vec![FrameRecord::empty(); num_frames],
            next_checked: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, frame: FrameId) -> &FrameRecord {
        &self.frames[frame.0]
    }

    pub fn get_mut(&mut self, frame: FrameId) -> &mut FrameRecord {
        &mut self.frames[frame.0]
    }

    /// Cross-checks I1/I2: the frame occupied by `page` belonging to `pid`
    /// must name itself back. Fatal halt on mismatch.
    pub fn assert_owns(&self, frame: FrameId, pid: Pid, page: PageId) {
        let rec = self.get(frame);
        if rec.page != Some(page) || rec.pid != Some(pid) {
            fatal("frame table does not cross-check with the page table entry it claims to back");
        }
    }

    /// `getNextFrame()` (§4.3): returns a frame the caller may overwrite, or
    /// `None` if every frame is currently locked or referenced.
    ///
    /// `get_ref`/`clear_ref` let the caller (which owns the MMU handle)
    /// answer "is this frame's REF bit set" and "clear it" without this
    /// module depending on the MMU abstraction. REF lifecycle belongs
    /// entirely to this algorithm (§9): nothing else may touch it.
    pub fn next_victim(
        &mut self,
        mut get_ref: impl FnMut(FrameId) -> bool,
        mut clear_ref: impl FnMut(FrameId),
    ) -> Option<FrameId> {
        // 1. Any frame with no resident page at all is free, take it
        // outright — but only if it isn't already locked out to another
        // pager mid-commit (I3/P7): a free frame stays `locked=true` and
        // `page=None` from the moment `next_victim` hands it out until the
        // owning pager calls `occupy`, so the locked check here is load
        // bearing, not redundant with the clock branch's.
        if let Some(idx) = self.frames.iter().position(|f| !f.is_occupied() && !f.locked) {
            let frame = FrameId(idx);
            self.frames[idx].locked = true;
            return Some(frame);
        }

        // 2. Clock scan. One extra step over a full pass handles the case
        // where the first pass only cleared REF bits (§4.3 tie-break note).
        let n = self.frames.len();
        let mut pos = self.next_checked % n;
        for _ in 0..=n {
            let frame = FrameId(pos);
            let locked = self.frames[pos].locked;
            if !locked {
                if get_ref(frame) {
                    clear_ref(frame);
                } else {
                    self.next_checked = (pos + 1) % n;
                    self.frames[pos].locked = true;
                    return Some(frame);
                }
            }
            pos = (pos + 1) % n;
        }

        // 3. Full pass found nothing unlocked and non-referenced.
        None
    }

    /// Commits `frame` to hold `page` for `pid`, locked (§4.5 step 6).
    /// Caller must already hold the frame via [`Self::next_victim`].
    pub fn occupy(&mut self, frame: FrameId, pid: Pid, page: PageId) {
        let rec = self.get_mut(frame);
        rec.page = Some(page);
        rec.pid = Some(pid);
        rec.locked = true;
    }

    /// Releases ownership of `frame` entirely (process quit, §4.6 onQuit).
    pub fn free(&mut self, frame: FrameId) {
        *self.get_mut(frame) = FrameRecord::empty();
    }

    /// Unlocks `frame`, making it eligible for replacement again (§4.4d).
    pub fn unlock(&mut self, frame: FrameId) {
        self.get_mut(frame).locked = false;
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_occupied()).count()
    }
}

/// A process's page table: one [`Pte`] per virtual page.
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<Pte>,
}

impl PageTable {
    /// A zeroed (`UNUSED`) page table of the given length (onFork, §4.6).
    pub fn new(num_pages: usize) -> Self {
        Self {
            entries: vec![Pte::unused(); num_pages],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, page: PageId) -> &Pte {
        &self.entries[page.0]
    }

    pub fn get_mut(&mut self, page: PageId) -> &mut Pte {
        &mut self.entries[page.0]
    }

    /// Re-zeroes every entry in place (onQuit, §4.6).
    pub fn clear(&mut self) {
        for e in self.entries.iter_mut() {
            *e = Pte::unused();
        }
    }

    /// Iterates resident (`INMEM`) pages, for switch-out/switch-in/quit
    /// mapping teardown (§4.6).
    pub fn resident_pages(&self) -> impl Iterator<Item = (PageId, FrameId)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, pte)| {
            match (pte.state, pte.frame) {
                (PteState::InMem, Some(f)) => Some((PageId(i), f)),
                _ => None,
            }
        })
    }
}
