//! A `no_std`, heapless-backed reference [`Mailbox`] implementation (§6).
//!
//! A host kernel that already has a native mailbox primitive should use
//! that instead — the whole point of [`host::Mailbox`](crate::host::Mailbox)
//! is to let this crate stay agnostic about where blocking comes from. This
//! module exists for hosts (and this crate's own examples) that want a
//! working bounded FIFO without pulling in an allocator-backed queue,
//! following the teacher's own preference for `heapless` fixed-capacity
//! collections over `alloc` ones wherever a hard upper bound already
//! exists, the same way it reaches for `heapless::Vec`/`String` in its
//! boot and driver paths instead of growable `alloc` collections.
//!
//! Blocking is implemented by spinning, because
//! [`heapless::mpmc::MpMcQueue`] itself never blocks — `enqueue`/`dequeue`
//! return immediately either way. A real kernel would park the calling
//! thread on a wait queue instead of spinning; this type is a reference
//! implementation for hosts with nothing better yet, not a claim that
//! busy-waiting is the right backoff strategy under contention.

use core::hint::spin_loop;

use heapless::mpmc::MpMcQueue;

use crate::host::Mailbox;

/// A bounded, multi-producer multi-consumer FIFO of capacity `N`. `N` must
/// be a power of two, per [`MpMcQueue`]'s own requirement — the fault
/// channel's `MAXPROC`-sized capacity (§4.4) should round up to the next
/// power of two when this type backs it (e.g. 64 for `MAXPROC = 50`).
pub struct HeaplessMailbox<T, const N: usize> {
    queue: MpMcQueue<T, N>,
}

impl<T, const N: usize> HeaplessMailbox<T, N> {
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
        }
    }
}

impl<T, const N: usize> Default for HeaplessMailbox<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send, const N: usize> Mailbox<T> for HeaplessMailbox<T, N> {
    /// Spins until the queue has room. Acceptable backpressure per §4.4b —
    /// the same "blocks if full" contract the spec's mailbox carries,
    /// implemented here with a busy-wait instead of a park/wake pair.
    fn send(&self, mut msg: T) {
        loop {
            match self.queue.enqueue(msg) {
                Ok(()) => return,
                Err(rejected) => {
                    msg = rejected;
                    spin_loop();
                }
            }
        }
    }

    fn receive(&self) -> T {
        loop {
            if let Some(msg) = self.queue.dequeue() {
                return msg;
            }
            spin_loop();
        }
    }
}
