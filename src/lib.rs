//! Demand-paged virtual memory core for a simulated kernel.
//!
//! This crate implements the pieces a host kernel cannot get from anywhere
//! else: the page-fault protocol between a faulting thread and a pool of
//! pager threads, the frame table and its clock replacement policy, the
//! swap store, and the context-switch mapping discipline that keeps the
//! MMU in sync with per-process page tables.
//!
//! Everything the host kernel already provides — mailboxes, semaphores,
//! process control, the raw MMU, the raw swap disk — is modeled as a trait
//! in [`host`] and consumed generically. This crate never assumes a
//! specific threading model; it only assumes the traits' documented
//! blocking semantics.
//!
//! # Layout
//!
//! - [`host`] — trait boundary for kernel-provided collaborators (out of
//!   scope; consumed only), plus a `std`-backed reference implementation
//!   used by this crate's own tests.
//! - [`error`] — the error/outcome taxonomy.
//! - [`heapless_mailbox`] — a `no_std`, allocation-free reference
//!   [`host::Mailbox`] implementation for hosts without one of their own.
//! - [`log_ext`] — the logging facade and its reference sinks.
//! - [`mmu`] — the typed MMU wrapper.
//! - [`swap`] — the swap store.
//! - [`page_table`] — PTEs, the frame table, and the clock hand.
//! - [`stats`] — the mutex-guarded statistics counters.
//! - [`process`] — per-process VM records.
//! - [`fault_channel`] — the bounded fault-notification channel and
//!   per-process fault descriptors.
//! - [`pager`] — the pager pool loop and the faulting-thread protocol.
//! - [`switch`] — the context-switch mapping manager.
//! - [`lifecycle`] — `vm_init`/`vm_destroy` and process fork/quit hooks.
//! - [`syscall`] — the thin external syscall shim.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(clippy::new_without_default)]

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod error;
pub mod heapless_mailbox;
pub mod host;
pub mod log_ext;
pub mod mmu;
pub mod swap;
pub mod page_table;
pub mod stats;
pub mod process;
pub mod fault_channel;
pub mod pager;
pub mod switch;
pub mod lifecycle;
pub mod syscall;

#[cfg(test)]
mod scenario_tests;

pub use error::{FaultOutcome, VmError};
pub use lifecycle::{VmConfig, VmContext};
pub use page_table::{BlockId, FrameId, PageId, Pid};

/// The MMU address-space tag used throughout. All processes share it
/// because at most one is ever mapped in at a time (§I4).
pub const TAG: u32 = 0;

/// Maximum number of processes the fault-descriptor slot scheme supports.
///
/// Kept for API parity with the `pid mod MAXPROC` addressing scheme
/// described in the design notes, even though this crate stores the fault
/// descriptor directly in [`process::ProcessVm`] rather than in a
/// slot array.
pub const MAXPROC: usize = 50;

/// Maximum number of pager threads a [`VmConfig`] may request.
pub const MAXPAGERS: usize = 8;
