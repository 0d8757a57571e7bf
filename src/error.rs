//! The error/outcome taxonomy (§7).
//!
//! Only configuration mistakes are ordinary [`Result`] errors. Transient
//! frame starvation is not an error at all — it is a field on
//! [`FaultOutcome`] that tells the faulter to retry. Resource exhaustion
//! (swap full) kills the faulting process but never the kernel. Invariant
//! violations are the one case that halts: [`fatal`] logs at `error!` and
//! diverges, standing in for the teacher's `USLOSS_Halt(1)`.

use core::fmt;

/// Configuration-time errors, returned from [`crate::lifecycle::VmConfig::new`]
/// and [`crate::lifecycle::VmContext::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// `mappings` did not equal `pages`.
    MappingsPagesMismatch { mappings: usize, pages: usize },
    /// `pages`, `frames`, or `disk_blocks` was zero.
    ZeroSized,
    /// Requested more pager threads than [`crate::MAXPAGERS`].
    TooManyPagers { requested: usize },
    /// VM was already initialized when `init` was called again.
    AlreadyInitialized,
    /// An operation that requires VM to be initialized was called first.
    NotInitialized,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::MappingsPagesMismatch { mappings, pages } => write!(
                f,
                "mappings ({mappings}) must equal pages ({pages})"
            ),
            VmError::ZeroSized => write!(f, "pages, frames, and disk_blocks must be non-zero"),
            VmError::TooManyPagers { requested } => {
                write!(f, "requested {requested} pagers, exceeds MAXPAGERS")
            }
            VmError::AlreadyInitialized => write!(f, "VM already initialized"),
            VmError::NotInitialized => write!(f, "VM not initialized"),
        }
    }
}

/// The result handed back to the fault-handling protocol (§4.4, §7) once a
/// pager has processed a fault descriptor.
///
/// This is not a [`Result`]: `Retry` is ordinary backpressure, not failure,
/// and `Terminate` is a deliberate kill, not a bug. Only [`fatal`] models
/// kernel-halting failure, and it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The fault was resolved; the frame is committed and locked, ready
    /// for the faulter to unlock on wake (§4.4d).
    Resolved,
    /// No frame was available. This never escapes
    /// [`crate::pager::VmContext::handle_fault`] — it loops internally
    /// until a pager replies with something other than `failed` (§4.4d,
    /// §4.5 step 4) — but the variant stays public because the pager's own
    /// per-iteration reply is this same shape.
    Retry,
    /// Swap was exhausted during a required eviction; the faulter must be
    /// terminated (§4.2, §7).
    Terminate,
}

/// Diverges after logging an invariant violation at `error!` level.
///
/// This is this crate's analogue of `USLOSS_Halt(1)`: every cross-check
/// between the page table and the frame table that fails, and every
/// unexpected MMU return code, funnels through here. The host kernel's own
/// panic handler decides what a "halt" means on real hardware; that
/// decision is out of scope for this crate.
#[cold]
#[track_caller]
pub fn fatal(msg: &str) -> ! {
    log::error!("fatal invariant violation: {msg}");
    panic!("demand_vm: fatal invariant violation: {msg}");
}
