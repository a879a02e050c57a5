//! # Kernel Services
//!
//! The supervising kernel's interface, as the startup path consumes it. Both
//! services are synchronous: a call returns having taken effect, or the
//! process is not in a state where execution can meaningfully continue.

use ember_relocation::{LoadResult, RamAddr};

/// The kernel's memory-management service.
///
/// The boundary is the absolute address up to which the process may touch
/// RAM. The service may deny a request that exceeds available memory; denial
/// surfaces as a fault, since startup cannot proceed without its footprint.
pub trait MemoryService {
    /// Set the process memory boundary to `boundary` and return the boundary
    /// the kernel actually confirmed.
    fn set_boundary(&mut self, boundary: RamAddr) -> LoadResult<RamAddr>;

    /// Report the current boundary.
    fn boundary(&self) -> RamAddr;
}

/// The kernel's cooperative yield primitive.
pub trait Scheduler {
    /// Relinquish the processor to the host scheduler.
    fn yield_now(&self);
}
