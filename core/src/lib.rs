//! # Ember Startup Core
//!
//! The orchestration layer that turns a flash-resident position-independent
//! image plus a raw memory grant into a running process. It owns the order
//! of operations and nothing else: the relocation arithmetic lives in
//! `ember-relocation`, the one register-level effect in `ember-hal`, and the
//! kernel's memory and yield services stay behind traits.
//!
//! ## Startup sequence
//!
//! ```text
//! plan layout ─▶ negotiate boundary ─▶ install context
//!      ─▶ GOT / data / BSS ─▶ explicit fixups ─▶ dispatch ─▶ park
//! ```
//!
//! There is exactly one path through this crate. A fault anywhere on it is
//! terminal: the fault is logged and the thread parks for the supervisor to
//! reap.

#![no_std]

pub mod layout;
pub mod services;
pub mod startup;

pub use layout::{LayoutConfig, MemoryLayout, DEFAULT_STACK_SIZE};
pub use services::{MemoryService, Scheduler};
pub use startup::boot;

use ember_relocation::LoadStats;
use spin::Once;

// ============================================================================
// LOAD REPORT
// ============================================================================

/// What startup did, for the running application to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// The planned memory layout
    pub layout: MemoryLayout,
    /// Work counters from the load stages
    pub stats: LoadStats,
}

static LOAD_REPORT: Once<LoadReport> = Once::new();

/// Publish the startup report. Later calls are ignored; startup runs once.
pub fn publish_report(report: LoadReport) -> &'static LoadReport {
    LOAD_REPORT.call_once(|| report)
}

/// The report published by startup, if startup has completed.
pub fn load_report() -> Option<&'static LoadReport> {
    LOAD_REPORT.get()
}
