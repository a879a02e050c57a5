//! # Startup Sequence
//!
//! The single execution path from "handed a flash image and a memory grant"
//! to "application running". Stage order is fixed: layout and boundary
//! negotiation first, then the in-memory stages (GOT, data, BSS, in any
//! mutual order), then the explicit fixups that mutate what those stages
//! produced, then entry dispatch. On return from the entry point the thread
//! parks in a cooperative yield loop; there is no further transition.

use crate::layout::{negotiate, LayoutConfig, MemoryLayout};
use crate::services::{MemoryService, Scheduler};
use crate::LoadReport;
use ember_hal::ProcessorContext;
use ember_relocation::{FlashRegion, LoadContext, LoadResult, RamRegion, RelocationEngine};

/// Run every load stage and produce the startup report.
///
/// On success the image is fully staged: GOT resolved, data copied, BSS
/// zeroed, fixups applied, stack pointer and static base installed. The
/// caller owns dispatch.
///
/// # Safety
/// - `flash` and `ram` must describe the image and the memory grant the
///   kernel actually handed this process.
/// - The kernel must honor confirmed boundary requests with backing memory:
///   the staging window `[stack_top, stack_top + heap_size)` is carved from
///   that grant.
/// - Repoints the stack on device targets; callable only once, from the
///   process entry path.
pub unsafe fn prepare<M: MemoryService>(
    flash: FlashRegion,
    ram: RamRegion,
    config: LayoutConfig,
    service: &mut M,
) -> LoadResult<LoadReport> {
    let header = ember_relocation::ImageHeader::read_from(&flash)?;
    let layout = MemoryLayout::plan(config, ram.base(), &header)?;
    negotiate(&layout, service)?;

    // The one hardware-specific effect in the whole sequence.
    unsafe { ProcessorContext::at_stack_top(layout.stack_top.as_u32()).install() };

    // The staging window sits above the tightened stack ceiling; its backing
    // was admitted by the generous phase of the negotiation.
    let staging = unsafe { ram.carve(config.stack_size, layout.heap_size) };

    let mut engine = RelocationEngine::new(LoadContext::new(flash, staging, header)?);
    engine.relocate_got()?;
    engine.load_data()?;
    engine.zero_bss()?;
    engine.apply_fixups()?;

    Ok(LoadReport {
        layout,
        stats: engine.context().stats,
    })
}

/// Transfer control to the application entry point, exactly once.
pub fn dispatch<F: FnOnce()>(entry: F) {
    entry();
}

/// Park the thread in an unbounded cooperative wait.
///
/// The terminal state of the runtime: reached when the entry point returns,
/// or when a load fault leaves the process defunct and waiting for the
/// supervisor to reap it.
pub fn park<S: Scheduler>(scheduler: &S) -> ! {
    loop {
        scheduler.yield_now();
    }
}

/// Load the image, run the application, park forever.
///
/// A load fault is logged and the thread parks without dispatching: a
/// malformed image or a denied grant is a configuration defect the
/// supervisor owns, not a condition this process can report upward.
///
/// # Safety
/// Same contract as [`prepare`].
pub unsafe fn boot<M, S, F>(
    flash: FlashRegion,
    ram: RamRegion,
    config: LayoutConfig,
    service: &mut M,
    scheduler: &S,
    entry: F,
) -> !
where
    M: MemoryService,
    S: Scheduler,
    F: FnOnce(),
{
    match unsafe { prepare(flash, ram, config, service) } {
        Ok(report) => {
            crate::publish_report(report);
            log::info!(
                "process image staged: {} GOT entries, {} data bytes, {} BSS bytes, {} fixups",
                report.stats.got_entries,
                report.stats.data_bytes,
                report.stats.bss_bytes,
                report.stats.fixups_applied
            );
            dispatch(entry);
        },
        Err(fault) => {
            log::error!("image load failed: {}", fault);
        },
    }
    park(scheduler)
}

// ============================================================================
// TESTS
// ============================================================================
