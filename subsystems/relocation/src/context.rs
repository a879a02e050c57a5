//! # Load Context
//!
//! Central state for one image load: the flash and RAM ranges, the resolution
//! bases, the header, and the set of stages that have completed. The stage
//! set is what turns the load sequence's ordering contract into something a
//! harness can check: each engine operation names the stages it requires and
//! faults if they have not run.

use crate::{
    FlashRegion, ImageHeader, LoadFault, LoadResult, LoadStats, RamRegion, ResolutionBases,
};

// ============================================================================
// STAGE SET
// ============================================================================

bitflags::bitflags! {
    /// Load stages, as completion flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StageSet: u8 {
        /// Layout planned, boundary negotiated, staging region established
        const LAYOUT = 1 << 0;
        /// GOT rewritten to absolute addresses
        const GOT = 1 << 1;
        /// Initialized data copied into RAM
        const DATA = 1 << 2;
        /// BSS zeroed
        const BSS = 1 << 3;
        /// Explicit relocation table applied
        const FIXUP = 1 << 4;
    }
}

impl StageSet {
    /// Stages that must complete before control may transfer to the entry
    /// point.
    pub const fn for_dispatch() -> Self {
        Self::LAYOUT
            .union(Self::GOT)
            .union(Self::DATA)
            .union(Self::BSS)
            .union(Self::FIXUP)
    }
}

// ============================================================================
// LOAD CONTEXT
// ============================================================================

/// State for one image load.
///
/// Constructed only once layout planning has produced the staging region, so
/// a fresh context already carries [`StageSet::LAYOUT`]. The staging region's
/// declared base is the RAM base every RAM-relative offset resolves against.
#[derive(Debug)]
pub struct LoadContext {
    /// The flash-resident image
    pub flash: FlashRegion,
    /// The RAM staging window for GOT + data + BSS
    pub ram: RamRegion,
    /// The image header
    pub header: ImageHeader,
    /// Counters accumulated by the engine
    pub stats: LoadStats,
    bases: ResolutionBases,
    completed: StageSet,
}

impl LoadContext {
    /// Create a context for a planned load.
    ///
    /// Validates the header's alignment invariants. The RAM region must be
    /// the staging window whose base is the stack top.
    pub fn new(flash: FlashRegion, ram: RamRegion, header: ImageHeader) -> LoadResult<Self> {
        header.validate()?;
        let bases = ResolutionBases::new(ram.base(), flash.base().offset(header.text_offset));
        Ok(Self {
            flash,
            ram,
            header,
            stats: LoadStats::new(),
            bases,
            completed: StageSet::LAYOUT,
        })
    }

    /// The bases tagged pointers resolve against
    pub const fn bases(&self) -> ResolutionBases {
        self.bases
    }

    /// Stages completed so far
    pub const fn completed(&self) -> StageSet {
        self.completed
    }

    /// Whether every stage before dispatch has completed
    pub fn is_complete(&self) -> bool {
        self.completed.contains(StageSet::for_dispatch())
    }

    /// Fault unless all `required` stages have completed.
    pub fn require(&self, required: StageSet) -> LoadResult<()> {
        if self.completed.contains(required) {
            Ok(())
        } else {
            Err(LoadFault::StageViolation {
                required,
                completed: self.completed,
            })
        }
    }

    /// Record a completed stage.
    pub fn mark(&mut self, stage: StageSet) {
        self.completed.insert(stage);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlashAddr, RamAddr, WORD_SIZE};

    fn context(words: &[u32], ram_buf: &mut [u32]) -> LoadContext {
        let flash = unsafe {
            FlashRegion::new(
                words.as_ptr().cast(),
                FlashAddr::new(0x8000),
                (words.len() as u32) * WORD_SIZE,
            )
        };
        let ram = unsafe {
            RamRegion::new(
                ram_buf.as_mut_ptr().cast(),
                RamAddr::new(0x2000_1000),
                (ram_buf.len() as u32) * WORD_SIZE,
            )
        };
        let header = ImageHeader::read_from(&flash).unwrap();
        LoadContext::new(flash, ram, header).unwrap()
    }

    // Header with zero-size sections and text at 0x28
    const HEADER: [u32; 10] = [0x28, 0, 0, 0x28, 0, 0, 0, 0, 0x28, 0x28];

    #[test]
    fn test_new_context_has_layout_done() {
        let mut ram = [0u32; 4];
        let ctx = context(&HEADER, &mut ram);
        assert_eq!(ctx.completed(), StageSet::LAYOUT);
        assert!(!ctx.is_complete());
    }

    #[test]
    fn test_bases_derive_from_regions() {
        let mut ram = [0u32; 4];
        let ctx = context(&HEADER, &mut ram);
        assert_eq!(ctx.bases().ram, RamAddr::new(0x2000_1000));
        assert_eq!(ctx.bases().code, FlashAddr::new(0x8000 + 0x28));
    }

    #[test]
    fn test_require_and_mark() {
        let mut ram = [0u32; 4];
        let mut ctx = context(&HEADER, &mut ram);

        let fault = ctx.require(StageSet::GOT | StageSet::DATA).unwrap_err();
        assert_eq!(
            fault,
            LoadFault::StageViolation {
                required: StageSet::GOT | StageSet::DATA,
                completed: StageSet::LAYOUT,
            }
        );

        ctx.mark(StageSet::GOT);
        ctx.mark(StageSet::DATA);
        assert!(ctx.require(StageSet::GOT | StageSet::DATA).is_ok());

        ctx.mark(StageSet::BSS);
        ctx.mark(StageSet::FIXUP);
        assert!(ctx.is_complete());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut words = HEADER;
        words[7] = 3; // bss_size
        let mut ram = [0u32; 4];
        let flash = unsafe {
            FlashRegion::new(words.as_ptr().cast(), FlashAddr::new(0), 40)
        };
        let ram_region = unsafe {
            RamRegion::new(ram.as_mut_ptr().cast(), RamAddr::new(0x2000_0000), 16)
        };
        let header = ImageHeader::read_from(&flash).unwrap();
        assert!(LoadContext::new(flash, ram_region, header).is_err());
    }
}
