//! # Ember Relocation Engine
//!
//! Position-independent image relocation for the Ember runtime. This crate
//! turns the flash-resident form of a process image (symbolic GOT, packed
//! data image, explicit relocation table) into its runnable RAM form.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Image Header   │────▶│  Load Context   │────▶│ Relocation      │
//! │  (flash, fixed) │     │ (regions+bases) │     │ Engine (stages) │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! - **Bounds-checked regions**: flash and RAM are declared `(base, len)`
//!   ranges; every access is validated before memory is touched.
//! - **Tagged pointers**: the single encoding shared by the GOT and the
//!   relocation table, modelled as an explicit two-variant type.
//! - **Fatal-only faults**: a malformed image is a build defect, not a
//!   runtime condition; faults exist so a harness can observe them, not so
//!   a caller can recover.
//!
//! All addresses in this crate are 32-bit: the image format is a 32-bit
//! machine contract, and keeping the arithmetic in `u32` lets the engine run
//! unchanged under a 64-bit host test harness.

#![no_std]

use core::fmt;

pub mod context;
pub mod engine;
pub mod header;
pub mod region;
pub mod reldata;
pub mod tagged;

pub use context::{LoadContext, StageSet};
pub use engine::RelocationEngine;
pub use header::ImageHeader;
pub use region::{FlashRegion, RamRegion};
pub use reldata::RelocationTable;
pub use tagged::{ResolutionBases, TaggedPointer};

/// Machine word size of the image format, in bytes.
pub const WORD_SIZE: u32 = 4;

// ============================================================================
// ADDRESS TYPES
// ============================================================================

/// An address in the process RAM address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RamAddr(pub u32);

impl RamAddr {
    /// Create a new RAM address
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Offset the address (address arithmetic wraps, as on hardware)
    pub const fn offset(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }

    /// Check word alignment
    pub const fn is_word_aligned(self) -> bool {
        self.0 % WORD_SIZE == 0
    }
}

/// An address in the flash (image) address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlashAddr(pub u32);

impl FlashAddr {
    /// Create a new flash address
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Offset the address (address arithmetic wraps, as on hardware)
    pub const fn offset(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

// ============================================================================
// FAULTS
// ============================================================================

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadFault>;

/// Unrecoverable load faults
///
/// Every variant is fatal: the image or the memory grant is defective and the
/// process cannot meaningfully continue. The type exists so the condition can
/// be named, logged, and asserted on by a test harness - no runtime caller
/// recovers from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFault {
    /// The memory service denied a boundary request
    BoundaryDenied {
        /// The boundary that was requested
        requested: RamAddr,
    },
    /// The memory service confirmed a different boundary than requested
    BoundaryMismatch {
        /// The boundary that was requested
        requested: RamAddr,
        /// The boundary the service reports
        confirmed: RamAddr,
    },
    /// A header field violates the word-multiple invariant
    MisalignedField {
        /// Header field name
        name: &'static str,
        /// Offending value
        value: u32,
    },
    /// A word access at an offset that is not word-aligned
    MisalignedOffset {
        /// Offending byte offset
        offset: u32,
    },
    /// An access outside a declared region
    OutOfBounds {
        /// Starting byte offset of the access
        offset: u32,
        /// Length of the access in bytes
        len: u32,
        /// Declared region size in bytes
        size: u32,
    },
    /// Relocation table length is not a whole number of entry pairs
    MalformedTable {
        /// Declared table length in bytes
        len: u32,
    },
    /// RAM footprint arithmetic overflowed the 32-bit address space
    LayoutOverflow,
    /// A stage ran before its preconditions completed
    StageViolation {
        /// Stages that must have completed
        required: StageSet,
        /// Stages that actually completed
        completed: StageSet,
    },
}

impl fmt::Display for LoadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundaryDenied { requested } => {
                write!(f, "memory service denied boundary {:#010x}", requested.as_u32())
            },
            Self::BoundaryMismatch { requested, confirmed } => write!(
                f,
                "boundary mismatch: requested {:#010x}, confirmed {:#010x}",
                requested.as_u32(),
                confirmed.as_u32()
            ),
            Self::MisalignedField { name, value } => {
                write!(f, "header field {} = {:#010x} is not word-aligned", name, value)
            },
            Self::MisalignedOffset { offset } => {
                write!(f, "word access at unaligned offset {:#010x}", offset)
            },
            Self::OutOfBounds { offset, len, size } => write!(
                f,
                "access of {} bytes at offset {:#010x} exceeds region of {} bytes",
                len, offset, size
            ),
            Self::MalformedTable { len } => {
                write!(f, "relocation table length {} is not a whole number of pairs", len)
            },
            Self::LayoutOverflow => write!(f, "RAM footprint overflows the address space"),
            Self::StageViolation { required, completed } => write!(
                f,
                "stage order violation: required {:#04x}, completed {:#04x}",
                required.bits(),
                completed.bits()
            ),
        }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Counters accumulated across the load stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// GOT entries resolved
    pub got_entries: u32,
    /// Initialized-data bytes copied from flash
    pub data_bytes: u32,
    /// BSS bytes zeroed
    pub bss_bytes: u32,
    /// Explicit relocation fixups applied
    pub fixups_applied: u32,
}

impl LoadStats {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            got_entries: 0,
            data_bytes: 0,
            bss_bytes: 0,
            fixups_applied: 0,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_offset_wraps() {
        let addr = RamAddr::new(0xFFFF_FFFC);
        assert_eq!(addr.offset(8).as_u32(), 0x0000_0004);
    }

    #[test]
    fn test_addr_alignment() {
        assert!(RamAddr::new(0x2000_1000).is_word_aligned());
        assert!(!RamAddr::new(0x2000_1002).is_word_aligned());
    }

    #[test]
    fn test_fault_display() {
        let fault = LoadFault::OutOfBounds {
            offset: 0x100,
            len: 8,
            size: 0x104,
        };
        // Faults must carry enough context to diagnose a bad image from a log
        // line alone.
        let mut buf = [0u8; 96];
        let mut cursor = Cursor { buf: &mut buf, used: 0 };
        use core::fmt::Write;
        write!(cursor, "{}", fault).unwrap();
        let text = core::str::from_utf8(&cursor.buf[..cursor.used]).unwrap();
        assert!(text.contains("0x00000100"));
        assert!(text.contains("260"));
    }

    struct Cursor<'a> {
        buf: &'a mut [u8],
        used: usize,
    }

    impl fmt::Write for Cursor<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let bytes = s.as_bytes();
            if self.used + bytes.len() > self.buf.len() {
                return Err(fmt::Error);
            }
            self.buf[self.used..self.used + bytes.len()].copy_from_slice(bytes);
            self.used += bytes.len();
            Ok(())
        }
    }
}
