//! # Tagged Pointer Encoding
//!
//! The single cross-section pointer encoding shared by the GOT and the
//! explicit relocation table. An encoded word is a 32-bit value whose top bit
//! selects the base the remaining bits are an offset into:
//!
//! ```text
//! ┌───┬─────────────────────────────┐
//! │ 0 │ offset from RAM base        │  resolves to ram_base + offset
//! ├───┼─────────────────────────────┤
//! │ 1 │ offset from code base       │  resolves to code_base + offset
//! └───┴─────────────────────────────┘
//! ```
//!
//! The same image may be placed at a different RAM address and a different
//! flash address on every install; this encoding is how every cross-section
//! pointer stays expressible relative to exactly one of the two bases.

use crate::{FlashAddr, RamAddr};

/// Discriminant bit: set means code-relative, clear means RAM-relative.
pub const TAG_BIT: u32 = 0x8000_0000;

// ============================================================================
// RESOLUTION BASES
// ============================================================================

/// The two runtime bases a tagged pointer can resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionBases {
    /// RAM base (the stack top); RAM-relative offsets resolve against this
    pub ram: RamAddr,
    /// Code-segment base (image base + text offset)
    pub code: FlashAddr,
}

impl ResolutionBases {
    /// Create resolution bases
    pub const fn new(ram: RamAddr, code: FlashAddr) -> Self {
        Self { ram, code }
    }
}

// ============================================================================
// TAGGED POINTER
// ============================================================================

/// A decoded tagged pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedPointer {
    /// Offset into RAM, relative to the RAM base
    RamRelative(u32),
    /// Offset into the code segment, relative to the code base
    CodeRelative(u32),
}

impl TaggedPointer {
    /// Decode a raw encoded word.
    ///
    /// Pure: the result depends on nothing but `raw`.
    pub const fn decode(raw: u32) -> Self {
        if raw & TAG_BIT == 0 {
            Self::RamRelative(raw)
        } else {
            Self::CodeRelative(raw & !TAG_BIT)
        }
    }

    /// Re-encode into the raw word form.
    ///
    /// `encode` inverts `decode` for every representable offset.
    pub const fn encode(self) -> u32 {
        match self {
            Self::RamRelative(offset) => offset,
            Self::CodeRelative(offset) => offset | TAG_BIT,
        }
    }

    /// Resolve to an absolute runtime address.
    ///
    /// Pure function of the pointer and the two bases; address arithmetic
    /// wraps as on hardware.
    pub const fn resolve(self, bases: ResolutionBases) -> u32 {
        match self {
            Self::RamRelative(offset) => bases.ram.as_u32().wrapping_add(offset),
            Self::CodeRelative(offset) => bases.code.as_u32().wrapping_add(offset),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
