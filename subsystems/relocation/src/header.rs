//! # Image Header
//!
//! The fixed header the image-build tool places at the very start of the
//! flash image. It carries the sizes and offsets of every section that needs
//! loading or relocation. Ten little-endian words, fixed order - this layout
//! is a binary contract and must stay bit-exact.

use crate::{FlashRegion, LoadFault, LoadResult, WORD_SIZE};
use static_assertions::const_assert_eq;

/// The header at the start of a flash-resident process image.
///
/// All `*_size` fields are byte counts and multiples of [`WORD_SIZE`]. RAM
/// offsets (`got_start`, `data_start`, `bss_start`) are relative to the RAM
/// base established at load time; flash offsets are relative to the image
/// base. The header is immutable input - the loader never writes it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Offset of the symbolic (pre-relocation) GOT in flash
    pub got_sym_start: u32,
    /// Offset of the GOT in RAM
    pub got_start: u32,
    /// Size of the GOT in bytes
    pub got_size: u32,
    /// Offset of the initialized-data image in flash
    pub data_sym_start: u32,
    /// Offset of the data section in RAM
    pub data_start: u32,
    /// Size of the data section in bytes
    pub data_size: u32,
    /// Offset of the BSS section in RAM
    pub bss_start: u32,
    /// Size of the BSS section in bytes
    pub bss_size: u32,
    /// Offset of the explicit relocation table in flash
    pub reldata_start: u32,
    /// Offset of the code segment in flash
    pub text_offset: u32,
}

// The binary contract: ten words, nothing the compiler may pad or reorder.
const_assert_eq!(core::mem::size_of::<ImageHeader>(), ImageHeader::SIZE as usize);

impl ImageHeader {
    /// Header size in bytes
    pub const SIZE: u32 = 10 * WORD_SIZE;

    /// Read the header from the start of an image.
    pub fn read_from(flash: &FlashRegion) -> LoadResult<Self> {
        let mut words = [0u32; (Self::SIZE / WORD_SIZE) as usize];
        for (i, word) in words.iter_mut().enumerate() {
            *word = flash.read_word(i as u32 * WORD_SIZE)?;
        }
        Ok(Self {
            got_sym_start: words[0],
            got_start: words[1],
            got_size: words[2],
            data_sym_start: words[3],
            data_start: words[4],
            data_size: words[5],
            bss_start: words[6],
            bss_size: words[7],
            reldata_start: words[8],
            text_offset: words[9],
        })
    }

    /// Validate the word-multiple invariants.
    pub fn validate(&self) -> LoadResult<()> {
        let fields = [
            ("got_sym_start", self.got_sym_start),
            ("got_start", self.got_start),
            ("got_size", self.got_size),
            ("data_sym_start", self.data_sym_start),
            ("data_start", self.data_start),
            ("data_size", self.data_size),
            ("bss_start", self.bss_start),
            ("bss_size", self.bss_size),
            ("reldata_start", self.reldata_start),
            ("text_offset", self.text_offset),
        ];
        for (name, value) in fields {
            if value % WORD_SIZE != 0 {
                return Err(LoadFault::MisalignedField { name, value });
            }
        }
        Ok(())
    }

    /// Number of GOT entries
    pub const fn got_entries(&self) -> u32 {
        self.got_size / WORD_SIZE
    }

    /// Total RAM needed for GOT + data + BSS staging.
    pub fn heap_size(&self) -> LoadResult<u32> {
        self.got_size
            .checked_add(self.data_size)
            .and_then(|n| n.checked_add(self.bss_size))
            .ok_or(LoadFault::LayoutOverflow)
    }
}

// ============================================================================
// TESTS
// ============================================================================
