//! # Explicit Relocation Table
//!
//! The secondary relocation table the build tool appends after the data
//! image, for pointers the GOT scheme does not cover (pointers embedded
//! inside initialized data). On flash it is one length word - the byte length
//! of the entry data - followed by word pairs.
//!
//! Each pair names a RAM word to fix up (first word, an offset from the RAM
//! base) and carries the link-time metadata the build tool emitted alongside
//! it (second word, not consumed here). The value to relocate is read in
//! place from the target word, which is why the walker must run only after
//! the data copy has populated it.

use crate::{FlashRegion, LoadFault, LoadResult, WORD_SIZE};

/// Bytes per table entry: a target-offset word and a link-info word.
pub const ENTRY_SIZE: u32 = 2 * WORD_SIZE;

/// The explicit relocation table, located in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationTable {
    /// Flash offset of the first entry (just past the length word)
    entries_start: u32,
    /// Entry data length in bytes
    len: u32,
}

/// One relocation table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    /// RAM offset (from the RAM base) of the word to fix up
    pub target_offset: u32,
    /// Link metadata carried by the build tool; not consumed by the loader
    pub link_info: u32,
}

impl RelocationTable {
    /// Read and validate the table descriptor at image offset `start`.
    ///
    /// Faults if the declared length is not a whole number of entry pairs or
    /// if the entry data does not fit inside the image. A zero length is a
    /// valid empty table.
    pub fn read_from(flash: &FlashRegion, start: u32) -> LoadResult<Self> {
        let len = flash.read_word(start)?;
        if len % ENTRY_SIZE != 0 {
            return Err(LoadFault::MalformedTable { len });
        }
        let entries_start = start
            .checked_add(WORD_SIZE)
            .ok_or(LoadFault::MalformedTable { len })?;
        if len > 0 {
            // Prove the whole entry range up front so the walk cannot fault
            // halfway through a mutation pass.
            flash.bytes(entries_start, len)?;
        }
        Ok(Self { entries_start, len })
    }

    /// Number of entry pairs
    pub const fn entry_count(&self) -> u32 {
        self.len / ENTRY_SIZE
    }

    /// Read entry `index`.
    pub fn entry(&self, flash: &FlashRegion, index: u32) -> LoadResult<RelocationEntry> {
        let offset = self.entries_start + index * ENTRY_SIZE;
        Ok(RelocationEntry {
            target_offset: flash.read_word(offset)?,
            link_info: flash.read_word(offset + WORD_SIZE)?,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::FlashAddr;

    fn flash_of(words: &[u32]) -> FlashRegion {
        unsafe {
            FlashRegion::new(
                words.as_ptr().cast(),
                FlashAddr::new(0x8000),
                (words.len() as u32) * WORD_SIZE,
            )
        }
    }

    #[test]
    fn test_empty_table() {
        let words = [0u32];
        let table = RelocationTable::read_from(&flash_of(&words), 0).unwrap();
        assert_eq!(table.entry_count(), 0);
    }

    #[test]
    fn test_two_entries() {
        // len = 16 bytes, then two (target, info) pairs
        let words = [16u32, 0x08, 0x0000_0016, 0x10, 0x0000_0216];
        let flash = flash_of(&words);
        let table = RelocationTable::read_from(&flash, 0).unwrap();
        assert_eq!(table.entry_count(), 2);

        let first = table.entry(&flash, 0).unwrap();
        assert_eq!(first.target_offset, 0x08);
        assert_eq!(first.link_info, 0x16);

        let second = table.entry(&flash, 1).unwrap();
        assert_eq!(second.target_offset, 0x10);
    }

    #[test]
    fn test_odd_length_faults() {
        // 12 bytes is three words: not a whole number of pairs
        let words = [12u32, 0, 0, 0];
        assert_eq!(
            RelocationTable::read_from(&flash_of(&words), 0),
            Err(LoadFault::MalformedTable { len: 12 })
        );
    }

    #[test]
    fn test_overhanging_entries_fault() {
        // Declares 16 bytes of entries but the image ends after 8
        let words = [16u32, 0, 0];
        assert!(RelocationTable::read_from(&flash_of(&words), 0).is_err());
    }

    #[test]
    fn test_table_not_at_image_base() {
        let words = [0xAAAA_AAAAu32, 8, 0x04, 0x0000_0116];
        let flash = flash_of(&words);
        let table = RelocationTable::read_from(&flash, 4).unwrap();
        assert_eq!(table.entry_count(), 1);
        assert_eq!(table.entry(&flash, 0).unwrap().target_offset, 0x04);
    }
}
