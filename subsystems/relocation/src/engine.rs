//! # Relocation Engine
//!
//! The four in-memory load stages, driven in order over a [`LoadContext`]:
//! GOT relocation, data copy, BSS zero, explicit fixups. Each stage declares
//! the stages it requires, treats a zero size as a valid no-op, and accounts
//! its work in [`LoadStats`](crate::LoadStats).
//!
//! The GOT pass and the fixup pass are the same algorithm pointed at
//! different words: decode a tagged pointer, resolve it against the two
//! runtime bases, store the absolute result. The GOT pass reads its input
//! from the symbolic table in flash; the fixup pass reads it in place from
//! RAM words the data copy just produced, which is why it must run last.

use crate::context::{LoadContext, StageSet};
use crate::reldata::RelocationTable;
use crate::tagged::TaggedPointer;
use crate::{LoadResult, WORD_SIZE};

/// Drives the in-memory load stages over one context.
#[derive(Debug)]
pub struct RelocationEngine {
    ctx: LoadContext,
}

impl RelocationEngine {
    /// Create an engine for a planned load.
    pub const fn new(ctx: LoadContext) -> Self {
        Self { ctx }
    }

    /// Get the context
    pub const fn context(&self) -> &LoadContext {
        &self.ctx
    }

    /// Consume and return the context
    pub fn into_context(self) -> LoadContext {
        self.ctx
    }

    /// Rewrite the GOT from its symbolic flash form to absolute addresses.
    ///
    /// Returns the number of entries resolved. An empty GOT is a no-op.
    pub fn relocate_got(&mut self) -> LoadResult<u32> {
        self.ctx.require(StageSet::LAYOUT)?;
        let hdr = self.ctx.header;
        let bases = self.ctx.bases();

        for i in 0..hdr.got_entries() {
            let raw = self.ctx.flash.read_word(hdr.got_sym_start + i * WORD_SIZE)?;
            let resolved = TaggedPointer::decode(raw).resolve(bases);
            self.ctx.ram.write_word(hdr.got_start + i * WORD_SIZE, resolved)?;
        }

        self.ctx.mark(StageSet::GOT);
        self.ctx.stats.got_entries = hdr.got_entries();
        log::debug!("GOT relocated: {} entries", hdr.got_entries());
        Ok(hdr.got_entries())
    }

    /// Copy the initialized-data image from flash into RAM.
    ///
    /// Byte-exact, no interpretation; pointers inside the copied data are
    /// fixed up later by [`apply_fixups`](Self::apply_fixups).
    pub fn load_data(&mut self) -> LoadResult<u32> {
        self.ctx.require(StageSet::LAYOUT)?;
        let hdr = self.ctx.header;

        if hdr.data_size > 0 {
            self.ctx
                .ram
                .copy_from(&self.ctx.flash, hdr.data_sym_start, hdr.data_start, hdr.data_size)?;
        }

        self.ctx.mark(StageSet::DATA);
        self.ctx.stats.data_bytes = hdr.data_size;
        log::debug!("data section loaded: {} bytes", hdr.data_size);
        Ok(hdr.data_size)
    }

    /// Zero the uninitialized-data region.
    pub fn zero_bss(&mut self) -> LoadResult<u32> {
        self.ctx.require(StageSet::LAYOUT)?;
        let hdr = self.ctx.header;

        if hdr.bss_size > 0 {
            self.ctx.ram.zero(hdr.bss_start, hdr.bss_size)?;
        }

        self.ctx.mark(StageSet::BSS);
        self.ctx.stats.bss_bytes = hdr.bss_size;
        log::debug!("BSS zeroed: {} bytes", hdr.bss_size);
        Ok(hdr.bss_size)
    }

    /// Walk the explicit relocation table and fix up each target word in
    /// place.
    ///
    /// Must run after every other in-memory stage: it mutates words those
    /// stages produced.
    pub fn apply_fixups(&mut self) -> LoadResult<u32> {
        self.ctx.require(StageSet::GOT | StageSet::DATA | StageSet::BSS)?;
        let hdr = self.ctx.header;
        let bases = self.ctx.bases();

        let table = RelocationTable::read_from(&self.ctx.flash, hdr.reldata_start)?;
        for i in 0..table.entry_count() {
            let entry = table.entry(&self.ctx.flash, i)?;
            let current = self.ctx.ram.read_word(entry.target_offset)?;
            let resolved = TaggedPointer::decode(current).resolve(bases);
            self.ctx.ram.write_word(entry.target_offset, resolved)?;
            #[cfg(feature = "debug_reloc")]
            log::trace!(
                "fixup [{}] target {:#010x}: {:#010x} -> {:#010x} (info {:#010x})",
                i,
                entry.target_offset,
                current,
                resolved,
                entry.link_info
            );
        }

        self.ctx.mark(StageSet::FIXUP);
        self.ctx.stats.fixups_applied = table.entry_count();
        log::debug!("explicit relocations applied: {} entries", table.entry_count());
        Ok(table.entry_count())
    }
}

// ============================================================================
// TESTS
// ============================================================================
