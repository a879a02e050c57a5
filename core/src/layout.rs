//! # Layout Planner
//!
//! Computes where everything in RAM goes - stack first, then the staging
//! window for GOT, data, and BSS - and negotiates the memory boundary with
//! the kernel. The negotiation keeps its historical three-call shape: a
//! generous speculative request covering stack plus staging, an idempotent
//! confirmation of the same bound, then a tightening to exactly the stack
//! top so the stack keeps a hard ceiling at its nominal size.

use crate::services::MemoryService;
use ember_relocation::{ImageHeader, LoadFault, LoadResult, RamAddr, WORD_SIZE};
use static_assertions::const_assert_eq;

/// Default stack size in bytes.
pub const DEFAULT_STACK_SIZE: u32 = 2048;

const_assert_eq!(DEFAULT_STACK_SIZE % WORD_SIZE, 0);

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Startup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Stack size in bytes; must be a word multiple
    pub stack_size: u32,
}

impl LayoutConfig {
    /// Configuration with an explicit stack size
    pub const fn with_stack_size(stack_size: u32) -> Self {
        Self { stack_size }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

// ============================================================================
// MEMORY LAYOUT
// ============================================================================

/// The planned RAM layout for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Start of the process memory region
    pub ram_start: RamAddr,
    /// Top of the stack; also the RAM base all image offsets resolve against
    pub stack_top: RamAddr,
    /// Bytes of staging RAM above the stack (GOT + data + BSS)
    pub heap_size: u32,
}

impl MemoryLayout {
    /// Plan the layout for an image placed in a region starting at
    /// `ram_start`.
    pub fn plan(config: LayoutConfig, ram_start: RamAddr, header: &ImageHeader) -> LoadResult<Self> {
        if config.stack_size % WORD_SIZE != 0 {
            return Err(LoadFault::MisalignedField {
                name: "stack_size",
                value: config.stack_size,
            });
        }
        let stack_top = ram_start
            .as_u32()
            .checked_add(config.stack_size)
            .ok_or(LoadFault::LayoutOverflow)?;
        let heap_size = header.heap_size()?;
        // The whole footprint must be addressable.
        stack_top
            .checked_add(heap_size)
            .ok_or(LoadFault::LayoutOverflow)?;
        Ok(Self {
            ram_start,
            stack_top: RamAddr::new(stack_top),
            heap_size,
        })
    }

    /// The transient upper bound requested during negotiation
    pub const fn staging_ceiling(&self) -> RamAddr {
        self.stack_top.offset(self.heap_size)
    }
}

// ============================================================================
// BOUNDARY NEGOTIATION
// ============================================================================

/// Negotiate the memory boundary for a planned layout.
///
/// On success the confirmed boundary is exactly the stack top; the staging
/// window above it was admitted by the two preceding generous requests.
pub fn negotiate<M: MemoryService>(layout: &MemoryLayout, service: &mut M) -> LoadResult<()> {
    let generous = layout.staging_ceiling();
    request(service, generous)?;
    request(service, generous)?;
    request(service, layout.stack_top)?;
    log::debug!(
        "boundary negotiated: stack top {:#010x}, staging {} bytes above",
        layout.stack_top.as_u32(),
        layout.heap_size
    );
    Ok(())
}

fn request<M: MemoryService>(service: &mut M, boundary: RamAddr) -> LoadResult<()> {
    let confirmed = service.set_boundary(boundary)?;
    if confirmed != boundary {
        return Err(LoadFault::BoundaryMismatch {
            requested: boundary,
            confirmed,
        });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn header(got: u32, data: u32, bss: u32) -> ImageHeader {
        ImageHeader {
            got_sym_start: 0x28,
            got_start: 0,
            got_size: got,
            data_sym_start: 0x28,
            data_start: got,
            data_size: data,
            bss_start: got + data,
            bss_size: bss,
            reldata_start: 0x28,
            text_offset: 0x28,
        }
    }

    struct MockMemory {
        boundary: RamAddr,
        calls: [u32; 8],
        count: usize,
        deny_above: Option<u32>,
    }

    impl MockMemory {
        fn new() -> Self {
            Self {
                boundary: RamAddr::new(0),
                calls: [0; 8],
                count: 0,
                deny_above: None,
            }
        }

        fn calls(&self) -> &[u32] {
            &self.calls[..self.count]
        }
    }

    impl MemoryService for MockMemory {
        fn set_boundary(&mut self, boundary: RamAddr) -> LoadResult<RamAddr> {
            self.calls[self.count] = boundary.as_u32();
            self.count += 1;
            if let Some(limit) = self.deny_above {
                if boundary.as_u32() > limit {
                    return Err(LoadFault::BoundaryDenied { requested: boundary });
                }
            }
            self.boundary = boundary;
            Ok(boundary)
        }

        fn boundary(&self) -> RamAddr {
            self.boundary
        }
    }

    #[test]
    fn test_plan() {
        let config = LayoutConfig::with_stack_size(64);
        let layout =
            MemoryLayout::plan(config, RamAddr::new(0x2000_0000), &header(8, 12, 16)).unwrap();
        assert_eq!(layout.stack_top, RamAddr::new(0x2000_0040));
        assert_eq!(layout.heap_size, 36);
        assert_eq!(layout.staging_ceiling(), RamAddr::new(0x2000_0040 + 36));
    }

    #[test]
    fn test_plan_default_stack() {
        let layout = MemoryLayout::plan(
            LayoutConfig::default(),
            RamAddr::new(0x2000_0000),
            &header(0, 0, 0),
        )
        .unwrap();
        assert_eq!(layout.stack_top, RamAddr::new(0x2000_0000 + DEFAULT_STACK_SIZE));
    }

    #[test]
    fn test_plan_rejects_misaligned_stack() {
        let result = MemoryLayout::plan(
            LayoutConfig::with_stack_size(1022),
            RamAddr::new(0x2000_0000),
            &header(0, 0, 0),
        );
        assert!(matches!(result, Err(LoadFault::MisalignedField { .. })));
    }

    #[test]
    fn test_plan_overflow() {
        let result = MemoryLayout::plan(
            LayoutConfig::with_stack_size(64),
            RamAddr::new(0xFFFF_FFF0),
            &header(0, 0, 0),
        );
        assert_eq!(result, Err(LoadFault::LayoutOverflow));
    }

    #[test]
    fn test_negotiation_sequence_and_stack_ceiling() {
        let config = LayoutConfig::with_stack_size(64);
        let layout =
            MemoryLayout::plan(config, RamAddr::new(0x2000_0000), &header(8, 12, 16)).unwrap();
        let mut memory = MockMemory::new();

        negotiate(&layout, &mut memory).unwrap();

        // Two generous requests, then the tightening request - the shape is
        // part of the contract with the kernel.
        let generous = 0x2000_0040 + 36;
        assert_eq!(memory.calls(), &[generous, generous, 0x2000_0040]);
        // The confirmed boundary is the stack top, not the transient bound.
        assert_eq!(memory.boundary(), layout.stack_top);
    }

    #[test]
    fn test_negotiation_denied() {
        let layout = MemoryLayout::plan(
            LayoutConfig::with_stack_size(64),
            RamAddr::new(0x2000_0000),
            &header(8, 12, 16),
        )
        .unwrap();
        let mut memory = MockMemory::new();
        memory.deny_above = Some(0x2000_0040);

        assert_eq!(
            negotiate(&layout, &mut memory),
            Err(LoadFault::BoundaryDenied { requested: layout.staging_ceiling() })
        );
    }
}
