//! Resolved per-draw vertex input layout.
//!
//! Hardware interleaving is address-proximity-based rather than explicit:
//! array streams with matching strides packed within one stride of each
//! other are fetched as a single interleaved region. [`InterleavedBlock`]
//! models one such region; [`VertexInputLayout`] owns the blocks resolved
//! for the current draw and is recycled between draws.

use crate::format::MemoryPool;
use crate::regs::VERTEX_ATTRIBUTE_COUNT;

/// Where a vertex attribute slot sources its data for the current draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePlacement {
    /// Not fetched.
    #[default]
    None,
    /// Register, pushed, or inline data; re-supplied per draw.
    Transient,
    /// Stable guest memory array, part of an interleaved block.
    Persistent,
}

/// One attribute slot's membership in an interleaved block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    pub slot: u8,
    /// Whether the slot's frequency divider operates in modulo mode.
    pub modulo: bool,
    pub frequency: u16,
}

/// One contiguous guest memory region feeding one or more attribute slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterleavedBlock {
    /// Lowest observed base offset of the member arrays, pool bit masked.
    pub base_offset: u32,
    /// Element stride in bytes. For single-vertex blocks this is the host
    /// size of the one element.
    pub stride: u32,
    pub pool: MemoryPool,
    /// Member slots in declaration order.
    pub entries: Vec<BlockEntry>,
    /// Two or more slots share the region.
    pub interleaved: bool,
    /// Declared stride was zero: one element, broadcast to all vertices.
    pub single_vertex: bool,
    /// Absolute guest address, filled in at the end of resolution. Inline
    /// blocks keep zero; their data never lives in guest memory.
    pub resolved_address: u32,
}

impl InterleavedBlock {
    /// Vertex sub-range of this block a draw of `[first, first + count)`
    /// actually touches, as `(first_required, required_count)`.
    ///
    /// The result is the union over member slots: per-vertex members need
    /// the full draw range, modulo members that wrap need one full period,
    /// and divisor members need the divided range (upper bound rounded up so
    /// the fetch is never short).
    pub fn required_range(&self, first: u32, count: u32) -> (u32, u32) {
        if self.single_vertex {
            return (0, 1);
        }

        let max_index = first + count - 1;
        let mut lo = first;
        let mut hi = 0u32;

        for entry in &self.entries {
            if entry.frequency <= 1 {
                hi = hi.max(max_index);
                continue;
            }

            let frequency = u32::from(entry.frequency);
            if entry.modulo {
                if max_index >= frequency {
                    // The range wraps; one full period is read.
                    lo = 0;
                    hi = hi.max(frequency - 1);
                } else {
                    hi = hi.max(max_index);
                }
            } else {
                lo = lo.min(first / frequency);
                hi = hi.max(max_index.div_ceil(frequency));
            }
        }

        (lo, hi - lo + 1)
    }
}

/// Byte region of one pushed attribute within the transient stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushRegion {
    pub slot: u8,
    pub byte_len: u32,
}

/// Everything the descriptor writer and materializer need to know about the
/// current draw's vertex inputs. Owned by the draw that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexInputLayout {
    /// Hardware-enabled slots intersected with program-referenced slots.
    pub attribute_mask: u16,
    pub placements: [AttributePlacement; VERTEX_ATTRIBUTE_COUNT],
    /// Interleaved blocks in resolution order.
    pub blocks: Vec<InterleavedBlock>,
    /// Slots fed from constant registers, in slot order.
    pub referenced_registers: Vec<u8>,
    /// Pushed-attribute regions in slot order, byte lengths after padding.
    pub push_regions: Vec<PushRegion>,
}

impl VertexInputLayout {
    pub fn new() -> Self {
        Self {
            attribute_mask: 0,
            placements: [AttributePlacement::None; VERTEX_ATTRIBUTE_COUNT],
            blocks: Vec::with_capacity(VERTEX_ATTRIBUTE_COUNT),
            referenced_registers: Vec::with_capacity(VERTEX_ATTRIBUTE_COUNT),
            push_regions: Vec::with_capacity(VERTEX_ATTRIBUTE_COUNT),
        }
    }

    /// Reset for the next draw, keeping allocations.
    pub fn clear(&mut self) {
        self.attribute_mask = 0;
        self.placements = [AttributePlacement::None; VERTEX_ATTRIBUTE_COUNT];
        self.blocks.clear();
        self.referenced_registers.clear();
        self.push_regions.clear();
    }
}
