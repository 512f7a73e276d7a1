//! Read-only register-state snapshot consumed by layout resolution.
//!
//! The command-stream decoder owns the live register mirror; before each draw
//! it hands this core an immutable [`VertexStateSnapshot`]. Nothing here is
//! mutated during resolution, which keeps the single-writer-per-draw
//! invariant visible in the type system instead of hidden behind globals.

use crate::format::{IndexType, MemoryPool, VertexBaseType};

/// Number of vertex attribute slots the hardware exposes.
pub const VERTEX_ATTRIBUTE_COUNT: usize = 16;

/// Mask of the addressable offset bits in a vertex array offset register;
/// bit 31 selects the memory pool.
pub const VERTEX_OFFSET_MASK: u32 = 0x7fff_ffff;

/// Per-slot vertex array configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArrayBinding {
    /// Raw offset register value. Bit 31 selects the memory pool; the low 31
    /// bits address into it.
    pub offset: u32,
    /// Distance between consecutive elements in bytes. Zero means the array
    /// holds a single element broadcast to every vertex.
    pub stride: u8,
    /// Component count, `0..=4`. Zero disables the array.
    pub size: u8,
    /// Component storage format.
    pub base_type: VertexBaseType,
    /// Fetch frequency divider. 0 and 1 both mean one element per vertex.
    pub frequency: u16,
}

impl VertexArrayBinding {
    /// Base address within the selected pool, pool bit masked off.
    pub fn base_offset(&self) -> u32 {
        self.offset & VERTEX_OFFSET_MASK
    }

    pub fn pool(&self) -> MemoryPool {
        MemoryPool::from_bit(self.offset >> 31)
    }

    /// Host-side size of one element of this array.
    pub fn element_size(&self) -> u32 {
        crate::format::host_type_size(self.base_type, self.size)
    }
}

impl Default for VertexArrayBinding {
    fn default() -> Self {
        Self {
            offset: 0,
            stride: 0,
            size: 0,
            base_type: VertexBaseType::Float32,
            frequency: 0,
        }
    }
}

/// Per-slot constant register attribute, used when no array feeds the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRegister {
    pub base_type: VertexBaseType,
    /// Component count, `0..=4`. Zero means the register holds no value.
    pub size: u8,
    /// Raw register payload; always stored as four words.
    pub data: [u32; 4],
}

impl Default for AttributeRegister {
    fn default() -> Self {
        Self {
            base_type: VertexBaseType::Float32,
            size: 0,
            data: [0; 4],
        }
    }
}

/// Draw command kind currently programmed in the draw clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawCommand {
    /// Reset state; no draw has been programmed. Reaching resolution in this
    /// state is a protocol fault.
    #[default]
    None,
    /// Sequential fetch over the configured arrays.
    Array,
    /// Index-driven fetch.
    Indexed,
    /// Vertex data supplied inline in the command stream.
    InlinedArray,
}

/// Current draw topology, owned by the register-state collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawClause {
    pub command: DrawCommand,
    /// Whether the draw was submitted through immediate-mode pushes.
    pub is_immediate: bool,
    /// First vertex for array draws; minimum index for indexed draws.
    pub first: u32,
    /// Vertex count for array draws; element count for indexed draws.
    pub count: u32,
    /// Raw inline vertex payload for [`DrawCommand::InlinedArray`].
    pub inline_data: Vec<u32>,
}

/// Snapshot of every register this core reads while resolving a draw.
#[derive(Debug, Clone, Default)]
pub struct VertexStateSnapshot {
    /// Hardware-enabled attribute slots.
    pub attrib_input_mask: u16,
    /// Slots whose frequency divider operates in modulo mode.
    pub frequency_divider_mask: u16,
    /// Base offset added to every vertex array offset before translation.
    pub vertex_data_base_offset: u32,
    pub vertex_arrays: [VertexArrayBinding; VERTEX_ATTRIBUTE_COUNT],
    pub attribute_registers: [AttributeRegister; VERTEX_ATTRIBUTE_COUNT],
    /// Offset of the index array within `index_array_pool`.
    pub index_array_offset: u32,
    pub index_array_pool: MemoryPool,
    pub index_type: IndexType,
    pub draw: DrawClause,
}
