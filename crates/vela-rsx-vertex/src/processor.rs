//! Per-draw vertex input resolution.
//!
//! [`VertexInputProcessor`] owns the immediate-mode push buffers and turns
//! the current register snapshot into a [`VertexInputLayout`]: every slot is
//! classified as unused, register-fed, pushed, or array-backed, and
//! array-backed slots are fused into interleaved blocks by address/stride
//! proximity. The layout is then consumed by the descriptor writer and the
//! data materializer.

use bitflags::bitflags;
use tracing::trace;

use crate::error::VertexFetchError;
use crate::format::VertexBaseType;
use crate::layout::{
    AttributePlacement, BlockEntry, InterleavedBlock, PushRegion, VertexInputLayout,
};
use crate::memory::{AddressResolver, GuestMemory};
use crate::push::AttributePushBuffer;
use crate::regs::{DrawCommand, VertexStateSnapshot, VERTEX_ATTRIBUTE_COUNT};

bitflags! {
    /// Dirty-state tracking for the draw context.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GraphicsDirtyFlags: u32 {
        /// At least one attribute push buffer holds data.
        const PUSH_BUFFERS = 1 << 0;
    }
}

/// Draw shape resolved from the current draw clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDraw<'a> {
    /// Sequential fetch over the configured arrays.
    Array,
    /// Index-driven fetch; carries the raw index bytes backing the draw.
    Indexed { indices: &'a [u8] },
    /// Vertex data lives inline in the draw clause.
    InlinedArray,
}

/// Resolves vertex-input topology for each draw call.
#[derive(Debug, Default)]
pub struct VertexInputProcessor {
    push_buffers: [AttributePushBuffer; VERTEX_ATTRIBUTE_COUNT],
    element_push_buffer: Vec<u32>,
    dirty: GraphicsDirtyFlags,
}

impl VertexInputProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_buffer(&self, slot: usize) -> &AttributePushBuffer {
        &self.push_buffers[slot]
    }

    /// Classify every referenced slot and reconstruct the interleaved fetch
    /// topology for the current draw.
    ///
    /// `referenced_attributes` is the active vertex program's input mask;
    /// only slots both program-referenced and hardware-enabled are placed.
    /// Pushed slots are padded to the provoking slot's vertex count here,
    /// which is why this takes `&mut self`.
    pub fn resolve_input_layout(
        &mut self,
        state: &VertexStateSnapshot,
        referenced_attributes: u16,
        resolver: &dyn AddressResolver,
        layout: &mut VertexInputLayout,
    ) {
        let input_mask = state.attrib_input_mask & referenced_attributes;

        layout.clear();
        layout.attribute_mask = input_mask;

        if state.draw.command == DrawCommand::InlinedArray {
            self.resolve_inlined_layout(state, input_mask, layout);
            return;
        }

        for slot in 0..VERTEX_ATTRIBUTE_COUNT as u8 {
            if input_mask & (1 << slot) == 0 {
                continue;
            }

            if state.draw.is_immediate && state.draw.command != DrawCommand::Indexed {
                // Immediate rendering bypasses the array pointers entirely;
                // data comes from the push buffers or falls back to the
                // attribute registers.
                if self.push_buffers[usize::from(slot)].vertex_count() > 1 {
                    let provoking_count = self.push_buffers[0].vertex_count();
                    let buf = &mut self.push_buffers[usize::from(slot)];
                    buf.pad_to(provoking_count);
                    layout.push_regions.push(PushRegion {
                        slot,
                        byte_len: buf.byte_len(),
                    });
                    layout.placements[usize::from(slot)] = AttributePlacement::Transient;
                } else if state.attribute_registers[usize::from(slot)].size > 0 {
                    layout.referenced_registers.push(slot);
                    layout.placements[usize::from(slot)] = AttributePlacement::Transient;
                }
                continue;
            }

            let binding = &state.vertex_arrays[usize::from(slot)];
            if binding.size == 0 {
                if state.attribute_registers[usize::from(slot)].size > 0 {
                    layout.referenced_registers.push(slot);
                    layout.placements[usize::from(slot)] = AttributePlacement::Transient;
                }
                continue;
            }

            layout.placements[usize::from(slot)] = AttributePlacement::Persistent;

            let base_offset = binding.base_offset();
            let stride = u32::from(binding.stride);
            let modulo = state.frequency_divider_mask & (1 << slot) != 0;
            let entry = BlockEntry {
                slot,
                modulo,
                frequency: binding.frequency,
            };

            let mut fused = false;
            for block in &mut layout.blocks {
                if block.single_vertex {
                    continue;
                }
                if block.stride != stride {
                    continue;
                }

                if base_offset > block.base_offset {
                    if base_offset - block.base_offset > stride {
                        continue;
                    }
                } else {
                    if block.base_offset - base_offset > stride {
                        continue;
                    }
                    // The lowest observed address is the canonical base.
                    block.base_offset = base_offset;
                }

                block.entries.push(entry);
                block.interleaved = true;
                fused = true;
                break;
            }

            if !fused {
                let mut block = InterleavedBlock {
                    base_offset,
                    stride,
                    pool: binding.pool(),
                    entries: vec![entry],
                    ..Default::default()
                };
                if block.stride == 0 {
                    // Single element broadcast to every vertex.
                    block.single_vertex = true;
                    block.stride = binding.element_size();
                }
                layout.blocks.push(block);
            }
        }

        for block in &mut layout.blocks {
            let offset = state.vertex_data_base_offset.wrapping_add(block.base_offset);
            block.resolved_address = resolver.resolve(offset, block.pool);
        }

        trace!(
            mask = input_mask,
            blocks = layout.blocks.len(),
            registers = layout.referenced_registers.len(),
            pushed = layout.push_regions.len(),
            "resolved vertex input layout"
        );
    }

    /// Inlined draws pack every declared array field into one interleaved
    /// stream; stride accounting must include slots the program never reads
    /// since they still occupy space in the inline data.
    fn resolve_inlined_layout(
        &self,
        state: &VertexStateSnapshot,
        input_mask: u16,
        layout: &mut VertexInputLayout,
    ) {
        let mut block = InterleavedBlock {
            interleaved: true,
            ..Default::default()
        };

        for slot in 0..VERTEX_ATTRIBUTE_COUNT as u8 {
            let binding = &state.vertex_arrays[usize::from(slot)];
            if binding.size > 0 {
                block.stride += binding.element_size();
                block.entries.push(BlockEntry {
                    slot,
                    modulo: false,
                    frequency: 1,
                });
                if input_mask & (1 << slot) != 0 {
                    layout.placements[usize::from(slot)] = AttributePlacement::Transient;
                }
            } else if state.attribute_registers[usize::from(slot)].size > 0
                && input_mask & (1 << slot) != 0
            {
                layout.referenced_registers.push(slot);
                layout.placements[usize::from(slot)] = AttributePlacement::Transient;
            }
        }

        // At least one array feed must be live for the stream to exist.
        if block.stride != 0 {
            layout.blocks.push(block);
        }
    }

    /// Raw index bytes backing an indexed draw.
    ///
    /// Immediate-mode indices take priority over the configured guest index
    /// array; both are returned in hardware (big-endian) byte order. The
    /// guest array address is aligned down to the index size, as enforced by
    /// real hardware.
    pub fn raw_index_bytes<'a>(
        &'a self,
        state: &VertexStateSnapshot,
        mem: &'a dyn GuestMemory,
        resolver: &dyn AddressResolver,
    ) -> Result<&'a [u8], VertexFetchError> {
        if !self.element_push_buffer.is_empty() {
            return Ok(bytemuck::cast_slice(&self.element_push_buffer));
        }

        let type_size = state.index_type.size_bytes();
        let address = resolver.resolve(state.index_array_offset, state.index_array_pool)
            & 0u32.wrapping_sub(type_size);

        let first = state.draw.first;
        let count = state.draw.count;
        let bytes = mem.get(
            address.wrapping_add(first * type_size),
            (count * type_size) as usize,
        )?;
        Ok(bytes)
    }

    /// Map the current draw clause to one of the three draw shapes.
    ///
    /// Any other command kind is an unreachable protocol state and aborts
    /// the draw before any buffer is touched.
    pub fn classify_draw<'a>(
        &'a self,
        state: &VertexStateSnapshot,
        mem: &'a dyn GuestMemory,
        resolver: &dyn AddressResolver,
    ) -> Result<ResolvedDraw<'a>, VertexFetchError> {
        match state.draw.command {
            DrawCommand::Indexed => Ok(ResolvedDraw::Indexed {
                indices: self.raw_index_bytes(state, mem, resolver)?,
            }),
            DrawCommand::Array => Ok(ResolvedDraw::Array),
            DrawCommand::InlinedArray => Ok(ResolvedDraw::InlinedArray),
            other => Err(VertexFetchError::IllFormedDrawCommand(other)),
        }
    }

    /// Append one component word to a slot's push buffer.
    ///
    /// No-op when the slot is not hardware-enabled. The provoking slot's
    /// count of complete vertices decides which vertex the component lands
    /// in.
    pub fn push_vertex_component(
        &mut self,
        state: &VertexStateSnapshot,
        slot: u8,
        size: u8,
        sub_index: u32,
        base_type: VertexBaseType,
        value: u32,
    ) {
        if state.attrib_input_mask & (1 << slot) == 0 {
            return;
        }

        let vertex_id = self.push_buffers[0].current_vertex_id();
        self.push_buffers[usize::from(slot)].set_component(
            vertex_id, sub_index, base_type, size, value,
        );
        self.dirty |= GraphicsDirtyFlags::PUSH_BUFFERS;
    }

    /// Append one raw index to the element push buffer.
    ///
    /// Stored big-endian so the raw byte stream matches hardware order on
    /// any host.
    pub fn push_raw_index(&mut self, index: u32) {
        self.element_push_buffer.push(index.to_be());
    }

    /// Vertices accumulated on the provoking attribute.
    pub fn push_buffer_vertex_count(&self) -> u32 {
        self.push_buffers[0].vertex_count()
    }

    /// Indices accumulated in the element push buffer.
    pub fn push_buffer_index_count(&self) -> u32 {
        self.element_push_buffer.len() as u32
    }

    /// Reset push state at the start of a new submission.
    ///
    /// Per-slot buffers are only walked when something was pushed; the
    /// element buffer is always cleared.
    pub fn clear_push_buffers(&mut self) {
        if self.dirty.contains(GraphicsDirtyFlags::PUSH_BUFFERS) {
            for buf in &mut self.push_buffers {
                buf.clear();
            }
            self.dirty.remove(GraphicsDirtyFlags::PUSH_BUFFERS);
        }
        self.element_push_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{LinearAddressMap, VecGuestMemory};

    fn snapshot_with_mask(mask: u16) -> VertexStateSnapshot {
        VertexStateSnapshot {
            attrib_input_mask: mask,
            ..Default::default()
        }
    }

    #[test]
    fn pushes_to_disabled_slots_are_dropped() {
        let mut proc = VertexInputProcessor::new();
        let state = snapshot_with_mask(0b0001);

        proc.push_vertex_component(&state, 1, 4, 0, VertexBaseType::Float32, 42);
        assert_eq!(proc.push_buffer(1).vertex_count(), 0);
        assert_eq!(proc.dirty, GraphicsDirtyFlags::empty());

        proc.push_vertex_component(&state, 0, 4, 0, VertexBaseType::Float32, 42);
        assert_eq!(proc.push_buffer(0).vertex_count(), 1);
        assert!(proc.dirty.contains(GraphicsDirtyFlags::PUSH_BUFFERS));
    }

    #[test]
    fn clear_without_dirty_flag_skips_slot_buffers() {
        let mut proc = VertexInputProcessor::new();
        proc.push_raw_index(3);
        proc.clear_push_buffers();
        assert_eq!(proc.push_buffer_index_count(), 0);
    }

    #[test]
    fn raw_indices_are_big_endian() {
        let mut proc = VertexInputProcessor::new();
        proc.push_raw_index(0x0102_0304);

        let state = VertexStateSnapshot::default();
        let mem = VecGuestMemory::new(16);
        let map = LinearAddressMap::default();
        let bytes = proc.raw_index_bytes(&state, &mem, &map).unwrap();
        assert_eq!(bytes, &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn classify_faults_on_reset_draw_state() {
        let proc = VertexInputProcessor::new();
        let state = VertexStateSnapshot::default();
        let mem = VecGuestMemory::new(16);
        let map = LinearAddressMap::default();

        assert_eq!(
            proc.classify_draw(&state, &mem, &map),
            Err(VertexFetchError::IllFormedDrawCommand(DrawCommand::None))
        );
    }
}
