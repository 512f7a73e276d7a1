//! Packed per-attribute descriptor emission.
//!
//! Each referenced slot gets one 64-bit descriptor, written as two 32-bit
//! words. The layout is a binary contract with the downstream renderer and
//! must be reproduced bit-exactly:
//!
//! | word | bits  | field |
//! |------|-------|-------|
//! | w0   | 0–7   | source byte stride (0 for non-strided register fetch) |
//! | w0   | 8–23  | fetch frequency (1 = per-vertex default) |
//! | w0   | 24–26 | component format code |
//! | w0   | 27–29 | component count |
//! | w0   | 30–31 | reserved |
//! | w1   | 0–28  | destination byte offset in the upload buffer |
//! | w1   | 29    | byte-swap-required flag |
//! | w1   | 30    | volatile/transient-source flag |
//! | w1   | 31    | modulo-wrap-enabled flag |

use crate::format::{host_type_size, VertexBaseType};
use crate::layout::{AttributePlacement, VertexInputLayout};
use crate::processor::VertexInputProcessor;
use crate::regs::{DrawCommand, VertexStateSnapshot, VERTEX_ATTRIBUTE_COUNT};

/// Words per attribute descriptor.
pub const ATTRIBUTE_DESCRIPTOR_WORDS: usize = 2;
/// Words in a full descriptor table.
pub const DESCRIPTOR_TABLE_WORDS: usize = VERTEX_ATTRIBUTE_COUNT * ATTRIBUTE_DESCRIPTOR_WORDS;

const DEFAULT_FREQUENCY: u32 = 1 << 8;
const SWAP_BYTES: u32 = 1 << 29;
const VOLATILE_SOURCE: u32 = 1 << 30;
const MODULO_FREQUENCY: u32 = 1 << 31;

impl VertexInputProcessor {
    /// Emit one descriptor per referenced slot into `table`.
    ///
    /// Destination offsets are allocated in a fixed order that the
    /// materializer reproduces: push-buffer regions first, then referenced
    /// registers (16 bytes each), then either the inlined block's fields in
    /// declaration order or each persistent block's required byte range.
    /// Slots outside `referenced_attributes`, and referenced slots with no
    /// placement, get all-zero descriptors.
    #[allow(clippy::too_many_arguments)]
    pub fn write_attribute_descriptors(
        &self,
        state: &VertexStateSnapshot,
        layout: &VertexInputLayout,
        referenced_attributes: u16,
        first_vertex: u32,
        vertex_count: u32,
        persistent_offset_base: u32,
        volatile_offset_base: u32,
        table: &mut [u32; DESCRIPTOR_TABLE_WORDS],
    ) {
        let mut offset_in_block = [0u32; VERTEX_ATTRIBUTE_COUNT];
        let mut volatile_offset = volatile_offset_base;
        let mut persistent_offset = persistent_offset_base;

        // Transient data is always laid out push buffers first, then
        // register data.
        if state.draw.is_immediate {
            for region in &layout.push_regions {
                offset_in_block[usize::from(region.slot)] = volatile_offset;
                volatile_offset += region.byte_len;
            }
        }

        for &slot in &layout.referenced_registers {
            offset_in_block[usize::from(slot)] = volatile_offset;
            volatile_offset += 16;
        }

        if state.draw.command == DrawCommand::InlinedArray {
            if let Some(block) = layout.blocks.first() {
                let mut inline_offset = volatile_offset;
                for entry in &block.entries {
                    let binding = &state.vertex_arrays[usize::from(entry.slot)];
                    offset_in_block[usize::from(entry.slot)] = inline_offset;
                    inline_offset += binding.element_size();
                }
            }
        } else {
            for block in &layout.blocks {
                for entry in &block.entries {
                    let local = state.vertex_arrays[usize::from(entry.slot)].base_offset();
                    offset_in_block[usize::from(entry.slot)] =
                        persistent_offset + (local - block.base_offset);
                }
                let (_, required_count) = block.required_range(first_vertex, vertex_count);
                persistent_offset += block.stride * required_count;
            }
        }

        let modulo_mask = state.frequency_divider_mask;
        let max_index = (first_vertex + vertex_count) - 1;

        for slot in 0..VERTEX_ATTRIBUTE_COUNT {
            let words = slot * ATTRIBUTE_DESCRIPTOR_WORDS;

            if referenced_attributes & (1 << slot) == 0
                || layout.placements[slot] == AttributePlacement::None
            {
                table[words] = 0;
                table[words + 1] = 0;
                continue;
            }

            let base_type;
            let mut size;
            let mut w0;
            let mut w1 = 0u32;

            if layout.placements[slot] == AttributePlacement::Transient {
                if state.draw.command == DrawCommand::InlinedArray {
                    let binding = &state.vertex_arrays[slot];
                    if binding.size == 0 {
                        // Register source.
                        let reg = &state.attribute_registers[slot];
                        base_type = reg.base_type;
                        size = u32::from(reg.size);
                        w0 = host_type_size(reg.base_type, reg.size);
                    } else {
                        // Inline array field; strided at the block's packed
                        // stride.
                        base_type = binding.base_type;
                        size = u32::from(binding.size);
                        let stride = layout.blocks.first().map_or(0, |b| b.stride);
                        w0 = stride | DEFAULT_FREQUENCY;
                    }
                } else if state.draw.is_immediate && self.push_buffer(slot).vertex_count() > 1 {
                    // Pushed data overrides register input.
                    let buf = self.push_buffer(slot);
                    base_type = buf.base_type();
                    size = u32::from(buf.size());
                    w0 = host_type_size(buf.base_type(), buf.size()) | DEFAULT_FREQUENCY;
                } else {
                    let reg = &state.attribute_registers[slot];
                    base_type = reg.base_type;
                    size = u32::from(reg.size);
                    w0 = host_type_size(reg.base_type, reg.size);
                }

                w1 |= VOLATILE_SOURCE;
            } else {
                let binding = &state.vertex_arrays[slot];
                base_type = binding.base_type;
                size = u32::from(binding.size);

                let stride = u32::from(binding.stride);
                w0 = stride;

                // Zero stride is a single broadcast element, not an array;
                // it carries no frequency bits.
                if stride > 0 {
                    match binding.frequency {
                        0 | 1 => w0 |= DEFAULT_FREQUENCY,
                        frequency => {
                            let frequency = u32::from(frequency);
                            if modulo_mask & (1 << slot) != 0 {
                                if max_index >= frequency {
                                    // The rendered range actually wraps, so
                                    // the modulo cost is warranted.
                                    w0 |= frequency << 8;
                                    w1 |= MODULO_FREQUENCY;
                                } else {
                                    w0 |= DEFAULT_FREQUENCY;
                                }
                            } else {
                                // Plain divisor fetch.
                                w0 |= frequency << 8;
                            }
                        }
                    }
                }
            }

            // Compressed formats pack four components into one decoded value.
            if base_type == VertexBaseType::Cmp {
                size = 1;
            }

            // Guest data arrives big-endian, so the swap flag is always set.
            w1 |= SWAP_BYTES;
            w0 |= (base_type as u32) << 24;
            w0 |= size << 27;
            w1 |= offset_in_block[slot];

            table[words] = w0;
            table[words + 1] = w1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinearAddressMap;
    use crate::regs::{DrawClause, VertexArrayBinding};

    fn array_state(mask: u16) -> VertexStateSnapshot {
        VertexStateSnapshot {
            attrib_input_mask: mask,
            draw: DrawClause {
                command: DrawCommand::Array,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn resolve(
        proc: &mut VertexInputProcessor,
        state: &VertexStateSnapshot,
        referenced: u16,
    ) -> VertexInputLayout {
        let mut layout = VertexInputLayout::new();
        proc.resolve_input_layout(state, referenced, &LinearAddressMap::default(), &mut layout);
        layout
    }

    #[test]
    fn register_descriptor_has_no_stride_or_frequency() {
        let mut state = array_state(0b0001);
        state.attribute_registers[0].size = 4;
        state.attribute_registers[0].base_type = VertexBaseType::Float32;

        let mut proc = VertexInputProcessor::new();
        let layout = resolve(&mut proc, &state, 0b0001);

        let mut table = [0u32; DESCRIPTOR_TABLE_WORDS];
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 4, 0, 0, &mut table);

        let w0 = table[0];
        let w1 = table[1];
        assert_eq!(w0 & 0xff, 16, "register fetch reports the element size");
        assert_eq!((w0 >> 8) & 0xffff, 0, "no frequency bits");
        assert_eq!((w0 >> 24) & 0x7, VertexBaseType::Float32 as u32);
        assert_eq!((w0 >> 27) & 0x7, 4);
        assert_ne!(w1 & VOLATILE_SOURCE, 0);
        assert_ne!(w1 & SWAP_BYTES, 0);
    }

    #[test]
    fn modulo_falls_back_when_range_never_wraps() {
        let mut state = array_state(0b0001);
        state.vertex_arrays[0] = VertexArrayBinding {
            offset: 0x100,
            stride: 8,
            size: 2,
            base_type: VertexBaseType::Float32,
            frequency: 6,
        };
        state.frequency_divider_mask = 0b0001;

        let mut proc = VertexInputProcessor::new();
        let layout = resolve(&mut proc, &state, 0b0001);

        // Max index 5 = frequency - 1: never wraps.
        let mut table = [0u32; DESCRIPTOR_TABLE_WORDS];
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 6, 0, 0, &mut table);
        assert_eq!((table[0] >> 8) & 0xffff, 1, "plain per-vertex frequency");
        assert_eq!(table[1] & MODULO_FREQUENCY, 0);

        // Max index 6 reaches the frequency: wraps.
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 7, 0, 0, &mut table);
        assert_eq!((table[0] >> 8) & 0xffff, 6);
        assert_ne!(table[1] & MODULO_FREQUENCY, 0);
    }

    #[test]
    fn divisor_without_modulo_keeps_frequency_field() {
        let mut state = array_state(0b0001);
        state.vertex_arrays[0] = VertexArrayBinding {
            offset: 0,
            stride: 4,
            size: 1,
            base_type: VertexBaseType::Float32,
            frequency: 3,
        };

        let mut proc = VertexInputProcessor::new();
        let layout = resolve(&mut proc, &state, 0b0001);

        let mut table = [0u32; DESCRIPTOR_TABLE_WORDS];
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 100, 0, 0, &mut table);
        assert_eq!((table[0] >> 8) & 0xffff, 3);
        assert_eq!(table[1] & MODULO_FREQUENCY, 0);
    }

    #[test]
    fn compressed_formats_report_one_component() {
        let mut state = array_state(0b0001);
        state.vertex_arrays[0] = VertexArrayBinding {
            offset: 0,
            stride: 4,
            size: 4,
            base_type: VertexBaseType::Cmp,
            frequency: 1,
        };

        let mut proc = VertexInputProcessor::new();
        let layout = resolve(&mut proc, &state, 0b0001);

        let mut table = [0u32; DESCRIPTOR_TABLE_WORDS];
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 4, 0, 0, &mut table);
        assert_eq!((table[0] >> 27) & 0x7, 1);
        assert_eq!((table[0] >> 24) & 0x7, VertexBaseType::Cmp as u32);
    }

    #[test]
    fn unreferenced_slots_are_zeroed() {
        let state = array_state(0b0011);
        let mut proc = VertexInputProcessor::new();
        let layout = resolve(&mut proc, &state, 0b0001);

        let mut table = [0xffff_ffffu32; DESCRIPTOR_TABLE_WORDS];
        proc.write_attribute_descriptors(&state, &layout, 0b0001, 0, 1, 0, 0, &mut table);
        for slot in 0..VERTEX_ATTRIBUTE_COUNT {
            assert_eq!(table[slot * 2], 0, "slot {slot} w0");
            assert_eq!(table[slot * 2 + 1], 0, "slot {slot} w1");
        }
    }
}
