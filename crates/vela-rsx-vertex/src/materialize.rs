//! Vertex data materialization.
//!
//! Fills the two destination streams the renderer consumes alongside the
//! descriptor table: the transient stream (pushed/register/inline data) and
//! the persistent stream (interleaved guest arrays, copied through the
//! external bulk-copy service). Stream layout matches the offset allocation
//! in [`crate::descriptor`] exactly.

use crate::error::VertexFetchError;
use crate::layout::VertexInputLayout;
use crate::memory::BulkCopy;
use crate::processor::VertexInputProcessor;
use crate::regs::{DrawCommand, VertexStateSnapshot};

impl VertexInputProcessor {
    /// Copy the draw's vertex bytes into the destination buffers.
    ///
    /// Either destination may be `None`, in which case that stream is
    /// skipped. Inlined draws write registers followed by the verbatim
    /// inline payload and have no persistent stream.
    ///
    /// # Panics
    ///
    /// Panics if a provided destination is smaller than the stream computed
    /// from `layout` — sizing is derivable by the caller from the same
    /// offset arithmetic the descriptor writer uses, so an undersized buffer
    /// is a caller bug rather than a recoverable fault.
    pub fn materialize_vertex_data(
        &self,
        state: &VertexStateSnapshot,
        layout: &VertexInputLayout,
        first_vertex: u32,
        vertex_count: u32,
        persistent: Option<&mut [u8]>,
        transient: Option<&mut [u8]>,
        bulk: &dyn BulkCopy,
    ) -> Result<(), VertexFetchError> {
        if let Some(out) = transient {
            let mut cursor = 0usize;

            if state.draw.command == DrawCommand::InlinedArray {
                for &slot in &layout.referenced_registers {
                    let reg = &state.attribute_registers[usize::from(slot)];
                    out[cursor..cursor + 16].copy_from_slice(bytemuck::cast_slice(&reg.data));
                    cursor += 16;
                }

                let payload: &[u8] = bytemuck::cast_slice(&state.draw.inline_data);
                out[cursor..cursor + payload.len()].copy_from_slice(payload);
            } else {
                // Push buffers first, then register data; same order as the
                // descriptor offsets.
                if state.draw.is_immediate {
                    for region in &layout.push_regions {
                        let words = self.push_buffer(usize::from(region.slot)).data();
                        let bytes: &[u8] = bytemuck::cast_slice(words);
                        let len = region.byte_len as usize;
                        out[cursor..cursor + len].copy_from_slice(&bytes[..len]);
                        cursor += len;
                    }
                }

                for &slot in &layout.referenced_registers {
                    let reg = &state.attribute_registers[usize::from(slot)];
                    out[cursor..cursor + 16].copy_from_slice(bytemuck::cast_slice(&reg.data));
                    cursor += 16;
                }
            }
        }

        if state.draw.command == DrawCommand::InlinedArray {
            return Ok(());
        }

        if let Some(out) = persistent {
            let mut cursor = 0usize;
            for block in &layout.blocks {
                let (required_first, required_count) =
                    block.required_range(first_vertex, vertex_count);
                let len = (required_count * block.stride) as usize;
                let source = block
                    .resolved_address
                    .wrapping_add(required_first * block.stride);
                bulk.copy(&mut out[cursor..cursor + len], source, len)?;
                cursor += len;
            }
        }

        Ok(())
    }
}
