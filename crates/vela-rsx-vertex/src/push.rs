//! Immediate-mode vertex data accumulation.
//!
//! Each attribute slot owns one buffer of raw component words. Slot 0 is the
//! provoking attribute: its count of fully pushed vertices decides which
//! vertex an incoming component belongs to, and every other slot is padded
//! up to its count before the data is consumed.

use crate::format::VertexBaseType;

/// Per-slot accumulator for software-pushed vertex components.
#[derive(Debug, Clone)]
pub struct AttributePushBuffer {
    base_type: VertexBaseType,
    size: u8,
    vertex_count: u32,
    data: Vec<u32>,
}

impl Default for AttributePushBuffer {
    fn default() -> Self {
        Self {
            base_type: VertexBaseType::Float32,
            size: 0,
            vertex_count: 0,
            data: Vec::new(),
        }
    }
}

impl AttributePushBuffer {
    pub fn base_type(&self) -> VertexBaseType {
        self.base_type
    }

    /// Component count per vertex.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Vertices accumulated so far (including partially written ones).
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Raw accumulated words, one per pushed component.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn byte_len(&self) -> u32 {
        (self.data.len() * core::mem::size_of::<u32>()) as u32
    }

    fn words_per_vertex(&self) -> usize {
        usize::from(self.size)
    }

    /// Index of the vertex the next pushed component lands in.
    ///
    /// Only meaningful on the provoking slot: a vertex is complete once all
    /// of its component words have been written.
    pub(crate) fn current_vertex_id(&self) -> u32 {
        let words = self.words_per_vertex();
        if words == 0 {
            0
        } else {
            (self.data.len() / words) as u32
        }
    }

    /// Write one component word of vertex `vertex_id`.
    ///
    /// Reconfiguring the slot's format or component count restarts
    /// accumulation; holes left by out-of-order sub-indices stay zero.
    pub(crate) fn set_component(
        &mut self,
        vertex_id: u32,
        sub_index: u32,
        base_type: VertexBaseType,
        size: u8,
        value: u32,
    ) {
        if self.base_type != base_type || self.size != size {
            self.data.clear();
            self.vertex_count = 0;
            self.base_type = base_type;
            self.size = size;
        }
        if self.size == 0 {
            return;
        }

        let index = vertex_id as usize * self.words_per_vertex() + sub_index as usize;
        if index >= self.data.len() {
            self.data.resize(index + 1, 0);
        }
        self.data[index] = value;
        self.vertex_count = self.vertex_count.max(vertex_id + 1);
    }

    /// Grow to `count` vertices by duplicating the last complete vertex.
    ///
    /// Never shrinks. An empty buffer pads with zeroes.
    pub(crate) fn pad_to(&mut self, count: u32) {
        let words = self.words_per_vertex();
        if words == 0 || self.vertex_count >= count {
            return;
        }

        // Normalize a partially written final vertex first.
        self.data.resize(self.vertex_count as usize * words, 0);

        if self.vertex_count == 0 {
            self.data.resize(count as usize * words, 0);
        } else {
            let last_start = (self.vertex_count as usize - 1) * words;
            for _ in self.vertex_count..count {
                for i in 0..words {
                    let value = self.data[last_start + i];
                    self.data.push(value);
                }
            }
        }
        self.vertex_count = count;
    }

    pub(crate) fn clear(&mut self) {
        self.base_type = VertexBaseType::Float32;
        self.size = 0;
        self.vertex_count = 0;
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_accumulate_into_vertices() {
        let mut buf = AttributePushBuffer::default();
        for vertex in 0..3u32 {
            for sub in 0..4u32 {
                buf.set_component(vertex, sub, VertexBaseType::Float32, 4, vertex * 10 + sub);
            }
        }
        assert_eq!(buf.vertex_count(), 3);
        assert_eq!(buf.byte_len(), 3 * 4 * 4);
        assert_eq!(buf.data()[4], 10);
        assert_eq!(buf.current_vertex_id(), 3);
    }

    #[test]
    fn partial_vertex_does_not_advance_vertex_id() {
        let mut buf = AttributePushBuffer::default();
        buf.set_component(0, 0, VertexBaseType::Float32, 4, 1);
        buf.set_component(0, 1, VertexBaseType::Float32, 4, 2);
        assert_eq!(buf.current_vertex_id(), 0);
        buf.set_component(0, 2, VertexBaseType::Float32, 4, 3);
        buf.set_component(0, 3, VertexBaseType::Float32, 4, 4);
        assert_eq!(buf.current_vertex_id(), 1);
    }

    #[test]
    fn reconfiguration_restarts_accumulation() {
        let mut buf = AttributePushBuffer::default();
        buf.set_component(0, 0, VertexBaseType::Float32, 2, 7);
        buf.set_component(0, 1, VertexBaseType::Float32, 2, 8);
        assert_eq!(buf.vertex_count(), 1);

        buf.set_component(0, 0, VertexBaseType::Unorm8, 4, 9);
        assert_eq!(buf.base_type(), VertexBaseType::Unorm8);
        assert_eq!(buf.size(), 4);
        assert_eq!(buf.vertex_count(), 1);
        assert_eq!(buf.data(), &[9]);
    }

    #[test]
    fn pad_duplicates_last_vertex() {
        let mut buf = AttributePushBuffer::default();
        for sub in 0..2u32 {
            buf.set_component(0, sub, VertexBaseType::Float32, 2, 100 + sub);
        }
        buf.pad_to(3);
        assert_eq!(buf.vertex_count(), 3);
        assert_eq!(buf.data(), &[100, 101, 100, 101, 100, 101]);

        // Never shrinks.
        buf.pad_to(1);
        assert_eq!(buf.vertex_count(), 3);
    }

    #[test]
    fn pad_after_clear_is_noop() {
        let mut buf = AttributePushBuffer::default();
        buf.set_component(0, 0, VertexBaseType::Float32, 2, 5);
        buf.clear();
        // A cleared buffer has no layout to pad with.
        buf.pad_to(2);
        assert_eq!(buf.vertex_count(), 0);
        assert!(buf.data().is_empty());
    }
}
