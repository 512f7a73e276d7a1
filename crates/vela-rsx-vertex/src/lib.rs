//! Vertex-input resolution for the RSX fixed-function draw pipeline.
//!
//! Real hardware fetched vertex attributes from independently configured
//! array streams, a bank of constant register attributes, and optional
//! immediate-mode pushes, silently merging array streams with compatible
//! address/stride relationships into single interleaved regions. This crate
//! reconstructs that fetch topology from the register state before every
//! draw:
//!
//! - [`VertexInputProcessor::resolve_input_layout`] classifies each slot and
//!   groups array-backed slots into [`InterleavedBlock`]s.
//! - [`VertexInputProcessor::classify_draw`] maps the draw clause to one of
//!   the three draw shapes, resolving index data for indexed draws.
//! - [`VertexInputProcessor::write_attribute_descriptors`] emits the packed
//!   per-attribute descriptor table consumed by the renderer.
//! - [`VertexInputProcessor::materialize_vertex_data`] copies the actual
//!   vertex bytes into the transient/persistent destination streams.
//!
//! Command-stream decoding, address translation, rendering, and bulk-copy
//! execution are external collaborators reached through the [`GuestMemory`],
//! [`AddressResolver`], and [`BulkCopy`] traits. All resolution runs on the
//! single thread owning register state; nothing here is internally
//! synchronized.

#![forbid(unsafe_code)]

mod descriptor;
mod error;
mod format;
mod layout;
mod materialize;
mod memory;
mod processor;
mod push;
mod regs;

pub use descriptor::{ATTRIBUTE_DESCRIPTOR_WORDS, DESCRIPTOR_TABLE_WORDS};
pub use error::VertexFetchError;
pub use format::{host_type_size, IndexType, MemoryPool, VertexBaseType};
pub use layout::{
    AttributePlacement, BlockEntry, InterleavedBlock, PushRegion, VertexInputLayout,
};
pub use memory::{
    AddressResolver, BulkCopy, GuestMemory, GuestMemoryError, LinearAddressMap, VecGuestMemory,
};
pub use processor::{GraphicsDirtyFlags, ResolvedDraw, VertexInputProcessor};
pub use push::AttributePushBuffer;
pub use regs::{
    AttributeRegister, DrawClause, DrawCommand, VertexArrayBinding, VertexStateSnapshot,
    VERTEX_ATTRIBUTE_COUNT, VERTEX_OFFSET_MASK,
};
