use thiserror::Error;

use crate::memory::GuestMemoryError;
use crate::regs::DrawCommand;

/// Faults surfaced while resolving a draw's vertex inputs.
///
/// Protocol faults are fatal for the draw: they indicate a logic defect in
/// the upstream state decoder, not a transient condition, and are never
/// retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VertexFetchError {
    #[error("ill-formed draw command state: {0:?}")]
    IllFormedDrawCommand(DrawCommand),

    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
}
