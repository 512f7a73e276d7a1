//! Hardware component formats and the host-side sizes they decode to.

/// Component storage format of a vertex attribute.
///
/// Discriminants are the hardware format codes and are encoded verbatim into
/// the attribute descriptor words, so they must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VertexBaseType {
    /// Signed 16-bit, normalized to `[-1, 1]`.
    Snorm16 = 0,
    /// 32-bit float.
    Float32 = 1,
    /// 16-bit float.
    Float16 = 2,
    /// Unsigned 8-bit, normalized to `[0, 1]`.
    Unorm8 = 3,
    /// Signed 16-bit integer, not normalized.
    Sint16 = 4,
    /// Four components compressed into one 32-bit word, decoded as a single
    /// value.
    Cmp = 5,
    /// Unsigned 8-bit integer, not normalized.
    Uint8 = 6,
}

impl VertexBaseType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Snorm16,
            1 => Self::Float32,
            2 => Self::Float16,
            3 => Self::Unorm8,
            4 => Self::Sint16,
            5 => Self::Cmp,
            6 => Self::Uint8,
            _ => return None,
        })
    }
}

/// Host-side byte size of one element of `count` components.
///
/// Sub-dword component types with three components are padded out to four on
/// the host; compressed formats always occupy one dword.
pub fn host_type_size(base_type: VertexBaseType, count: u8) -> u32 {
    let count = u32::from(count);
    match base_type {
        VertexBaseType::Float32 => 4 * count,
        VertexBaseType::Snorm16 | VertexBaseType::Sint16 | VertexBaseType::Float16 => match count {
            3 | 4 => 8,
            n => 2 * n,
        },
        VertexBaseType::Unorm8 | VertexBaseType::Uint8 => match count {
            3 | 4 => 4,
            n => n,
        },
        VertexBaseType::Cmp => 4,
    }
}

/// Storage width of one index element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IndexType {
    #[default]
    U32 = 0,
    U16 = 1,
}

impl IndexType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::U32,
            1 => Self::U16,
            _ => return None,
        })
    }

    pub fn size_bytes(self) -> u32 {
        match self {
            Self::U32 => 4,
            Self::U16 => 2,
        }
    }
}

/// Which of the two guest address spaces a vertex array lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MemoryPool {
    /// GPU-local memory.
    #[default]
    Local = 0,
    /// Main (system) memory.
    Main = 1,
}

impl MemoryPool {
    /// Pool selected by bit 31 of a vertex array offset register.
    pub fn from_bit(bit: u32) -> Self {
        if bit & 1 != 0 {
            Self::Main
        } else {
            Self::Local
        }
    }
}
