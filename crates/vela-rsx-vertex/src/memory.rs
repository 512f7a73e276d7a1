//! Guest memory collaborators.
//!
//! This core performs no address translation of its own: the emulator shell
//! provides an [`AddressResolver`] that maps pool-relative offsets to
//! absolute guest addresses, a [`GuestMemory`] for byte-addressable reads,
//! and a [`BulkCopy`] service for the persistent-stream uploads. The trait
//! surface is intentionally small so it can be implemented by both native
//! memory systems and test fixtures.

use thiserror::Error;

use crate::format::MemoryPool;

/// Failed guest memory access.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("guest memory access out of bounds: address=0x{address:08x}, len=0x{len:x}")]
pub struct GuestMemoryError {
    pub address: u32,
    pub len: usize,
}

/// Byte-addressable view of guest memory after address resolution.
pub trait GuestMemory {
    fn read(&self, address: u32, dst: &mut [u8]) -> Result<(), GuestMemoryError>;

    /// Borrow `len` bytes starting at `address`.
    fn get(&self, address: u32, len: usize) -> Result<&[u8], GuestMemoryError>;
}

/// Maps a pool-relative offset to an absolute guest address.
pub trait AddressResolver {
    fn resolve(&self, offset: u32, pool: MemoryPool) -> u32;
}

/// External bulk-copy service used for persistent vertex uploads.
///
/// The implementation may overlap copies internally, but from this core's
/// point of view `copy` is synchronous: the destination is fully populated
/// when the call returns.
pub trait BulkCopy {
    fn copy(&self, dst: &mut [u8], source: u32, len: usize) -> Result<(), GuestMemoryError>;
}

/// Simple contiguous in-memory guest RAM implementation for tests.
#[derive(Debug, Clone)]
pub struct VecGuestMemory {
    mem: Vec<u8>,
}

impl VecGuestMemory {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            mem: vec![0u8; size_bytes],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mem
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), GuestMemoryError> {
        let start = address as usize;
        let end = start.checked_add(data.len()).ok_or(GuestMemoryError {
            address,
            len: data.len(),
        })?;
        let slice = self.mem.get_mut(start..end).ok_or(GuestMemoryError {
            address,
            len: data.len(),
        })?;
        slice.copy_from_slice(data);
        Ok(())
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&self, address: u32, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        dst.copy_from_slice(self.get(address, dst.len())?);
        Ok(())
    }

    fn get(&self, address: u32, len: usize) -> Result<&[u8], GuestMemoryError> {
        let start = address as usize;
        let end = start
            .checked_add(len)
            .ok_or(GuestMemoryError { address, len })?;
        self.mem
            .get(start..end)
            .ok_or(GuestMemoryError { address, len })
    }
}

impl BulkCopy for VecGuestMemory {
    fn copy(&self, dst: &mut [u8], source: u32, len: usize) -> Result<(), GuestMemoryError> {
        dst[..len].copy_from_slice(self.get(source, len)?);
        Ok(())
    }
}

/// Address resolver with a fixed linear base per pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearAddressMap {
    pub local_base: u32,
    pub main_base: u32,
}

impl AddressResolver for LinearAddressMap {
    fn resolve(&self, offset: u32, pool: MemoryPool) -> u32 {
        let base = match pool {
            MemoryPool::Local => self.local_base,
            MemoryPool::Main => self.main_base,
        };
        base.wrapping_add(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_fail() {
        let mem = VecGuestMemory::new(16);
        assert!(mem.get(0, 16).is_ok());
        assert_eq!(
            mem.get(8, 16),
            Err(GuestMemoryError {
                address: 8,
                len: 16
            })
        );
    }

    #[test]
    fn linear_map_distinguishes_pools() {
        let map = LinearAddressMap {
            local_base: 0x1000,
            main_base: 0x8000,
        };
        assert_eq!(map.resolve(0x10, MemoryPool::Local), 0x1010);
        assert_eq!(map.resolve(0x10, MemoryPool::Main), 0x8010);
    }
}
