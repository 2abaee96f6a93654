//! Boot-time memory map.
//!
//! The real-mode loader performs the BIOS E820 walk before entering
//! protected mode and leaves the results at a fixed physical address:
//! a 4-byte header whose first two bytes are the little-endian entry
//! count, followed by that many 24-byte entries. Only each entry's
//! 64-bit region length (at offset 8, stored as two 32-bit halves) is
//! consumed here; the kernel sizes its frame pool from the total.

use crate::memory::MemoryError;

/// Where the loader leaves the map.
pub const BOOT_MAP_ADDR: u32 = 0x8000;

const HEADER_SIZE: usize = 4;
const ENTRY_SIZE: usize = 24;
const LENGTH_OFFSET: usize = 8;

/// A parsed view over the loader's memory map bytes.
#[derive(Debug)]
pub struct BootMemoryMap<'a> {
    entries: &'a [u8],
    count: usize,
}

impl<'a> BootMemoryMap<'a> {
    /// Parse the header and validate that every advertised entry is
    /// actually present in `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, MemoryError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MemoryError::TruncatedMemoryMap {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let count = usize::from(u16::from_le_bytes([bytes[0], bytes[1]]));
        let needed = HEADER_SIZE + count * ENTRY_SIZE;
        if bytes.len() < needed {
            return Err(MemoryError::TruncatedMemoryMap {
                expected: needed,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            entries: &bytes[HEADER_SIZE..needed],
            count,
        })
    }

    /// View the map the loader left at [`BOOT_MAP_ADDR`].
    ///
    /// # Safety
    ///
    /// Only valid on the target machine after the loader has run; the
    /// fixed address must hold a well-formed map that nothing else
    /// mutates while the view is alive.
    #[cfg(target_arch = "x86")]
    pub unsafe fn from_fixed() -> Result<Self, MemoryError> {
        let header = unsafe { core::slice::from_raw_parts(BOOT_MAP_ADDR as *const u8, HEADER_SIZE) };
        let count = usize::from(u16::from_le_bytes([header[0], header[1]]));
        let len = HEADER_SIZE + count * ENTRY_SIZE;
        let bytes = unsafe { core::slice::from_raw_parts(BOOT_MAP_ADDR as *const u8, len) };
        Self::parse(bytes)
    }

    pub fn entry_count(&self) -> usize {
        self.count
    }

    /// 64-bit byte length of entry `index`, assembled from its two
    /// little-endian 32-bit halves.
    pub fn region_length(&self, index: usize) -> u64 {
        let base = index * ENTRY_SIZE + LENGTH_OFFSET;
        let low = u32::from_le_bytes(self.entries[base..base + 4].try_into().unwrap());
        let high = u32::from_le_bytes(self.entries[base + 4..base + 8].try_into().unwrap());
        u64::from(low) | (u64::from(high) << 32)
    }

    /// Sum of every region's length. The frame pool is sized from this
    /// figure, so regions the firmware reports as reserved still count;
    /// the loader filters those before writing the map.
    pub fn total_bytes(&self) -> u64 {
        (0..self.count).map(|i| self.region_length(i)).sum()
    }
}
