//! Typed physical and virtual addresses.
//!
//! Plain `u32`s invite mixing the two spaces; the newtypes keep the
//! paging code honest at zero runtime cost.

use core::fmt;

/// Bytes per page and per physical frame.
pub const PAGE_SIZE: u32 = 4096;

/// A 32-bit physical address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(u32);

impl PhysAddr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }
}

/// A 32-bit virtual (linear) address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(u32);

impl VirtAddr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Top 10 bits: index into the page directory.
    pub const fn directory_index(self) -> usize {
        (self.0 >> 22) as usize
    }

    /// Middle 10 bits: index into the page table.
    pub const fn table_index(self) -> usize {
        ((self.0 >> 12) & 0x3FF) as usize
    }

    /// Low 12 bits: offset within the page.
    pub const fn page_offset(self) -> u32 {
        self.0 & 0xFFF
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#010X})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010X})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_address_splits_10_10_12() {
        let v = VirtAddr::new(0xC07F_E123);
        assert_eq!(v.directory_index(), 0xC07F_E123 >> 22);
        assert_eq!(v.table_index(), (0xC07F_E123 >> 12) & 0x3FF);
        assert_eq!(v.page_offset(), 0x123);
    }

    #[test]
    fn alignment_check() {
        assert!(PhysAddr::new(0x50_0000).is_page_aligned());
        assert!(!PhysAddr::new(0x50_0004).is_page_aligned());
    }
}
