//! Two-level virtual memory manager.
//!
//! Classic 32-bit paging: a 1024-entry page directory of 1024-entry
//! page tables, 4 KiB pages. Page tables are allocated lazily from the
//! frame pool on the first mapping that needs them. All page-table
//! memory is reached through a [`PhysMapper`], which is an identity
//! translation on hardware and an arena offset under test.

use bitflags::bitflags;

use crate::memory::MemoryError;
use crate::memory::address::{PhysAddr, VirtAddr};
use crate::memory::pmm::FrameAllocator;

bitflags! {
    /// Low 12 bits of a directory or table entry.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct PageFlags: u32 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const CACHE_DISABLE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
    }
}

/// One 32-bit paging entry: 20-bit frame address plus flag bits.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageEntry(u32);

impl PageEntry {
    pub const ABSENT: Self = Self(0);

    pub fn new(frame: PhysAddr, flags: PageFlags) -> Self {
        Self((frame.as_u32() & 0xFFFF_F000) | (flags.bits() & 0xFFF))
    }

    pub fn frame_addr(self) -> PhysAddr {
        PhysAddr::new(self.0 & 0xFFFF_F000)
    }

    pub fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0 & 0xFFF)
    }

    pub fn is_present(self) -> bool {
        self.flags().contains(PageFlags::PRESENT)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A page directory or page table: 1024 entries, page-aligned.
#[repr(C, align(4096))]
pub struct PageTable {
    pub entries: [PageEntry; 1024],
}

impl PageTable {
    pub fn zero(&mut self) {
        self.entries.fill(PageEntry::ABSENT);
    }
}

/// Translation from a physical frame address to a pointer the kernel
/// can dereference.
///
/// On hardware the low memory holding page tables is identity mapped,
/// so the translation is the identity. Tests back frames with a heap
/// arena and use the arena's offset instead.
#[derive(Clone, Copy)]
pub struct PhysMapper {
    offset: isize,
}

impl PhysMapper {
    pub const IDENTITY: Self = Self { offset: 0 };

    /// A mapper that adds `offset` to every physical address.
    pub const fn with_offset(offset: isize) -> Self {
        Self { offset }
    }

    /// # Safety
    ///
    /// `phys` must name a live, exclusively-owned page table reachable
    /// at `phys + offset`.
    unsafe fn table(&self, phys: PhysAddr) -> *mut PageTable {
        (phys.as_u32() as isize + self.offset) as *mut PageTable
    }
}

/// One address space: a page directory plus the translation used to
/// walk it.
pub struct AddressSpace {
    directory: PhysAddr,
    mapper: PhysMapper,
}

impl AddressSpace {
    /// Allocate and zero a fresh page directory.
    pub fn create(
        frames: &mut FrameAllocator<'_>,
        mapper: PhysMapper,
    ) -> Result<Self, MemoryError> {
        let directory = frames.allocate()?;
        unsafe { (*mapper.table(directory)).zero() };
        Ok(Self { directory, mapper })
    }

    pub fn directory_addr(&self) -> PhysAddr {
        self.directory
    }

    /// Map `virt` to `phys` with `flags`, allocating the intermediate
    /// page table if this is the first mapping in its 4 MiB window.
    ///
    /// Remapping an already-mapped page silently overwrites the entry;
    /// the previously referenced frame is not reclaimed.
    pub fn map(
        &mut self,
        virt: VirtAddr,
        phys: PhysAddr,
        flags: PageFlags,
        frames: &mut FrameAllocator<'_>,
    ) -> Result<(), MemoryError> {
        let dir = unsafe { &mut *self.mapper.table(self.directory) };
        let dir_entry = &mut dir.entries[virt.directory_index()];

        let table_addr = if dir_entry.is_present() {
            dir_entry.frame_addr()
        } else {
            let frame = frames.allocate()?;
            unsafe { (*self.mapper.table(frame)).zero() };
            // Directory entries stay permissive; per-page flags do the
            // real access control.
            *dir_entry = PageEntry::new(frame, PageFlags::PRESENT | PageFlags::WRITABLE);
            frame
        };

        let table = unsafe { &mut *self.mapper.table(table_addr) };
        table.entries[virt.table_index()] = PageEntry::new(phys, flags);
        Ok(())
    }

    /// Walk the tables for `virt`. Returns `None` when the directory
    /// slot is absent or the leaf entry is empty.
    pub fn lookup(&self, virt: VirtAddr) -> Option<PageEntry> {
        let dir = unsafe { &*self.mapper.table(self.directory) };
        let dir_entry = dir.entries[virt.directory_index()];
        if !dir_entry.is_present() {
            return None;
        }
        let table = unsafe { &*self.mapper.table(dir_entry.frame_addr()) };
        let entry = table.entries[virt.table_index()];
        if entry == PageEntry::ABSENT {
            return None;
        }
        Some(entry)
    }

    /// Identity-map the first megabyte so the kernel image, the VGA
    /// window and the boot bookkeeping stay reachable once paging is
    /// on.
    pub fn identity_map_low(&mut self, frames: &mut FrameAllocator<'_>) -> Result<(), MemoryError> {
        for page in 0..256u32 {
            let addr = page * crate::memory::address::PAGE_SIZE;
            self.map(
                VirtAddr::new(addr),
                PhysAddr::new(addr),
                PageFlags::PRESENT | PageFlags::WRITABLE,
                frames,
            )?;
        }
        Ok(())
    }

    /// Point CR3 at this directory and set the paging bit.
    ///
    /// # Safety
    ///
    /// The directory must identity-map every address the kernel touches
    /// from the instruction after the CR0 write onwards, and the mapper
    /// must be the identity.
    #[cfg(target_arch = "x86")]
    pub unsafe fn activate(&self) {
        unsafe {
            core::arch::asm!(
                "mov cr3, {dir}",
                "mov {tmp}, cr0",
                "or {tmp}, 0x80000000",
                "mov cr0, {tmp}",
                dir = in(reg) self.directory.as_u32(),
                tmp = out(reg) _,
                options(nostack)
            );
        }
    }
}
