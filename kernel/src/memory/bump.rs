//! Fixed-arena bump allocator.
//!
//! Carves allocations off the front of a byte arena and never frees.
//! It exists for boot-time bookkeeping that lives forever, chiefly the
//! frame bitmap. Lifetimes tie every allocation to the arena, so tests
//! can run it over an ordinary `Vec` while the kernel hands it the
//! fixed heap window.

use core::mem;

/// Physical heap window the kernel arena occupies.
pub const HEAP_START: u32 = 0x20_0000;
pub const HEAP_SIZE: u32 = 0x10_0000;

/// Minimum alignment for untyped allocations.
pub const MIN_ALIGN: usize = 8;

pub struct BumpAllocator<'a> {
    arena: &'a mut [u8],
    used: usize,
}

impl<'a> BumpAllocator<'a> {
    pub fn new(arena: &'a mut [u8]) -> Self {
        Self { arena, used: 0 }
    }

    /// Take ownership of the raw heap window.
    ///
    /// # Safety
    ///
    /// `start..start + size` must be physical memory that is mapped,
    /// unused by anything else, and identity-addressable for the
    /// kernel's lifetime.
    #[cfg(target_arch = "x86")]
    pub unsafe fn from_raw(start: u32, size: u32) -> BumpAllocator<'static> {
        let arena =
            unsafe { core::slice::from_raw_parts_mut(start as usize as *mut u8, size as usize) };
        BumpAllocator::new(arena)
    }

    pub fn remaining(&self) -> usize {
        self.arena.len() - self.used
    }

    /// Allocate `size` bytes at `align` (which must be a power of two).
    /// Returns `None` when the arena cannot satisfy the request.
    pub fn alloc_bytes(&mut self, size: usize, align: usize) -> Option<&'a mut [u8]> {
        debug_assert!(align.is_power_of_two());
        let base = self.arena.as_ptr() as usize + self.used;
        let pad = base.wrapping_neg() & (align - 1);
        let start = self.used.checked_add(pad)?;
        let end = start.checked_add(size)?;
        if end > self.arena.len() {
            return None;
        }

        // Split the arena so the returned slice carries the arena
        // lifetime instead of borrowing self.
        let arena = mem::take(&mut self.arena);
        let (spent, rest) = arena.split_at_mut(end);
        self.arena = rest;
        self.used = 0;
        Some(&mut spent[start..])
    }

    /// Allocate a zeroed `u64` word array.
    pub fn alloc_words(&mut self, words: usize) -> Option<&'a mut [u64]> {
        let bytes = self.alloc_bytes(words * mem::size_of::<u64>(), mem::align_of::<u64>())?;
        bytes.fill(0);
        // Alignment and size were established above.
        let ptr = bytes.as_mut_ptr().cast::<u64>();
        Some(unsafe { core::slice::from_raw_parts_mut(ptr, words) })
    }
}
