//! Physical frame allocator.
//!
//! One bit per 4 KiB frame, packed into `u64` words: set means in use.
//! Allocation is first-fit from frame 0, so freed low frames are reused
//! before the pool grows upward. The bitmap itself lives in storage
//! carved from the boot bump arena.

use crate::memory::MemoryError;
use crate::memory::address::{PAGE_SIZE, PhysAddr};
use crate::memory::bootmap::BootMemoryMap;
use crate::memory::bump::BumpAllocator;

/// First physical address handed out as a frame. Everything below is
/// kernel image, boot bookkeeping and the bump heap.
pub const DATA_START: u32 = 0x50_0000;

const BITS_PER_WORD: usize = 64;

pub struct FrameAllocator<'bitmap> {
    bitmap: &'bitmap mut [u64],
    frame_count: usize,
    free_frames: usize,
    data_start: u32,
    /// Lowest word that may contain a clear bit. Moves forward as low
    /// words fill and snaps back on free, so the scan stays first-fit
    /// without rereading known-full words.
    search_hint: usize,
}

impl<'bitmap> FrameAllocator<'bitmap> {
    /// Size the frame pool from the boot memory map and carve the
    /// bitmap out of `bump`.
    pub fn new(
        map: &BootMemoryMap<'_>,
        bump: &mut BumpAllocator<'bitmap>,
        data_start: u32,
    ) -> Result<Self, MemoryError> {
        let total = map.total_bytes();
        let frame_count = (total / u64::from(PAGE_SIZE)) as usize;
        let words = frame_count.div_ceil(BITS_PER_WORD);
        let bitmap = bump
            .alloc_words(words)
            .ok_or(MemoryError::BitmapStorage { words })?;
        Ok(Self {
            bitmap,
            frame_count,
            free_frames: frame_count,
            data_start,
            search_hint: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn free_frames(&self) -> usize {
        self.free_frames
    }

    fn frame_index(&self, frame: PhysAddr) -> usize {
        debug_assert!(frame.is_page_aligned());
        debug_assert!(frame.as_u32() >= self.data_start);
        ((frame.as_u32() - self.data_start) / PAGE_SIZE) as usize
    }

    fn frame_addr(&self, index: usize) -> PhysAddr {
        PhysAddr::new(self.data_start + index as u32 * PAGE_SIZE)
    }

    pub fn is_allocated(&self, frame: PhysAddr) -> bool {
        let index = self.frame_index(frame);
        self.bitmap[index / BITS_PER_WORD] & (1 << (index % BITS_PER_WORD)) != 0
    }

    /// Claim the lowest free frame.
    pub fn allocate(&mut self) -> Result<PhysAddr, MemoryError> {
        for word_index in self.search_hint..self.bitmap.len() {
            let word = self.bitmap[word_index];
            if word == u64::MAX {
                continue;
            }
            let bit = word.trailing_ones() as usize;
            let index = word_index * BITS_PER_WORD + bit;
            if index >= self.frame_count {
                break;
            }
            self.bitmap[word_index] = word | (1 << bit);
            self.free_frames -= 1;
            self.search_hint = word_index;
            return Ok(self.frame_addr(index));
        }
        Err(MemoryError::OutOfFrames)
    }

    /// Return a frame to the pool. Freeing an unallocated frame is a
    /// caller bug; debug builds trap it.
    pub fn free(&mut self, frame: PhysAddr) {
        let index = self.frame_index(frame);
        debug_assert!(index < self.frame_count);
        let word = index / BITS_PER_WORD;
        let mask = 1u64 << (index % BITS_PER_WORD);
        debug_assert!(self.bitmap[word] & mask != 0, "double free of {frame}");
        self.bitmap[word] &= !mask;
        self.free_frames += 1;
        self.search_hint = self.search_hint.min(word);
    }
}
