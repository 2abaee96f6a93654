//! Memory management: boot map parsing, the boot bump arena, the
//! physical frame pool and the virtual memory manager.

pub mod address;
pub mod bootmap;
pub mod bump;
pub mod pmm;
pub mod vmm;

use core::fmt;

use crate::sync::SpinLock;
use pmm::FrameAllocator;
use vmm::AddressSpace;

pub use address::{PAGE_SIZE, PhysAddr, VirtAddr};

/// Failures the memory subsystem can report.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemoryError {
    /// The loader's memory map advertises more entries than are present.
    TruncatedMemoryMap { expected: usize, actual: usize },
    /// The bump arena could not hold the frame bitmap.
    BitmapStorage { words: usize },
    /// Every physical frame is in use.
    OutOfFrames,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedMemoryMap { expected, actual } => write!(
                f,
                "boot memory map truncated: need {expected} bytes, have {actual}"
            ),
            Self::BitmapStorage { words } => {
                write!(f, "bump arena cannot hold {words}-word frame bitmap")
            }
            Self::OutOfFrames => write!(f, "out of physical frames"),
        }
    }
}

/// The system frame pool. `None` until [`init`] runs.
static FRAMES: SpinLock<Option<FrameAllocator<'static>>> = SpinLock::new(None);

/// The kernel address space, once paging is up.
static KERNEL_SPACE: SpinLock<Option<AddressSpace>> = SpinLock::new(None);

/// Run `f` against the frame pool. Panics if called before [`init`].
pub fn with_frame_allocator<R>(f: impl FnOnce(&mut FrameAllocator<'static>) -> R) -> R {
    let mut guard = FRAMES.lock();
    let frames = guard.as_mut().expect("frame allocator not initialized");
    f(frames)
}

/// Claim one frame from the system pool.
pub fn allocate_frame() -> Result<PhysAddr, MemoryError> {
    with_frame_allocator(|frames| frames.allocate())
}

/// Return one frame to the system pool.
pub fn free_frame(frame: PhysAddr) {
    with_frame_allocator(|frames| frames.free(frame));
}

/// Map a kernel page. Panics if called before [`init`].
pub fn map_kernel_page(
    virt: VirtAddr,
    phys: PhysAddr,
    flags: vmm::PageFlags,
) -> Result<(), MemoryError> {
    let mut space = KERNEL_SPACE.lock();
    let space = space.as_mut().expect("kernel address space not initialized");
    with_frame_allocator(|frames| space.map(virt, phys, flags, frames))
}

/// Bring up the whole memory subsystem: parse the loader's map, carve
/// the bump arena, build the frame pool, construct the kernel address
/// space with the first megabyte identity mapped, and turn paging on.
///
/// # Safety
///
/// Single call, early in boot, before anything else touches the heap
/// window or the boot map. Interrupts must be disabled.
#[cfg(target_arch = "x86")]
pub unsafe fn init() -> Result<(), MemoryError> {
    use bump::{BumpAllocator, HEAP_SIZE, HEAP_START};
    use vmm::PhysMapper;

    let map = unsafe { bootmap::BootMemoryMap::from_fixed()? };
    let mut bump = unsafe { BumpAllocator::from_raw(HEAP_START, HEAP_SIZE) };
    let mut frames = FrameAllocator::new(&map, &mut bump, pmm::DATA_START)?;
    log::info!(
        "pmm: {} frames ({} MiB) managed from {:#010X}",
        frames.frame_count(),
        frames.frame_count() / 256,
        pmm::DATA_START
    );

    let mut space = AddressSpace::create(&mut frames, PhysMapper::IDENTITY)?;
    space.identity_map_low(&mut frames)?;
    unsafe { space.activate() };
    log::info!("vmm: paging enabled, directory at {}", space.directory_addr());

    *FRAMES.lock() = Some(frames);
    *KERNEL_SPACE.lock() = Some(space);
    Ok(())
}
