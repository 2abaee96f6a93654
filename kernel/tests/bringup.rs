//! End-to-end exercises across subsystem boundaries: boot map to frame
//! pool to address space, and gate installation to interrupt dispatch.

use ferrite_kernel::arch::gdt::selectors;
use ferrite_kernel::arch::idt::Idt;
use ferrite_kernel::arch::pic::{PIC1_COMMAND, PIC2_COMMAND};
use ferrite_kernel::arch::port::PortBus;
use ferrite_kernel::memory::address::{PAGE_SIZE, PhysAddr, VirtAddr};
use ferrite_kernel::memory::bootmap::BootMemoryMap;
use ferrite_kernel::memory::bump::BumpAllocator;
use ferrite_kernel::memory::pmm::{DATA_START, FrameAllocator};
use ferrite_kernel::memory::vmm::{AddressSpace, PageFlags, PhysMapper};
use ferrite_kernel::traps::dispatch::{IrqTable, dispatch_irq};
use ferrite_kernel::traps::{
    IRQ_BASE, IRQ_LINES, InterruptHandler, TrapFrame, VectorStubs, install_vectors,
};

const HEADER_SIZE: usize = 4;
const ENTRY_SIZE: usize = 24;

fn boot_map_bytes(region_lengths: &[u64]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_SIZE + region_lengths.len() * ENTRY_SIZE];
    bytes[..2].copy_from_slice(&(region_lengths.len() as u16).to_le_bytes());
    for (i, &len) in region_lengths.iter().enumerate() {
        let base = HEADER_SIZE + i * ENTRY_SIZE + 8;
        bytes[base..base + 4].copy_from_slice(&((len & 0xFFFF_FFFF) as u32).to_le_bytes());
        bytes[base + 4..base + 8].copy_from_slice(&((len >> 32) as u32).to_le_bytes());
    }
    bytes
}

/// Boot map to frame pool to live page tables, the way `memory::init`
/// wires them, but with the frames living in a leaked heap arena.
#[test]
fn memory_pipeline_maps_and_walks() {
    let frames = 64usize;
    let page = PAGE_SIZE as usize;

    let arena: &'static mut [u8] = Box::leak(vec![0u8; (frames + 1) * page].into_boxed_slice());
    let aligned = (arena.as_mut_ptr() as usize + page - 1) & !(page - 1);
    let mapper = PhysMapper::with_offset(aligned as isize - DATA_START as isize);

    let storage: &'static mut [u8] = Box::leak(vec![0u8; 4096].into_boxed_slice());
    let mut bump = BumpAllocator::new(storage);

    let bytes = boot_map_bytes(&[32 * PAGE_SIZE as u64, 32 * PAGE_SIZE as u64]);
    let map = BootMemoryMap::parse(&bytes).unwrap();
    assert_eq!(map.total_bytes(), 64 * u64::from(PAGE_SIZE));

    let mut pmm = FrameAllocator::new(&map, &mut bump, DATA_START).unwrap();
    assert_eq!(pmm.frame_count(), frames);

    let mut space = AddressSpace::create(&mut pmm, mapper).unwrap();
    space.identity_map_low(&mut pmm).unwrap();

    // Map a handful of kernel pages above the identity window.
    let mut mapped = Vec::new();
    for i in 0..8u32 {
        let virt = VirtAddr::new(0xC000_0000 + i * PAGE_SIZE);
        let phys = pmm.allocate().unwrap();
        space
            .map(virt, phys, PageFlags::PRESENT | PageFlags::WRITABLE, &mut pmm)
            .unwrap();
        mapped.push((virt, phys));
    }

    for (virt, phys) in mapped {
        let entry = space.lookup(virt).unwrap();
        assert_eq!(entry.frame_addr(), phys);
        assert!(entry.is_present());
        // Every frame the tables reference is accounted for in the pool.
        assert!(pmm.is_allocated(phys));
    }

    // The identity window resolves to itself.
    let entry = space.lookup(VirtAddr::new(0xB8000)).unwrap();
    assert_eq!(entry.frame_addr(), PhysAddr::new(0xB8000));
}

struct CountingHandler(std::sync::atomic::AtomicUsize);

impl InterruptHandler for CountingHandler {
    fn handle(&self, _frame: &TrapFrame) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

#[derive(Default)]
struct RecordingBus {
    writes: Vec<(u16, u8)>,
}

impl PortBus for RecordingBus {
    fn write(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
    fn read(&mut self, _port: u16) -> u8 {
        0
    }
}

/// Gate installation plus dispatch plus acknowledgement, as one flow.
#[test]
fn installed_lines_dispatch_and_acknowledge() {
    static HANDLER: CountingHandler = CountingHandler(std::sync::atomic::AtomicUsize::new(0));

    let mut stubs = VectorStubs {
        exceptions: [0; 32],
        irqs: [0; IRQ_LINES],
        syscall: 0,
        syscall_alt: 0,
    };
    for (i, slot) in stubs.irqs.iter_mut().enumerate() {
        *slot = 0x0010_0000 + i as u32 * 8;
    }

    let mut idt = Idt::new();
    install_vectors(&mut idt, selectors::KERNEL_CODE, &stubs);

    let mut table = IrqTable::new();
    table.bind(1, &HANDLER);
    table.bind(12, &HANDLER);

    for irq in [1u8, 12] {
        let vector = IRQ_BASE + irq;
        let gate = idt.entry(vector);
        assert!(!gate.is_missing());
        assert_eq!(gate.offset(), 0x0010_0000 + u32::from(irq) * 8);

        let frame = TrapFrame::synthetic(u32::from(vector));
        let mut bus = RecordingBus::default();
        dispatch_irq(table.handler(irq), irq, &frame, &mut bus);

        if irq >= 8 {
            assert_eq!(bus.writes, vec![(PIC2_COMMAND, 0x20), (PIC1_COMMAND, 0x20)]);
        } else {
            assert_eq!(bus.writes, vec![(PIC1_COMMAND, 0x20)]);
        }
    }
    assert_eq!(HANDLER.0.load(std::sync::atomic::Ordering::Relaxed), 2);
}
