//! Global Descriptor Table.
//!
//! Flat memory model: four overlapping 4 GiB code/data segments (one pair
//! per privilege level) plus the mandatory null descriptor and one TSS
//! descriptor. Six entries, fixed at build time; the table never grows.
//!
//! A malformed descriptor here is not a recoverable error; the CPU triple
//! faults the moment it loads one. Correctness is guaranteed by
//! construction (the `init` sequence below and its unit tests), never by
//! runtime checks.

use crate::arch::tss::TaskStateSegment;

/// Number of descriptors. Index 0 is the null descriptor.
pub const SEGMENT_COUNT: usize = 6;

/// Segment selectors, i.e. byte offsets into the table.
pub mod selectors {
    pub const KERNEL_CODE: u16 = 0x08;
    pub const KERNEL_DATA: u16 = 0x10;
    pub const USER_CODE: u16 = 0x18;
    pub const USER_DATA: u16 = 0x20;
    pub const TSS: u16 = 0x28;
    /// Requested-privilege-level bits for ring-3 selectors.
    pub const RPL_USER: u16 = 0x3;
}

/// One 8-byte segment descriptor in the CPU-mandated split layout:
/// limit 16+4 bits, base 16+8+8 bits, access byte, flags nibble.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct SegmentDescriptor {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    /// Low nibble: limit bits 16-19. High nibble: granularity/size flags.
    granularity: u8,
    base_high: u8,
}

impl SegmentDescriptor {
    pub const NULL: Self = Self {
        limit_low: 0,
        base_low: 0,
        base_mid: 0,
        access: 0,
        granularity: 0,
        base_high: 0,
    };

    pub const fn new(base: u32, limit: u32, access: u8, granularity: u8) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access,
            granularity: (((limit >> 16) & 0x0F) as u8) | (granularity & 0xF0),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }

    /// Reassembled 32-bit base.
    pub fn base(&self) -> u32 {
        u32::from(self.base_low)
            | (u32::from(self.base_mid) << 16)
            | (u32::from(self.base_high) << 24)
    }

    /// Reassembled 20-bit limit.
    pub fn limit(&self) -> u32 {
        u32::from(self.limit_low) | (u32::from(self.granularity & 0x0F) << 16)
    }

    pub fn access(&self) -> u8 {
        self.access
    }

    /// The granularity/size flag nibble (high four bits).
    pub fn flags(&self) -> u8 {
        self.granularity & 0xF0
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// Descriptor table plus the task-state record it describes.
///
/// Owned state: callers hold one instance (the kernel keeps a single
/// locked static) and every operation goes through it explicitly.
pub struct Gdt {
    entries: [SegmentDescriptor; SEGMENT_COUNT],
    tss: TaskStateSegment,
}

impl Gdt {
    pub const fn new() -> Self {
        Self {
            entries: [SegmentDescriptor::NULL; SEGMENT_COUNT],
            tss: TaskStateSegment::new(),
        }
    }

    /// Write all fields of descriptor `index`. Rewriting an index fully
    /// overwrites it. `index` must be below [`SEGMENT_COUNT`]; the table
    /// is fixed-size by hardware contract, not bounds-negotiated.
    pub fn set_segment(&mut self, index: usize, base: u32, limit: u32, access: u8, granularity: u8) {
        self.entries[index] = SegmentDescriptor::new(base, limit, access, granularity);
    }

    /// Zero-fill the task-state record, install the ring-0 stack pair and
    /// ring-3 segment defaults, and register its descriptor at `index`.
    pub fn write_task_state(&mut self, index: usize, ss0: u16, esp0: u32) {
        let base = core::ptr::from_ref(&self.tss) as usize as u32;
        let limit = base + core::mem::size_of::<TaskStateSegment>() as u32;

        // 0xE9: present, DPL 3, 32-bit available TSS. Byte granularity.
        self.set_segment(index, base, limit, 0xE9, 0x00);

        self.tss = TaskStateSegment::new();
        self.tss.ss0 = u32::from(ss0);
        self.tss.esp0 = esp0;

        // Ring-3 compatible selectors so an eventual privilege transition
        // lands on sane segments.
        self.tss.cs = u32::from(selectors::KERNEL_CODE | selectors::RPL_USER);
        let data = u32::from(selectors::KERNEL_DATA | selectors::RPL_USER);
        self.tss.ss = data;
        self.tss.ds = data;
        self.tss.es = data;
        self.tss.fs = data;
        self.tss.gs = data;
    }

    /// Build the six live descriptors: null, kernel code/data (ring 0),
    /// user code/data (ring 3), TSS. All flat 0..4 GiB, page granular.
    pub fn init(&mut self) {
        self.set_segment(0, 0, 0, 0, 0);
        self.set_segment(1, 0, 0xFFFF_FFFF, 0x9A, 0xCF); // kernel code
        self.set_segment(2, 0, 0xFFFF_FFFF, 0x92, 0xCF); // kernel data
        self.set_segment(3, 0, 0xFFFF_FFFF, 0xFA, 0xCF); // user code
        self.set_segment(4, 0, 0xFFFF_FFFF, 0xF2, 0xCF); // user data
        self.write_task_state(5, selectors::KERNEL_DATA, 0x0);
    }

    pub fn entry(&self, index: usize) -> SegmentDescriptor {
        self.entries[index]
    }

    pub fn task_state(&self) -> &TaskStateSegment {
        &self.tss
    }

    /// Load the table into GDTR, reload the segment registers, and load
    /// the task register.
    ///
    /// # Safety
    ///
    /// `self` must stay at a stable address for the rest of the kernel's
    /// lifetime (the CPU keeps reading it), and the entries built by
    /// [`Gdt::init`] must be in place.
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&self) {
        #[repr(C, packed)]
        struct GdtPointer {
            limit: u16,
            base: u32,
        }

        let ptr = GdtPointer {
            limit: (core::mem::size_of::<[SegmentDescriptor; SEGMENT_COUNT]>() - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        };

        unsafe {
            core::arch::asm!(
                "lgdt [{}]",
                in(reg) &ptr,
                options(readonly, nostack, preserves_flags)
            );

            // Reload CS with a far return, then the data segments.
            core::arch::asm!(
                "push {code}",
                "lea {tmp}, [2f]",
                "push {tmp}",
                "retf",
                "2:",
                "mov ds, {data:x}",
                "mov es, {data:x}",
                "mov fs, {data:x}",
                "mov gs, {data:x}",
                "mov ss, {data:x}",
                code = in(reg) u32::from(selectors::KERNEL_CODE),
                data = in(reg) u32::from(selectors::KERNEL_DATA),
                tmp = out(reg) _,
            );

            core::arch::asm!(
                "ltr {0:x}",
                in(reg) selectors::TSS,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

impl Default for Gdt {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel's descriptor table. Mutated only during bring-up.
static GDT: spin::Mutex<Gdt> = spin::Mutex::new(Gdt::new());

/// Build and activate the kernel GDT and TSS.
#[cfg(target_arch = "x86")]
pub fn init() {
    let mut gdt = GDT.lock();
    gdt.init();
    // SAFETY: the table lives in a static, so its address is stable.
    unsafe {
        gdt.load();
    }
    log::info!("GDT loaded ({} descriptors, TSS at ring 0)", SEGMENT_COUNT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built() -> Gdt {
        let mut gdt = Gdt::new();
        gdt.init();
        gdt
    }

    #[test]
    fn init_populates_exactly_six_descriptors() {
        let gdt = built();
        assert!(gdt.entry(0).is_null());
        for i in 1..SEGMENT_COUNT {
            assert!(!gdt.entry(i).is_null(), "entry {i} should be populated");
        }
    }

    #[test]
    fn access_bytes_match_privilege_layout() {
        let gdt = built();
        assert_eq!(gdt.entry(1).access(), 0x9A);
        assert_eq!(gdt.entry(2).access(), 0x92);
        assert_eq!(gdt.entry(3).access(), 0xFA);
        assert_eq!(gdt.entry(4).access(), 0xF2);
        assert_eq!(gdt.entry(5).access(), 0xE9);
    }

    #[test]
    fn flat_segments_span_the_full_address_space() {
        let gdt = built();
        for i in 1..=4 {
            let d = gdt.entry(i);
            assert_eq!(d.base(), 0);
            assert_eq!(d.limit(), 0xF_FFFF);
            assert_eq!(d.flags(), 0xC0, "4 KiB granularity + 32-bit size");
        }
    }

    #[test]
    fn set_segment_splits_base_across_three_fields() {
        let mut gdt = Gdt::new();
        gdt.set_segment(1, 0xAABB_CCDD, 0x12345, 0x9A, 0xC0);
        let d = gdt.entry(1);
        assert_eq!(d.base(), 0xAABB_CCDD);
        assert_eq!(d.limit(), 0x12345 & 0xF_FFFF);
    }

    #[test]
    fn rewriting_an_index_fully_overwrites_it() {
        let mut gdt = Gdt::new();
        gdt.set_segment(2, 0xFFFF_FFFF, 0xF_FFFF, 0xFF, 0xF0);
        gdt.set_segment(2, 0, 0xFFFF_FFFF, 0x92, 0xCF);
        let d = gdt.entry(2);
        assert_eq!(d.base(), 0);
        assert_eq!(d.access(), 0x92);
    }

    #[test]
    fn task_state_points_at_owned_record() {
        // Built in place: the descriptor records the record's address, so
        // the table must not move between init and the assertion.
        let mut gdt = Gdt::new();
        gdt.init();
        let d = gdt.entry(5);
        let base = core::ptr::from_ref(gdt.task_state()) as usize as u32;
        assert_eq!(d.base(), base);
        // Byte granularity for the TSS descriptor.
        assert_eq!(d.flags(), 0x00);
    }

    #[test]
    fn task_state_stack_and_segment_defaults() {
        let gdt = built();
        let tss = gdt.task_state();
        assert_eq!({ tss.ss0 }, u32::from(selectors::KERNEL_DATA));
        assert_eq!({ tss.esp0 }, 0);
        assert_eq!({ tss.cs }, 0x08 | 0x3);
        for sel in [{ tss.ss }, { tss.ds }, { tss.es }, { tss.fs }, { tss.gs }] {
            assert_eq!(sel, 0x10 | 0x3);
        }
        // Everything else stays zero-filled.
        assert_eq!({ tss.link }, 0);
        assert_eq!({ tss.eip }, 0);
        assert_eq!({ tss.iopb }, 0);
    }
}
