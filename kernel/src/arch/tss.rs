//! 32-bit Task State Segment.
//!
//! On a single-task protected-mode kernel the TSS exists for exactly one
//! reason: when an interrupt arrives in ring 3, the CPU pulls the ring-0
//! stack (`ss0:esp0`) from here before pushing the trap frame. The record
//! is owned by the GDT builder, which also registers its descriptor.

/// The hardware TSS layout. Every field is CPU-mandated; most are unused
/// by this kernel and stay zero.
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct TaskStateSegment {
    /// Selector of the previous task's TSS. Unused (no hardware task
    /// switching), always zero.
    pub link: u32,
    /// Ring-0 stack pointer loaded on a privilege transition.
    pub esp0: u32,
    /// Ring-0 stack segment selector.
    pub ss0: u32,
    pub esp1: u32,
    pub ss1: u32,
    pub esp2: u32,
    pub ss2: u32,
    pub cr3: u32,
    pub eip: u32,
    pub eflags: u32,
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub es: u32,
    pub cs: u32,
    pub ss: u32,
    pub ds: u32,
    pub fs: u32,
    pub gs: u32,
    pub ldtr: u32,
    /// I/O permission bitmap base. Zero means "at the segment limit",
    /// i.e. no bitmap.
    pub iopb: u32,
    /// Shadow stack pointer (CET). Unused.
    pub ssp: u32,
}

impl TaskStateSegment {
    /// A fully zeroed record.
    pub const fn new() -> Self {
        Self {
            link: 0,
            esp0: 0,
            ss0: 0,
            esp1: 0,
            ss1: 0,
            esp2: 0,
            ss2: 0,
            cr3: 0,
            eip: 0,
            eflags: 0,
            eax: 0,
            ecx: 0,
            edx: 0,
            ebx: 0,
            esp: 0,
            ebp: 0,
            esi: 0,
            edi: 0,
            es: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ldtr: 0,
            iopb: 0,
            ssp: 0,
        }
    }
}

impl Default for TaskStateSegment {
    fn default() -> Self {
        Self::new()
    }
}
