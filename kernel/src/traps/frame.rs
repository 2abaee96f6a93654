//! The register snapshot pushed by the interrupt entry stubs.

/// Everything the dispatch glue saves on every trap, in stack order
/// (lowest address first). The layout must match the push sequence in
/// `stubs.rs` exactly; the stubs hand the dispatcher a pointer to the
/// top of this block.
///
/// Handlers receive the frame read-only. Its storage is the interrupted
/// context's stack and is reused on the next trap, so a handler must
/// never retain the reference beyond its own execution.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct TrapFrame {
    /// Page-fault linear address (CR2), captured on every trap; only
    /// meaningful for vector 14.
    pub cr2: u32,
    /// Data segment selector of the interrupted context.
    pub ds: u32,
    // PUSHA block.
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// ESP value saved by PUSHA (points into this frame, not the
    /// pre-trap stack).
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    /// Vector number pushed by the stub.
    pub vector: u32,
    /// Hardware error code, or the stub's 0 filler for vectors where the
    /// CPU pushes none.
    pub error_code: u32,
    // Pushed by the CPU on the trap itself.
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    /// Pre-trap stack pointer; only pushed by the CPU on a privilege
    /// change.
    pub user_esp: u32,
    pub ss: u32,
}

impl TrapFrame {
    /// A zeroed frame with the given vector. Test scaffolding; real
    /// frames are built by hardware plus the entry stubs.
    pub fn synthetic(vector: u32) -> Self {
        Self {
            cr2: 0,
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            vector,
            error_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
            user_esp: 0,
            ss: 0,
        }
    }
}
