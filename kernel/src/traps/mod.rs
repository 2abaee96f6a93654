//! Trap handling: IDT population, exception reporting and the hardware
//! interrupt registry.

pub mod dispatch;
pub mod frame;
pub mod stubs;

pub use dispatch::{InterruptHandler, bind, unbind};
pub use frame::TrapFrame;

use crate::arch::idt::{GATE_INTERRUPT, Idt};

/// First vector the remapped PIC delivers on.
pub const IRQ_BASE: u8 = 32;
/// Hardware lines across both PIC controllers.
pub const IRQ_LINES: usize = 16;
/// Primary software-interrupt vector (`int 0x80`).
pub const SYSCALL_VECTOR: u8 = 0x80;
/// Secondary software-interrupt vector kept open for the same purpose.
pub const SYSCALL_ALT_VECTOR: u8 = 0xB1;

/// Human-readable names for the 32 CPU exception vectors. Everything
/// from 19 up is architecturally reserved.
pub const EXCEPTION_MESSAGES: [&str; 32] = [
    "Division By Zero",
    "Debug",
    "Non Maskable Interrupt",
    "Breakpoint",
    "Into Detected Overflow",
    "Out of Bounds",
    "Invalid Opcode",
    "No Coprocessor",
    "Double fault",
    "Coprocessor Segment Overrun",
    "Bad TSS",
    "Segment not present",
    "Stack fault",
    "General protection fault",
    "Page fault",
    "Unknown Interrupt",
    "Coprocessor Fault",
    "Alignment Fault",
    "Machine Check",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
];

/// Name for an exception vector, tolerating out-of-range input.
pub fn exception_message(vector: usize) -> &'static str {
    EXCEPTION_MESSAGES.get(vector).copied().unwrap_or("Reserved")
}

/// Entry-stub addresses for every vector the kernel installs.
///
/// Built from the real stubs on target hardware; tests construct one
/// with synthetic addresses to check gate population without linking
/// the assembly.
pub struct VectorStubs {
    pub exceptions: [u32; 32],
    pub irqs: [u32; IRQ_LINES],
    pub syscall: u32,
    pub syscall_alt: u32,
}

/// Populate `idt` with every vector the kernel services: the 32 CPU
/// exceptions, the 16 remapped hardware lines and the two software
/// interrupt vectors. All gates share `selector` and the standard
/// present ring-0 interrupt-gate attributes.
pub fn install_vectors(idt: &mut Idt, selector: u16, stubs: &VectorStubs) {
    for (vector, &handler) in stubs.exceptions.iter().enumerate() {
        idt.set_gate(vector as u8, handler, selector, GATE_INTERRUPT);
    }
    for (line, &handler) in stubs.irqs.iter().enumerate() {
        idt.set_gate(IRQ_BASE + line as u8, handler, selector, GATE_INTERRUPT);
    }
    idt.set_gate(SYSCALL_VECTOR, stubs.syscall, selector, GATE_INTERRUPT);
    idt.set_gate(SYSCALL_ALT_VECTOR, stubs.syscall_alt, selector, GATE_INTERRUPT);
}

/// The system interrupt descriptor table. Built once during [`init`],
/// then only read by the CPU.
#[cfg(target_arch = "x86")]
static IDT: spin::Mutex<Idt> = spin::Mutex::new(Idt::new());

/// Remap the interrupt controllers, install every vector and hand the
/// table to the CPU. Interrupts stay disabled; the caller enables them
/// once the rest of bring-up is done.
#[cfg(target_arch = "x86")]
pub fn init() {
    use crate::arch::gdt::selectors;
    use crate::arch::port::IoPorts;
    use crate::arch::{idt, pic};

    pic::remap(&mut IoPorts);

    let mut table = IDT.lock();
    install_vectors(&mut table, selectors::KERNEL_CODE, &stubs::vector_stubs());
    // The table lives in a static, so the descriptor stays valid after
    // the guard drops.
    unsafe { table.load() };

    log::info!("idt: {} vectors installed", idt::IDT_ENTRIES);
}

/// Deliberately raise vector 0, proving the whole trap path (stub,
/// dispatcher, report) end to end. Never returns.
#[cfg(target_arch = "x86")]
pub fn divide_by_zero_selftest() -> ! {
    unsafe {
        core::arch::asm!(
            "mov eax, 1",
            "xor edx, edx",
            "xor ecx, ecx",
            "div ecx",
            options(noreturn)
        );
    }
}
