//! Interrupt entry stubs.
//!
//! The CPU delivers a trap with only eip/cs/eflags (and sometimes an
//! error code) on the stack. These stubs normalize every vector to the
//! same [`TrapFrame`] layout: push a 0 filler where the CPU pushed no
//! error code, push the vector number, save the register file and CR2,
//! switch to kernel data segments, and call the common dispatcher with a
//! pointer to the frame.
//!
//! [`TrapFrame`]: crate::traps::frame::TrapFrame

#[cfg(target_arch = "x86")]
use crate::traps::VectorStubs;

#[cfg(target_arch = "x86")]
core::arch::global_asm!(
    r#"
.macro isr_no_err num
    .global isr\num
isr\num:
    push 0
    push \num
    jmp trap_common
.endm

.macro isr_err num
    .global isr\num
isr\num:
    push \num
    jmp trap_common
.endm

.macro irq_stub num, vector
    .global irq\num
irq\num:
    push 0
    push \vector
    jmp irq_common
.endm

// Vectors 8, 10-14 and 17 carry a hardware error code; the rest get a
// 0 filler so the frame layout is uniform.
isr_no_err 0
isr_no_err 1
isr_no_err 2
isr_no_err 3
isr_no_err 4
isr_no_err 5
isr_no_err 6
isr_no_err 7
isr_err    8
isr_no_err 9
isr_err    10
isr_err    11
isr_err    12
isr_err    13
isr_err    14
isr_no_err 15
isr_no_err 16
isr_err    17
isr_no_err 18
isr_no_err 19
isr_no_err 20
isr_no_err 21
isr_no_err 22
isr_no_err 23
isr_no_err 24
isr_no_err 25
isr_no_err 26
isr_no_err 27
isr_no_err 28
isr_no_err 29
isr_no_err 30
isr_no_err 31
isr_no_err 128
isr_no_err 177

irq_stub 0, 32
irq_stub 1, 33
irq_stub 2, 34
irq_stub 3, 35
irq_stub 4, 36
irq_stub 5, 37
irq_stub 6, 38
irq_stub 7, 39
irq_stub 8, 40
irq_stub 9, 41
irq_stub 10, 42
irq_stub 11, 43
irq_stub 12, 44
irq_stub 13, 45
irq_stub 14, 46
irq_stub 15, 47

// Shared tail: build the TrapFrame, call the Rust dispatcher, unwind.
.macro trap_body handler
    pusha
    mov eax, ds
    push eax
    mov eax, cr2
    push eax

    // Kernel data segments while the handler runs.
    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax

    push esp
    call \handler
    add esp, 4

    add esp, 4          // discard cr2
    pop eax             // restore the interrupted ds
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax
    popa
    add esp, 8          // vector + error code
    iretd
.endm

trap_common:
    trap_body exception_dispatch

irq_common:
    trap_body irq_dispatch
"#
);

#[cfg(target_arch = "x86")]
unsafe extern "C" {
    fn isr0();
    fn isr1();
    fn isr2();
    fn isr3();
    fn isr4();
    fn isr5();
    fn isr6();
    fn isr7();
    fn isr8();
    fn isr9();
    fn isr10();
    fn isr11();
    fn isr12();
    fn isr13();
    fn isr14();
    fn isr15();
    fn isr16();
    fn isr17();
    fn isr18();
    fn isr19();
    fn isr20();
    fn isr21();
    fn isr22();
    fn isr23();
    fn isr24();
    fn isr25();
    fn isr26();
    fn isr27();
    fn isr28();
    fn isr29();
    fn isr30();
    fn isr31();
    fn isr128();
    fn isr177();
    fn irq0();
    fn irq1();
    fn irq2();
    fn irq3();
    fn irq4();
    fn irq5();
    fn irq6();
    fn irq7();
    fn irq8();
    fn irq9();
    fn irq10();
    fn irq11();
    fn irq12();
    fn irq13();
    fn irq14();
    fn irq15();
}

/// Collect the real stub addresses for gate installation.
#[cfg(target_arch = "x86")]
pub fn vector_stubs() -> VectorStubs {
    macro_rules! addr {
        ($f:ident) => {
            $f as usize as u32
        };
    }
    VectorStubs {
        exceptions: [
            addr!(isr0),
            addr!(isr1),
            addr!(isr2),
            addr!(isr3),
            addr!(isr4),
            addr!(isr5),
            addr!(isr6),
            addr!(isr7),
            addr!(isr8),
            addr!(isr9),
            addr!(isr10),
            addr!(isr11),
            addr!(isr12),
            addr!(isr13),
            addr!(isr14),
            addr!(isr15),
            addr!(isr16),
            addr!(isr17),
            addr!(isr18),
            addr!(isr19),
            addr!(isr20),
            addr!(isr21),
            addr!(isr22),
            addr!(isr23),
            addr!(isr24),
            addr!(isr25),
            addr!(isr26),
            addr!(isr27),
            addr!(isr28),
            addr!(isr29),
            addr!(isr30),
            addr!(isr31),
        ],
        irqs: [
            addr!(irq0),
            addr!(irq1),
            addr!(irq2),
            addr!(irq3),
            addr!(irq4),
            addr!(irq5),
            addr!(irq6),
            addr!(irq7),
            addr!(irq8),
            addr!(irq9),
            addr!(irq10),
            addr!(irq11),
            addr!(irq12),
            addr!(irq13),
            addr!(irq14),
            addr!(irq15),
        ],
        syscall: addr!(isr128),
        syscall_alt: addr!(isr177),
    }
}
