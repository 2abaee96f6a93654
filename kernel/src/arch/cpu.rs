//! Low-level CPU control: interrupt flag, halt states.
//!
//! These are the bottom of the abstraction stack: thin wrappers around
//! privileged instructions with no logic of their own. On non-x86 builds
//! (host-side unit tests) they degrade to no-ops so that code paths which
//! merely *mention* them still compile.

/// Halts the CPU until the next interrupt arrives.
///
/// This is the idle instruction: the busy-wait delay loop uses it so a
/// waiting kernel does not burn a core at full power between timer ticks.
/// Interrupts must be enabled or the CPU never wakes.
#[inline(always)]
pub fn halt() {
    #[cfg(target_arch = "x86")]
    // SAFETY: HLT stops execution until an interrupt fires; always safe in
    // ring 0 with interrupts enabled.
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack));
    }
    #[cfg(not(target_arch = "x86"))]
    core::hint::spin_loop();
}

/// Halts the CPU in an unrecoverable state. Never returns.
///
/// CLI followed by HLT in a loop: with interrupts masked nothing can wake
/// the core again. This is the terminal state of every CPU exception.
#[inline(always)]
pub fn halt_forever() -> ! {
    loop {
        #[cfg(target_arch = "x86")]
        // SAFETY: CLI + HLT keeps the CPU stopped; no interrupt can wake us.
        unsafe {
            core::arch::asm!("cli", "hlt", options(nomem, nostack));
        }
        #[cfg(not(target_arch = "x86"))]
        core::hint::spin_loop();
    }
}

/// Disables maskable interrupt delivery on this CPU.
#[inline(always)]
pub fn disable_interrupts() {
    #[cfg(target_arch = "x86")]
    // SAFETY: CLI in ring 0 cannot fault. Callers are responsible for
    // restoring delivery; the spinlock guard does so automatically.
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
}

/// Enables maskable interrupt delivery on this CPU.
///
/// The CPU guarantees the instruction after STI executes before any
/// pending interrupt is delivered.
#[inline(always)]
pub fn enable_interrupts() {
    #[cfg(target_arch = "x86")]
    // SAFETY: STI in ring 0 cannot fault.
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack));
    }
}

/// Checks whether interrupts are currently enabled (EFLAGS.IF, bit 9).
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    #[cfg(target_arch = "x86")]
    {
        let eflags: u32;
        // SAFETY: Reading EFLAGS is a side-effect-free observation.
        unsafe {
            core::arch::asm!(
                "pushfd",
                "pop {}",
                out(reg) eflags,
                options(nomem, preserves_flags)
            );
        }
        eflags & (1 << 9) != 0
    }
    #[cfg(not(target_arch = "x86"))]
    false
}
