//! Ferrite kernel core.
//!
//! The protected-mode runtime: segmentation, interrupt dispatch,
//! physical and virtual memory, the timer tick, and the fatal-error
//! path. Boot assembly jumps into [`init`] with interrupts disabled; it
//! hands control back with the machine fully set up and interrupts on.
//!
//! The crate builds for the host too, where the hardware-facing pieces
//! compile out and the descriptor, bitmap and paging logic run under
//! ordinary `cargo test`.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod console;
pub mod memory;
pub mod sync;
pub mod time;
pub mod traps;
pub mod util;

pub use console::Console;

/// Bring the core up, in dependency order: console and logging first so
/// later stages can report, then segmentation, the interrupt plumbing,
/// memory, and finally the timer before interrupts come on.
#[cfg(target_arch = "x86")]
pub fn init(console: &'static mut (dyn Console + Send)) {
    console::register(console);
    util::logger::init();
    log::info!("ferrite: booting");

    arch::gdt::init();
    traps::init();

    if let Err(err) = unsafe { memory::init() } {
        log::error!("memory init failed: {err}");
        arch::cpu::halt_forever();
    }

    time::init(&mut arch::port::IoPorts);
    arch::cpu::enable_interrupts();
    log::info!("ferrite: up, interrupts enabled");
}
