//! Fatal-error reporting.

use crate::arch::cpu;
use crate::console::{self, ATTENTION_BG, ATTENTION_FG};
use crate::traps::exception_message;

/// Report an unrecoverable CPU exception and halt.
///
/// Interrupts go off first so nothing interleaves with the report, then
/// the console is cleared into the attention palette and the machine is
/// parked.
pub fn exception_panic(vector: usize) -> ! {
    cpu::disable_interrupts();
    console::with_console(|sink| {
        sink.set_color(ATTENTION_FG, ATTENTION_BG);
        sink.clear();
        sink.print_str(exception_message(vector));
        sink.print_str("\nException! system halted\n");
    });
    cpu::halt_forever()
}

/// Rust panics in kernel context get the same treatment as exceptions:
/// print what we know and park.
#[cfg(all(not(test), target_arch = "x86"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::fmt::Write;

    cpu::disable_interrupts();
    console::with_console(|sink| {
        sink.set_color(ATTENTION_FG, ATTENTION_BG);
        sink.clear();

        struct Writer<'a>(&'a mut dyn console::Console);
        impl core::fmt::Write for Writer<'_> {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                self.0.print_str(s);
                Ok(())
            }
        }
        let _ = writeln!(Writer(sink), "kernel panic: {info}");
        sink.print_str("system halted\n");
    });
    cpu::halt_forever()
}
