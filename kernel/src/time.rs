//! Programmable interval timer.
//!
//! Channel 0 in square-wave mode ticks at 100 Hz; the IRQ 0 handler
//! counts ticks into a monotonic counter that [`delay_ms`] polls.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::port::PortBus;
use crate::traps::{InterruptHandler, TrapFrame};

pub const PIT_CHANNEL0: u16 = 0x40;
pub const PIT_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 3.
const PIT_MODE: u8 = 0x36;

/// The PIT's fixed input clock.
pub const PIT_INPUT_HZ: u32 = 1_193_180;

/// Tick rate the kernel programs.
pub const TICK_HZ: u32 = 100;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Counts timer interrupts. Acknowledgement is the dispatcher's job,
/// not the handler's.
pub struct TickHandler;

impl InterruptHandler for TickHandler {
    fn handle(&self, _frame: &TrapFrame) {
        TICKS.fetch_add(1, Ordering::Relaxed);
    }
}

pub static TICK_HANDLER: TickHandler = TickHandler;

/// Program channel 0 for `hz` and return the divisor written.
pub fn program_channel0(bus: &mut impl PortBus, hz: u32) -> u16 {
    let divisor = (PIT_INPUT_HZ / hz) as u16;
    bus.write(PIT_COMMAND, PIT_MODE);
    bus.write(PIT_CHANNEL0, (divisor & 0xFF) as u8);
    bus.write(PIT_CHANNEL0, (divisor >> 8) as u8);
    divisor
}

/// Bind the tick handler to IRQ 0 and start the timer.
pub fn init(bus: &mut impl PortBus) {
    crate::traps::bind(0, &TICK_HANDLER);
    let divisor = program_channel0(bus, TICK_HZ);
    log::info!("pit: {TICK_HZ} Hz (divisor {divisor})");
}

/// Ticks since the timer started.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Block for at least `ms` milliseconds, halting between ticks.
/// Requires interrupts enabled and the timer running.
pub fn delay_ms(ms: u64) {
    let target = ticks() + ms.div_ceil(1000 / u64::from(TICK_HZ));
    while ticks() < target {
        crate::arch::cpu::halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn programs_mode_then_divisor_low_high() {
        let mut bus = RecordingBus::default();
        let divisor = program_channel0(&mut bus, 100);
        assert_eq!(divisor, (PIT_INPUT_HZ / 100) as u16);
        assert_eq!(
            bus.writes,
            vec![
                (PIT_COMMAND, PIT_MODE),
                (PIT_CHANNEL0, (divisor & 0xFF) as u8),
                (PIT_CHANNEL0, (divisor >> 8) as u8),
            ]
        );
    }

    #[test]
    fn tick_handler_advances_the_counter() {
        let before = ticks();
        TICK_HANDLER.handle(&TrapFrame::synthetic(32));
        TICK_HANDLER.handle(&TrapFrame::synthetic(32));
        assert!(ticks() >= before + 2);
    }
}
