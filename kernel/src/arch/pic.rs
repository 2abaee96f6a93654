//! Legacy 8259 PIC (Programmable Interrupt Controller) pair.
//!
//! At reset the PICs deliver IRQ 0-7 on vectors 0x08-0x0F, which overlap
//! the CPU exception range. The remap sequence moves hardware lines to
//! vectors 32-47 so a timer tick can never masquerade as a double fault.
//! This remap is mandatory before interrupts are ever enabled.

use crate::arch::port::PortBus;

/// I/O ports for the master PIC.
pub const PIC1_COMMAND: u16 = 0x20;
pub const PIC1_DATA: u16 = 0x21;

/// I/O ports for the slave PIC.
pub const PIC2_COMMAND: u16 = 0xA0;
pub const PIC2_DATA: u16 = 0xA1;

/// ICW1: begin initialization, ICW4 will follow.
const ICW1_INIT_ICW4: u8 = 0x11;
/// ICW3 (master): slave attached on line 2.
const ICW3_MASTER: u8 = 0x04;
/// ICW3 (slave): cascade identity 2.
const ICW3_SLAVE: u8 = 0x02;
/// ICW4: 8086/88 mode.
const ICW4_8086: u8 = 0x01;
/// End-of-interrupt command byte.
const EOI: u8 = 0x20;

/// Vector base for IRQ 0-7 after remap.
pub const PIC1_OFFSET: u8 = 0x20;
/// Vector base for IRQ 8-15 after remap.
pub const PIC2_OFFSET: u8 = 0x28;

/// Small I/O delay by writing to an unused port.
/// Some old hardware requires a delay between PIC commands.
#[inline]
fn io_wait(bus: &mut impl PortBus) {
    bus.write(0x80, 0);
}

/// Remap both PICs to vectors 32-47 and unmask every line.
///
/// Sequence per controller: ICW1 to the command port, then ICW2 (vector
/// base), ICW3 (cascade wiring) and ICW4 (8086 mode) to the data port.
/// A final write of 0x00 to each data port clears the interrupt masks.
pub fn remap(bus: &mut impl PortBus) {
    bus.write(PIC1_COMMAND, ICW1_INIT_ICW4);
    io_wait(bus);
    bus.write(PIC2_COMMAND, ICW1_INIT_ICW4);
    io_wait(bus);

    bus.write(PIC1_DATA, PIC1_OFFSET);
    io_wait(bus);
    bus.write(PIC2_DATA, PIC2_OFFSET);
    io_wait(bus);

    bus.write(PIC1_DATA, ICW3_MASTER);
    io_wait(bus);
    bus.write(PIC2_DATA, ICW3_SLAVE);
    io_wait(bus);

    bus.write(PIC1_DATA, ICW4_8086);
    io_wait(bus);
    bus.write(PIC2_DATA, ICW4_8086);
    io_wait(bus);

    // Unmask all lines on both controllers.
    bus.write(PIC1_DATA, 0x00);
    bus.write(PIC2_DATA, 0x00);
}

/// Acknowledge a serviced interrupt line.
///
/// The master is always signalled. Lines 8-15 arrive through the slave, so
/// those additionally signal the slave first. Skipping that stalls every
/// further interrupt of equal or lower priority on the slave.
pub fn end_of_interrupt(bus: &mut (impl PortBus + ?Sized), irq: u8) {
    if irq >= 8 {
        bus.write(PIC2_COMMAND, EOI);
    }
    bus.write(PIC1_COMMAND, EOI);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every port write, ignoring the 0x80 delay slot.
    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u16, u8)>,
    }

    impl PortBus for RecordingBus {
        fn write(&mut self, port: u16, value: u8) {
            if port != 0x80 {
                self.writes.push((port, value));
            }
        }
        fn read(&mut self, _port: u16) -> u8 {
            0
        }
    }

    #[test]
    fn remap_sends_full_icw_sequence() {
        let mut bus = RecordingBus::default();
        remap(&mut bus);
        assert_eq!(
            bus.writes,
            vec![
                (PIC1_COMMAND, 0x11),
                (PIC2_COMMAND, 0x11),
                (PIC1_DATA, 0x20),
                (PIC2_DATA, 0x28),
                (PIC1_DATA, 0x04),
                (PIC2_DATA, 0x02),
                (PIC1_DATA, 0x01),
                (PIC2_DATA, 0x01),
                (PIC1_DATA, 0x00),
                (PIC2_DATA, 0x00),
            ]
        );
    }

    #[test]
    fn eoi_low_lines_signal_master_only() {
        for irq in 0..8 {
            let mut bus = RecordingBus::default();
            end_of_interrupt(&mut bus, irq);
            assert_eq!(bus.writes, vec![(PIC1_COMMAND, 0x20)]);
        }
    }

    #[test]
    fn eoi_high_lines_signal_slave_then_master() {
        for irq in 8..16 {
            let mut bus = RecordingBus::default();
            end_of_interrupt(&mut bus, irq);
            assert_eq!(bus.writes, vec![(PIC2_COMMAND, 0x20), (PIC1_COMMAND, 0x20)]);
        }
    }
}
