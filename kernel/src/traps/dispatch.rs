//! Exception and hardware-interrupt demultiplexing.
//!
//! Exceptions (vectors 0-31) are always fatal here: report and halt.
//! Hardware lines (vectors 32-47) go through the 16-slot handler
//! registry; an unbound line is a no-op. Either way the PIC is
//! acknowledged afterwards; forgetting the slave EOI for lines 8-15
//! silently wedges that whole controller.

use crate::arch::pic;
use crate::arch::port::{IoPorts, PortBus};
use crate::sync::SpinLock;
use crate::traps::frame::TrapFrame;
use crate::traps::{IRQ_BASE, IRQ_LINES};
use crate::util::panic::exception_panic;

/// A driver-supplied interrupt callback.
///
/// Implementations must be `Sync`: the registry hands the same reference
/// to the interrupt context and to whoever bound it.
pub trait InterruptHandler: Sync {
    fn handle(&self, frame: &TrapFrame);
}

/// The 16-slot bind registry, one slot per hardware line.
///
/// Each slot holds at most one handler; binding over an occupied slot
/// replaces it (last bind wins), there is no chaining.
pub struct IrqTable {
    slots: [Option<&'static dyn InterruptHandler>; IRQ_LINES],
}

impl IrqTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; IRQ_LINES],
        }
    }

    pub fn bind(&mut self, irq: u8, handler: &'static dyn InterruptHandler) {
        self.slots[irq as usize] = Some(handler);
    }

    pub fn unbind(&mut self, irq: u8) {
        self.slots[irq as usize] = None;
    }

    pub fn handler(&self, irq: u8) -> Option<&'static dyn InterruptHandler> {
        self.slots[irq as usize]
    }

    pub fn is_bound(&self, irq: u8) -> bool {
        self.slots[irq as usize].is_some()
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Service one hardware line: invoke the bound handler (if any), then
/// acknowledge the controllers. EOI is unconditional: it re-arms the
/// line whether or not anyone was listening.
pub fn dispatch_irq(
    handler: Option<&dyn InterruptHandler>,
    irq: u8,
    frame: &TrapFrame,
    bus: &mut dyn PortBus,
) {
    if let Some(h) = handler {
        h.handle(frame);
    }
    pic::end_of_interrupt(bus, irq);
}

/// The kernel's bind registry.
static IRQ_TABLE: SpinLock<IrqTable> = SpinLock::new(IrqTable::new());

/// Bind `handler` to hardware line `irq` (0-15). Replaces any previous
/// binding for that line.
pub fn bind(irq: u8, handler: &'static dyn InterruptHandler) {
    IRQ_TABLE.lock().bind(irq, handler);
}

/// Clear the binding for hardware line `irq`. Subsequent interrupts on
/// the line are acknowledged but otherwise ignored.
pub fn unbind(irq: u8) {
    IRQ_TABLE.lock().unbind(irq);
}

/// Common exception entry, called by the `isr*` stubs with the saved
/// frame.
///
/// CPU exceptions never resume: the machine state that produced them is
/// unrecoverable by design. The two software-interrupt vectors also land
/// here and simply return; the system-call surface on top of them is
/// future work.
#[unsafe(no_mangle)]
extern "C" fn exception_dispatch(frame: &TrapFrame) {
    if frame.vector < u32::from(IRQ_BASE) {
        exception_panic(frame.vector as usize);
    }
}

/// Common hardware-interrupt entry, called by the `irq*` stubs.
///
/// The handler reference is copied out before the registry lock drops so
/// a handler can itself bind/unbind without deadlocking.
#[unsafe(no_mangle)]
extern "C" fn irq_dispatch(frame: &TrapFrame) {
    let irq = (frame.vector as u8).wrapping_sub(IRQ_BASE);
    let handler = IRQ_TABLE.lock().handler(irq);
    dispatch_irq(handler, irq, frame, &mut IoPorts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::pic::{PIC1_COMMAND, PIC2_COMMAND};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingHandler(AtomicU32);

    impl InterruptHandler for CountingHandler {
        fn handle(&self, frame: &TrapFrame) {
            self.0.fetch_add(frame.vector, Ordering::Relaxed);
        }
    }

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
    fn last_bind_wins_and_unbind_clears() {
        static FIRST: CountingHandler = CountingHandler(AtomicU32::new(0));
        static SECOND: CountingHandler = CountingHandler(AtomicU32::new(0));

        let mut table = IrqTable::new();
        table.bind(4, &FIRST);
        table.bind(4, &SECOND);
        assert!(table.is_bound(4));

        let frame = TrapFrame::synthetic(36);
        let mut bus = RecordingBus::default();
        dispatch_irq(table.handler(4), 4, &frame, &mut bus);
        assert_eq!(FIRST.0.load(Ordering::Relaxed), 0);
        assert_eq!(SECOND.0.load(Ordering::Relaxed), 36);

        table.unbind(4);
        assert!(!table.is_bound(4));
    }

    #[test]
    fn unbound_line_is_a_noop_but_still_acknowledged() {
        let table = IrqTable::new();
        let frame = TrapFrame::synthetic(35);
        let mut bus = RecordingBus::default();
        dispatch_irq(table.handler(3), 3, &frame, &mut bus);
        assert_eq!(bus.writes, vec![(PIC1_COMMAND, 0x20)]);
    }

    #[test]
    fn high_lines_acknowledge_both_controllers() {
        static HANDLER: CountingHandler = CountingHandler(AtomicU32::new(0));
        let mut table = IrqTable::new();
        table.bind(12, &HANDLER);

        let frame = TrapFrame::synthetic(44);
        let mut bus = RecordingBus::default();
        dispatch_irq(table.handler(12), 12, &frame, &mut bus);

        assert_eq!(HANDLER.0.load(Ordering::Relaxed), 44);
        assert_eq!(bus.writes, vec![(PIC2_COMMAND, 0x20), (PIC1_COMMAND, 0x20)]);
    }
}
