//! x86 port-mapped I/O.
//!
//! The raw `inb`/`outb` wrappers exist only on the real target. Device
//! protocol code (PIC remap, PIT programming, EOI) is written against the
//! [`PortBus`] trait instead, so the exact byte sequences can be verified
//! in host tests with a recording bus.

/// Write a byte to an I/O port.
///
/// # Safety
///
/// Writing to an arbitrary I/O port can have side effects on hardware.
/// The caller must ensure the port and value are valid.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Read a byte from an I/O port.
///
/// # Safety
///
/// Reading from an arbitrary I/O port can have side effects on hardware.
/// The caller must ensure the port is valid.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    unsafe {
        core::arch::asm!(
            "in al, dx",
            in("dx") port,
            out("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// Byte-granular access to the I/O port space.
pub trait PortBus {
    fn write(&mut self, port: u16, value: u8);
    fn read(&mut self, port: u16) -> u8;
}

/// The real I/O port space.
pub struct IoPorts;

impl PortBus for IoPorts {
    #[inline]
    fn write(&mut self, port: u16, value: u8) {
        #[cfg(target_arch = "x86")]
        // SAFETY: callers of the bus are the device protocol modules, which
        // only address the ports their hardware owns.
        unsafe {
            outb(port, value);
        }
        #[cfg(not(target_arch = "x86"))]
        let _ = (port, value);
    }

    #[inline]
    fn read(&mut self, port: u16) -> u8 {
        #[cfg(target_arch = "x86")]
        // SAFETY: see `write`.
        unsafe {
            return inb(port);
        }
        #[cfg(not(target_arch = "x86"))]
        {
            let _ = port;
            0
        }
    }
}
