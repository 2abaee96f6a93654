//! Interrupt Descriptor Table.
//!
//! 256 gate slots in the CPU-mandated 8-byte protected-mode layout.
//! Only vectors 0-31 (CPU exceptions), 32-47 (remapped hardware lines)
//! and the two software-interrupt vectors are ever populated; the rest
//! stay zero and fault as "segment not present" if reached.

/// Number of interrupt vectors.
pub const IDT_ENTRIES: usize = 256;

/// Attribute byte for a privileged 32-bit interrupt gate (present, DPL 0,
/// gate type 0xE).
pub const GATE_INTERRUPT: u8 = 0x8E;

/// Bits the attribute byte always carries in this table, OR-ed into every
/// stored flags value.
pub const GATE_FIXED_BITS: u8 = 0x60;

/// One 8-byte interrupt gate: handler offset split 16/16 around the
/// selector, a fixed zero byte, and the attribute byte.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    attributes: u8,
    offset_high: u16,
}

impl GateDescriptor {
    /// An unpopulated slot.
    pub const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        zero: 0,
        attributes: 0,
        offset_high: 0,
    };

    /// Reassembled 32-bit handler address.
    pub fn offset(&self) -> u32 {
        u32::from(self.offset_low) | (u32::from(self.offset_high) << 16)
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn attributes(&self) -> u8 {
        self.attributes
    }

    pub fn zero_byte(&self) -> u8 {
        self.zero
    }

    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }
}

/// The gate table. Built once at boot; individual slots change only
/// through the explicit [`Idt::set_gate`] admin operation.
#[repr(C, align(8))]
pub struct Idt {
    entries: [GateDescriptor; IDT_ENTRIES],
}

impl Idt {
    /// All 256 slots zeroed.
    pub const fn new() -> Self {
        Self {
            entries: [GateDescriptor::MISSING; IDT_ENTRIES],
        }
    }

    /// Populate one gate: split the handler address, store the selector,
    /// force the zero byte, and OR the fixed bits into the attributes.
    pub fn set_gate(&mut self, vector: u8, handler: u32, selector: u16, flags: u8) {
        self.entries[vector as usize] = GateDescriptor {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            attributes: flags | GATE_FIXED_BITS,
            offset_high: ((handler >> 16) & 0xFFFF) as u16,
        };
    }

    pub fn entry(&self, vector: u8) -> GateDescriptor {
        self.entries[vector as usize]
    }

    /// Load the table into IDTR.
    ///
    /// # Safety
    ///
    /// `self` must stay at a stable address for the kernel's lifetime,
    /// and every populated gate must point at a real handler stub.
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&self) {
        #[repr(C, packed)]
        struct IdtPointer {
            limit: u16,
            base: u32,
        }

        let ptr = IdtPointer {
            limit: (core::mem::size_of::<[GateDescriptor; IDT_ENTRIES]>() - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        };

        unsafe {
            core::arch::asm!(
                "lidt [{}]",
                in(reg) &ptr,
                options(readonly, nostack, preserves_flags)
            );
        }
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_gate_splits_offset_and_forces_zero_byte() {
        let mut idt = Idt::new();
        idt.set_gate(3, 0xDEAD_BEEF, 0x08, GATE_INTERRUPT);
        let gate = idt.entry(3);
        assert_eq!(gate.offset(), 0xDEAD_BEEF);
        assert_eq!(gate.selector(), 0x08);
        assert_eq!(gate.zero_byte(), 0);
        assert_eq!(gate.attributes(), GATE_INTERRUPT | GATE_FIXED_BITS);
    }

    #[test]
    fn fixed_bits_are_always_present() {
        let mut idt = Idt::new();
        idt.set_gate(0, 0x1000, 0x08, 0x8E);
        assert_eq!(idt.entry(0).attributes() & GATE_FIXED_BITS, GATE_FIXED_BITS);
    }

    #[test]
    fn untouched_vectors_stay_missing() {
        let mut idt = Idt::new();
        idt.set_gate(32, 0x1234, 0x08, GATE_INTERRUPT);
        for v in 0..=255u8 {
            if v != 32 {
                assert!(idt.entry(v).is_missing(), "vector {v} should be empty");
            }
        }
    }
}
