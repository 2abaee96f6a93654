//! Architecture layer: privileged CPU state and device port protocols.

pub mod cpu;
pub mod gdt;
pub mod idt;
pub mod pic;
pub mod port;
pub mod tss;
