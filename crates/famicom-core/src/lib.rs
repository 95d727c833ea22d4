//! famicom-core - Pure Rust 8-bit console core
//!
//! This crate provides the emulation core of a Famicom/NES-class machine: the 2A03
//! (6502 variant) interpreter, the CPU memory bus, the picture unit's register file and
//! graphics memory, and a static background decoder that turns graphics memory into
//! RGBA pixels. Windowing and input live in the front-end crates.

#![forbid(unsafe_code)]

/// CPU module containing the 2A03 (6502 variant) interpreter
pub mod cpu;
/// Memory bus and address decoding
pub mod bus;
/// Picture unit registers and graphics memory
pub mod ppu;
/// Background tile decoder and hardware palette
pub mod render;
/// Controller shift registers
pub mod controller;
/// iNES cartridge loading and mapper 0 layout
pub mod cartridge;
/// Machine configuration
pub mod config;
/// Machine aggregate tying CPU, bus and decoder together
pub mod system;

pub use bus::{BusError, FlatBus, NesBus};
pub use cartridge::{Cartridge, CartridgeError, Mirroring};
pub use config::SystemConfig;
pub use controller::{Button, Port};
pub use cpu::{Bus, Cpu, CpuError, CpuRegisters, StatusFlags};
pub use render::{FRAME_HEIGHT, FRAME_WIDTH};
pub use system::{NesSystem, SystemError};
