//! CPU module - 2A03 (6502 variant) implementation
//!
//! The 2A03 is a 6502 without decimal mode. Each call to [`Cpu::step`] runs one
//! instruction to completion: fetch the opcode, look up its mnemonic and addressing
//! mode in [`OPCODES`], resolve the operand, then execute. Timing is not modelled.

mod addressing;
mod disassembler;
mod instructions;
mod opcodes;

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::bus::BusError;

pub use addressing::{AddressingMode, Operand};
pub use disassembler::{disassemble, instruction_length, trace_line, DISASSEMBLY_WIDTH};
pub use opcodes::{Mnemonic, Opcode, OPCODES};

/// Base address of the hardware stack page
pub const STACK_BASE: u16 = 0x0100;
/// Non-maskable interrupt vector
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Status register value loaded on reset
const RESET_STATUS: u8 = 0x34;

bitflags! {
    /// Processor status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b0000_0001;
        const ZERO = 0b0000_0010;
        const INTERRUPT = 0b0000_0100;
        const DECIMAL = 0b0000_1000;
        const BREAK = 0b0001_0000;
        /// Reads back as 1 at all times
        const RESERVED = 0b0010_0000;
        const OVERFLOW = 0b0100_0000;
        const NEGATIVE = 0b1000_0000;
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(StatusFlags, char); 8] = [
            (StatusFlags::NEGATIVE, 'N'),
            (StatusFlags::OVERFLOW, 'V'),
            (StatusFlags::RESERVED, '-'),
            (StatusFlags::BREAK, 'B'),
            (StatusFlags::DECIMAL, 'D'),
            (StatusFlags::INTERRUPT, 'I'),
            (StatusFlags::ZERO, 'Z'),
            (StatusFlags::CARRY, 'C'),
        ];
        for (flag, name) in NAMES {
            let c = if self.contains(flag) { name } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// 2A03 CPU registers
///
/// The status register is private so that the reserved bit cannot be cleared; use
/// [`CpuRegisters::set_status`] and [`CpuRegisters::set_flag`] to change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,    // Accumulator
    pub x: u8,    // X index register
    pub y: u8,    // Y index register
    pub sp: u8,   // Stack pointer
    pub pc: u16,  // Program counter
    p: StatusFlags,
}

impl Default for CpuRegisters {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            p: StatusFlags::from_bits_retain(RESET_STATUS),
        }
    }
}

impl CpuRegisters {
    /// Current status register
    pub fn status(&self) -> StatusFlags {
        self.p
    }

    /// Replace the whole status register, keeping the reserved bit set
    pub fn set_status(&mut self, value: u8) {
        self.p = StatusFlags::from_bits_retain(value) | StatusFlags::RESERVED;
    }

    pub fn flag(&self, flag: StatusFlags) -> bool {
        self.p.contains(flag)
    }

    pub fn set_flag(&mut self, flag: StatusFlags, value: bool) {
        self.p.set(flag, value);
        self.p.insert(StatusFlags::RESERVED);
    }

    /// Update zero and negative flags from a result byte
    pub fn set_flags_zn(&mut self, value: u8) {
        self.p.set(StatusFlags::ZERO, value == 0);
        self.p.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }
}

/// Fatal CPU conditions. Dispatch cannot continue after any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unsupported opcode ${opcode:02X} ({mnemonic}) at ${pc:04X}")]
    UnsupportedOpcode { opcode: u8, mnemonic: Mnemonic, pc: u16 },
    #[error("opcode fetch at ${pc:04X}: {source}")]
    Fetch {
        pc: u16,
        #[source]
        source: BusError,
    },
    #[error("opcode ${opcode:02X} at ${pc:04X}: {source}")]
    Bus {
        opcode: u8,
        pc: u16,
        #[source]
        source: BusError,
    },
    #[error("interrupt sequence through vector ${vector:04X}: {source}")]
    Interrupt {
        vector: u16,
        #[source]
        source: BusError,
    },
}

/// Bus trait for memory and I/O access
pub trait Bus {
    /// Read a byte, applying any register side effects
    fn read(&mut self, address: u16) -> Result<u8, BusError>;
    /// Write a byte
    fn write(&mut self, address: u16, value: u8) -> Result<(), BusError>;
    /// Read a byte without side effects, for debugging views
    fn peek(&self, address: u16) -> u8;
}

/// Read a little-endian word
fn read_word<B: Bus + ?Sized>(bus: &mut B, address: u16) -> Result<u16, BusError> {
    let lo = bus.read(address)?;
    let hi = bus.read(address.wrapping_add(1))?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// CPU emulator state
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    registers: CpuRegisters,
    /// Instructions executed since reset
    instructions: u64,
}

impl Cpu {
    /// Create a CPU in its power-on register state. Call [`Cpu::reset`] before stepping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset registers and load the program counter from the reset vector
    pub fn reset<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        self.registers = CpuRegisters::default();
        self.registers.pc = read_word(bus, RESET_VECTOR)
            .map_err(|source| CpuError::Interrupt { vector: RESET_VECTOR, source })?;
        self.instructions = 0;
        Ok(())
    }

    pub fn registers(&self) -> &CpuRegisters {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.registers
    }

    pub fn status(&self) -> StatusFlags {
        self.registers.status()
    }

    /// Instructions executed since reset
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Execute one instruction
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        let pc = self.registers.pc;
        let opcode = self.fetch(bus).map_err(|source| CpuError::Fetch { pc, source })?;
        let Opcode { mnemonic, mode } = OPCODES[usize::from(opcode)];
        if !mnemonic.is_supported() {
            return Err(CpuError::UnsupportedOpcode { opcode, mnemonic, pc });
        }

        self.resolve(mode, bus)
            .and_then(|operand| self.execute(mnemonic, operand, bus))
            .map_err(|source| CpuError::Bus { opcode, pc, source })?;
        self.instructions += 1;
        Ok(())
    }

    /// Service a non-maskable interrupt between instructions
    pub fn nmi<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        self.enter_nmi(bus)
            .map_err(|source| CpuError::Interrupt { vector: NMI_VECTOR, source })
    }

    fn enter_nmi<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let [lo, hi] = self.registers.pc.to_le_bytes();
        self.push(bus, hi)?;
        self.push(bus, lo)?;
        // Break is pushed as it stands
        let status = self.registers.status() | StatusFlags::RESERVED;
        self.push(bus, status.bits())?;
        self.registers.set_flag(StatusFlags::INTERRUPT, true);
        self.registers.pc = read_word(bus, NMI_VECTOR)?;
        Ok(())
    }

    pub(crate) fn fetch<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u8, BusError> {
        let value = bus.read(self.registers.pc)?;
        self.registers.pc = self.registers.pc.wrapping_add(1);
        Ok(value)
    }

    pub(crate) fn fetch_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16, BusError> {
        let lo = self.fetch(bus)?;
        let hi = self.fetch(bus)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(crate) fn push<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u8) -> Result<(), BusError> {
        bus.write(STACK_BASE | u16::from(self.registers.sp), value)?;
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        Ok(())
    }

    pub(crate) fn pull<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u8, BusError> {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        bus.read(STACK_BASE | u16::from(self.registers.sp))
    }

    pub(crate) fn read_vector<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        vector: u16,
    ) -> Result<u16, BusError> {
        read_word(bus, vector)
    }
}
