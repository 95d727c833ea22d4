//! Addressing-mode resolution
//!
//! Every mode turns the bytes following an opcode into an [`Operand`], advancing the
//! program counter past whatever it consumed.

use super::{Bus, Cpu};
use crate::bus::BusError;

/// CPU addressing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode
    pub const fn operand_bytes(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY
            | AddressingMode::Relative => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// What an instruction operates on once its addressing mode has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    Implied,
    /// The accumulator register
    Accumulator,
    /// An effective bus address
    Address(u16),
}

impl Cpu {
    /// Resolve the operand for `mode`, consuming operand bytes from the instruction stream
    pub(crate) fn resolve<B: Bus + ?Sized>(
        &mut self,
        mode: AddressingMode,
        bus: &mut B,
    ) -> Result<Operand, BusError> {
        let address = match mode {
            AddressingMode::Implied => return Ok(Operand::Implied),
            AddressingMode::Accumulator => return Ok(Operand::Accumulator),
            AddressingMode::Immediate => {
                let address = self.registers.pc;
                self.registers.pc = address.wrapping_add(1);
                address
            }
            AddressingMode::ZeroPage => u16::from(self.fetch(bus)?),
            AddressingMode::ZeroPageX => u16::from(self.fetch(bus)?.wrapping_add(self.registers.x)),
            AddressingMode::ZeroPageY => u16::from(self.fetch(bus)?.wrapping_add(self.registers.y)),
            AddressingMode::Absolute => self.fetch_word(bus)?,
            AddressingMode::AbsoluteX => {
                self.fetch_word(bus)?.wrapping_add(u16::from(self.registers.x))
            }
            AddressingMode::AbsoluteY => {
                self.fetch_word(bus)?.wrapping_add(u16::from(self.registers.y))
            }
            AddressingMode::Indirect => {
                let pointer = self.fetch_word(bus)?;
                // The high byte never carries into the next page
                let high_pointer = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
                let lo = bus.read(pointer)?;
                let hi = bus.read(high_pointer)?;
                u16::from_le_bytes([lo, hi])
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch(bus)?.wrapping_add(self.registers.x);
                read_zero_page_word(bus, pointer)?
            }
            AddressingMode::IndirectY => {
                let pointer = self.fetch(bus)?;
                read_zero_page_word(bus, pointer)?.wrapping_add(u16::from(self.registers.y))
            }
            AddressingMode::Relative => {
                let offset = self.fetch(bus)? as i8;
                self.registers.pc.wrapping_add(offset as u16)
            }
        };
        Ok(Operand::Address(address))
    }
}

/// Read a pointer stored in zero page; the high byte wraps from $FF to $00
fn read_zero_page_word<B: Bus + ?Sized>(bus: &mut B, pointer: u8) -> Result<u16, BusError> {
    let lo = bus.read(u16::from(pointer))?;
    let hi = bus.read(u16::from(pointer.wrapping_add(1)))?;
    Ok(u16::from_le_bytes([lo, hi]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatBus;

    fn cpu_at(pc: u16) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.registers_mut().pc = pc;
        cpu
    }

    #[test]
    fn test_zero_page_x_wraps_within_page() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0xF0]);
        let mut cpu = cpu_at(0x0400);
        cpu.registers_mut().x = 0x20;

        let operand = cpu.resolve(AddressingMode::ZeroPageX, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x0010));
        assert_eq!(cpu.registers().pc, 0x0401);
    }

    #[test]
    fn test_indirect_high_byte_stays_in_page() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0xFF, 0x30]);
        bus.load(0x30FF, &[0x80]);
        bus.load(0x3000, &[0x50]);
        bus.load(0x3100, &[0x40]);
        let mut cpu = cpu_at(0x0400);

        let operand = cpu.resolve(AddressingMode::Indirect, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x5080));
        assert_eq!(cpu.registers().pc, 0x0402);
    }

    #[test]
    fn test_indexed_indirect_wraps_pointer() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0xFE]);
        bus.load(0x0000, &[0x12]);
        bus.load(0x00FF, &[0x34]);
        let mut cpu = cpu_at(0x0400);
        cpu.registers_mut().x = 0x01;

        // $FE + 1 = $FF, high byte read from $00
        let operand = cpu.resolve(AddressingMode::IndirectX, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x1234));
    }

    #[test]
    fn test_indirect_indexed_crosses_page() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0x10]);
        bus.load(0x0010, &[0xF0, 0x20]);
        let mut cpu = cpu_at(0x0400);
        cpu.registers_mut().y = 0x20;

        let operand = cpu.resolve(AddressingMode::IndirectY, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x2110));
    }

    #[test]
    fn test_relative_backwards() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0xFC]);
        let mut cpu = cpu_at(0x0400);

        let operand = cpu.resolve(AddressingMode::Relative, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x03FD));
    }

    #[test]
    fn test_absolute_x_no_page_fixup() {
        let mut bus = FlatBus::new();
        bus.load(0x0400, &[0xFF, 0xFF]);
        let mut cpu = cpu_at(0x0400);
        cpu.registers_mut().x = 0x02;

        let operand = cpu.resolve(AddressingMode::AbsoluteX, &mut bus).unwrap();
        assert_eq!(operand, Operand::Address(0x0001));
        assert_eq!(cpu.registers().pc, 0x0402);
    }
}
