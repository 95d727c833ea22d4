//! Disassembly and trace formatting

use super::{AddressingMode, Bus, CpuRegisters, OPCODES};

/// Width every disassembly line is padded to
pub const DISASSEMBLY_WIDTH: usize = 40;

/// Bytes occupied by the instruction whose opcode is `opcode`
pub fn instruction_length(opcode: u8) -> u16 {
    1 + OPCODES[usize::from(opcode)].mode.operand_bytes()
}

/// Disassemble the instruction at `address` without touching machine state.
///
/// Produces `$AAAA  B0 B1 B2  MNE operand`, padded to [`DISASSEMBLY_WIDTH`].
/// Relative branches show the resolved target followed by the signed offset.
pub fn disassemble<B: Bus + ?Sized>(bus: &B, address: u16) -> String {
    let opcode = bus.peek(address);
    let entry = OPCODES[usize::from(opcode)];
    let length = instruction_length(opcode);

    let bytes: Vec<u8> = (0..length)
        .map(|offset| bus.peek(address.wrapping_add(offset)))
        .collect();
    let hex = bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    let lo = bytes.get(1).copied().unwrap_or(0);
    let hi = bytes.get(2).copied().unwrap_or(0);
    let word = u16::from_le_bytes([lo, hi]);
    let operand = match entry.mode {
        AddressingMode::Implied => String::new(),
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${lo:02X}"),
        AddressingMode::ZeroPage => format!("${lo:02X}"),
        AddressingMode::ZeroPageX => format!("${lo:02X},X"),
        AddressingMode::ZeroPageY => format!("${lo:02X},Y"),
        AddressingMode::Absolute => format!("${word:04X}"),
        AddressingMode::AbsoluteX => format!("${word:04X},X"),
        AddressingMode::AbsoluteY => format!("${word:04X},Y"),
        AddressingMode::Indirect => format!("(${word:04X})"),
        AddressingMode::IndirectX => format!("(${lo:02X},X)"),
        AddressingMode::IndirectY => format!("(${lo:02X}),Y"),
        AddressingMode::Relative => {
            let offset = lo as i8;
            let target = address.wrapping_add(2).wrapping_add(offset as u16);
            format!("${target:04X} ({offset:+04})")
        }
    };

    let line = format!("${address:04X}  {hex:<8}  {} {operand}", entry.mnemonic);
    format!("{:<width$}", line.trim_end(), width = DISASSEMBLY_WIDTH)
}

/// Disassembly of the instruction at the program counter followed by the register file
pub fn trace_line<B: Bus + ?Sized>(bus: &B, registers: &CpuRegisters) -> String {
    format!(
        "{}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
        disassemble(bus, registers.pc),
        registers.a,
        registers.x,
        registers.y,
        registers.status().bits(),
        registers.sp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatBus;

    fn line(program: &[u8]) -> String {
        let mut bus = FlatBus::new();
        bus.load(0x8000, program);
        disassemble(&bus, 0x8000)
    }

    #[test]
    fn test_fixed_width() {
        let programs: [&[u8]; 4] = [&[0xEA], &[0xA9, 0x05], &[0x4C, 0x00, 0x80], &[0xD0, 0xFE]];
        for program in programs {
            assert_eq!(line(program).len(), DISASSEMBLY_WIDTH);
        }
    }

    #[test]
    fn test_operand_text() {
        assert_eq!(line(&[0xA9, 0x05]).trim_end(), "$8000  A9 05     LDA #$05");
        assert_eq!(line(&[0x8D, 0x00, 0x20]).trim_end(), "$8000  8D 00 20  STA $2000");
        assert_eq!(line(&[0x6C, 0xFC, 0xFF]).trim_end(), "$8000  6C FC FF  JMP ($FFFC)");
        assert_eq!(line(&[0xB1, 0x10]).trim_end(), "$8000  B1 10     LDA ($10),Y");
        assert_eq!(line(&[0x0A]).trim_end(), "$8000  0A        ASL A");
    }

    #[test]
    fn test_relative_shows_target_and_offset() {
        assert_eq!(line(&[0xD0, 0xFE]).trim_end(), "$8000  D0 FE     BNE $8000 (-002)");
        assert_eq!(line(&[0x10, 0x05]).trim_end(), "$8000  10 05     BPL $8007 (+005)");
    }

    #[test]
    fn test_does_not_mutate() {
        let mut bus = FlatBus::new();
        bus.load(0x8000, &[0xA9, 0x05]);
        let before = bus.clone();
        let _ = disassemble(&bus, 0x8000);
        assert_eq!(before, bus);
    }

    #[test]
    fn test_trace_line_appends_registers() {
        let mut bus = FlatBus::new();
        bus.load(0xC000, &[0x4C, 0xF5, 0xC5]);
        let mut registers = CpuRegisters::default();
        registers.pc = 0xC000;
        registers.set_status(0x24);

        let trace = trace_line(&bus, &registers);
        assert!(trace.starts_with("$C000  4C F5 C5  JMP $C5F5"));
        assert!(trace.ends_with("A:00 X:00 Y:00 P:24 SP:FD"));
    }
}
