//! Opcode decode table
//!
//! One table drives both execution and disassembly, so the two can never disagree
//! about what a byte means.

use std::fmt;

use super::AddressingMode;
use super::AddressingMode::{
    Absolute as ABS, AbsoluteX as ABX, AbsoluteY as ABY, Accumulator as ACC, Immediate as IMM,
    Implied as IMP, Indirect as IND, IndirectX as IZX, IndirectY as IZY, Relative as REL,
    ZeroPage as ZP, ZeroPageX as ZPX, ZeroPageY as ZPY,
};

/// Instruction mnemonics, including the undocumented ones
#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // Official
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
    // Undocumented, stable
    ALR, ANC, ARR, AXS, DCP, ISB, LAX, RLA, RRA, SAX, SLO, SRE,
    // Undocumented, unstable or jamming
    AHX, LAS, LXA, SHX, SHY, STP, TAS, XAA,
}

impl Mnemonic {
    /// Whether the interpreter implements this mnemonic
    pub const fn is_supported(self) -> bool {
        !matches!(
            self,
            Mnemonic::AHX
                | Mnemonic::LAS
                | Mnemonic::LXA
                | Mnemonic::SHX
                | Mnemonic::SHY
                | Mnemonic::STP
                | Mnemonic::TAS
                | Mnemonic::XAA
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Decoded opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode) -> Opcode {
    Opcode { mnemonic, mode }
}

use Mnemonic::*;

/// Opcode byte to mnemonic and addressing mode
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    op(BRK, IMP), op(ORA, IZX), op(STP, IMP), op(SLO, IZX), op(NOP, ZP),  op(ORA, ZP),  op(ASL, ZP),  op(SLO, ZP),
    op(PHP, IMP), op(ORA, IMM), op(ASL, ACC), op(ANC, IMM), op(NOP, ABS), op(ORA, ABS), op(ASL, ABS), op(SLO, ABS),
    // 0x10
    op(BPL, REL), op(ORA, IZY), op(STP, IMP), op(SLO, IZY), op(NOP, ZPX), op(ORA, ZPX), op(ASL, ZPX), op(SLO, ZPX),
    op(CLC, IMP), op(ORA, ABY), op(NOP, IMP), op(SLO, ABY), op(NOP, ABX), op(ORA, ABX), op(ASL, ABX), op(SLO, ABX),
    // 0x20
    op(JSR, ABS), op(AND, IZX), op(STP, IMP), op(RLA, IZX), op(BIT, ZP),  op(AND, ZP),  op(ROL, ZP),  op(RLA, ZP),
    op(PLP, IMP), op(AND, IMM), op(ROL, ACC), op(ANC, IMM), op(BIT, ABS), op(AND, ABS), op(ROL, ABS), op(RLA, ABS),
    // 0x30
    op(BMI, REL), op(AND, IZY), op(STP, IMP), op(RLA, IZY), op(NOP, ZPX), op(AND, ZPX), op(ROL, ZPX), op(RLA, ZPX),
    op(SEC, IMP), op(AND, ABY), op(NOP, IMP), op(RLA, ABY), op(NOP, ABX), op(AND, ABX), op(ROL, ABX), op(RLA, ABX),
    // 0x40
    op(RTI, IMP), op(EOR, IZX), op(STP, IMP), op(SRE, IZX), op(NOP, ZP),  op(EOR, ZP),  op(LSR, ZP),  op(SRE, ZP),
    op(PHA, IMP), op(EOR, IMM), op(LSR, ACC), op(ALR, IMM), op(JMP, ABS), op(EOR, ABS), op(LSR, ABS), op(SRE, ABS),
    // 0x50
    op(BVC, REL), op(EOR, IZY), op(STP, IMP), op(SRE, IZY), op(NOP, ZPX), op(EOR, ZPX), op(LSR, ZPX), op(SRE, ZPX),
    op(CLI, IMP), op(EOR, ABY), op(NOP, IMP), op(SRE, ABY), op(NOP, ABX), op(EOR, ABX), op(LSR, ABX), op(SRE, ABX),
    // 0x60
    op(RTS, IMP), op(ADC, IZX), op(STP, IMP), op(RRA, IZX), op(NOP, ZP),  op(ADC, ZP),  op(ROR, ZP),  op(RRA, ZP),
    op(PLA, IMP), op(ADC, IMM), op(ROR, ACC), op(ARR, IMM), op(JMP, IND), op(ADC, ABS), op(ROR, ABS), op(RRA, ABS),
    // 0x70
    op(BVS, REL), op(ADC, IZY), op(STP, IMP), op(RRA, IZY), op(NOP, ZPX), op(ADC, ZPX), op(ROR, ZPX), op(RRA, ZPX),
    op(SEI, IMP), op(ADC, ABY), op(NOP, IMP), op(RRA, ABY), op(NOP, ABX), op(ADC, ABX), op(ROR, ABX), op(RRA, ABX),
    // 0x80
    op(NOP, IMM), op(STA, IZX), op(NOP, IMM), op(SAX, IZX), op(STY, ZP),  op(STA, ZP),  op(STX, ZP),  op(SAX, ZP),
    op(DEY, IMP), op(NOP, IMM), op(TXA, IMP), op(XAA, IMM), op(STY, ABS), op(STA, ABS), op(STX, ABS), op(SAX, ABS),
    // 0x90
    op(BCC, REL), op(STA, IZY), op(STP, IMP), op(AHX, IZY), op(STY, ZPX), op(STA, ZPX), op(STX, ZPY), op(SAX, ZPY),
    op(TYA, IMP), op(STA, ABY), op(TXS, IMP), op(TAS, ABY), op(SHY, ABX), op(STA, ABX), op(SHX, ABY), op(AHX, ABY),
    // 0xA0
    op(LDY, IMM), op(LDA, IZX), op(LDX, IMM), op(LAX, IZX), op(LDY, ZP),  op(LDA, ZP),  op(LDX, ZP),  op(LAX, ZP),
    op(TAY, IMP), op(LDA, IMM), op(TAX, IMP), op(LXA, IMM), op(LDY, ABS), op(LDA, ABS), op(LDX, ABS), op(LAX, ABS),
    // 0xB0
    op(BCS, REL), op(LDA, IZY), op(STP, IMP), op(LAX, IZY), op(LDY, ZPX), op(LDA, ZPX), op(LDX, ZPY), op(LAX, ZPY),
    op(CLV, IMP), op(LDA, ABY), op(TSX, IMP), op(LAS, ABY), op(LDY, ABX), op(LDA, ABX), op(LDX, ABY), op(LAX, ABY),
    // 0xC0
    op(CPY, IMM), op(CMP, IZX), op(NOP, IMM), op(DCP, IZX), op(CPY, ZP),  op(CMP, ZP),  op(DEC, ZP),  op(DCP, ZP),
    op(INY, IMP), op(CMP, IMM), op(DEX, IMP), op(AXS, IMM), op(CPY, ABS), op(CMP, ABS), op(DEC, ABS), op(DCP, ABS),
    // 0xD0
    op(BNE, REL), op(CMP, IZY), op(STP, IMP), op(DCP, IZY), op(NOP, ZPX), op(CMP, ZPX), op(DEC, ZPX), op(DCP, ZPX),
    op(CLD, IMP), op(CMP, ABY), op(NOP, IMP), op(DCP, ABY), op(NOP, ABX), op(CMP, ABX), op(DEC, ABX), op(DCP, ABX),
    // 0xE0
    op(CPX, IMM), op(SBC, IZX), op(NOP, IMM), op(ISB, IZX), op(CPX, ZP),  op(SBC, ZP),  op(INC, ZP),  op(ISB, ZP),
    op(INX, IMP), op(SBC, IMM), op(NOP, IMP), op(SBC, IMM), op(CPX, ABS), op(SBC, ABS), op(INC, ABS), op(ISB, ABS),
    // 0xF0
    op(BEQ, REL), op(SBC, IZY), op(STP, IMP), op(ISB, IZY), op(NOP, ZPX), op(SBC, ZPX), op(INC, ZPX), op(ISB, ZPX),
    op(SED, IMP), op(SBC, ABY), op(NOP, IMP), op(ISB, ABY), op(NOP, ABX), op(SBC, ABX), op(INC, ABX), op(ISB, ABX),
];
