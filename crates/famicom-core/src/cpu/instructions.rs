//! Instruction semantics
//!
//! Decimal mode is ignored: ADC and SBC are always binary on the 2A03.

use super::{Bus, Cpu, Mnemonic, Operand, StatusFlags, IRQ_VECTOR};
use crate::bus::BusError;

impl Cpu {
    /// Run one decoded instruction against its resolved operand
    pub(crate) fn execute<B: Bus + ?Sized>(
        &mut self,
        mnemonic: Mnemonic,
        operand: Operand,
        bus: &mut B,
    ) -> Result<(), BusError> {
        match mnemonic {
            // Loads and stores
            Mnemonic::LDA => {
                let value = self.load(bus, operand)?;
                self.op_lda(value);
            }
            Mnemonic::LDX => {
                let value = self.load(bus, operand)?;
                self.op_ldx(value);
            }
            Mnemonic::LDY => {
                let value = self.load(bus, operand)?;
                self.op_ldy(value);
            }
            Mnemonic::STA => self.store(bus, operand, self.registers.a)?,
            Mnemonic::STX => self.store(bus, operand, self.registers.x)?,
            Mnemonic::STY => self.store(bus, operand, self.registers.y)?,

            // Transfers
            Mnemonic::TAX => self.op_ldx(self.registers.a),
            Mnemonic::TAY => self.op_ldy(self.registers.a),
            Mnemonic::TXA => self.op_lda(self.registers.x),
            Mnemonic::TYA => self.op_lda(self.registers.y),
            Mnemonic::TSX => self.op_ldx(self.registers.sp),
            Mnemonic::TXS => self.registers.sp = self.registers.x,

            // Arithmetic and logic
            Mnemonic::ADC => {
                let value = self.load(bus, operand)?;
                self.op_adc(value);
            }
            Mnemonic::SBC => {
                let value = self.load(bus, operand)?;
                self.op_sbc(value);
            }
            Mnemonic::AND => {
                let value = self.load(bus, operand)?;
                self.op_lda(self.registers.a & value);
            }
            Mnemonic::ORA => {
                let value = self.load(bus, operand)?;
                self.op_lda(self.registers.a | value);
            }
            Mnemonic::EOR => {
                let value = self.load(bus, operand)?;
                self.op_lda(self.registers.a ^ value);
            }
            Mnemonic::CMP => {
                let value = self.load(bus, operand)?;
                self.op_compare(self.registers.a, value);
            }
            Mnemonic::CPX => {
                let value = self.load(bus, operand)?;
                self.op_compare(self.registers.x, value);
            }
            Mnemonic::CPY => {
                let value = self.load(bus, operand)?;
                self.op_compare(self.registers.y, value);
            }
            Mnemonic::BIT => {
                let value = self.load(bus, operand)?;
                self.op_bit(value);
            }

            // Shifts and rotates, on memory or the accumulator
            Mnemonic::ASL => {
                self.modify(bus, operand, Self::op_asl)?;
            }
            Mnemonic::LSR => {
                self.modify(bus, operand, Self::op_lsr)?;
            }
            Mnemonic::ROL => {
                self.modify(bus, operand, Self::op_rol)?;
            }
            Mnemonic::ROR => {
                self.modify(bus, operand, Self::op_ror)?;
            }

            // Increments and decrements
            Mnemonic::INC => {
                self.modify(bus, operand, Self::op_inc)?;
            }
            Mnemonic::DEC => {
                self.modify(bus, operand, Self::op_dec)?;
            }
            Mnemonic::INX => self.op_ldx(self.registers.x.wrapping_add(1)),
            Mnemonic::INY => self.op_ldy(self.registers.y.wrapping_add(1)),
            Mnemonic::DEX => self.op_ldx(self.registers.x.wrapping_sub(1)),
            Mnemonic::DEY => self.op_ldy(self.registers.y.wrapping_sub(1)),

            // Branches
            Mnemonic::BCC => self.op_branch(!self.registers.flag(StatusFlags::CARRY), operand),
            Mnemonic::BCS => self.op_branch(self.registers.flag(StatusFlags::CARRY), operand),
            Mnemonic::BNE => self.op_branch(!self.registers.flag(StatusFlags::ZERO), operand),
            Mnemonic::BEQ => self.op_branch(self.registers.flag(StatusFlags::ZERO), operand),
            Mnemonic::BPL => self.op_branch(!self.registers.flag(StatusFlags::NEGATIVE), operand),
            Mnemonic::BMI => self.op_branch(self.registers.flag(StatusFlags::NEGATIVE), operand),
            Mnemonic::BVC => self.op_branch(!self.registers.flag(StatusFlags::OVERFLOW), operand),
            Mnemonic::BVS => self.op_branch(self.registers.flag(StatusFlags::OVERFLOW), operand),

            // Jumps, calls and interrupts
            Mnemonic::JMP => self.registers.pc = address_of(operand),
            Mnemonic::JSR => self.op_jsr(bus, address_of(operand))?,
            Mnemonic::RTS => self.op_rts(bus)?,
            Mnemonic::RTI => self.op_rti(bus)?,
            Mnemonic::BRK => self.op_brk(bus)?,

            // Stack
            Mnemonic::PHA => self.push(bus, self.registers.a)?,
            Mnemonic::PHP => {
                let status = self.registers.status() | StatusFlags::BREAK | StatusFlags::RESERVED;
                self.push(bus, status.bits())?;
            }
            Mnemonic::PLA => {
                let value = self.pull(bus)?;
                self.op_lda(value);
            }
            Mnemonic::PLP => {
                let value = self.pull(bus)?;
                self.restore_status(value);
            }

            // Flags
            Mnemonic::CLC => self.registers.set_flag(StatusFlags::CARRY, false),
            Mnemonic::SEC => self.registers.set_flag(StatusFlags::CARRY, true),
            Mnemonic::CLI => self.registers.set_flag(StatusFlags::INTERRUPT, false),
            Mnemonic::SEI => self.registers.set_flag(StatusFlags::INTERRUPT, true),
            Mnemonic::CLD => self.registers.set_flag(StatusFlags::DECIMAL, false),
            Mnemonic::SED => self.registers.set_flag(StatusFlags::DECIMAL, true),
            Mnemonic::CLV => self.registers.set_flag(StatusFlags::OVERFLOW, false),

            // Operand bytes are consumed but never read
            Mnemonic::NOP => {}

            // Undocumented combined operations
            Mnemonic::LAX => {
                let value = self.load(bus, operand)?;
                self.op_lda(value);
                self.registers.x = value;
            }
            Mnemonic::SAX => self.store(bus, operand, self.registers.a & self.registers.x)?,
            Mnemonic::DCP => {
                let value = self.modify(bus, operand, Self::op_dec)?;
                self.op_compare(self.registers.a, value);
            }
            Mnemonic::ISB => {
                let value = self.modify(bus, operand, Self::op_inc)?;
                self.op_sbc(value);
            }
            Mnemonic::SLO => {
                let value = self.modify(bus, operand, Self::op_asl)?;
                self.op_lda(self.registers.a | value);
            }
            Mnemonic::RLA => {
                let value = self.modify(bus, operand, Self::op_rol)?;
                self.op_lda(self.registers.a & value);
            }
            Mnemonic::SRE => {
                let value = self.modify(bus, operand, Self::op_lsr)?;
                self.op_lda(self.registers.a ^ value);
            }
            Mnemonic::RRA => {
                let value = self.modify(bus, operand, Self::op_ror)?;
                self.op_adc(value);
            }
            Mnemonic::ANC => {
                let value = self.load(bus, operand)?;
                self.op_lda(self.registers.a & value);
                let negative = self.registers.flag(StatusFlags::NEGATIVE);
                self.registers.set_flag(StatusFlags::CARRY, negative);
            }
            Mnemonic::ALR => {
                let value = self.load(bus, operand)?;
                let result = self.op_lsr(self.registers.a & value);
                self.registers.a = result;
            }
            Mnemonic::ARR => {
                let value = self.load(bus, operand)?;
                self.op_arr(value);
            }
            Mnemonic::AXS => {
                let value = self.load(bus, operand)?;
                let masked = self.registers.a & self.registers.x;
                self.registers.set_flag(StatusFlags::CARRY, masked >= value);
                self.op_ldx(masked.wrapping_sub(value));
            }

            // Rejected by dispatch before an operand is resolved
            Mnemonic::AHX
            | Mnemonic::LAS
            | Mnemonic::LXA
            | Mnemonic::SHX
            | Mnemonic::SHY
            | Mnemonic::STP
            | Mnemonic::TAS
            | Mnemonic::XAA => unreachable!("{mnemonic} reached the executor"),
        }
        Ok(())
    }

    /// Read the operand's value
    fn load<B: Bus + ?Sized>(&mut self, bus: &mut B, operand: Operand) -> Result<u8, BusError> {
        match operand {
            Operand::Address(address) => bus.read(address),
            Operand::Accumulator => Ok(self.registers.a),
            Operand::Implied => unreachable!("implied operand has no value"),
        }
    }

    fn store<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        value: u8,
    ) -> Result<(), BusError> {
        match operand {
            Operand::Address(address) => bus.write(address, value),
            Operand::Accumulator => {
                self.registers.a = value;
                Ok(())
            }
            Operand::Implied => unreachable!("implied operand cannot be written"),
        }
    }

    /// Read-modify-write: apply `op` to the operand and write the result back
    fn modify<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        op: fn(&mut Self, u8) -> u8,
    ) -> Result<u8, BusError> {
        let value = self.load(bus, operand)?;
        let result = op(self, value);
        self.store(bus, operand, result)?;
        Ok(result)
    }

    fn op_lda(&mut self, value: u8) {
        self.registers.a = value;
        self.registers.set_flags_zn(value);
    }

    fn op_ldx(&mut self, value: u8) {
        self.registers.x = value;
        self.registers.set_flags_zn(value);
    }

    fn op_ldy(&mut self, value: u8) {
        self.registers.y = value;
        self.registers.set_flags_zn(value);
    }

    fn op_adc(&mut self, value: u8) {
        let a = self.registers.a;
        let carry = u16::from(self.registers.flag(StatusFlags::CARRY));
        let sum = u16::from(a) + u16::from(value) + carry;
        let result = sum as u8;

        self.registers.set_flag(StatusFlags::CARRY, sum > 0xFF);
        // Both inputs share a sign that the result does not
        let overflow = (a ^ value) & 0x80 == 0 && (a ^ result) & 0x80 != 0;
        self.registers.set_flag(StatusFlags::OVERFLOW, overflow);
        self.op_lda(result);
    }

    fn op_sbc(&mut self, value: u8) {
        // A - M - !C is A + !M + C in two's complement
        self.op_adc(!value);
    }

    fn op_compare(&mut self, register: u8, value: u8) {
        self.registers.set_flag(StatusFlags::CARRY, register >= value);
        self.registers.set_flags_zn(register.wrapping_sub(value));
    }

    fn op_bit(&mut self, value: u8) {
        self.registers.set_flag(StatusFlags::ZERO, self.registers.a & value == 0);
        self.registers.set_flag(StatusFlags::OVERFLOW, value & 0x40 != 0);
        self.registers.set_flag(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }

    fn op_asl(&mut self, value: u8) -> u8 {
        self.registers.set_flag(StatusFlags::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.registers.set_flags_zn(result);
        result
    }

    fn op_lsr(&mut self, value: u8) -> u8 {
        self.registers.set_flag(StatusFlags::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.registers.set_flags_zn(result);
        result
    }

    fn op_rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.registers.flag(StatusFlags::CARRY));
        self.registers.set_flag(StatusFlags::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.registers.set_flags_zn(result);
        result
    }

    fn op_ror(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.registers.flag(StatusFlags::CARRY)) << 7;
        self.registers.set_flag(StatusFlags::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.registers.set_flags_zn(result);
        result
    }

    fn op_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.registers.set_flags_zn(result);
        result
    }

    fn op_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.registers.set_flags_zn(result);
        result
    }

    fn op_arr(&mut self, value: u8) {
        let carry_in = u8::from(self.registers.flag(StatusFlags::CARRY)) << 7;
        let result = ((self.registers.a & value) >> 1) | carry_in;
        self.op_lda(result);
        let bit6 = result & 0x40 != 0;
        let bit5 = result & 0x20 != 0;
        self.registers.set_flag(StatusFlags::CARRY, bit6);
        self.registers.set_flag(StatusFlags::OVERFLOW, bit6 ^ bit5);
    }

    fn op_branch(&mut self, condition: bool, operand: Operand) {
        if condition {
            self.registers.pc = address_of(operand);
        }
    }

    fn op_jsr<B: Bus + ?Sized>(&mut self, bus: &mut B, target: u16) -> Result<(), BusError> {
        let [lo, hi] = self.registers.pc.wrapping_sub(1).to_le_bytes();
        self.push(bus, hi)?;
        self.push(bus, lo)?;
        self.registers.pc = target;
        Ok(())
    }

    fn op_rts<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let lo = self.pull(bus)?;
        let hi = self.pull(bus)?;
        self.registers.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
        Ok(())
    }

    fn op_rti<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let status = self.pull(bus)?;
        self.restore_status(status);
        let lo = self.pull(bus)?;
        let hi = self.pull(bus)?;
        self.registers.pc = u16::from_le_bytes([lo, hi]);
        Ok(())
    }

    fn op_brk<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), BusError> {
        // BRK is followed by a padding byte
        let [lo, hi] = self.registers.pc.wrapping_add(1).to_le_bytes();
        self.push(bus, hi)?;
        self.push(bus, lo)?;
        let status = self.registers.status() | StatusFlags::BREAK | StatusFlags::RESERVED;
        self.push(bus, status.bits())?;
        self.registers.set_flag(StatusFlags::INTERRUPT, true);
        self.registers.pc = self.read_vector(bus, IRQ_VECTOR)?;
        Ok(())
    }

    /// Status pulled from the stack: reserved forced on, break cleared
    fn restore_status(&mut self, value: u8) {
        self.registers.set_status(value);
        self.registers.set_flag(StatusFlags::BREAK, false);
    }
}

fn address_of(operand: Operand) -> u16 {
    match operand {
        Operand::Address(address) => address,
        Operand::Accumulator | Operand::Implied => {
            unreachable!("jump target must be an address")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatBus;

    /// Load `program` at $0600 and run `steps` instructions
    fn run(program: &[u8], steps: usize, setup: impl FnOnce(&mut Cpu, &mut FlatBus)) -> (Cpu, FlatBus) {
        let mut bus = FlatBus::new();
        bus.load(0x0600, program);
        let mut cpu = Cpu::new();
        cpu.registers_mut().pc = 0x0600;
        setup(&mut cpu, &mut bus);
        for _ in 0..steps {
            cpu.step(&mut bus).unwrap();
        }
        (cpu, bus)
    }

    #[test]
    fn test_adc_signed_overflow() {
        let (cpu, _) = run(&[0x69, 0x50], 1, |cpu, _| {
            cpu.registers_mut().a = 0x50;
            cpu.registers_mut().set_flag(StatusFlags::CARRY, false);
        });
        assert_eq!(cpu.registers().a, 0xA0);
        assert!(!cpu.status().contains(StatusFlags::CARRY));
        assert!(cpu.status().contains(StatusFlags::OVERFLOW));
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_adc_carry_out() {
        let (cpu, _) = run(&[0x69, 0x01], 1, |cpu, _| {
            cpu.registers_mut().a = 0xFF;
            cpu.registers_mut().set_flag(StatusFlags::CARRY, false);
        });
        assert_eq!(cpu.registers().a, 0x00);
        assert!(cpu.status().contains(StatusFlags::CARRY));
        assert!(!cpu.status().contains(StatusFlags::OVERFLOW));
        assert!(cpu.status().contains(StatusFlags::ZERO));
    }

    #[test]
    fn test_sbc_borrow() {
        // SEC; LDA #$10; SBC #$20
        let (cpu, _) = run(&[0x38, 0xA9, 0x10, 0xE9, 0x20], 3, |_, _| {});
        assert_eq!(cpu.registers().a, 0xF0);
        assert!(!cpu.status().contains(StatusFlags::CARRY));
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_cmp_borrow() {
        let (cpu, _) = run(&[0xC9, 0x20], 1, |cpu, _| cpu.registers_mut().a = 0x10);
        assert!(!cpu.status().contains(StatusFlags::CARRY));
        assert!(!cpu.status().contains(StatusFlags::ZERO));
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_rotate_uses_previous_carry() {
        // SEC; LDA #$80; ROL A
        let (cpu, _) = run(&[0x38, 0xA9, 0x80, 0x2A], 3, |_, _| {});
        assert_eq!(cpu.registers().a, 0x01);
        assert!(cpu.status().contains(StatusFlags::CARRY));

        // CLC; LDA #$01; ROR A
        let (cpu, _) = run(&[0x18, 0xA9, 0x01, 0x6A], 3, |_, _| {});
        assert_eq!(cpu.registers().a, 0x00);
        assert!(cpu.status().contains(StatusFlags::CARRY));
        assert!(cpu.status().contains(StatusFlags::ZERO));
    }

    #[test]
    fn test_memory_shift() {
        // ASL $10
        let (cpu, bus) = run(&[0x06, 0x10], 1, |_, bus| bus.load(0x0010, &[0xC1]));
        assert_eq!(bus.peek(0x0010), 0x82);
        assert!(cpu.status().contains(StatusFlags::CARRY));
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_php_plp_break_handling() {
        // PHP; PLP
        let (cpu, bus) = run(&[0x08, 0x28], 2, |cpu, _| cpu.registers_mut().set_status(0x01));
        assert_eq!(bus.peek(0x01FD), 0x31);
        assert_eq!(cpu.status().bits(), 0x21);
        assert_eq!(cpu.registers().sp, 0xFD);
    }

    #[test]
    fn test_bit_copies_high_bits() {
        let (cpu, _) = run(&[0x24, 0x10], 1, |cpu, bus| {
            cpu.registers_mut().a = 0x01;
            bus.load(0x0010, &[0xC0]);
        });
        assert!(cpu.status().contains(StatusFlags::ZERO));
        assert!(cpu.status().contains(StatusFlags::OVERFLOW));
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
    }

    #[test]
    fn test_branch_taken_and_not_taken() {
        // LDX #$00; BNE +2; BEQ -6
        let (cpu, _) = run(&[0xA2, 0x00, 0xD0, 0x02, 0xF0, 0xFA], 3, |_, _| {});
        assert_eq!(cpu.registers().pc, 0x0600);
    }

    #[test]
    fn test_brk_pushes_and_vectors() {
        let (cpu, bus) = run(&[0x00, 0xEA], 1, |cpu, bus| {
            bus.load(IRQ_VECTOR, &[0x00, 0x80]);
            cpu.registers_mut().set_status(0x00);
        });
        assert_eq!(cpu.registers().pc, 0x8000);
        assert_eq!(bus.peek(0x01FD), 0x06);
        assert_eq!(bus.peek(0x01FC), 0x02);
        assert_eq!(bus.peek(0x01FB), 0x30);
        assert!(cpu.status().contains(StatusFlags::INTERRUPT));
    }

    #[test]
    fn test_rti_restores_state() {
        let (cpu, _) = run(&[0x40], 1, |cpu, bus| {
            cpu.registers_mut().sp = 0xFA;
            bus.load(0x01FB, &[0xFF, 0x34, 0x12]);
        });
        assert_eq!(cpu.registers().pc, 0x1234);
        assert_eq!(cpu.status().bits(), 0xEF);
        assert_eq!(cpu.registers().sp, 0xFD);
    }

    #[test]
    fn test_txs_leaves_flags() {
        let (cpu, _) = run(&[0x9A], 1, |cpu, _| {
            cpu.registers_mut().x = 0x00;
            cpu.registers_mut().set_status(0x80);
        });
        assert_eq!(cpu.registers().sp, 0x00);
        assert!(cpu.status().contains(StatusFlags::NEGATIVE));
        assert!(!cpu.status().contains(StatusFlags::ZERO));
    }

    #[test]
    fn test_undocumented_lax_and_sax() {
        // LAX $10; SAX $11
        let (cpu, bus) = run(&[0xA7, 0x10, 0x87, 0x11], 2, |_, bus| bus.load(0x0010, &[0x8F]));
        assert_eq!(cpu.registers().a, 0x8F);
        assert_eq!(cpu.registers().x, 0x8F);
        assert_eq!(bus.peek(0x0011), 0x8F);
    }

    #[test]
    fn test_undocumented_dcp_and_isb() {
        // DCP $10
        let (cpu, bus) = run(&[0xC7, 0x10], 1, |cpu, bus| {
            cpu.registers_mut().a = 0x40;
            bus.load(0x0010, &[0x41]);
        });
        assert_eq!(bus.peek(0x0010), 0x40);
        assert!(cpu.status().contains(StatusFlags::ZERO));
        assert!(cpu.status().contains(StatusFlags::CARRY));

        // SEC; ISB $10
        let (cpu, bus) = run(&[0x38, 0xE7, 0x10], 2, |cpu, bus| {
            cpu.registers_mut().a = 0x10;
            bus.load(0x0010, &[0x04]);
        });
        assert_eq!(bus.peek(0x0010), 0x05);
        assert_eq!(cpu.registers().a, 0x0B);
    }

    #[test]
    fn test_undocumented_shift_combos() {
        // SLO $10
        let (cpu, bus) = run(&[0x07, 0x10], 1, |cpu, bus| {
            cpu.registers_mut().a = 0x01;
            bus.load(0x0010, &[0x81]);
        });
        assert_eq!(bus.peek(0x0010), 0x02);
        assert_eq!(cpu.registers().a, 0x03);
        assert!(cpu.status().contains(StatusFlags::CARRY));

        // SRE $10
        let (cpu, _) = run(&[0x47, 0x10], 1, |cpu, bus| {
            cpu.registers_mut().a = 0xFF;
            bus.load(0x0010, &[0x02]);
        });
        assert_eq!(cpu.registers().a, 0xFE);
    }

    #[test]
    fn test_axs() {
        let (cpu, _) = run(&[0xCB, 0x02], 1, |cpu, _| {
            cpu.registers_mut().a = 0x0F;
            cpu.registers_mut().x = 0x3C;
        });
        assert_eq!(cpu.registers().x, 0x0A);
        assert!(cpu.status().contains(StatusFlags::CARRY));
    }
}
