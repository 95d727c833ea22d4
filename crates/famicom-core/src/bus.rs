//! Memory bus and address decoding
//!
//! The CPU memory map, decoded on the top three address bits:
//! $0000-$1FFF - 2KB internal RAM, mirrored every $0800
//! $2000-$3FFF - PPU registers, mirrored every 8 bytes
//! $4000-$401F - APU and I/O registers (controllers, OAM DMA)
//! $4020-$5FFF - Cartridge expansion (not supported, fatal)
//! $6000-$7FFF - Cartridge save RAM
//! $8000-$FFFF - Cartridge PRG ROM, four 8KB windows (writes are fatal)

use thiserror::Error;

use crate::cartridge::Cartridge;
use crate::controller::{Controllers, Port};
use crate::cpu::Bus;
use crate::ppu::Ppu;

/// RAM size in bytes
pub const RAM_SIZE: usize = 0x0800;
/// Save RAM size in bytes
pub const SAVE_RAM_SIZE: usize = 0x2000;

const OAM_DMA: u16 = 0x4014;
const JOYPAD_1: u16 = 0x4016;
const JOYPAD_2: u16 = 0x4017;

/// Accesses the hardware model does not support. All of them halt the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("access to unsupported expansion area ${address:04X}")]
    ExpansionAccess { address: u16 },
    #[error("write of ${value:02X} to program ROM at ${address:04X}")]
    ProgramRomWrite { address: u16, value: u8 },
    #[error("read of write-only PPU register ${address:04X}")]
    WriteOnlyRegister { address: u16 },
    #[error("write to read-only PPU register ${address:04X}")]
    ReadOnlyRegister { address: u16 },
    #[error("write of ${value:02X} to pattern ROM at PPU ${address:04X}")]
    PatternRomWrite { address: u16, value: u8 },
}

/// Console memory bus
#[derive(Debug, Clone)]
pub struct NesBus {
    ram: [u8; RAM_SIZE],
    save_ram: Vec<u8>,
    prg_rom: Vec<u8>,
    /// Offsets into `prg_rom` for $8000, $A000, $C000, $E000
    prg_windows: [usize; 4],
    ppu: Ppu,
    controllers: Controllers,
}

impl NesBus {
    /// Build the bus around a cartridge, taking ownership of its banks
    pub fn new(cartridge: Cartridge) -> Self {
        let prg_windows = cartridge.prg_windows();
        let mirroring = cartridge.mirroring();
        let (prg_rom, chr_rom) = cartridge.into_parts();

        Self {
            ram: [0; RAM_SIZE],
            save_ram: vec![0; SAVE_RAM_SIZE],
            prg_rom,
            prg_windows,
            ppu: Ppu::new(chr_rom, mirroring),
            controllers: Controllers::new(),
        }
    }

    /// Clear transient device state. RAM contents survive, as on hardware.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.controllers.reset();
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn controllers(&self) -> &Controllers {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut Controllers {
        &mut self.controllers
    }

    pub fn save_ram(&self) -> &[u8] {
        &self.save_ram
    }

    fn prg_offset(&self, address: u16) -> usize {
        let window = usize::from(address >> 13) - 4;
        self.prg_windows[window] + usize::from(address & 0x1FFF)
    }

    fn read_io(&mut self, address: u16) -> u8 {
        match address {
            JOYPAD_1 => self.controllers.read(Port::One),
            JOYPAD_2 => self.controllers.read(Port::Two),
            _ => 0,
        }
    }

    /// Audio registers are accepted and dropped
    fn write_io(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        match address {
            OAM_DMA => self.oam_dma(value)?,
            JOYPAD_1 => self.controllers.write_strobe(value),
            _ => {}
        }
        Ok(())
    }

    /// Copy page `page` of CPU memory into OAM
    fn oam_dma(&mut self, page: u8) -> Result<(), BusError> {
        log::debug!("OAM DMA from ${page:02X}00");
        let base = u16::from(page) << 8;
        for offset in 0..=0xFF {
            let value = self.read(base | offset)?;
            self.ppu.write_oam(value);
        }
        Ok(())
    }
}

impl Bus for NesBus {
    fn read(&mut self, address: u16) -> Result<u8, BusError> {
        match address >> 13 {
            0 => Ok(self.ram[usize::from(address) & (RAM_SIZE - 1)]),
            1 => self.ppu.read_register(address),
            2 if address < 0x4020 => Ok(self.read_io(address)),
            2 => Err(BusError::ExpansionAccess { address }),
            3 => Ok(self.save_ram[usize::from(address) & (SAVE_RAM_SIZE - 1)]),
            _ => Ok(self.prg_rom[self.prg_offset(address)]),
        }
    }

    fn write(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        match address >> 13 {
            0 => self.ram[usize::from(address) & (RAM_SIZE - 1)] = value,
            1 => self.ppu.write_register(address, value)?,
            2 if address < 0x4020 => self.write_io(address, value)?,
            2 => return Err(BusError::ExpansionAccess { address }),
            3 => self.save_ram[usize::from(address) & (SAVE_RAM_SIZE - 1)] = value,
            _ => return Err(BusError::ProgramRomWrite { address, value }),
        }
        Ok(())
    }

    fn peek(&self, address: u16) -> u8 {
        match address >> 13 {
            0 => self.ram[usize::from(address) & (RAM_SIZE - 1)],
            1 => self.ppu.peek_register(address),
            2 => 0,
            3 => self.save_ram[usize::from(address) & (SAVE_RAM_SIZE - 1)],
            _ => self.prg_rom[self.prg_offset(address)],
        }
    }
}

/// A flat 64KB RAM bus with no devices, for running CPU code in isolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatBus {
    memory: Vec<u8>,
}

impl FlatBus {
    pub fn new() -> Self {
        Self { memory: vec![0; 0x10000] }
    }

    /// Copy `bytes` into memory starting at `address`, wrapping at $FFFF
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        for (offset, &byte) in bytes.iter().enumerate() {
            let target = address.wrapping_add(offset as u16);
            self.memory[usize::from(target)] = byte;
        }
    }
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatBus {
    fn read(&mut self, address: u16) -> Result<u8, BusError> {
        Ok(self.memory[usize::from(address)])
    }

    fn write(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        self.memory[usize::from(address)] = value;
        Ok(())
    }

    fn peek(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{CHR_UNIT, HEADER_SIZE, PRG_UNIT};
    use crate::controller::Button;

    fn bus_with_prg(prg_banks: u8) -> NesBus {
        let mut bytes = vec![b'N', b'E', b'S', 0x1A, prg_banks, 1, 0, 0];
        bytes.resize(HEADER_SIZE, 0);
        for bank in 0..prg_banks {
            bytes.extend(std::iter::repeat(0x10 + bank).take(PRG_UNIT));
        }
        bytes.resize(bytes.len() + CHR_UNIT, 0);
        NesBus::new(Cartridge::from_bytes(&bytes).unwrap())
    }

    #[test]
    fn test_ram_mirroring() {
        let mut bus = bus_with_prg(1);
        bus.write(0x0001, 0x42).unwrap();
        assert_eq!(bus.read(0x0801).unwrap(), 0x42);
        assert_eq!(bus.read(0x1801).unwrap(), 0x42);
    }

    #[test]
    fn test_save_ram() {
        let mut bus = bus_with_prg(1);
        bus.write(0x6000, 0x99).unwrap();
        assert_eq!(bus.read(0x6000).unwrap(), 0x99);
        assert_eq!(bus.save_ram()[0], 0x99);
    }

    #[test]
    fn test_prg_windows() {
        let mut small = bus_with_prg(1);
        assert_eq!(small.read(0x8000).unwrap(), 0x10);
        assert_eq!(small.read(0xC000).unwrap(), 0x10);

        let mut large = bus_with_prg(2);
        assert_eq!(large.read(0xBFFF).unwrap(), 0x10);
        assert_eq!(large.read(0xC000).unwrap(), 0x11);
    }

    #[test]
    fn test_prg_write_is_fatal() {
        let mut bus = bus_with_prg(1);
        assert_eq!(
            bus.write(0x8000, 0x01),
            Err(BusError::ProgramRomWrite { address: 0x8000, value: 0x01 })
        );
    }

    #[test]
    fn test_expansion_is_fatal() {
        let mut bus = bus_with_prg(1);
        assert_eq!(bus.read(0x4020), Err(BusError::ExpansionAccess { address: 0x4020 }));
        assert_eq!(bus.write(0x5FFF, 0), Err(BusError::ExpansionAccess { address: 0x5FFF }));
    }

    #[test]
    fn test_ppu_register_mirror() {
        let mut bus = bus_with_prg(1);
        bus.ppu_mut().start_vblank();
        assert_eq!(bus.read(0x3FFA).unwrap() & 0x80, 0x80);
        assert_eq!(bus.read(0x2002).unwrap() & 0x80, 0x00);
    }

    #[test]
    fn test_joypad_strobe() {
        let mut bus = bus_with_prg(1);
        bus.controllers_mut().set_button(Port::One, Button::B, true);
        bus.write(0x4016, 1).unwrap();
        bus.write(0x4016, 0).unwrap();
        assert_eq!(bus.read(0x4016).unwrap(), 0);
        assert_eq!(bus.read(0x4016).unwrap(), 1);
    }

    #[test]
    fn test_audio_registers_are_dropped() {
        let mut bus = bus_with_prg(1);
        bus.write(0x4000, 0x3F).unwrap();
        bus.write(0x4015, 0x0F).unwrap();
        assert_eq!(bus.read(0x4000).unwrap(), 0);
        assert_eq!(bus.read(0x4015).unwrap(), 0);
        assert_eq!(bus.peek(0x4015), 0);
    }

    #[test]
    fn test_oam_dma() {
        let mut bus = bus_with_prg(1);
        for i in 0..=0xFFu16 {
            bus.write(0x0200 + i, i as u8).unwrap();
        }
        bus.write(0x4014, 0x02).unwrap();
        assert_eq!(bus.ppu().oam()[0x00], 0x00);
        assert_eq!(bus.ppu().oam()[0x7F], 0x7F);
        assert_eq!(bus.ppu().oam()[0xFF], 0xFF);
    }

    #[test]
    fn test_peek_has_no_side_effects() {
        let mut bus = bus_with_prg(1);
        bus.ppu_mut().start_vblank();
        assert_eq!(bus.peek(0x2002) & 0x80, 0x80);
        assert_eq!(bus.peek(0x2002) & 0x80, 0x80);
        assert_eq!(bus.peek(0x4020), 0);
    }
}
