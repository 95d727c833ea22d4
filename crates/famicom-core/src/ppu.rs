//! PPU (Picture Processing Unit) registers and graphics memory
//!
//! Only the CPU-visible side of the picture unit is modelled: the eight registers at
//! $2000-$2007, a 16-window table of 1KB graphics banks, the palette index table and
//! OAM. Pixels are produced from this state by [`crate::render`] once per frame.
//!
//! Graphics address space ($0000-$3FFF):
//! $0000-$1FFF - Pattern tables (windows 0-7)
//! $2000-$2FFF - Name tables (windows 8-11, arranged by mirroring)
//! $3000-$3EFF - Name table mirror (windows 12-15)
//! $3F00-$3FFF - Palette index table (32 entries, mirrored)

use bitflags::bitflags;

use crate::bus::BusError;
use crate::cartridge::Mirroring;

/// Size of one graphics bank window
pub const BANK_SIZE: usize = 0x0400;
/// Number of graphics bank windows
pub const BANK_COUNT: usize = 16;
/// Pattern memory size (two 4KB pattern tables)
pub const PATTERN_SIZE: usize = 0x2000;
/// Size of one pattern table
pub const PATTERN_TABLE_SIZE: usize = 0x1000;
/// Name table memory; four pages cover the four-screen layout
pub const NAMETABLE_MEMORY_SIZE: usize = 4 * BANK_SIZE;
/// Palette index entries
pub const PALETTE_SIZE: usize = 32;
/// Object Attribute Memory
pub const OAM_SIZE: usize = 256;

/// First address of palette space
const PALETTE_START: u16 = 0x3F00;
/// First window holding a name table
const NAMETABLE_WINDOW: usize = 8;

bitflags! {
    /// $2000 PPUCTRL
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuCtrl: u8 {
        const NMI_ENABLE = 0b1000_0000;
        const MASTER_SLAVE = 0b0100_0000;
        const SPRITE_SIZE = 0b0010_0000;
        const BG_PATTERN_TABLE = 0b0001_0000;
        const SPR_PATTERN_TABLE = 0b0000_1000;
        const VRAM_INC = 0b0000_0100;
        const NAMETABLE = 0b0000_0011;
    }
}

bitflags! {
    /// $2001 PPUMASK
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuMask: u8 {
        const EMPHASIZE_BLUE = 0b1000_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const RENDER_SPR = 0b0001_0000;
        const RENDER_BG = 0b0000_1000;
        const RENDER_SPR_LEFT = 0b0000_0100;
        const RENDER_BG_LEFT = 0b0000_0010;
        const GRAYSCALE = 0b0000_0001;
    }
}

bitflags! {
    /// $2002 PPUSTATUS
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const VBLANK = 0b1000_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const SPRITE_OVERFLOW = 0b0010_0000;
    }
}

/// Backing store of one 1KB graphics window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankSource {
    /// Offset into pattern memory
    Pattern(usize),
    /// Offset into name table memory
    Nametable(usize),
}

/// Picture unit register file and graphics memory
#[derive(Debug, Clone)]
pub struct Ppu {
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    oam: [u8; OAM_SIZE],
    /// $2005 writes: horizontal, vertical
    scroll: [u8; 2],
    /// Shared $2005/$2006 write toggle; true after the first write
    write_latch: bool,
    vram_addr: u16,
    /// Delayed $2007 read value
    read_buffer: u8,
    palette: [u8; PALETTE_SIZE],
    banks: [BankSource; BANK_COUNT],
    pattern: Vec<u8>,
    pattern_writable: bool,
    nametables: [u8; NAMETABLE_MEMORY_SIZE],
}

impl Ppu {
    /// Create a picture unit over cartridge pattern data.
    ///
    /// `pattern` is the cartridge's 8KB graphics ROM, or empty for a cartridge with
    /// graphics RAM, in which case 8KB of writable pattern memory is allocated.
    pub fn new(pattern: Vec<u8>, mirroring: Mirroring) -> Self {
        let pattern_writable = pattern.is_empty();
        let mut pattern = pattern;
        pattern.resize(PATTERN_SIZE, 0);

        let mut ppu = Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            oam: [0; OAM_SIZE],
            scroll: [0; 2],
            write_latch: false,
            vram_addr: 0,
            read_buffer: 0,
            palette: [0; PALETTE_SIZE],
            banks: [BankSource::Pattern(0); BANK_COUNT],
            pattern,
            pattern_writable,
            nametables: [0; NAMETABLE_MEMORY_SIZE],
        };
        ppu.map_banks(mirroring);
        ppu
    }

    /// Mapper 0 layout: pattern windows are linear, name tables follow the mirroring
    fn map_banks(&mut self, mirroring: Mirroring) {
        for (index, bank) in self.banks.iter_mut().take(NAMETABLE_WINDOW).enumerate() {
            *bank = BankSource::Pattern(index * BANK_SIZE);
        }

        let pages: [usize; 4] = match mirroring {
            Mirroring::FourScreen => [0, 1, 2, 3],
            Mirroring::Vertical => [0, 1, 0, 1],
            Mirroring::Horizontal => [0, 0, 1, 1],
        };
        for (index, page) in pages.into_iter().enumerate() {
            let source = BankSource::Nametable(page * BANK_SIZE);
            self.banks[NAMETABLE_WINDOW + index] = source;
            self.banks[NAMETABLE_WINDOW + 4 + index] = source;
        }
    }

    /// Clear transient register state. Graphics memory is kept.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr = 0;
        self.scroll = [0; 2];
        self.write_latch = false;
        self.vram_addr = 0;
        self.read_buffer = 0;
    }

    /// CPU read from a register at $2000-$3FFF
    pub fn read_register(&mut self, address: u16) -> Result<u8, BusError> {
        match address & 0x0007 {
            2 => {
                let value = self.status.bits();
                self.status.remove(PpuStatus::VBLANK);
                self.write_latch = false;
                Ok(value)
            }
            4 => {
                let value = self.oam[usize::from(self.oam_addr)];
                self.oam_addr = self.oam_addr.wrapping_add(1);
                Ok(value)
            }
            7 => {
                let value = self.read_data(self.vram_addr);
                self.increment_vram_addr();
                Ok(value)
            }
            _ => Err(BusError::WriteOnlyRegister { address }),
        }
    }

    /// CPU write to a register at $2000-$3FFF
    pub fn write_register(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        match address & 0x0007 {
            0 => {
                self.ctrl = PpuCtrl::from_bits_retain(value);
                log::debug!("PPUCTRL = ${value:02X}");
            }
            1 => self.mask = PpuMask::from_bits_retain(value),
            2 => return Err(BusError::ReadOnlyRegister { address }),
            3 => self.oam_addr = value,
            4 => self.write_oam(value),
            5 => {
                self.scroll[usize::from(self.write_latch)] = value;
                self.write_latch = !self.write_latch;
            }
            6 => {
                self.vram_addr = if self.write_latch {
                    (self.vram_addr & 0xFF00) | u16::from(value)
                } else {
                    (self.vram_addr & 0x00FF) | (u16::from(value) << 8)
                };
                self.write_latch = !self.write_latch;
            }
            _ => {
                self.write_data(self.vram_addr, value)?;
                self.increment_vram_addr();
            }
        }
        Ok(())
    }

    /// Register value as seen by a debugger; no side effects
    pub fn peek_register(&self, address: u16) -> u8 {
        match address & 0x0007 {
            2 => self.status.bits(),
            4 => self.oam[usize::from(self.oam_addr)],
            7 => self.read_buffer,
            _ => 0,
        }
    }

    /// Store one byte at the OAM address and advance it (also used by OAM DMA)
    pub fn write_oam(&mut self, value: u8) {
        self.oam[usize::from(self.oam_addr)] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn increment_vram_addr(&mut self) {
        let step = if self.ctrl.contains(PpuCtrl::VRAM_INC) { 32 } else { 1 };
        self.vram_addr = self.vram_addr.wrapping_add(step);
    }

    /// Data port read. Below palette space the previous buffered byte is returned and
    /// the buffer refilled; palette reads return immediately.
    fn read_data(&mut self, address: u16) -> u8 {
        let address = address & 0x3FFF;
        if address < PALETTE_START {
            let value = self.read_buffer;
            self.read_buffer = self.bank_byte(address);
            value
        } else {
            let value = self.palette[usize::from(address & 0x1F)];
            self.read_buffer = value;
            value
        }
    }

    fn write_data(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        let address = address & 0x3FFF;
        if address >= PALETTE_START {
            self.write_palette(address, value);
            return Ok(());
        }

        let offset = usize::from(address) % BANK_SIZE;
        match self.banks[usize::from(address) / BANK_SIZE] {
            BankSource::Pattern(base) => {
                if !self.pattern_writable {
                    return Err(BusError::PatternRomWrite { address, value });
                }
                self.pattern[base + offset] = value;
            }
            BankSource::Nametable(base) => self.nametables[base + offset] = value,
        }
        Ok(())
    }

    /// Entries 0, 4, 8 and C of each half are shared with the other half
    fn write_palette(&mut self, address: u16, value: u8) {
        let value = value & 0x3F;
        if address & 0x0003 != 0 {
            self.palette[usize::from(address & 0x1F)] = value;
        } else {
            let entry = usize::from(address & 0x0F);
            self.palette[entry] = value;
            self.palette[entry | 0x10] = value;
        }
    }

    fn bank_byte(&self, address: u16) -> u8 {
        let offset = usize::from(address) % BANK_SIZE;
        match self.banks[usize::from(address) / BANK_SIZE] {
            BankSource::Pattern(base) => self.pattern[base + offset],
            BankSource::Nametable(base) => self.nametables[base + offset],
        }
    }

    /// `len` contiguous bytes starting at graphics window `bank`
    fn window(&self, bank: usize, len: usize) -> &[u8] {
        match self.banks[bank] {
            BankSource::Pattern(base) => &self.pattern[base..base + len],
            BankSource::Nametable(base) => &self.nametables[base..base + len],
        }
    }

    /// Name table `index` (0-3) including its attribute bytes
    pub fn nametable(&self, index: usize) -> &[u8] {
        self.window(NAMETABLE_WINDOW + (index & 3), BANK_SIZE)
    }

    /// Pattern table 0 ($0000) or 1 ($1000)
    pub fn pattern_table(&self, index: usize) -> &[u8] {
        self.window((index & 1) * 4, PATTERN_TABLE_SIZE)
    }

    /// Pattern table selected for the background by PPUCTRL
    pub fn background_pattern_table(&self) -> &[u8] {
        self.pattern_table(usize::from(self.ctrl.contains(PpuCtrl::BG_PATTERN_TABLE)))
    }

    pub fn start_vblank(&mut self) {
        self.status.insert(PpuStatus::VBLANK);
    }

    pub fn nmi_enabled(&self) -> bool {
        self.ctrl.contains(PpuCtrl::NMI_ENABLE)
    }

    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn vram_addr(&self) -> u16 {
        self.vram_addr
    }

    pub fn scroll(&self) -> (u8, u8) {
        (self.scroll[0], self.scroll[1])
    }

    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    /// Palette index table ($3F00-$3F1F)
    pub fn palette(&self) -> &[u8; PALETTE_SIZE] {
        &self.palette
    }

    pub fn bank(&self, index: usize) -> BankSource {
        self.banks[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_addr(ppu: &mut Ppu, address: u16) {
        ppu.write_register(0x2006, (address >> 8) as u8).unwrap();
        ppu.write_register(0x2006, address as u8).unwrap();
    }

    #[test]
    fn test_vertical_mirroring_windows() {
        let ppu = Ppu::new(Vec::new(), Mirroring::Vertical);
        assert_eq!(ppu.bank(8), BankSource::Nametable(0));
        assert_eq!(ppu.bank(9), BankSource::Nametable(BANK_SIZE));
        assert_eq!(ppu.bank(10), BankSource::Nametable(0));
        assert_eq!(ppu.bank(11), BankSource::Nametable(BANK_SIZE));
        assert_eq!(ppu.bank(14), ppu.bank(10));
        assert_eq!(ppu.bank(3), BankSource::Pattern(3 * BANK_SIZE));
    }

    #[test]
    fn test_horizontal_mirroring_shares_pages() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        set_addr(&mut ppu, 0x2005);
        ppu.write_register(0x2007, 0x42).unwrap();

        assert_eq!(ppu.nametable(1)[5], 0x42);
        assert_eq!(ppu.nametable(2)[5], 0x00);
    }

    #[test]
    fn test_buffered_data_read() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        set_addr(&mut ppu, 0x2000);
        ppu.write_register(0x2007, 0x11).unwrap();
        ppu.write_register(0x2007, 0x22).unwrap();

        set_addr(&mut ppu, 0x2000);
        let _stale = ppu.read_register(0x2007).unwrap();
        assert_eq!(ppu.read_register(0x2007).unwrap(), 0x11);
        assert_eq!(ppu.read_register(0x2007).unwrap(), 0x22);
    }

    #[test]
    fn test_palette_read_not_delayed() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        set_addr(&mut ppu, 0x3F01);
        ppu.write_register(0x2007, 0x2A).unwrap();

        set_addr(&mut ppu, 0x3F01);
        assert_eq!(ppu.read_register(0x2007).unwrap(), 0x2A);
    }

    #[test]
    fn test_palette_background_mirror() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        set_addr(&mut ppu, 0x3F10);
        ppu.write_register(0x2007, 0x0F).unwrap();
        assert_eq!(ppu.palette()[0x00], 0x0F);
        assert_eq!(ppu.palette()[0x10], 0x0F);

        set_addr(&mut ppu, 0x3F15);
        ppu.write_register(0x2007, 0x16).unwrap();
        assert_eq!(ppu.palette()[0x15], 0x16);
        assert_eq!(ppu.palette()[0x05], 0x00);
    }

    #[test]
    fn test_increment_32() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        ppu.write_register(0x2000, PpuCtrl::VRAM_INC.bits()).unwrap();
        set_addr(&mut ppu, 0x2000);
        ppu.write_register(0x2007, 0x01).unwrap();
        assert_eq!(ppu.vram_addr(), 0x2020);
    }

    #[test]
    fn test_status_read_clears_vblank() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        ppu.start_vblank();
        assert_eq!(ppu.read_register(0x2002).unwrap() & 0x80, 0x80);
        assert_eq!(ppu.read_register(0x2002).unwrap() & 0x80, 0x00);
    }

    #[test]
    fn test_pattern_rom_is_read_only() {
        let mut ppu = Ppu::new(vec![0xAA; PATTERN_SIZE], Mirroring::Horizontal);
        set_addr(&mut ppu, 0x0010);
        assert_eq!(
            ppu.write_register(0x2007, 0x01),
            Err(BusError::PatternRomWrite { address: 0x0010, value: 0x01 })
        );
    }

    #[test]
    fn test_write_only_register_read_fails() {
        let mut ppu = Ppu::new(Vec::new(), Mirroring::Horizontal);
        assert_eq!(
            ppu.read_register(0x2000),
            Err(BusError::WriteOnlyRegister { address: 0x2000 })
        );
    }
}
