//! Cartridge loading
//!
//! Parses iNES images and lays them out for mapper 0, the only supported board: up to
//! 32KB of program ROM in four fixed 8KB windows and 8KB of pattern ROM or RAM.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// iNES header size
pub const HEADER_SIZE: usize = 16;
/// iNES signature
pub const INES_MAGIC: [u8; 4] = *b"NES\x1A";
/// Trainer size when flag 6 bit 2 is set
pub const TRAINER_SIZE: usize = 512;
/// Program bank unit as counted by the header
pub const PRG_UNIT: usize = 0x4000;
/// Graphics bank unit as counted by the header
pub const CHR_UNIT: usize = 0x2000;
/// Program window size on the CPU bus
pub const PRG_WINDOW: usize = 0x2000;

/// Name table arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Cartridge load failures. The machine never starts after one of these.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cartridge file {} does not exist", .path.display())]
    FileNotFound { path: PathBuf },
    #[error("failed to read cartridge: {0}")]
    Io(#[from] io::Error),
    #[error("not an iNES image (bad signature)")]
    IllegalFile,
    #[error("cartridge image truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("could not allocate {0} bytes for cartridge banks")]
    OutOfMemory(usize),
    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),
    #[error("{0} program banks cannot be mapped (expected 1 or 2)")]
    ProgramBankCount(u8),
    #[error("{0} graphics banks cannot be mapped (expected 0 or 1)")]
    GraphicsBankCount(u8),
    #[error("VS Unisystem and PlayChoice-10 cartridges are not supported")]
    UnsupportedHardware,
}

/// iNES header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesHeader {
    /// PRG ROM size in 16KB units
    pub prg_banks: u8,
    /// CHR ROM size in 8KB units
    pub chr_banks: u8,
    pub flags_6: u8,
    pub flags_7: u8,
    pub reserved: [u8; 8],
}

impl InesHeader {
    /// Parse an iNES header from the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < INES_MAGIC.len() || bytes[..INES_MAGIC.len()] != INES_MAGIC {
            return Err(CartridgeError::IllegalFile);
        }
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated { expected: HEADER_SIZE, found: bytes.len() });
        }

        let mut reserved = [0; 8];
        reserved.copy_from_slice(&bytes[8..HEADER_SIZE]);
        Ok(Self {
            prg_banks: bytes[4],
            chr_banks: bytes[5],
            flags_6: bytes[6],
            flags_7: bytes[7],
            reserved,
        })
    }

    pub fn mapper_number(&self) -> u8 {
        (self.flags_6 >> 4) | (self.flags_7 & 0xF0)
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.flags_6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if self.flags_6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    pub fn has_save_ram(&self) -> bool {
        self.flags_6 & 0x02 != 0
    }

    pub fn has_trainer(&self) -> bool {
        self.flags_6 & 0x04 != 0
    }

    pub fn is_vs_unisystem(&self) -> bool {
        self.flags_7 & 0x01 != 0
    }

    pub fn is_playchoice(&self) -> bool {
        self.flags_7 & 0x02 != 0
    }

    /// Reject anything the fixed mapper 0 bank table cannot represent
    fn validate(&self) -> Result<(), CartridgeError> {
        if self.is_vs_unisystem() || self.is_playchoice() {
            return Err(CartridgeError::UnsupportedHardware);
        }
        match self.mapper_number() {
            0 => {}
            other => return Err(CartridgeError::UnsupportedMapper(other)),
        }
        if !(1..=2).contains(&self.prg_banks) {
            return Err(CartridgeError::ProgramBankCount(self.prg_banks));
        }
        if self.chr_banks > 1 {
            return Err(CartridgeError::GraphicsBankCount(self.chr_banks));
        }
        Ok(())
    }
}

/// A loaded mapper 0 cartridge
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: InesHeader,
    prg_rom: Vec<u8>,
    /// Empty when the board carries graphics RAM
    chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Load an iNES file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => CartridgeError::FileNotFound { path: path.to_path_buf() },
            _ => CartridgeError::Io(err),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse an in-memory iNES image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(bytes)?;
        header.validate()?;

        let mut offset = HEADER_SIZE;
        if header.has_trainer() {
            log::warn!("skipping {TRAINER_SIZE}-byte trainer");
            offset += TRAINER_SIZE;
        }

        let prg_size = usize::from(header.prg_banks) * PRG_UNIT;
        let chr_size = usize::from(header.chr_banks) * CHR_UNIT;
        let expected = offset + prg_size + chr_size;
        if bytes.len() < expected {
            return Err(CartridgeError::Truncated { expected, found: bytes.len() });
        }

        let prg_rom = copy_bank(&bytes[offset..offset + prg_size])?;
        offset += prg_size;
        let chr_rom = copy_bank(&bytes[offset..offset + chr_size])?;

        log::info!(
            "cartridge: {} x 16KB PRG, {} x 8KB CHR, mapper {}, {:?} mirroring",
            header.prg_banks,
            header.chr_banks,
            header.mapper_number(),
            header.mirroring()
        );
        Ok(Self { header, prg_rom, chr_rom })
    }

    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring()
    }

    /// Byte offsets into program ROM for the four 8KB windows at $8000-$FFFF.
    ///
    /// A single 16KB bank appears at both $8000 and $C000.
    pub fn prg_windows(&self) -> [usize; 4] {
        let upper = usize::from(self.header.prg_banks & 2);
        [0, 1, upper, upper + 1].map(|bank| bank * PRG_WINDOW)
    }

    /// Split into program ROM and pattern data
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.prg_rom, self.chr_rom)
    }
}

fn copy_bank(bytes: &[u8]) -> Result<Vec<u8>, CartridgeError> {
    let mut bank = Vec::new();
    bank.try_reserve_exact(bytes.len())
        .map_err(|_| CartridgeError::OutOfMemory(bytes.len()))?;
    bank.extend_from_slice(bytes);
    Ok(bank)
}
