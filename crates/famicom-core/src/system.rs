//! Console system integration
//!
//! [`NesSystem`] owns the CPU and the bus (which in turn owns the picture unit,
//! controllers and cartridge banks) and drives them one frame at a time.

use std::path::Path;

use thiserror::Error;

use crate::bus::{BusError, NesBus};
use crate::cartridge::{Cartridge, CartridgeError};
use crate::config::SystemConfig;
use crate::controller::{Button, Port};
use crate::cpu::{self, Bus, Cpu, CpuError};
use crate::ppu::Ppu;
use crate::render::{self, FRAME_PIXELS};

/// Errors from loading and starting a machine
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
}

/// The whole machine
#[derive(Debug, Clone)]
pub struct NesSystem {
    cpu: Cpu,
    bus: NesBus,
    config: SystemConfig,
    /// RGBA pixels of the last rendered frame
    frame: Vec<u32>,
    frame_count: u64,
    /// Set once a fatal condition stops the CPU; cleared by reset
    halted: Option<CpuError>,
}

impl NesSystem {
    /// Build a machine around a cartridge and reset it
    pub fn new(cartridge: Cartridge) -> Result<Self, CpuError> {
        Self::with_config(cartridge, SystemConfig::default())
    }

    pub fn with_config(cartridge: Cartridge, config: SystemConfig) -> Result<Self, CpuError> {
        let mut system = Self {
            cpu: Cpu::new(),
            bus: NesBus::new(cartridge),
            config,
            frame: vec![0; FRAME_PIXELS],
            frame_count: 0,
            halted: None,
        };
        system.reset()?;
        Ok(system)
    }

    /// Load an iNES file and start it
    pub fn load(path: impl AsRef<Path>, config: SystemConfig) -> Result<Self, SystemError> {
        let cartridge = Cartridge::load(path)?;
        Ok(Self::with_config(cartridge, config)?)
    }

    /// Reload the program counter from the reset vector and clear transient device
    /// state. Also releases a halted machine.
    pub fn reset(&mut self) -> Result<(), CpuError> {
        self.bus.reset();
        self.halted = None;
        self.cpu.reset(&mut self.bus).map_err(|err| self.halt(err))?;
        log::info!("reset: PC = ${:04X}", self.cpu.registers().pc);
        Ok(())
    }

    /// Execute one instruction
    pub fn step(&mut self) -> Result<(), CpuError> {
        if let Some(err) = self.halted {
            return Err(err);
        }
        if self.config.trace && log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", cpu::trace_line(&self.bus, self.cpu.registers()));
        }
        self.cpu.step(&mut self.bus).map_err(|err| self.halt(err))
    }

    /// Deliver a non-maskable interrupt
    pub fn nmi(&mut self) -> Result<(), CpuError> {
        if let Some(err) = self.halted {
            return Err(err);
        }
        self.cpu.nmi(&mut self.bus).map_err(|err| self.halt(err))
    }

    /// Run one frame: a burst of CPU steps, vertical blank (with NMI if enabled), then
    /// decode the background into the frame buffer.
    pub fn render_frame(&mut self) -> Result<&[u32], CpuError> {
        for _ in 0..self.config.steps_per_frame {
            self.step()?;
        }

        self.bus.ppu_mut().start_vblank();
        if self.bus.ppu().nmi_enabled() {
            self.nmi()?;
        }

        render::render_background(self.bus.ppu(), &mut self.frame);
        self.frame_count += 1;
        Ok(&self.frame)
    }

    /// Press or release one controller button before the next frame
    pub fn set_controller_line(&mut self, port: Port, button: Button, pressed: bool) {
        self.bus.controllers_mut().set_button(port, button, pressed);
    }

    /// Disassemble the instruction at `address` without executing it
    pub fn disassemble_at(&self, address: u16) -> String {
        cpu::disassemble(&self.bus, address)
    }

    /// Target stored at an interrupt vector
    pub fn vector(&self, vector: u16) -> u16 {
        u16::from_le_bytes([self.bus.peek(vector), self.bus.peek(vector.wrapping_add(1))])
    }

    fn halt(&mut self, err: CpuError) -> CpuError {
        log::error!("machine halted: {err}");
        self.halted = Some(err);
        err
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    pub fn ppu(&self) -> &Ppu {
        self.bus.ppu()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The fatal condition that stopped the machine, if any
    pub fn halted(&self) -> Option<CpuError> {
        self.halted
    }

    /// Last rendered frame, 256x240 packed 0xRRGGBBAA
    pub fn framebuffer(&self) -> &[u32] {
        &self.frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Read a byte via the bus, with register side effects
    pub fn read_memory(&mut self, address: u16) -> Result<u8, BusError> {
        self.bus.read(address)
    }

    /// Read a byte without side effects
    pub fn peek_memory(&self, address: u16) -> u8 {
        self.bus.peek(address)
    }
}
