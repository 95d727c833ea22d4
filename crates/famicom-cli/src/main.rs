//! famicom-cli - Headless runner for the famicom core

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use famicom_core::cpu::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use famicom_core::{Cartridge, NesSystem, SystemConfig};

/// Exit status when the machine halts on a fatal condition
const EXIT_HALTED: u8 = 2;

/// Famicom emulator CLI
#[derive(Parser, Debug)]
#[command(name = "famicom-cli")]
#[command(about = "Run an iNES cartridge headless and inspect the machine", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// CPU instructions executed per frame
    #[arg(short, long, default_value_t = famicom_core::config::DEFAULT_STEPS_PER_FRAME)]
    steps_per_frame: u32,

    /// Dump CPU state after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(short = 'p', long)]
    dump_ppu: bool,

    /// Print interrupt vectors with the instruction at each target
    #[arg(short, long)]
    vectors: bool,

    /// Log every executed instruction
    #[arg(short, long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.trace { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let cartridge = match Cartridge::load(&args.rom) {
        Ok(cartridge) => cartridge,
        Err(e) => {
            log::error!("failed to load {}: {}", args.rom.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let header = *cartridge.header();
    println!("Loaded cartridge:");
    println!("  PRG ROM: {} bytes", cartridge.prg_rom().len());
    println!("  CHR ROM: {} bytes", cartridge.chr_rom().len());
    println!("  Mapper: {}", header.mapper_number());
    println!("  Mirroring: {:?}", header.mirroring());
    println!("  Save RAM: {}", header.has_save_ram());

    let config = SystemConfig { steps_per_frame: args.steps_per_frame, trace: args.trace };
    let mut system = match NesSystem::with_config(cartridge, config) {
        Ok(system) => system,
        Err(e) => {
            log::error!("reset failed: {}", e);
            return ExitCode::from(EXIT_HALTED);
        }
    };

    if args.vectors {
        dump_vectors(&system);
    }

    println!("\nRunning {} frames...", args.frames);
    let mut status = ExitCode::SUCCESS;
    for _ in 0..args.frames {
        if let Err(e) = system.render_frame().map(|_| ()) {
            log::error!("stopped after {} frames: {}", system.frame_count(), e);
            status = ExitCode::from(EXIT_HALTED);
            break;
        }
    }

    println!("Completed {} frames.", system.frame_count());

    if args.dump_cpu {
        dump_cpu_state(&system);
    }

    if args.dump_ppu {
        dump_ppu_state(&system);
    }

    status
}

fn dump_vectors(system: &NesSystem) {
    println!("\nVectors:");
    for (name, vector) in [("NMI", NMI_VECTOR), ("RESET", RESET_VECTOR), ("IRQ", IRQ_VECTOR)] {
        let target = system.vector(vector);
        println!("  {:<5} ${:04X}  {}", name, target, system.disassemble_at(target).trim_end());
    }
}

fn dump_cpu_state(system: &NesSystem) {
    let cpu = system.cpu();
    let regs = cpu.registers();
    let status = cpu.status();

    println!("\nCPU State:");
    println!("  A:    ${:02X}", regs.a);
    println!("  X:    ${:02X}", regs.x);
    println!("  Y:    ${:02X}", regs.y);
    println!("  PC:   ${:04X}", regs.pc);
    println!("  SP:   ${:02X}", regs.sp);
    println!("  P:    ${:02X} ({})", status.bits(), status);
    println!("  Instructions: {}", cpu.instructions());
    println!("  Next: {}", system.disassemble_at(regs.pc).trim_end());
}

fn dump_ppu_state(system: &NesSystem) {
    let ppu = system.ppu();
    let (scroll_x, scroll_y) = ppu.scroll();

    println!("\nPPU State:");
    println!("  CTRL:   {:?}", ppu.ctrl());
    println!("  MASK:   {:?}", ppu.mask());
    println!("  STATUS: {:?}", ppu.status());
    println!("  VRAM address: ${:04X}", ppu.vram_addr());
    println!("  Scroll: ({}, {})", scroll_x, scroll_y);
    println!("  OAM address: ${:02X}", ppu.oam_addr());
    println!("  Palette: {:02X?}", ppu.palette());
}
