//! Famicom emulator - Desktop Application using egui

mod input;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use eframe::egui;
use famicom_core::{CpuError, NesSystem, Port, SystemConfig, FRAME_HEIGHT, FRAME_WIDTH};

use input::{button_label, button_states, KEY_MAP};

/// Famicom emulator
#[derive(Parser, Debug)]
#[command(name = "famicom")]
struct Args {
    /// iNES ROM to open on start
    rom: Option<PathBuf>,
}

/// App state for the egui application
struct FamicomApp {
    system: Option<NesSystem>,
    /// Last load or runtime failure shown in place of the picture
    message: Option<String>,
    texture: Option<egui::TextureHandle>,
    button_states: [bool; 8],
    last_frame_time: Instant,
    fps: f64,
}

impl FamicomApp {
    fn new() -> Self {
        Self {
            system: None,
            message: None,
            texture: None,
            button_states: [false; 8],
            last_frame_time: Instant::now(),
            fps: 0.0,
        }
    }

    fn load_rom(&mut self, path: &Path) {
        match NesSystem::load(path, SystemConfig::default()) {
            Ok(system) => {
                log::info!("loaded {}", path.display());
                self.system = Some(system);
                self.message = None;
            }
            Err(e) => {
                log::error!("failed to load {}: {}", path.display(), e);
                self.message = Some(format!("Failed to load ROM: {}", e));
            }
        }
    }

    fn reset(&mut self) {
        if let Some(system) = &mut self.system {
            self.message = system.reset().err().map(|e| halt_message(&e));
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        self.button_states = ctx.input(|i| button_states(|key| i.key_down(key)));

        if let Some(system) = &mut self.system {
            for ((_, button), pressed) in KEY_MAP.iter().zip(self.button_states) {
                system.set_controller_line(Port::One, *button, pressed);
            }
        }
    }

    fn run_frame(&mut self, ctx: &egui::Context) {
        let Some(system) = &mut self.system else {
            return;
        };
        if system.halted().is_some() {
            return;
        }

        match system.render_frame() {
            Ok(pixels) => {
                let rgba_bytes: Vec<u8> = pixels.iter().flat_map(|pixel| pixel.to_be_bytes()).collect();
                let image = egui::ColorImage::from_rgba_unmultiplied([FRAME_WIDTH, FRAME_HEIGHT], &rgba_bytes);
                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                    None => {
                        self.texture = Some(ctx.load_texture("frame", image, egui::TextureOptions::NEAREST));
                    }
                }
            }
            Err(e) => self.message = Some(halt_message(&e)),
        }
    }
}

fn halt_message(error: &CpuError) -> String {
    format!("Machine halted: {}", error)
}

impl eframe::App for FamicomApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame_time).as_secs_f64();
        self.fps = 1.0 / dt.max(0.001);
        self.last_frame_time = now;

        self.run_frame(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        ui.close_menu();
                        if let Some(path) = rfd::FileDialog::new().add_filter("iNES", &["nes"]).pick_file() {
                            self.load_rom(&path);
                        }
                    }
                    if ui.add_enabled(self.system.is_some(), egui::Button::new("Reset")).clicked() {
                        ui.close_menu();
                        self.reset();
                    }
                });

                ui.label(format!("FPS: {:.1}", self.fps));
                if let Some(system) = &self.system {
                    ui.label(format!("Frames: {}", system.frame_count()));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.message {
                ui.colored_label(egui::Color32::RED, message);
            }

            match (&self.system, &self.texture) {
                (None, _) => {
                    ui.label("No ROM loaded. Use File > Open to select a .nes file.");
                }
                (Some(_), Some(texture)) => {
                    let size = egui::vec2(FRAME_WIDTH as f32, FRAME_HEIGHT as f32) * 2.0;
                    ui.add(egui::Image::from_texture(texture).fit_to_exact_size(size));
                }
                (Some(_), None) => {}
            }

            ui.horizontal(|ui| {
                ui.label("Controller 1:");
                for ((_, button), pressed) in KEY_MAP.iter().zip(self.button_states) {
                    let label = button_label(*button);
                    if pressed {
                        ui.label(egui::RichText::new(label).background_color(egui::Color32::GREEN));
                    } else {
                        ui.label(label);
                    }
                }
            });
        });

        ctx.request_repaint();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let viewport = egui::ViewportBuilder::default()
        .with_title("Famicom")
        .with_inner_size(egui::Vec2::new(560.0, 580.0));

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Famicom",
        native_options,
        Box::new(move |_| {
            let mut app = FamicomApp::new();
            if let Some(path) = args.rom {
                app.load_rom(&path);
            }
            Ok(Box::new(app))
        }),
    )
}
