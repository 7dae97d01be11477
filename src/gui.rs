// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Align2, Color32, RichText, ScrollArea, Vec2};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "clipboard")]
use arboard::Clipboard;

use crate::ai::GeminiClient;
#[cfg(feature = "camera")]
use crate::capture::CameraSource;
use crate::capture::{FileSource, ScreenSource};
use crate::config::AppConfig;
use crate::controller::{CaptureController, UiHandle, READY_TEXT};

const WINDOW_WIDTH: f32 = 420.0;
const WINDOW_HEIGHT: f32 = 640.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const ACCENT: Color32 = Color32::from_rgb(51, 153, 255);

/// Label and popup state; written only from `update`
struct Surface {
    status_text: String,
    error_dialog: Option<String>,
}

impl UiHandle for Surface {
    fn set_status_text(&mut self, text: &str) {
        self.status_text = text.to_string();
    }

    fn show_error(&mut self, text: &str) {
        self.error_dialog = Some(text.to_string());
    }

    fn clear_error(&mut self) {
        self.error_dialog = None;
    }
}

pub struct SnapSolveApp {
    controller: CaptureController,
    surface: Surface,
    was_style_initialized: bool,
}

impl SnapSolveApp {
    fn new(controller: CaptureController) -> Self {
        Self {
            controller,
            surface: Surface {
                status_text: READY_TEXT.to_string(),
                error_dialog: None,
            },
            was_style_initialized: false,
        }
    }

    fn init_style(&mut self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::new(16.0, egui::FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            egui::FontId::new(18.0, egui::FontFamily::Proportional),
        );
        ctx.set_style(style);
        self.was_style_initialized = true;
    }

    fn draw_source_row(&mut self, ui: &mut egui::Ui) {
        let busy = self.controller.is_busy();
        ui.horizontal(|ui| {
            ui.label(RichText::new("Kaynak:").size(14.0));
            ui.label(RichText::new(self.controller.source_description()).size(14.0).weak());
        });
        ui.horizontal(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("🖥 Ekran")).clicked() {
                self.controller.set_source(Box::new(ScreenSource::new()));
            }
            #[cfg(feature = "camera")]
            if ui.add_enabled(!busy, egui::Button::new("📷 Kamera")).clicked() {
                self.controller.set_source(Box::new(CameraSource::new()));
            }
            if ui.add_enabled(!busy, egui::Button::new("📂 Görüntü aç")).clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "webp"])
                    .pick_file()
                {
                    self.controller.set_source(Box::new(FileSource::new(path)));
                }
            }
        });
    }

    fn draw_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.surface.error_dialog.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Hata")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("Tamam").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.dismiss_error();
        }
    }

    /// Close the popup; only a failed result is acknowledged with it
    fn dismiss_error(&mut self) {
        self.surface.error_dialog = None;
        if self.controller.last_result().map_or(false, |r| !r.is_answer()) {
            self.controller.acknowledge();
        }
    }

    /// Returns whether a cycle is now in flight
    fn start_cycle(&mut self) -> bool {
        self.controller.trigger(&mut self.surface) && self.controller.is_busy()
    }

    fn copy_answer_to_clipboard(&mut self) {
        let Some(answer) = self.controller.last_result().and_then(|r| r.answer()) else {
            return;
        };
        #[cfg(feature = "clipboard")]
        {
            match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(answer.to_string())) {
                Ok(()) => info!("Answer copied to clipboard"),
                Err(e) => error!("Failed to copy answer to clipboard: {}", e),
            }
        }
        #[cfg(not(feature = "clipboard"))]
        {
            let _ = answer;
            error!("Clipboard feature not enabled. Enable the 'clipboard' feature in Cargo.toml");
        }
    }
}

impl eframe::App for SnapSolveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            self.init_style(ctx);
        }

        // results are applied here, on the UI thread
        self.controller.poll(&mut self.surface);
        let busy = self.controller.is_busy();
        if busy {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            ui.heading(RichText::new("SnapSolve").size(22.0));
            ui.separator();
            self.draw_source_row(ui);
            ui.add_space(10.0);

            let button = egui::Button::new(RichText::new("BAŞLA").size(20.0).color(Color32::WHITE))
                .fill(ACCENT)
                .rounding(8.0);
            let size = egui::vec2(ui.available_width(), 48.0);
            if ui.add_enabled_ui(!busy, |ui| ui.add_sized(size, button)).inner.clicked()
                && self.start_cycle()
            {
                ctx.request_repaint();
            }

            ui.add_space(10.0);
            if busy {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Analiz ediliyor").weak());
                });
            }

            ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.label(RichText::new(&self.surface.status_text).size(16.0));
                    if self.controller.last_result().map_or(false, |r| r.is_answer()) {
                        ui.add_space(8.0);
                        if ui.button("📋 Kopyala").clicked() {
                            self.copy_answer_to_clipboard();
                        }
                    }
                });
        });

        self.draw_error_dialog(ctx);
    }
}

pub fn run_gui(config: &AppConfig) -> Result<()> {
    info!("SnapSolve GUI starting up...");

    let client = GeminiClient::new(&config.gemini_settings()?)?;
    let controller = CaptureController::new(
        Box::new(ScreenSource::new()),
        Arc::new(client),
        config.encoder(),
        &config.instruction,
    );

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "SnapSolve",
        native_options,
        Box::new(move |_cc| Box::new(SnapSolveApp::new(controller))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}
