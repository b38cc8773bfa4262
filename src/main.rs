#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod error;
mod session;
mod types {
    pub mod analysis;
}
mod client {
    pub mod gemini;
    pub mod schema;
}
mod export {
    pub mod pdf_report;
    pub mod text_report;
}

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use eframe::{egui, App, NativeOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::client::gemini::AnalysisClient;
use crate::config::Config;
use crate::export::pdf_report::{self, RegionCapture};
use crate::export::text_report;
use crate::session::{AnalysisSession, SessionState};

const ERROR_BANNER: &str = "Oops! The magic fizzled out. Please try again later! 🪄💥";
const PDF_ALERT: &str = "Could not generate PDF. Please try again.";
const PDF_TRUNCATED_ALERT: &str =
    "The whole result needs to be visible to save a PDF. Please enlarge the window and try again.";
const TEXT_ALERT: &str = "Could not save the text file. Please try again.";

#[derive(Parser, Debug)]
#[command(
    name = "english-explorer",
    about = "A friendly English sentence explorer for young learners"
)]
struct CliArgs {
    /// Path to the optional config.toml
    #[arg(long, default_value = "config.toml")]
    config: String,
}

struct ExplorerApp {
    config: Config,
    config_error: Option<String>,
    client: Arc<AnalysisClient>,
    input_text: String,
    session: AnalysisSession,
    // PDF export runs its own little lifecycle, independent of the session.
    pdf_generating: bool,
    screenshot_requested: bool,
    export_alert: Option<String>,
    export_status: Option<String>,
    // Geometry of the rendered result, refreshed every frame while in
    // Success; the PDF capture crops and paginates against these.
    result_region: Option<egui::Rect>,
    card_rects: Vec<egui::Rect>,
}

impl ExplorerApp {
    fn new(_cc: &eframe::CreationContext<'_>, config_path: &str) -> Self {
        let mut config = Config::default();
        let mut config_error = None;
        match config::load_config_from_file(config_path) {
            Ok(loaded_config) => config = loaded_config,
            Err(err_msg) => {
                error!("{err_msg}");
                config_error = Some(err_msg);
            }
        }

        let api_key = config::api_key_from_env();
        let client = Arc::new(AnalysisClient::new(api_key, config.model.clone()));
        if !client.has_credential() {
            warn!(
                "{} is not set; analysis will fail until it is configured",
                config::API_KEY_VAR
            );
        }
        info!(model = client.model(), "English Explorer ready");

        Self {
            config,
            config_error,
            client,
            input_text: String::new(),
            session: AnalysisSession::new(),
            pdf_generating: false,
            screenshot_requested: false,
            export_alert: None,
            export_status: None,
            result_region: None,
            card_rects: Vec::new(),
        }
    }

    fn handle_analyze(&mut self) {
        let Some(tx) = self.session.begin(&self.input_text) else {
            return;
        };
        self.export_status = None;
        let client = Arc::clone(&self.client);
        let text = self.input_text.clone();
        // Blocking provider call on its own thread; the single channel
        // delivers the settlement back to the UI loop.
        thread::spawn(move || {
            let _ = tx.send(client.analyze(&text));
        });
    }

    fn handle_text_export(&mut self) {
        let Some(result) = self.session.result().cloned() else {
            return;
        };
        let original_text = self
            .session
            .analyzed_input()
            .unwrap_or(self.input_text.as_str())
            .to_string();
        match text_report::write_text_report(
            Path::new(&self.config.export_dir),
            &original_text,
            &result,
        ) {
            Ok(path) => {
                info!("text report saved to {}", path.display());
                self.export_status = Some(format!("Saved {}", path.display()));
            }
            Err(err) => {
                error!("text export failed: {err}");
                self.export_alert = Some(TEXT_ALERT.to_string());
            }
        }
    }

    fn handle_pdf_export(&mut self) {
        if self.pdf_generating {
            return;
        }
        self.pdf_generating = true;
        self.screenshot_requested = true;
        self.export_status = None;
    }

    fn finish_pdf_export(&mut self, ctx: &egui::Context, image: &egui::ColorImage) {
        self.pdf_generating = false;
        let Some(region) = self.result_region else {
            error!("PDF capture arrived with no rendered result region");
            self.export_alert = Some(PDF_ALERT.to_string());
            return;
        };
        let pixels_per_point = ctx.pixels_per_point();
        // Results live in a scroll area, so a tall result can extend past
        // the window edge; the screenshot only holds the framebuffer, and
        // writing a silently shortened PDF would be worse than refusing.
        if !region_fully_visible(image, pixels_per_point, region) {
            error!("result region extends beyond the window; a capture would truncate it");
            self.export_alert = Some(PDF_TRUNCATED_ALERT.to_string());
            return;
        }
        let capture = build_region_capture(image, pixels_per_point, region, &self.card_rects);
        let Some(capture) = capture else {
            error!("PDF capture missed the result region");
            self.export_alert = Some(PDF_ALERT.to_string());
            return;
        };
        match pdf_report::write_pdf_report(Path::new(&self.config.export_dir), &capture) {
            Ok(path) => {
                info!("PDF report saved to {}", path.display());
                self.export_status = Some(format!("Saved {}", path.display()));
            }
            Err(err) => {
                error!("PDF export failed: {err}");
                self.export_alert = Some(PDF_ALERT.to_string());
            }
        }
    }

    fn input_section(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.label(egui::RichText::new("📖 Paste your sentence here:").strong());
        ui.add(
            egui::TextEdit::multiline(&mut self.input_text)
                .hint_text("e.g. Once upon a time, there was a brave little rabbit...")
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );

        let chord = ui.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if self.session.is_analyzing() {
                ui.add_enabled(false, egui::Button::new("Thinking..."));
                ui.spinner();
            } else {
                let can_analyze = self.session.can_begin(&self.input_text);
                if ui
                    .add_enabled(can_analyze, egui::Button::new("✨ Magic Analyze!"))
                    .clicked()
                {
                    self.handle_analyze();
                }
            }
        });
        // Cmd+Enter (Ctrl+Enter off-mac) is equivalent to the button; it
        // hits the same session guard, so it is a no-op while Analyzing.
        if chord {
            self.handle_analyze();
        }
    }

    fn result_section(&mut self, ui: &mut egui::Ui) {
        let Some(result) = self.session.result().cloned() else {
            return;
        };
        let input_text = self
            .session
            .analyzed_input()
            .unwrap_or(self.input_text.as_str())
            .to_string();

        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format!("🌟 {}", result.encouragement))
                    .strong()
                    .size(18.0)
                    .color(egui::Color32::from_rgb(0xB4, 0x8A, 0x00)),
            );
        });

        ui.add_space(6.0);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if self.pdf_generating {
                ui.add_enabled(false, egui::Button::new("Saving..."));
                ui.spinner();
            } else if ui.button("🖨 Save as PDF").clicked() {
                self.handle_pdf_export();
            }
            if ui.button("💾 Save as Text").clicked() {
                self.handle_text_export();
            }
            if let Some(status) = self.export_status.clone() {
                ui.weak(status);
            }
        });

        ui.add_space(6.0);
        self.card_rects.clear();
        let region = ui.vertical(|ui| {
            self.card(ui, |ui| {
                ui.label(egui::RichText::new("ORIGINAL TEXT").weak().small());
                ui.label(
                    egui::RichText::new(format!("\"{input_text}\""))
                        .italics()
                        .size(16.0),
                );
            });
            ui.add_space(8.0);
            self.card(ui, |ui| {
                ui.label(
                    egui::RichText::new("🌏 Chinese Meaning")
                        .strong()
                        .color(egui::Color32::from_rgb(0x2B, 0x6C, 0xB0)),
                );
                ui.label(egui::RichText::new(&result.translation).size(20.0));
            });
            ui.add_space(8.0);
            self.card(ui, |ui| {
                ui.label(
                    egui::RichText::new("⭐ Cool Phrases")
                        .strong()
                        .color(egui::Color32::from_rgb(0x2F, 0x85, 0x5A)),
                );
                if result.phrases.is_empty() {
                    ui.label(
                        egui::RichText::new("No specific phrases found in this short text.")
                            .italics()
                            .weak(),
                    );
                } else {
                    for phrase in &result.phrases {
                        ui.horizontal_wrapped(|ui| {
                            ui.label(egui::RichText::new(&phrase.text).strong());
                            ui.label(
                                egui::RichText::new(format!("[{}]", phrase.kind))
                                    .small()
                                    .weak(),
                            );
                        });
                        ui.label(&phrase.meaning);
                        ui.add_space(4.0);
                    }
                }
            });
            ui.add_space(8.0);
            self.card(ui, |ui| {
                ui.label(
                    egui::RichText::new("📚 Grammar Check")
                        .strong()
                        .color(egui::Color32::from_rgb(0xA8, 0x73, 0x00)),
                );
                if result.grammar_points.is_empty() {
                    ui.label(
                        egui::RichText::new("This looks like a simple sentence grammatically!")
                            .italics()
                            .weak(),
                    );
                } else {
                    for (idx, point) in result.grammar_points.iter().enumerate() {
                        ui.label(
                            egui::RichText::new(format!("{}. {}", idx + 1, point.rule)).strong(),
                        );
                        ui.label(&point.explanation);
                        ui.add_space(4.0);
                    }
                }
            });
        });
        self.result_region = Some(region.response.rect);
    }

    /// One result card; its rect feeds the PDF page-break avoidance.
    fn card(&mut self, ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
        let inner = egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(10.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                add_contents(ui);
            });
        self.card_rects.push(inner.response.rect);
    }

    fn alert_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.export_alert.clone() else {
            return;
        };
        egui::Window::new("Export Problem")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(6.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        self.export_alert = None;
                    }
                });
            });
    }
}

impl App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.poll();
        if self.session.is_analyzing() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // A screenshot requested on an earlier frame arrives as an input
        // event; the recorded region/card rects are from that same layout.
        let screenshot = ctx.input(|i| {
            i.events.iter().rev().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(image.clone()),
                _ => None,
            })
        });
        if let Some(image) = screenshot {
            if self.pdf_generating {
                self.finish_pdf_export(ctx, &image);
            }
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(4.0);
                ui.heading("🏰 English Explorer");
                ui.label("Let's explore the magic of English sentences! ✨");
                ui.add_space(4.0);
            });
            if let Some(err) = &self.config_error {
                ui.colored_label(egui::Color32::RED, format!("Config: {}", err));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    self.input_section(ui);

                    if self.session.state() == SessionState::Error {
                        ui.add_space(12.0);
                        ui.vertical_centered(|ui| {
                            ui.colored_label(egui::Color32::RED, ERROR_BANNER);
                        });
                    }

                    if self.session.state() == SessionState::Success {
                        self.result_section(ui);
                    } else {
                        self.result_region = None;
                        self.card_rects.clear();
                    }
                });
        });

        self.alert_window(ctx);

        if self.screenshot_requested {
            self.screenshot_requested = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot);
        }
    }
}

/// True only when the whole result region lies inside the captured
/// framebuffer. A region partly scrolled out of the window cannot be
/// captured faithfully from a screenshot.
fn region_fully_visible(
    image: &egui::ColorImage,
    pixels_per_point: f32,
    region: egui::Rect,
) -> bool {
    // A couple of pixels of slack for rounding at the window edges.
    const SLACK_PX: f32 = 2.0;
    (region.min.x * pixels_per_point).floor() >= -SLACK_PX
        && (region.min.y * pixels_per_point).floor() >= -SLACK_PX
        && (region.max.x * pixels_per_point).ceil() <= image.size[0] as f32 + SLACK_PX
        && (region.max.y * pixels_per_point).ceil() <= image.size[1] as f32 + SLACK_PX
}

/// Crops the window screenshot down to the result region and converts the
/// card rects into pixel rows relative to the crop. Callers must check
/// `region_fully_visible` first; the clamping here only absorbs edge
/// rounding, it cannot recover content outside the framebuffer.
fn build_region_capture(
    image: &egui::ColorImage,
    pixels_per_point: f32,
    region: egui::Rect,
    cards: &[egui::Rect],
) -> Option<RegionCapture> {
    let img_w = image.size[0];
    let img_h = image.size[1];
    let x0 = (((region.min.x * pixels_per_point).floor().max(0.0)) as usize).min(img_w);
    let y0 = (((region.min.y * pixels_per_point).floor().max(0.0)) as usize).min(img_h);
    let x1 = (((region.max.x * pixels_per_point).ceil().max(0.0)) as usize).min(img_w);
    let y1 = (((region.max.y * pixels_per_point).ceil().max(0.0)) as usize).min(img_h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let width = x1 - x0;
    let height = y1 - y0;
    let mut rgba = Vec::with_capacity(width * height * 4);
    for y in y0..y1 {
        for x in x0..x1 {
            rgba.extend_from_slice(&image.pixels[y * img_w + x].to_array());
        }
    }

    let card_rows = cards
        .iter()
        .filter_map(|rect| {
            let top =
                ((rect.min.y * pixels_per_point).floor() as isize - y0 as isize).max(0) as usize;
            let bottom =
                ((rect.max.y * pixels_per_point).ceil() as isize - y0 as isize).max(0) as usize;
            let top = top.min(height);
            let bottom = bottom.min(height);
            (bottom > top).then_some((top, bottom))
        })
        .collect();

    Some(RegionCapture {
        width,
        height,
        rgba,
        card_rows,
    })
}


fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([880.0, 760.0])
            .with_min_inner_size([640.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "English Explorer",
        options,
        Box::new(move |cc| Box::new(ExplorerApp::new(cc, &args.config))),
    )
}
