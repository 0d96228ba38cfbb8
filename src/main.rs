//! WaveScope - Main Application
//! Streaming audio visualizer with keyword-matched visual presets

mod audio;
mod config;
mod particles;
mod presets;
mod spectrum;
mod waveform;

use std::time::Instant;

use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError};
use eframe::egui;

use audio::{AudioFrame, AudioSystem, FrameStats, StreamMessage};
use config::AppConfig;
use particles::ParticleField;
use presets::{match_preset, PresetKey};
use spectrum::SpectrumRenderer;

/// Streaming audio visualizer: load a file or URL, describe a style in free
/// text, and watch the matched preset react to the music.
#[derive(Parser)]
#[command(name = "wavescope", version, about)]
struct Args {
    /// Audio source to load at startup: a local file or an http(s) URL
    source: Option<String>,

    /// Free-text style description to apply at startup
    #[arg(long)]
    style: Option<String>,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<String>,
}

/// Main application state
struct WaveScopeApp {
    config: AppConfig,
    audio_sys: AudioSystem,

    // Renderer context: per-preset state lives here, never in globals
    spectrum: SpectrumRenderer,
    particles: ParticleField,
    active_preset: PresetKey,

    // Current analysis frame and its display statistics
    frame: AudioFrame,
    stats: FrameStats,

    // UI state
    url_input: String,
    style_input: String,
    status: String,
    show_settings: bool,
    is_playing: bool,
    playback_clock: f32,
    last_update: Instant,
    last_dt: f32,

    // Pending background stream fetch, if any
    stream_rx: Option<Receiver<StreamMessage>>,
}

impl WaveScopeApp {
    fn new(cc: &eframe::CreationContext<'_>, args: Args, config: AppConfig) -> Self {
        // Setup dark theme
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_unmultiplied(15, 15, 25, 245);
        visuals.panel_fill = egui::Color32::from_rgba_unmultiplied(20, 20, 35, 240);
        cc.egui_ctx.set_visuals(visuals);

        let audio_sys = AudioSystem::new();
        audio_sys.set_volume(config.playback.volume);

        let mut app = Self {
            config,
            audio_sys,
            spectrum: SpectrumRenderer::new(),
            particles: ParticleField::new(),
            active_preset: PresetKey::default(),
            frame: AudioFrame::default(),
            stats: FrameStats::default(),
            url_input: String::new(),
            style_input: String::new(),
            status: "Idle".to_string(),
            show_settings: false,
            is_playing: false,
            playback_clock: 0.0,
            last_update: Instant::now(),
            last_dt: 0.016,
            stream_rx: None,
        };

        if let Some(style) = args.style {
            app.active_preset = match_preset(&style);
        }
        if let Some(source) = args.source {
            app.open_source(source);
        }

        app
    }

    /// Route a source string to the stream fetcher or the local file loader.
    fn open_source(&mut self, source: String) {
        if source.starts_with("http://") || source.starts_with("https://") {
            self.start_stream(source);
        } else {
            self.load_local(source);
        }
    }

    fn load_local(&mut self, path: String) {
        match self.audio_sys.load_file(path, &self.config.analysis) {
            Ok(()) => self.begin_playback(),
            Err(e) => {
                eprintln!("Error loading audio: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    fn start_stream(&mut self, url: String) {
        let url = url.trim().to_string();
        if url.is_empty() {
            self.status = "Please enter a valid URL".to_string();
            return;
        }

        self.stream_rx = Some(audio::fetch_stream(url, self.config.analysis));
        self.status = "Fetching stream...".to_string();
    }

    fn begin_playback(&mut self) {
        self.playback_clock = 0.0;
        self.is_playing = true;
        self.audio_sys.set_volume(self.config.playback.volume);
        self.audio_sys.play();
        self.status = "Playing...".to_string();
    }

    fn stop_playback(&mut self) {
        self.audio_sys.stop();
        self.is_playing = false;
        self.playback_clock = 0.0;
        self.frame = AudioFrame::default();
        self.stats = FrameStats::default();
        self.status = "Stopped".to_string();
    }

    fn apply_style(&mut self) {
        let input = self.style_input.trim().to_string();
        if input.is_empty() {
            self.status = "Please describe a visualizer style".to_string();
            return;
        }

        self.active_preset = match_preset(&input);
        self.status = format!("Applied preset: {}", self.active_preset.name());
        self.style_input.clear();
    }

    /// Pick up the result of a background stream fetch, if one arrived.
    fn poll_stream_loader(&mut self) {
        if let Some(rx) = self.stream_rx.take() {
            match rx.try_recv() {
                Ok(StreamMessage::Loaded { path, analysis }) => {
                    match self.audio_sys.install(analysis, path) {
                        Ok(()) => self.begin_playback(),
                        Err(e) => {
                            eprintln!("Error starting stream playback: {}", e);
                            self.status = format!("Error: {}", e);
                        }
                    }
                }
                Ok(StreamMessage::Failed(e)) => {
                    eprintln!("Error fetching stream: {}", e);
                    self.status = format!("Error: {}", e);
                }
                Err(TryRecvError::Empty) => self.stream_rx = Some(rx),
                Err(TryRecvError::Disconnected) => {
                    self.status = "Error: stream loader stopped unexpectedly".to_string();
                }
            }
        }
    }

    /// Advance the playback clock and pull the analysis frame it lands on,
    /// then measure the display statistics over the same buffer.
    fn advance_frame(&mut self, dt: f32) {
        if !self.is_playing && self.playback_clock == 0.0 {
            return;
        }

        if let Some(ref analysis) = self.audio_sys.analysis {
            if self.is_playing {
                self.playback_clock += dt;
            }

            let index = (self.playback_clock * analysis.fps as f32) as usize;
            if index >= analysis.total_frames {
                if self.is_playing {
                    self.is_playing = false;
                    self.status = "Finished".to_string();
                }
                self.playback_clock = analysis.duration;
            } else {
                self.frame = analysis.get_frame(index);
            }

            self.stats = FrameStats::measure(&self.frame.spectrum);
        }
    }
}

impl eframe::App for WaveScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.last_dt = dt;

        self.poll_stream_loader();
        self.advance_frame(dt);

        self.render_top_bar(ctx);
        self.render_style_bar(ctx);
        self.render_status_bar(ctx);

        if self.show_settings {
            self.render_settings_panel(ctx);
        }

        self.render_canvas(ctx);

        // Request continuous repaint for animation
        ctx.request_repaint();
    }
}

impl WaveScopeApp {
    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🎵 WaveScope");
                ui.separator();

                if ui.button("📂 Open File").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Audio", &["mp3", "wav", "ogg", "flac"])
                        .pick_file()
                    {
                        self.load_local(path.to_string_lossy().to_string());
                    }
                }

                ui.separator();

                let url_edit = ui.add(
                    egui::TextEdit::singleline(&mut self.url_input)
                        .hint_text("Stream URL...")
                        .desired_width(260.0),
                );
                let url_submitted =
                    url_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if ui.button("▶ Play").clicked() || url_submitted {
                    if !self.url_input.trim().is_empty() {
                        let url = self.url_input.trim().to_string();
                        self.url_input.clear();
                        self.open_source(url);
                    } else if self.audio_sys.is_loaded() && !self.is_playing {
                        // Resume, or restart after stop / end of track
                        if let Some(ref analysis) = self.audio_sys.analysis {
                            if self.playback_clock >= analysis.duration {
                                self.playback_clock = 0.0;
                            }
                        }
                        self.is_playing = true;
                        self.audio_sys.play();
                        self.status = "Playing...".to_string();
                    }
                }

                if self.is_playing {
                    if ui.button("⏸ Pause").clicked() {
                        self.is_playing = false;
                        self.audio_sys.pause();
                        self.status = "Paused".to_string();
                    }
                }

                if self.audio_sys.is_loaded() {
                    if ui.button("⏹ Stop").clicked() {
                        self.stop_playback();
                    }
                }

                ui.separator();
                ui.toggle_value(&mut self.show_settings, "⚙ Settings");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let fps = 1.0 / self.last_dt.max(0.001);
                    ui.label(format!("FPS: {:.0}", fps));

                    if let Some(ref analysis) = self.audio_sys.analysis {
                        let current = self.playback_clock.min(analysis.duration);
                        ui.label(format!("{:.1}s / {:.1}s", current, analysis.duration));
                    }
                });
            });
        });
    }

    fn render_style_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("style_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Style:");

                let style_edit = ui.add(
                    egui::TextEdit::singleline(&mut self.style_input)
                        .hint_text("Describe a visualizer style, e.g. \"chunky bass\"...")
                        .desired_width(320.0),
                );
                let submitted =
                    style_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if ui.button("✨ Apply").clicked() || submitted {
                    self.apply_style();
                }

                ui.separator();
                ui.label(format!("Preset: {}", self.active_preset.name()));
            });
        });
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Bass: {}", self.stats.bass));
                    ui.label(format!("Peak: {}", self.stats.peak));
                    ui.label(format!("Avg: {}", self.stats.avg));
                });
            });
        });
    }

    fn render_settings_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("settings_panel")
            .min_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Settings");
                ui.separator();

                ui.label("Volume");
                if ui
                    .add(egui::Slider::new(&mut self.config.playback.volume, 0.0..=1.0))
                    .changed()
                {
                    self.audio_sys.set_volume(self.config.playback.volume);
                }

                ui.add_space(8.0);
                ui.label("Trail Frames");
                ui.add(egui::Slider::new(&mut self.config.visual.trail_frames, 4..=30));

                ui.label("Trail Decay");
                ui.add(egui::Slider::new(&mut self.config.visual.trail_decay, 0.5..=0.99));

                ui.add_space(16.0);
                ui.separator();

                if ui.button("💾 Save Config").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("JSON", &["json"])
                        .save_file()
                    {
                        if let Err(e) = self.config.save(&path.to_string_lossy()) {
                            eprintln!("Error saving config: {}", e);
                        }
                    }
                }

                if ui.button("📂 Load Config").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("JSON", &["json"])
                        .pick_file()
                    {
                        match AppConfig::load(&path.to_string_lossy()) {
                            Ok(config) => {
                                self.config = config;
                                self.audio_sys.set_volume(self.config.playback.volume);
                            }
                            Err(e) => eprintln!("Error loading config: {}", e),
                        }
                    }
                }
            });
    }

    fn render_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (rect, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
            let painter = ui.painter_at(rect);

            let bg = self.config.visual.background;
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(bg[0], bg[1], bg[2]));

            let drawing = self.audio_sys.is_loaded()
                && (self.is_playing || self.playback_clock > 0.0);

            if !drawing {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open an audio file or enter a stream URL to start",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
                return;
            }

            match self.active_preset {
                PresetKey::SpectrumBars => self.spectrum.render_bars(&painter, rect, &self.frame),
                PresetKey::Oscilloscope => {
                    waveform::render_oscilloscope(&painter, rect, &self.frame)
                }
                PresetKey::CircularSpectrum => {
                    self.spectrum
                        .render_circular(&painter, rect, &self.frame, &self.config.visual)
                }
                PresetKey::ChunkyBass => self.spectrum.render_chunky(&painter, rect, &self.frame),
                PresetKey::Particles => {
                    self.particles
                        .render(&painter, rect, &self.frame, &self.config.visual)
                }
            }
        });
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                AppConfig::default()
            }
        },
        None => AppConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 760.0])
            .with_title("WaveScope")
            .with_min_inner_size([800.0, 500.0]),
        vsync: false, // Disable vsync for max FPS
        ..Default::default()
    };

    eframe::run_native(
        "WaveScope",
        options,
        Box::new(|cc| Box::new(WaveScopeApp::new(cc, args, config))),
    )
}
