// ============================================================================
// VIEWER APP — session object, input mapping, presentation, info overlay
// ============================================================================

use std::path::{Path, PathBuf};

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, TextureOptions, Vec2};

use crate::gpu::{GpuContext, GpuError, Presenter, SamplingMode};
use crate::raster::{LoadError, LoadedRaster, RasterDecoder};
use crate::settings::{ViewerSettings, ZoomFilterMode};
use crate::viewport::ViewportState;
use crate::{log_err, log_info, log_warn};

// ============================================================================
// SESSION
// ============================================================================

/// Everything one viewer run owns. Built by `main` and moved into the app.
pub struct ViewerSession {
    pub path: PathBuf,
    pub raster: LoadedRaster,
    pub settings: ViewerSettings,
}

/// Input gathered for one frame, already in viewer units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    /// Vertical scroll in egui points (positive = away from the user).
    pub scroll_points: f32,
    /// Primary-button drag in egui points.
    pub drag_points: Vec2,
    pub pixels_per_point: f32,
    pub reset: bool,
    pub close: bool,
}

/// What applying an [`InputFrame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputOutcome {
    pub view_changed: bool,
    pub close_requested: bool,
}

impl ViewerSession {
    pub fn open(path: &Path, settings: ViewerSettings, decoder: &RasterDecoder) -> Result<Self, LoadError> {
        let raster = LoadedRaster::open(path, decoder)?;
        Ok(Self {
            path: path.to_path_buf(),
            raster,
            settings,
        })
    }

    pub fn file_label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Feed one frame of input to the viewport. Scroll is scaled to zoom
    /// units, drags are converted to physical pixels so panning tracks the
    /// cursor on high-DPI displays.
    pub fn apply(&mut self, input: &InputFrame) -> InputOutcome {
        let before = self.raster.viewport();
        if input.reset {
            self.raster.reset_view();
        }
        if input.scroll_points != 0.0 {
            self.raster
                .zoom_by(input.scroll_points * self.settings.scroll_units_per_point);
        }
        if input.drag_points != Vec2::ZERO {
            let ppp = if input.pixels_per_point > 0.0 {
                input.pixels_per_point
            } else {
                1.0
            };
            self.raster
                .pan(input.drag_points.x * ppp, input.drag_points.y * ppp);
        }
        InputOutcome {
            view_changed: self.raster.viewport() != before,
            close_requested: input.close,
        }
    }
}

/// View and target size a frame was rendered for.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FrameKey {
    view: ViewportState,
    width: u32,
    height: u32,
}

pub fn sampling_mode(settings: &ViewerSettings) -> SamplingMode {
    let mag = match settings.zoom_filter_mode {
        ZoomFilterMode::Linear => wgpu::FilterMode::Linear,
        ZoomFilterMode::Nearest => wgpu::FilterMode::Nearest,
    };
    SamplingMode {
        min: wgpu::FilterMode::Linear,
        mag,
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct ViewerApp {
    session: ViewerSession,
    presenter: Option<Presenter>,
    frame_texture: Option<egui::TextureHandle>,
    last_frame: Option<FrameKey>,
    /// Last presentation failure, shown in place of the image.
    status: Option<String>,
    show_info: bool,
    /// Cursor position in image pixels, when over the raster area.
    cursor_image_pos: Option<[f32; 2]>,
}

impl ViewerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, mut session: ViewerSession) -> Self {
        let mut status = None;
        let presenter = match GpuContext::new(&session.settings.preferred_gpu) {
            Some(ctx) => {
                log_info!("GPU adapter: {}", ctx.adapter_name);
                let mut presenter = Presenter::new(
                    ctx,
                    sampling_mode(&session.settings),
                    session.settings.background,
                );
                // The CPU copy is dropped at the end of this block.
                if let Some(image) = session.raster.take_image() {
                    match presenter.upload(&image) {
                        Ok(texture) => {
                            if texture.narrowed {
                                log_warn!(
                                    "16-bit samples narrowed to 8 bits: adapter lacks Rgba16Unorm"
                                );
                            }
                            log_info!(
                                "Uploaded {}x{} texture as {:?}",
                                texture.width,
                                texture.height,
                                texture.format
                            );
                        }
                        Err(e) => {
                            log_err!("Texture upload failed: {}", e);
                            status = Some(e.to_string());
                        }
                    }
                }
                Some(presenter)
            }
            None => {
                log_err!("{}", GpuError::NoAdapter);
                status = Some(GpuError::NoAdapter.to_string());
                None
            }
        };

        let show_info = session.settings.show_info_window;
        Self {
            session,
            presenter,
            frame_texture: None,
            last_frame: None,
            status,
            show_info,
            cursor_image_pos: None,
        }
    }

    /// Re-render through the presenter when the view or target size changed.
    fn refresh_frame(&mut self, ctx: &egui::Context, width: u32, height: u32) {
        let key = FrameKey {
            view: self.session.raster.viewport(),
            width,
            height,
        };
        if self.last_frame == Some(key) && self.frame_texture.is_some() {
            return;
        }
        let Some(presenter) = self.presenter.as_mut() else { return };
        if !presenter.has_raster() {
            return;
        }

        let matrix = self
            .session
            .raster
            .projection_matrix(width as f32, height as f32);
        match presenter.render(&matrix, width, height) {
            Ok(pixels) => {
                let image = ColorImage::from_rgba_unmultiplied(
                    [width as usize, height as usize],
                    &pixels,
                );
                // The frame is already at physical resolution, so egui must not
                // filter it again.
                match self.frame_texture.as_mut() {
                    Some(tex) => tex.set(image, TextureOptions::NEAREST),
                    None => {
                        self.frame_texture =
                            Some(ctx.load_texture("raster_frame", image, TextureOptions::NEAREST));
                    }
                }
                self.last_frame = Some(key);
                self.status = None;
            }
            Err(e) => {
                if self.status.is_none() {
                    log_err!("Render failed: {}", e);
                }
                self.status = Some(e.to_string());
            }
        }
    }

    fn info_window(&mut self, ctx: &egui::Context) {
        let raster = &self.session.raster;
        let view = raster.viewport();
        let adapter = self
            .presenter
            .as_ref()
            .map(|p| p.adapter_name().to_string())
            .unwrap_or_else(|| "none".to_string());
        let file = self.session.file_label();
        let cursor = self.cursor_image_pos;

        egui::Window::new("Info")
            .open(&mut self.show_info)
            .resizable(false)
            .default_pos(Pos2::new(12.0, 12.0))
            .show(ctx, |ui| {
                egui::Grid::new("info_grid")
                    .num_columns(2)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("File");
                        ui.label(file);
                        ui.end_row();
                        ui.label("Size");
                        ui.label(format!("{} x {}", raster.width(), raster.height()));
                        ui.end_row();
                        ui.label("Format");
                        ui.label(raster.pixel_format().to_string());
                        ui.end_row();
                        ui.label("Source");
                        ui.label(raster.source_label());
                        ui.end_row();
                        ui.label("Zoom");
                        ui.label(format!("{:.3}", view.zoom()));
                        ui.end_row();
                        let [cx, cy] = view.center();
                        ui.label("Center");
                        ui.label(format!("{:.1}, {:.1}", cx, cy));
                        ui.end_row();
                        if let Some([x, y]) = cursor {
                            // Relative to the image centre; shift to top-left origin.
                            ui.label("Cursor");
                            ui.label(format!(
                                "{:.0}, {:.0}",
                                x + raster.width() as f32 / 2.0,
                                y + raster.height() as f32 / 2.0
                            ));
                            ui.end_row();
                        }
                        ui.label("GPU");
                        ui.label(adapter);
                        ui.end_row();
                    });
                ui.separator();
                ui.weak("Drag to pan, scroll to zoom, 0 resets, Esc quits");
            });
    }
}

impl eframe::App for ViewerApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        let [r, g, b] = self.session.settings.background;
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::I)) {
            self.show_info = !self.show_info;
        }

        let bg = {
            let [r, g, b] = self.session.settings.background;
            Color32::from_rgb(r, g, b)
        };

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(bg))
            .show(ctx, |ui| {
                let sense = egui::Sense::click_and_drag().union(egui::Sense::hover());
                let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
                let rect = response.rect;
                let ppp = ctx.pixels_per_point();

                let input = ctx.input(|i| InputFrame {
                    scroll_points: if response.hovered() { i.scroll_delta.y } else { 0.0 },
                    drag_points: if response.dragged_by(egui::PointerButton::Primary) {
                        response.drag_delta()
                    } else {
                        Vec2::ZERO
                    },
                    pixels_per_point: ppp,
                    reset: i.key_pressed(egui::Key::Num0),
                    close: i.key_pressed(egui::Key::Escape),
                });
                let outcome = self.session.apply(&input);
                if outcome.close_requested {
                    log_info!("Escape pressed, closing");
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }

                self.cursor_image_pos = response.hover_pos().map(|pos| {
                    let offset = (pos - rect.center()) * ppp;
                    self.session.raster.viewport().screen_to_image(offset.x, offset.y)
                });

                let width = (rect.width() * ppp).round() as u32;
                let height = (rect.height() * ppp).round() as u32;
                if width > 0 && height > 0 {
                    self.refresh_frame(ctx, width, height);
                }

                if let Some(tex) = &self.frame_texture {
                    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                    painter.image(tex.id(), rect, uv, Color32::WHITE);
                }
                if let Some(msg) = &self.status {
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        msg,
                        egui::FontId::proportional(16.0),
                        Color32::LIGHT_RED,
                    );
                }
            });

        if self.show_info {
            self.info_window(ctx);
        }
    }
}
