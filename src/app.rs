use eframe::egui;
use polycrop::annotation::AnnotationStore;
use polycrop::draft::{Draft, Retract};
use polycrop::layout::{image_stem, DatasetLayout};
use polycrop::scan::{discover_images, list_images};
use polycrop::{CropJob, CropSettings, DisplayFit, PixelPoint, RasterSize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const VERTEX_RADIUS: f32 = 4.0;
const PREVIEW_SECONDS: f64 = 1.5;
/// Time spent cropping per frame before handing control back to egui.
const CROP_FRAME_BUDGET: Duration = Duration::from_millis(15);

fn annotation_color() -> egui::Color32 {
    egui::Color32::from_rgb(255, 0, 0)
}

// ── Setup screen ────────────────────────────────────────────────────────────

struct Setup {
    image_dir: PathBuf,
    image_count: usize,
    canvas_width: String,
    canvas_height: String,
    error: Option<String>,
}

impl Setup {
    fn new(image_dir: PathBuf, canvas: RasterSize) -> Self {
        let mut setup = Self {
            image_dir: PathBuf::new(),
            image_count: 0,
            canvas_width: canvas.width.to_string(),
            canvas_height: canvas.height.to_string(),
            error: None,
        };
        setup.select_dir(image_dir);
        setup
    }

    fn select_dir(&mut self, dir: PathBuf) {
        self.image_count = list_images(&dir).map(|v| v.len()).unwrap_or(0);
        self.image_dir = dir;
    }

    fn canvas(&self) -> Option<RasterSize> {
        let w = self.canvas_width.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        let h = self.canvas_height.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        Some(RasterSize::new(w, h))
    }
}

// ── Annotation session ──────────────────────────────────────────────────────

/// The image on the canvas plus its annotations.
struct OpenImage {
    path: PathBuf,
    natural: RasterSize,
    fit: DisplayFit,
    texture: egui::TextureHandle,
    /// `None` when the annotation file could not be loaded; editing and
    /// cropping are then disabled so the file is never overwritten.
    store: Option<AnnotationStore>,
}

struct Session {
    images: Vec<PathBuf>,
    index: usize,
    layout: DatasetLayout,
    canvas: RasterSize,
    current: Option<OpenImage>,
    draft: Draft,

    crop_size: String,
    stride: String,
    settings: CropSettings,
    job: Option<CropJob>,
    preview_until: Option<f64>,

    status: Option<String>,
}

impl Session {
    fn start(
        ctx: &egui::Context,
        image_dir: &Path,
        results_root: &Path,
        canvas: RasterSize,
        settings: CropSettings,
    ) -> polycrop::Result<Self> {
        let images = discover_images(image_dir)?;
        let layout = DatasetLayout::create(results_root, image_dir)?;

        let mut session = Self {
            images,
            index: 0,
            layout,
            canvas,
            current: None,
            draft: Draft::new(),
            crop_size: settings.crop_size.to_string(),
            stride: settings.stride.to_string(),
            settings,
            job: None,
            preview_until: None,
            status: None,
        };
        session.open_current(ctx);
        Ok(session)
    }

    fn move_index(&mut self, ctx: &egui::Context, delta: isize) {
        let n = self.images.len() as isize;
        self.index = ((self.index as isize + delta).rem_euclid(n)) as usize;
        self.open_current(ctx);
    }

    fn open_current(&mut self, ctx: &egui::Context) {
        self.draft.clear();
        self.preview_until = None;
        self.status = None;
        self.current = None;

        let path = self.images[self.index].clone();
        let raw = match image::open(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot open image: {e}");
                self.status = Some(format!("Cannot open {}: {e}", path.display()));
                return;
            }
        };

        let natural = RasterSize::new(raw.width(), raw.height());
        let fit = DisplayFit::new(natural, self.canvas);
        let shown = raw
            .resize_exact(
                fit.display.width,
                fit.display.height,
                image::imageops::FilterType::Triangle,
            )
            .to_rgba8();
        let size = [shown.width() as usize, shown.height() as usize];
        let pixels = shown.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        let texture = ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR);

        let store = match image_stem(&path)
            .and_then(|stem| AnnotationStore::open(self.layout.annotation(&stem), fit.display))
        {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::error!("{e}");
                self.status = Some(e.to_string());
                None
            }
        };

        self.current = Some(OpenImage {
            path,
            natural,
            fit,
            texture,
            store,
        });
    }

    fn parsed_settings(&self) -> Option<CropSettings> {
        let crop_size = self.crop_size.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        let stride = self.stride.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        Some(CropSettings {
            crop_size,
            stride,
            ..self.settings
        })
    }

    fn start_crop(&mut self, ctx: &egui::Context) {
        let Some(settings) = self.parsed_settings() else {
            self.status = Some("Crop size and stride must be positive integers".into());
            return;
        };
        let Some(open) = &self.current else {
            return;
        };
        let Some(store) = &open.store else {
            return;
        };

        match CropJob::prepare(&open.path, store.set(), &self.layout, settings) {
            Ok(job) => {
                self.settings = settings;
                self.job = Some(job);
                self.status = None;
                ctx.request_repaint();
            }
            Err(e) => {
                tracing::error!("crop failed: {e}");
                self.status = Some(e.to_string());
            }
        }
    }

    /// Advances the running crop for at most one frame budget.
    fn pump_crop(&mut self, ctx: &egui::Context) {
        let Some(job) = self.job.as_mut() else {
            return;
        };

        let started = Instant::now();
        while started.elapsed() < CROP_FRAME_BUDGET {
            match job.step() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("crop aborted: {e}");
                    self.status = Some(format!("Crop aborted: {e}"));
                    self.job = None;
                    return;
                }
            }
        }

        if job.is_finished() {
            if let Some(job) = self.job.take() {
                self.status = Some(match job.finish() {
                    Ok(report) => format!(
                        "{} positive, {} negative, {} ignored",
                        report.positive, report.negative, report.ignored
                    ),
                    Err(e) => format!("Crop report failed: {e}"),
                });
            }
        } else {
            ctx.request_repaint();
        }
    }

    fn controls(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let busy = self.job.is_some();

        ui.horizontal(|ui| {
            ui.label(format!("{} / {}", self.index + 1, self.images.len()));
            if ui.add_enabled(!busy, egui::Button::new("◀")).clicked() {
                self.move_index(ctx, -1);
            }
            if ui.add_enabled(!busy, egui::Button::new("▶")).clicked() {
                self.move_index(ctx, 1);
            }
        });
        if let Some(open) = &self.current {
            ui.label(
                open.path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        ui.separator();

        egui::Grid::new("crop_settings").show(ui, |ui| {
            ui.label("Crop Size");
            ui.add_enabled(!busy, egui::TextEdit::singleline(&mut self.crop_size));
            ui.end_row();
            ui.label("Stride");
            ui.add_enabled(!busy, egui::TextEdit::singleline(&mut self.stride));
            ui.end_row();
        });

        if ui.add_enabled(!busy, egui::Button::new("Example")).clicked() {
            if self.parsed_settings().is_some() {
                self.preview_until = Some(ctx.input(|i| i.time) + PREVIEW_SECONDS);
            } else {
                self.status = Some("Crop size and stride must be positive integers".into());
            }
        }
        ui.separator();

        let can_crop = self
            .current
            .as_ref()
            .is_some_and(|open| open.store.is_some());
        let label = match &self.job {
            Some(job) => format!("{} %", (job.progress().fraction() * 100.0) as u32),
            None => "Go!".to_string(),
        };
        if ui
            .add_enabled(!busy && can_crop, egui::Button::new(label))
            .clicked()
        {
            self.start_crop(ctx);
        }
        if let Some(job) = &self.job {
            ui.add(egui::ProgressBar::new(job.progress().fraction()).show_percentage());
        }

        if let Some(status) = &self.status {
            ui.separator();
            ui.label(status);
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(open) = &self.current else {
            return;
        };
        let display = open.fit.display;
        let (response, painter) = ui.allocate_painter(
            egui::vec2(display.width as f32, display.height as f32),
            egui::Sense::click(),
        );
        let origin = response.rect.min;
        painter.image(
            open.texture.id(),
            response.rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let to_screen =
            |p: &PixelPoint| origin + egui::vec2(p.x as f32, p.y as f32);
        let pointer = response.hover_pos().map(|pos| {
            let rel = pos - origin;
            PixelPoint::new(
                (rel.x as i32).clamp(0, display.width as i32 - 1),
                (rel.y as i32).clamp(0, display.height as i32 - 1),
            )
        });

        // Saved polygons, closed.
        if let Some(store) = &open.store {
            for polygon in store.set().to_pixels(display) {
                draw_path(&painter, &polygon, true, to_screen);
            }
        }
        // Polygon in progress, open.
        draw_path(&painter, self.draft.points(), false, to_screen);

        if let Some(until) = self.preview_until {
            let now = ctx.input(|i| i.time);
            if now < until {
                if let Some(settings) = self.parsed_settings() {
                    draw_preview(&painter, origin, open, settings);
                }
                ctx.request_repaint_after(Duration::from_secs_f64(until - now));
            } else {
                self.preview_until = None;
            }
        }

        if self.job.is_some() || open.store.is_none() {
            return;
        }
        let Some(at) = pointer else {
            return;
        };

        let (primary, secondary, moved) = ctx.input(|i| {
            (
                i.pointer.button_pressed(egui::PointerButton::Primary),
                i.pointer.button_pressed(egui::PointerButton::Secondary),
                i.pointer.delta() != egui::Vec2::ZERO,
            )
        });

        if moved && self.draft.is_active() {
            self.draft.hover(at);
        }

        let result = if primary {
            match self.draft.press(at) {
                Some(polygon) => self
                    .current
                    .as_mut()
                    .and_then(|open| open.store.as_mut())
                    .map(|store| store.add_polygon(&polygon)),
                None => None,
            }
        } else if secondary {
            match self.draft.retract(at) {
                Retract::PreviousPolygon => self
                    .current
                    .as_mut()
                    .and_then(|open| open.store.as_mut())
                    .map(|store| store.remove_last_polygon().map(|_| ())),
                Retract::Vertex => None,
            }
        } else {
            None
        };

        if let Some(Err(e)) = result {
            tracing::error!("saving annotations failed: {e}");
            self.status = Some(e.to_string());
        }
    }
}

fn draw_path(
    painter: &egui::Painter,
    points: &[PixelPoint],
    closed: bool,
    to_screen: impl Fn(&PixelPoint) -> egui::Pos2,
) {
    if points.is_empty() {
        return;
    }
    let stroke = egui::Stroke::new(2.0, annotation_color());
    let screen: Vec<egui::Pos2> = points.iter().map(&to_screen).collect();

    for pair in screen.windows(2) {
        painter.line_segment([pair[0], pair[1]], stroke);
    }
    if closed {
        if let (Some(&first), Some(&last)) = (screen.first(), screen.last()) {
            painter.line_segment([last, first], stroke);
        }
    }
    let vertices = if closed {
        &screen[..]
    } else {
        &screen[..screen.len() - 1]
    };
    for &p in vertices {
        painter.circle_filled(p, VERTEX_RADIUS, annotation_color());
    }
}

/// Shows one tile and its stride-shifted neighbour at display scale.
fn draw_preview(painter: &egui::Painter, origin: egui::Pos2, open: &OpenImage, settings: CropSettings) {
    let side = open.fit.to_display_len(open.natural, settings.crop_size) as f32;
    let shift = open.fit.to_display_len(open.natural, settings.stride) as f32;
    let first = egui::Rect::from_min_size(origin + egui::vec2(3.0, 3.0), egui::vec2(side, side));

    painter.rect_stroke(
        first,
        0.0,
        egui::Stroke::new(3.0, egui::Color32::from_rgb(0, 255, 0)),
        egui::StrokeKind::Middle,
    );
    painter.rect_stroke(
        first.translate(egui::vec2(shift, 0.0)),
        0.0,
        egui::Stroke::new(3.0, egui::Color32::from_rgb(0, 0, 255)),
        egui::StrokeKind::Middle,
    );
}

// ── App ─────────────────────────────────────────────────────────────────────

enum Screen {
    Setup(Setup),
    Annotate(Box<Session>),
}

pub struct PolycropApp {
    screen: Screen,
    results_root: PathBuf,
    settings: CropSettings,
}

impl PolycropApp {
    pub fn new(
        image_dir: Option<PathBuf>,
        canvas: RasterSize,
        results_root: PathBuf,
        settings: CropSettings,
    ) -> Self {
        Self {
            screen: Screen::Setup(Setup::new(
                image_dir.unwrap_or_else(|| PathBuf::from("./")),
                canvas,
            )),
            results_root,
            settings,
        }
    }

    fn setup_ui(&mut self, ctx: &egui::Context) {
        let Screen::Setup(setup) = &mut self.screen else {
            return;
        };
        let mut started = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Abnormal Area Auto Cropping");
            });
            ui.add_space(20.0);

            ui.label("Directory Setting");
            ui.horizontal(|ui| {
                ui.label(setup.image_dir.display().to_string());
                if ui.button("Load Directory").clicked() {
                    let picked = rfd::FileDialog::new()
                        .set_title("Select Directory")
                        .pick_folder()
                        .unwrap_or_else(|| PathBuf::from("./"));
                    setup.select_dir(picked);
                }
            });
            ui.add_space(20.0);

            ui.label("Canvas Size Setting");
            egui::Grid::new("canvas_size").show(ui, |ui| {
                ui.label("Width  : ");
                ui.text_edit_singleline(&mut setup.canvas_width);
                ui.end_row();
                ui.label("Height : ");
                ui.text_edit_singleline(&mut setup.canvas_height);
                ui.end_row();
            });

            let ready = setup.image_count > 0 && setup.canvas().is_some();
            if ui
                .add_enabled(ready, egui::Button::new("Start Cropping!"))
                .clicked()
            {
                started = setup.canvas();
            }
            ui.label(format!("{} images detected", setup.image_count));
            if let Some(error) = &setup.error {
                ui.colored_label(egui::Color32::RED, error);
            }
        });

        let Some(canvas) = started else {
            return;
        };
        match Session::start(ctx, &setup.image_dir, &self.results_root, canvas, self.settings) {
            Ok(session) => self.screen = Screen::Annotate(Box::new(session)),
            Err(e) => {
                tracing::error!("cannot start session: {e}");
                setup.error = Some(e.to_string());
            }
        }
    }
}

impl eframe::App for PolycropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if matches!(self.screen, Screen::Setup(_)) {
            self.setup_ui(ctx);
            return;
        }
        let Screen::Annotate(session) = &mut self.screen else {
            return;
        };

        session.pump_crop(ctx);

        egui::SidePanel::left("controls")
            .resizable(false)
            .show(ctx, |ui| session.controls(ctx, ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both()
                .drag_to_scroll(false)
                .show(ui, |ui| session.canvas(ctx, ui));
        });
    }
}
