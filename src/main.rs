mod app;
mod cli;

use anyhow::Result;
use cli::{Args, Command};
use indicatif::{ProgressBar, ProgressStyle};
use polycrop::layout::{image_stem, DatasetLayout};
use polycrop::scan::discover_images;
use polycrop::{annotation, crop_image, CropSettings, RasterSize};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse_args();
    let settings = args.crop_settings();

    match args.command {
        Some(Command::Crop { image_dir }) => run_batch(&image_dir, &args.results_root, settings),
        Some(Command::Annotate {
            image_dir,
            canvas_width,
            canvas_height,
        }) => run_gui(
            image_dir,
            RasterSize::new(canvas_width, canvas_height),
            args.results_root,
            settings,
        ),
        None => run_gui(None, RasterSize::new(1280, 720), args.results_root, settings),
    }
}

fn run_gui(
    image_dir: Option<PathBuf>,
    canvas: RasterSize,
    results_root: PathBuf,
    settings: CropSettings,
) -> Result<()> {
    let title = "polycrop";
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([canvas.width as f32 + 260.0, canvas.height as f32 + 40.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| {
            Ok(Box::new(app::PolycropApp::new(
                image_dir,
                canvas,
                results_root,
                settings,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("annotation window failed: {e}"))
}

/// Crops every image of `image_dir` with its saved annotations.
fn run_batch(image_dir: &Path, results_root: &Path, settings: CropSettings) -> Result<()> {
    let images = discover_images(image_dir)?;
    let layout = DatasetLayout::create(results_root, image_dir)?;
    tracing::info!(
        images = images.len(),
        output = %layout.root().display(),
        crop_size = settings.crop_size,
        stride = settings.stride,
        "batch crop"
    );

    let style = ProgressStyle::default_bar()
        .template("{msg:>20} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
        .progress_chars("#>-");

    let (mut positive, mut negative) = (0, 0);
    for path in &images {
        let stem = image_stem(path)?;
        let set = annotation::load(&layout.annotation(&stem))?;

        let pb = ProgressBar::new(0);
        pb.set_style(style.clone());
        pb.set_message(stem);

        let report = crop_image(path, &set, &layout, settings, |p| {
            pb.set_length(p.total as u64);
            pb.set_position(p.processed as u64);
            ControlFlow::Continue(())
        })?;
        pb.finish();

        positive += report.positive;
        negative += report.negative;
    }

    tracing::info!(positive, negative, "batch crop done");
    Ok(())
}
