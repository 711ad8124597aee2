//! End-to-end crop tests through the public API.

use image::{Rgb, RgbImage};
use polycrop::annotation::{self, AnnotationStore};
use polycrop::{
    crop_image, CropError, CropJob, CropSettings, DatasetLayout, OverlapRule, PixelPoint,
    RasterSize, TileLabel,
};
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

fn checkerboard(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbImage::from_fn(w, h, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([200, 30, 30])
        } else {
            Rgb([20, 20, 220])
        }
    });
    img.save(&path).unwrap();
    path
}

fn keep_going(_: polycrop::Progress) -> ControlFlow<()> {
    ControlFlow::Continue(())
}

fn settings(crop_size: u32, stride: u32, rule: OverlapRule) -> CropSettings {
    CropSettings {
        crop_size,
        stride,
        rule,
    }
}

/// Files directly inside `dir`, sorted, with their bytes.
fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            (
                path.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read(&path).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_annotation_drawn_on_display_crops_full_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let src_dir = dir.path().join("scans");
    fs::create_dir(&src_dir).unwrap();
    let src = checkerboard(&src_dir, "wafer.png", 400, 200);
    let layout = DatasetLayout::create(&dir.path().join("results"), &src_dir).unwrap();

    // The canvas shows the image at half size.
    let display = RasterSize::new(200, 100);
    let mut store = AnnotationStore::open(layout.annotation("wafer"), display).unwrap();
    store
        .add_polygon(&[
            PixelPoint::new(0, 0),
            PixelPoint::new(50, 0),
            PixelPoint::new(50, 50),
            PixelPoint::new(0, 50),
        ])
        .unwrap();

    let set = annotation::load(&layout.annotation("wafer")).unwrap();
    let report = crop_image(
        &src,
        &set,
        &layout,
        settings(100, 100, OverlapRule::AnyOverlap),
        keep_going,
    )
    .unwrap();

    // 100x100 display square becomes the top-left 100x100 full-res tile.
    assert_eq!(report.covered_pixels, 100 * 100);
    assert_eq!(report.total_tiles, 8);
    assert_eq!(report.negative, 1);
    assert_eq!(report.positive, 7);

    let tile = image::open(layout.negative_tile("wafer", 0)).unwrap().to_rgb8();
    assert_eq!(tile.dimensions(), (100, 100));
    assert_eq!(tile.get_pixel(0, 0), &Rgb([200, 30, 30]));

    let tile_mask = image::open(layout.negative_tile_mask("wafer", 0))
        .unwrap()
        .to_luma8();
    assert!(tile_mask.pixels().all(|p| p.0[0] == 255));

    let full_mask = image::open(layout.mask("wafer")).unwrap().to_luma8();
    assert_eq!(full_mask.dimensions(), (400, 200));
    assert_eq!(full_mask.get_pixel(99, 99).0[0], 255);
    assert_eq!(full_mask.get_pixel(100, 99).0[0], 0);
}

#[test]
fn test_small_overlap_ignored_under_fraction_rule() {
    let dir = tempfile::tempdir().unwrap();
    let src = checkerboard(dir.path(), "plate.png", 1000, 1000);
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();

    // 10x10 annotated corner.
    let mut set = polycrop::AnnotationSet::new();
    set.push(polycrop::Polygon::from_pixels(
        &[
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
        ],
        RasterSize::new(1000, 1000),
    ));

    let mut job = CropJob::prepare(
        &src,
        &set,
        &layout,
        settings(500, 500, OverlapRule::default()),
    )
    .unwrap();
    let first = job.step().unwrap().unwrap();
    assert_eq!(first.intersection, 100);
    assert_eq!(first.label, None);

    let report = job.run(keep_going).unwrap();
    assert_eq!(report.ignored, 1);
    assert_eq!(report.negative, 0);
    assert_eq!(report.positive, 3);
    assert!(!layout.negative_tile("plate", 0).exists());

    let report = crop_image(
        &src,
        &set,
        &layout,
        settings(500, 500, OverlapRule::AnyOverlap),
        keep_going,
    )
    .unwrap();
    assert_eq!(report.negative, 1);
    assert!(layout.negative_tile("plate", 0).is_file());
}

#[test]
fn test_crop_larger_than_image_yields_no_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let src = checkerboard(dir.path(), "tiny.png", 64, 48);
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();

    let report = crop_image(
        &src,
        &polycrop::AnnotationSet::new(),
        &layout,
        settings(100, 10, OverlapRule::AnyOverlap),
        keep_going,
    )
    .unwrap();
    assert_eq!(report.total_tiles, 0);
    assert!(report.completed);
    assert!(layout.mask("tiny").is_file());
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let src = checkerboard(dir.path(), "board.png", 120, 90);
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();

    let set = polycrop::AnnotationSet::parse(
        "0.1,0.1,0.6,0.2,0.4,0.8\n0.5,0.5,0.9,0.5,0.9,0.9,0.5,0.9",
        Path::new("inline"),
    )
    .unwrap();
    let cfg = settings(30, 20, OverlapRule::AnyOverlap);

    let first = crop_image(&src, &set, &layout, cfg, keep_going).unwrap();
    let dirs = ["positive", "negative", "mask", "neg_mask", "reports"];
    let before: Vec<_> = dirs.iter().map(|d| snapshot(&layout.root().join(d))).collect();

    let second = crop_image(&src, &set, &layout, cfg, keep_going).unwrap();
    let after: Vec<_> = dirs.iter().map(|d| snapshot(&layout.root().join(d))).collect();

    assert_eq!(first, second);
    assert_eq!(before, after);
    assert_eq!(first.positive + first.negative, first.total_tiles);
}

#[test]
fn test_every_tile_positive_xor_negative_under_any_rule() {
    let dir = tempfile::tempdir().unwrap();
    let src = checkerboard(dir.path(), "board.png", 100, 100);
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();
    let set = polycrop::AnnotationSet::parse("0.2,0.2,0.7,0.3,0.5,0.9", Path::new("inline"))
        .unwrap();

    let mut job = CropJob::prepare(
        &src,
        &set,
        &layout,
        settings(20, 10, OverlapRule::AnyOverlap),
    )
    .unwrap();
    while let Some(tile) = job.step().unwrap() {
        match tile.label {
            Some(TileLabel::Positive) => assert_eq!(tile.intersection, 0),
            Some(TileLabel::Negative) => assert!(tile.intersection > 0),
            None => panic!("tile {:?} dropped", tile.bounds),
        }
    }
}

#[test]
fn test_unreadable_image_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("broken.png");
    fs::write(&src, b"definitely not a png").unwrap();
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();

    let err = crop_image(
        &src,
        &polycrop::AnnotationSet::new(),
        &layout,
        CropSettings::default(),
        keep_going,
    )
    .unwrap_err();
    match err {
        CropError::Image { path, .. } => assert_eq!(path, src),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_batch_stops_on_first_write_failure() {
    let dir = tempfile::tempdir().unwrap();
    let src = checkerboard(dir.path(), "board.png", 60, 60);
    let layout = DatasetLayout::create(&dir.path().join("results"), dir.path()).unwrap();

    // A directory squatting on the second positive tile path blocks the write.
    fs::create_dir_all(layout.positive_tile("board", 1)).unwrap();

    let mut job = CropJob::prepare(
        &src,
        &polycrop::AnnotationSet::new(),
        &layout,
        settings(20, 20, OverlapRule::AnyOverlap),
    )
    .unwrap();
    assert!(job.step().unwrap().is_some());
    let err = job.step().unwrap_err();
    assert!(matches!(err, CropError::Image { .. }));
    assert!(layout.positive_tile("board", 0).is_file());
    assert_eq!(job.progress().processed, 2);
}
