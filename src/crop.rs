//! Crop job: annotations → full-resolution mask → classified tiles on disk.
//!
//! A [`CropJob`] owns everything one crop request needs, so it can be
//! driven tile by tile from a frame loop ([`CropJob::step`]) or run to
//! completion with a progress callback ([`CropJob::run`]). Nothing is shared
//! between jobs.

use crate::annotation::AnnotationSet;
use crate::codec::{decode_image, encode_image};
use crate::coords::RasterSize;
use crate::error::{CropError, Result};
use crate::layout::{image_stem, DatasetLayout};
use crate::mask::{rasterize, Mask};
use crate::tiling::{classify, ClassifiedTile, OverlapRule, Progress, TileLabel, TileSweep};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropSettings {
    pub crop_size: u32,
    pub stride: u32,
    pub rule: OverlapRule,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            crop_size: 500,
            stride: 100,
            rule: OverlapRule::default(),
        }
    }
}

/// Summary written next to the dataset after each crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropReport {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub settings: CropSettings,
    pub covered_pixels: u64,
    pub total_tiles: usize,
    pub processed_tiles: usize,
    pub positive: usize,
    pub negative: usize,
    pub ignored: usize,
    pub completed: bool,
}

pub struct CropJob {
    source: PathBuf,
    stem: String,
    image: RgbImage,
    mask: Mask,
    sweep: TileSweep,
    layout: DatasetLayout,
    settings: CropSettings,
    positive: usize,
    negative: usize,
    ignored: usize,
}

impl CropJob {
    /// Decodes the image, rasterizes the annotations at full resolution and
    /// writes the whole-image mask. No tile is produced yet.
    pub fn prepare(
        image_path: &Path,
        annotations: &AnnotationSet,
        layout: &DatasetLayout,
        settings: CropSettings,
    ) -> Result<Self> {
        let stem = image_stem(image_path)?;
        let image = decode_image(image_path)?;
        let size = RasterSize::new(image.width(), image.height());

        let mask = rasterize(&annotations.to_pixels(size), size.width, size.height);

        layout.ensure_dirs()?;
        encode_image(&mask.to_image(), &layout.mask(&stem))?;

        let sweep = classify(&mask, settings.crop_size, settings.stride, settings.rule);
        tracing::info!(
            image = %image_path.display(),
            width = size.width,
            height = size.height,
            polygons = annotations.len(),
            tiles = sweep.progress().total,
            "prepared crop"
        );

        Ok(Self {
            source: image_path.to_path_buf(),
            stem,
            image,
            mask,
            sweep,
            layout: layout.clone(),
            settings,
            positive: 0,
            negative: 0,
            ignored: 0,
        })
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn progress(&self) -> Progress {
        self.sweep.progress()
    }

    pub fn is_finished(&self) -> bool {
        self.progress().is_done()
    }

    /// Classifies the next tile and writes its files. `Ok(None)` once every
    /// tile has been handled. The first write failure is returned as is;
    /// files already written stay on disk.
    pub fn step(&mut self) -> Result<Option<ClassifiedTile>> {
        let Some(tile) = self.sweep.next() else {
            return Ok(None);
        };
        let b = tile.bounds;

        match tile.label {
            Some(TileLabel::Positive) => {
                let path = self.layout.positive_tile(&self.stem, self.positive);
                encode_image(&self.crop_source(&tile), &path)?;
                self.positive += 1;
                tracing::debug!(path = %path.display(), x = b.x1, y = b.y1, "positive tile");
            }
            Some(TileLabel::Negative) => {
                let path = self.layout.negative_tile(&self.stem, self.negative);
                encode_image(&self.crop_source(&tile), &path)?;
                let mask_tile = self.mask.crop_to_image(b.x1, b.y1, b.width(), b.height());
                encode_image(
                    &mask_tile,
                    &self.layout.negative_tile_mask(&self.stem, self.negative),
                )?;
                self.negative += 1;
                tracing::debug!(
                    path = %path.display(),
                    x = b.x1,
                    y = b.y1,
                    covered = tile.intersection,
                    "negative tile"
                );
            }
            None => self.ignored += 1,
        }

        Ok(Some(tile))
    }

    fn crop_source(&self, tile: &ClassifiedTile) -> RgbImage {
        let b = tile.bounds;
        image::imageops::crop_imm(&self.image, b.x1, b.y1, b.width(), b.height()).to_image()
    }

    /// Handles every remaining tile, calling `on_progress` after each one.
    /// Returning `ControlFlow::Break` stops between tiles; the report then
    /// has `completed == false`.
    pub fn run<F>(mut self, mut on_progress: F) -> Result<CropReport>
    where
        F: FnMut(Progress) -> ControlFlow<()>,
    {
        while self.step()?.is_some() {
            if on_progress(self.progress()).is_break() {
                tracing::info!(image = %self.source.display(), "crop interrupted");
                break;
            }
        }
        self.finish()
    }

    pub fn finish(self) -> Result<CropReport> {
        let progress = self.progress();
        let report = CropReport {
            image: self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.stem.clone()),
            width: self.image.width(),
            height: self.image.height(),
            settings: self.settings,
            covered_pixels: self.mask.covered_area(),
            total_tiles: progress.total,
            processed_tiles: progress.processed,
            positive: self.positive,
            negative: self.negative,
            ignored: self.ignored,
            completed: progress.is_done(),
        };

        let path = self.layout.report(&self.stem);
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).map_err(|e| CropError::io(&path, e))?;

        tracing::info!(
            image = %self.source.display(),
            positive = report.positive,
            negative = report.negative,
            ignored = report.ignored,
            completed = report.completed,
            "crop finished"
        );
        Ok(report)
    }
}

pub fn crop_image<F>(
    image_path: &Path,
    annotations: &AnnotationSet,
    layout: &DatasetLayout,
    settings: CropSettings,
    on_progress: F,
) -> Result<CropReport>
where
    F: FnMut(Progress) -> ControlFlow<()>,
{
    CropJob::prepare(image_path, annotations, layout, settings)?.run(on_progress)
}
