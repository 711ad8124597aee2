//! Polygon annotations for one image and their on-disk text format.
//!
//! The file holds one polygon per line as a flat, comma-separated list of
//! normalized `x,y` pairs. A missing file means "no polygons". Every edit
//! made through [`AnnotationStore`] is written back immediately.

use crate::coords::{denormalize, normalize, NormPoint, PixelPoint, RasterSize};
use crate::error::{CropError, Result};
use std::fs;
use std::path::{Path, PathBuf};

// ── Data Model ──────────────────────────────────────────────────────────────

/// Closed polygon in normalized coordinates. The last vertex connects back
/// to the first.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<NormPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<NormPoint>) -> Self {
        Self { vertices }
    }

    pub fn from_pixels(points: &[PixelPoint], raster: RasterSize) -> Self {
        Self {
            vertices: points.iter().map(|p| normalize(*p, raster)).collect(),
        }
    }

    pub fn to_pixels(&self, raster: RasterSize) -> Vec<PixelPoint> {
        self.vertices
            .iter()
            .map(|v| denormalize(*v, raster))
            .collect()
    }

    pub fn vertices(&self) -> &[NormPoint] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Ordered polygons of a single image. Duplicates are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSet {
    polygons: Vec<Polygon>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn push(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn pop(&mut self) -> Option<Polygon> {
        self.polygons.pop()
    }

    pub fn to_pixels(&self, raster: RasterSize) -> Vec<Vec<PixelPoint>> {
        self.polygons.iter().map(|p| p.to_pixels(raster)).collect()
    }

    /// Parses the text format. `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut polygons = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let corrupt = |reason: String| CropError::CorruptAnnotation {
                path: path.to_path_buf(),
                line: idx + 1,
                reason,
            };

            let values = line
                .split(',')
                .map(|token| {
                    let token = token.trim();
                    match token.parse::<f64>() {
                        Ok(v) if v.is_finite() => Ok(v),
                        Ok(_) => Err(corrupt(format!("non-finite value '{token}'"))),
                        Err(_) => Err(corrupt(format!("non-numeric token '{token}'"))),
                    }
                })
                .collect::<Result<Vec<f64>>>()?;

            if values.len() % 2 != 0 {
                return Err(corrupt(format!(
                    "odd number of coordinates ({})",
                    values.len()
                )));
            }

            let vertices = values
                .chunks_exact(2)
                .map(|xy| NormPoint::new(xy[0], xy[1]))
                .collect();
            polygons.push(Polygon::new(vertices));
        }

        Ok(Self { polygons })
    }

    /// One line per polygon, no trailing newline.
    pub fn to_text(&self) -> String {
        self.polygons
            .iter()
            .map(|poly| {
                poly.vertices
                    .iter()
                    .flat_map(|v| [v.x.to_string(), v.y.to_string()])
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ── Persistence ─────────────────────────────────────────────────────────────

/// Reads an annotation file. An absent file yields an empty set.
pub fn load(path: &Path) -> Result<AnnotationSet> {
    match fs::read_to_string(path) {
        Ok(text) => AnnotationSet::parse(&text, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AnnotationSet::new()),
        Err(e) => Err(CropError::io(path, e)),
    }
}

pub fn save(path: &Path, set: &AnnotationSet) -> Result<()> {
    fs::write(path, set.to_text()).map_err(|e| CropError::io(path, e))
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Editable annotations of the image currently open, bound to their file
/// and to the display raster the user draws on.
#[derive(Debug)]
pub struct AnnotationStore {
    path: PathBuf,
    set: AnnotationSet,
    display: RasterSize,
}

impl AnnotationStore {
    pub fn open(path: impl Into<PathBuf>, display: RasterSize) -> Result<Self> {
        let path = path.into();
        let set = load(&path)?;
        tracing::debug!(path = %path.display(), polygons = set.len(), "loaded annotations");
        Ok(Self { path, set, display })
    }

    pub fn set(&self) -> &AnnotationSet {
        &self.set
    }

    /// Appends a polygon given in display pixels and persists the set.
    pub fn add_polygon(&mut self, vertices: &[PixelPoint]) -> Result<()> {
        self.set.push(Polygon::from_pixels(vertices, self.display));
        self.save()
    }

    /// Drops the most recent polygon and persists the set. Returns `false`
    /// without touching the file when the set is already empty.
    pub fn remove_last_polygon(&mut self) -> Result<bool> {
        if self.set.pop().is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        save(&self.path, &self.set)?;
        tracing::info!(path = %self.path.display(), polygons = self.set.len(), "saved annotations");
        Ok(())
    }
}
