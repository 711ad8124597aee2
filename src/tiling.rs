//! Sliding-window tile enumeration and positive/negative classification.
//!
//! Tiles are square, `crop_size` on a side, placed every `stride` pixels
//! starting at the origin. A leftover margin narrower than `crop_size` at the
//! right or bottom edge is not covered. Enumeration runs column by column:
//! the outer loop walks `x1`, the inner loop walks `y1`.

use crate::coords::RasterSize;
use crate::mask::Mask;
use serde::{Deserialize, Serialize};

/// Half-open tile rectangle `[x1, x2) × [y1, y2)` in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileBounds {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl TileBounds {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileLabel {
    Positive,
    Negative,
}

/// When a tile that touches an annotated region counts as negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OverlapRule {
    /// Any covered pixel makes the tile negative.
    AnyOverlap,
    /// Covered area must reach `fraction` of the tile area. Tiles with some
    /// overlap below that are ignored.
    MinFraction { fraction: f64 },
}

impl Default for OverlapRule {
    fn default() -> Self {
        OverlapRule::MinFraction { fraction: 0.01 }
    }
}

impl OverlapRule {
    /// `None` means the tile is ignored and produces no output.
    pub fn label(&self, intersection: u64, tile_area: u64) -> Option<TileLabel> {
        if intersection == 0 {
            return Some(TileLabel::Positive);
        }
        match *self {
            OverlapRule::AnyOverlap => Some(TileLabel::Negative),
            OverlapRule::MinFraction { fraction } => {
                (intersection as f64 >= tile_area as f64 * fraction).then_some(TileLabel::Negative)
            }
        }
    }
}

/// Tile start offsets along one axis. Empty when no tile fits or when
/// `crop_size` or `stride` is zero.
pub fn start_offsets(extent: u32, crop_size: u32, stride: u32) -> Vec<u32> {
    if crop_size == 0 || stride == 0 || crop_size > extent {
        return Vec::new();
    }
    (0..=extent - crop_size).step_by(stride as usize).collect()
}

// ── Grid ────────────────────────────────────────────────────────────────────

/// Every tile position for one image, in enumeration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    columns: Vec<u32>,
    rows: Vec<u32>,
    crop_size: u32,
}

impl TileGrid {
    pub fn new(size: RasterSize, crop_size: u32, stride: u32) -> Self {
        Self {
            columns: start_offsets(size.width, crop_size, stride),
            rows: start_offsets(size.height, crop_size, stride),
            crop_size,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self, index: usize) -> Option<TileBounds> {
        if index >= self.len() {
            return None;
        }
        let x1 = self.columns[index / self.rows.len()];
        let y1 = self.rows[index % self.rows.len()];
        Some(TileBounds {
            x1,
            y1,
            x2: x1 + self.crop_size,
            y2: y1 + self.crop_size,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = TileBounds> + '_ {
        (0..self.len()).filter_map(|i| self.bounds(i))
    }
}

// ── Area lookup ─────────────────────────────────────────────────────────────

/// Summed-area table over a mask; any rectangle sum in constant time.
///
/// Sums are kept modulo 2^32, so a rectangle sum is exact as long as the
/// rectangle holds fewer than 2^32 pixels.
#[derive(Clone, Debug)]
pub struct IntegralMask {
    width: usize,
    sums: Vec<u32>,
}

impl IntegralMask {
    pub fn new(mask: &Mask) -> Self {
        let (w, h) = (mask.width() as usize, mask.height() as usize);
        let stride = w + 1;
        let mut sums = vec![0u32; stride * (h + 1)];

        for (y, row) in mask.as_raw().chunks_exact(w.max(1)).take(h).enumerate() {
            let mut row_sum = 0u32;
            for (x, &v) in row.iter().enumerate() {
                row_sum = row_sum.wrapping_add(v as u32);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1].wrapping_add(row_sum);
            }
        }

        Self { width: w, sums }
    }

    /// Count of covered pixels inside `bounds`. Bounds must lie in the mask.
    pub fn area(&self, bounds: TileBounds) -> u64 {
        debug_assert!(bounds.area() <= u32::MAX as u64);
        let stride = self.width + 1;
        let at = |x: u32, y: u32| self.sums[y as usize * stride + x as usize];
        at(bounds.x2, bounds.y2)
            .wrapping_add(at(bounds.x1, bounds.y1))
            .wrapping_sub(at(bounds.x1, bounds.y2))
            .wrapping_sub(at(bounds.x2, bounds.y1)) as u64
    }
}

// ── Classification ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// `processed / total`, or 1.0 when there is nothing to do.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }

    pub fn is_done(&self) -> bool {
        self.processed >= self.total
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedTile {
    pub index: usize,
    pub bounds: TileBounds,
    pub intersection: u64,
    pub label: Option<TileLabel>,
}

/// Lazy tile classification. Each `next()` handles exactly one tile, so a
/// caller can report progress or stop between tiles.
#[derive(Clone, Debug)]
pub struct TileSweep {
    grid: TileGrid,
    integral: IntegralMask,
    rule: OverlapRule,
    next: usize,
}

impl TileSweep {
    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.next,
            total: self.grid.len(),
        }
    }
}

impl Iterator for TileSweep {
    type Item = ClassifiedTile;

    fn next(&mut self) -> Option<ClassifiedTile> {
        let bounds = self.grid.bounds(self.next)?;
        let index = self.next;
        self.next += 1;

        let intersection = self.integral.area(bounds);
        Some(ClassifiedTile {
            index,
            bounds,
            intersection,
            label: self.rule.label(intersection, bounds.area()),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid.len() - self.next;
        (left, Some(left))
    }
}

pub fn classify(mask: &Mask, crop_size: u32, stride: u32, rule: OverlapRule) -> TileSweep {
    let size = RasterSize::new(mask.width(), mask.height());
    TileSweep {
        grid: TileGrid::new(size, crop_size, stride),
        integral: IntegralMask::new(mask),
        rule,
        next: 0,
    }
}
