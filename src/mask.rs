//! Binary occupancy mask rasterized from pixel-space polygons.

use crate::coords::PixelPoint;
use image::GrayImage;

/// Single-channel grid, one element per source pixel, holding 0 or 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    grid: GrayImage,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.grid.get_pixel(x, y).0[0]
    }

    pub fn as_raw(&self) -> &[u8] {
        self.grid.as_raw()
    }

    pub fn covered_area(&self) -> u64 {
        self.grid.as_raw().iter().map(|&v| v as u64).sum()
    }

    /// Fills the interior of a closed polygon with 1.
    ///
    /// A pixel is inside when its centre is inside under the even-odd rule.
    /// Vertices outside the grid are allowed; the fill is clipped. Fewer
    /// than three vertices or a zero-area outline leaves the mask untouched.
    pub fn fill_polygon(&mut self, vertices: &[PixelPoint]) {
        let n = vertices.len();
        let (width, height) = (self.width(), self.height());
        if n < 3 || width == 0 || height == 0 {
            return;
        }

        let min_y = vertices.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = vertices.iter().map(|p| p.y).max().unwrap_or(0);
        let rows = min_y.max(0)..max_y.min(height as i32);

        let stride = width as usize;
        let buf: &mut [u8] = &mut self.grid;
        let mut crossings: Vec<f64> = Vec::with_capacity(n);

        for row in rows {
            let yc = row as f64 + 0.5;

            crossings.clear();
            for (i, a) in vertices.iter().enumerate() {
                let b = vertices[(i + 1) % n];
                let (ay, by) = (a.y as f64, b.y as f64);
                if (ay > yc) != (by > yc) {
                    // Vertices may sit anywhere in i32, so interpolate in f64.
                    let (ax, bx) = (a.x as f64, b.x as f64);
                    let t = (yc - ay) / (by - ay);
                    crossings.push(ax + t * (bx - ax));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            let offset = row as usize * stride;
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0);
                let end = (span[1] - 0.5).ceil().min(width as f64);
                if start >= end {
                    continue;
                }
                buf[offset + start as usize..offset + end as usize].fill(1);
            }
        }
    }

    pub fn union_with(&mut self, other: &Mask) {
        debug_assert_eq!(self.grid.dimensions(), other.grid.dimensions());
        for (a, b) in self.grid.iter_mut().zip(other.grid.iter()) {
            *a |= *b;
        }
    }

    /// Whole mask as a viewable image (1 → 255).
    pub fn to_image(&self) -> GrayImage {
        let mut out = self.grid.clone();
        stretch(&mut out);
        out
    }

    /// Sub-region as a viewable image (1 → 255).
    pub fn crop_to_image(&self, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
        let mut out = image::imageops::crop_imm(&self.grid, x, y, width, height).to_image();
        stretch(&mut out);
        out
    }
}

fn stretch(img: &mut GrayImage) {
    for v in img.iter_mut() {
        *v = v.saturating_mul(255);
    }
}

/// Renders polygons into a fresh `width × height` mask. Overlapping polygons
/// accumulate as a union.
pub fn rasterize(polygons: &[Vec<PixelPoint>], width: u32, height: u32) -> Mask {
    let mut mask = Mask::new(width, height);
    for polygon in polygons {
        mask.fill_polygon(polygon);
    }
    mask
}
