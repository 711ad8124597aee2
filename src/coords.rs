//! Mapping between display pixels, full-resolution pixels and normalized
//! coordinates.
//!
//! Pixel coordinates always belong to one specific raster. A point drawn on
//! the display canvas is normalized with the display size and only ever
//! reaches full-resolution pixel space through [`denormalize`] with the
//! source image size.

use serde::{Deserialize, Serialize};

/// Width and height of a raster in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resolution-independent point, each axis in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

impl NormPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer point in a specific raster's pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: PixelPoint) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// `x / width, y / height`.
pub fn normalize(point: PixelPoint, raster: RasterSize) -> NormPoint {
    NormPoint {
        x: point.x as f64 / raster.width.max(1) as f64,
        y: point.y as f64 / raster.height.max(1) as f64,
    }
}

/// `floor(x * width), floor(y * height)`.
pub fn denormalize(point: NormPoint, raster: RasterSize) -> PixelPoint {
    PixelPoint {
        x: (point.x * raster.width as f64).floor() as i32,
        y: (point.y * raster.height as f64).floor() as i32,
    }
}

/// How a source image is shown on the canvas: one uniform scale factor and
/// the resulting display raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayFit {
    pub scale: f64,
    pub display: RasterSize,
}

impl DisplayFit {
    /// Landscape images fill the canvas width, everything else fills the
    /// canvas height. Aspect ratio is always preserved.
    pub fn new(natural: RasterSize, canvas: RasterSize) -> Self {
        let iw = natural.width.max(1) as f64;
        let ih = natural.height.max(1) as f64;

        let (scale, display) = if iw / ih > 1.0 {
            let scale = canvas.width as f64 / iw;
            (
                scale,
                RasterSize::new(canvas.width.max(1), scaled(ih, scale)),
            )
        } else {
            let scale = canvas.height as f64 / ih;
            (
                scale,
                RasterSize::new(scaled(iw, scale), canvas.height.max(1)),
            )
        };

        Self { scale, display }
    }

    /// Converts a full-resolution length into display pixels, truncating.
    pub fn to_display_len(&self, natural: RasterSize, len: u32) -> u32 {
        (len as f64 / natural.width.max(1) as f64 * self.display.width as f64) as u32
    }
}

fn scaled(len: f64, scale: f64) -> u32 {
    ((len * scale).round() as u32).max(1)
}
