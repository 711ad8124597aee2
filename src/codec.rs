//! Image decoding and encoding, with failures tagged by path.

use crate::error::{CropError, Result};
use image::{ImageBuffer, PixelWithColorType, RgbImage};
use std::ops::Deref;
use std::path::Path;

pub fn decode_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| CropError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Writes an image; the format follows the file extension.
pub fn encode_image<P, C>(img: &ImageBuffer<P, C>, path: &Path) -> Result<()>
where
    P: PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: Deref<Target = [P::Subpixel]>,
{
    img.save(path).map_err(|source| CropError::Image {
        path: path.to_path_buf(),
        source,
    })
}
