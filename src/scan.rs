//! Finding the images to annotate in a directory.

use crate::error::{CropError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            CropError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// Like [`list_images`] but an empty result is an error.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let images = list_images(dir)?;
    if images.is_empty() {
        return Err(CropError::NoImagesFound(dir.to_path_buf()));
    }
    tracing::info!(dir = %dir.display(), count = images.len(), "discovered images");
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
