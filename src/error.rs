//! Error types for polycrop.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for polycrop operations.
pub type Result<T> = std::result::Result<T, CropError>;

/// Errors raised while loading annotations, rasterizing or writing tiles.
#[derive(Error, Debug)]
pub enum CropError {
    /// An annotation file exists but one of its lines cannot be parsed.
    #[error("corrupt annotation file {}, line {line}: {reason}", path.display())]
    CorruptAnnotation {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The configured directory holds no recognized image files.
    #[error("no images found in {}", .0.display())]
    NoImagesFound(PathBuf),

    /// Filesystem failure, tagged with the offending path.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decode or encode failure, tagged with the offending path.
    #[error("image error at {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Crop report could not be serialized.
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),

    /// A path has no usable file stem or directory name.
    #[error("invalid file name: {}", .0.display())]
    InvalidFileName(PathBuf),
}

impl CropError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CropError::Io {
            path: path.into(),
            source,
        }
    }
}
