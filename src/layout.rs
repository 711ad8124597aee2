//! On-disk layout of the generated dataset.
//!
//! ```text
//! <results>/<source_dir_name>/positive/<stem>_<index>.png
//! <results>/<source_dir_name>/negative/<stem>_<index>.png
//! <results>/<source_dir_name>/mask/<stem>.png
//! <results>/<source_dir_name>/neg_mask/<stem>_<index>.png
//! <results>/<source_dir_name>/annotations/<stem>.txt
//! <results>/<source_dir_name>/reports/<stem>.json
//! ```

use crate::error::{CropError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const POSITIVE: &str = "positive";
const NEGATIVE: &str = "negative";
const MASK: &str = "mask";
const NEGATIVE_MASK: &str = "neg_mask";
const ANNOTATIONS: &str = "annotations";
const REPORTS: &str = "reports";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    /// Layout rooted at `<results_root>/<name of source_dir>`.
    ///
    /// Paths without a final component (`.`, `./`) are resolved against the
    /// filesystem to find the directory name.
    pub fn new(results_root: &Path, source_dir: &Path) -> Result<Self> {
        let name = match source_dir.file_name() {
            Some(name) => name.to_os_string(),
            None => fs::canonicalize(source_dir)
                .map_err(|e| CropError::io(source_dir, e))?
                .file_name()
                .map(|n| n.to_os_string())
                .ok_or_else(|| CropError::InvalidFileName(source_dir.to_path_buf()))?,
        };
        Ok(Self {
            root: results_root.join(name),
        })
    }

    pub fn create(results_root: &Path, source_dir: &Path) -> Result<Self> {
        let layout = Self::new(results_root, source_dir)?;
        layout.ensure_dirs()?;
        Ok(layout)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for sub in [POSITIVE, NEGATIVE, MASK, NEGATIVE_MASK, ANNOTATIONS, REPORTS] {
            let dir = self.root.join(sub);
            fs::create_dir_all(&dir).map_err(|e| CropError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn positive_tile(&self, stem: &str, index: usize) -> PathBuf {
        self.root.join(POSITIVE).join(format!("{stem}_{index}.png"))
    }

    pub fn negative_tile(&self, stem: &str, index: usize) -> PathBuf {
        self.root.join(NEGATIVE).join(format!("{stem}_{index}.png"))
    }

    pub fn negative_tile_mask(&self, stem: &str, index: usize) -> PathBuf {
        self.root.join(NEGATIVE_MASK).join(format!("{stem}_{index}.png"))
    }

    pub fn mask(&self, stem: &str) -> PathBuf {
        self.root.join(MASK).join(format!("{stem}.png"))
    }

    pub fn annotation(&self, stem: &str) -> PathBuf {
        self.root.join(ANNOTATIONS).join(format!("{stem}.txt"))
    }

    pub fn report(&self, stem: &str) -> PathBuf {
        self.root.join(REPORTS).join(format!("{stem}.json"))
    }
}

/// File name without extension, e.g. `IMG_001` for `shots/IMG_001.jpg`.
pub fn image_stem(image_path: &Path) -> Result<String> {
    image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CropError::InvalidFileName(image_path.to_path_buf()))
}
