//! # polycrop
//!
//! Polygon annotation of image directories and automatic tile cropping.
//!
//! Regions drawn on a scaled-down display canvas are stored as normalized
//! polygons, one text file per image. On a crop request the polygons are
//! rasterized into a full-resolution mask and a fixed-size window slides over
//! the image; each window is routed to `positive/` (no annotated pixel) or
//! `negative/` (overlap above the configured threshold).
//!
//! ```no_run
//! use polycrop::{annotation, crop_image, CropSettings, DatasetLayout};
//! use std::ops::ControlFlow;
//! use std::path::Path;
//!
//! # fn main() -> polycrop::Result<()> {
//! let layout = DatasetLayout::create(Path::new("results"), Path::new("scans"))?;
//! let set = annotation::load(&layout.annotation("wafer_01"))?;
//! let report = crop_image(
//!     Path::new("scans/wafer_01.png"),
//!     &set,
//!     &layout,
//!     CropSettings::default(),
//!     |p| {
//!         println!("{:.0}%", p.fraction() * 100.0);
//!         ControlFlow::Continue(())
//!     },
//! )?;
//! println!("{} positive, {} negative", report.positive, report.negative);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod codec;
pub mod coords;
pub mod crop;
pub mod draft;
pub mod error;
pub mod layout;
pub mod mask;
pub mod scan;
pub mod tiling;

pub use annotation::{AnnotationSet, AnnotationStore, Polygon};
pub use coords::{denormalize, normalize, DisplayFit, NormPoint, PixelPoint, RasterSize};
pub use crop::{crop_image, CropJob, CropReport, CropSettings};
pub use error::{CropError, Result};
pub use layout::DatasetLayout;
pub use mask::{rasterize, Mask};
pub use tiling::{classify, OverlapRule, Progress, TileBounds, TileLabel};
