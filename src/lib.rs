//! Fit images into a preview box, stamp text or image watermarks, and
//! re-encode at a chosen format and quality.
//!
//! The crate is the imaging core of a desktop resizer: a caller hands over the
//! encoded bytes of a source image and a bounding box, and gets back an
//! encoded preview plus the source re-encoded at the configured quality.
//!
//! # Quick Start
//!
//! ```no_run
//! use img_resizer::{Pipeline, PipelineConfig, Size};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default()).expect("failed to init pipeline");
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! match pipeline.build_preview(&bytes, Size::new(640, 480)) {
//!     Ok(preview) => println!("{}", preview.status_line(bytes.len())),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! ```
//!
//! # Watermarks
//!
//! Watermarks are placed with one of nine alignments plus a pixel offset, and
//! rotated around their own center. Placement is never clamped; whatever
//! falls outside the canvas is clipped.
//!
//! ```no_run
//! use img_resizer::compositor::apply_image_watermark;
//! use img_resizer::{Alignment, HorizontalAlignment, VerticalAlignment};
//!
//! let mut photo = image::open("photo.jpg").unwrap().to_rgba8();
//! let logo = image::open("logo.png").unwrap().to_rgba8();
//! let corner = Alignment::new(HorizontalAlignment::Right, VerticalAlignment::Bottom);
//! apply_image_watermark(&mut photo, &logo, corner, -10, -10, 0.0, 60);
//! ```

#![deny(missing_docs)]

pub mod codec;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
mod pipeline;
pub mod text;

pub use codec::PhotoFormat;
pub use compositor::{Watermark, WatermarkContent, WatermarkMode};
pub use config::{FontSettings, PipelineConfig, TrialWatermarkSettings};
pub use error::{Error, Result};
pub use geometry::{Alignment, HorizontalAlignment, Point, Size, VerticalAlignment};
pub use pipeline::{
    default_output_path, CancelToken, Pipeline, Preview, BORDER_WIDTH, PREVIEW_QUALITY, TRIAL_TEXT,
};
pub use text::{Color, WatermarkFont};
