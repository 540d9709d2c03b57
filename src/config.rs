//! Read-only pipeline settings, loadable from YAML.
//!
//! ```yaml
//! trial_mode: true
//! output_format: jpeg
//! output_quality: 80
//! watermark:
//!   font:
//!     path: /usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf
//!     size: 28
//!   offset_x: 0
//!   offset_y: 10
//!   rotation: -30
//!   opacity: 40
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{clamp_percent, PhotoFormat};
use crate::error::{Error, Result};
use crate::text::WatermarkFont;

fn default_output_quality() -> u8 {
    85
}

fn default_font_size() -> f32 {
    24.0
}

fn default_opacity() -> u8 {
    50
}

/// Font used for text watermarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    /// TrueType/OpenType file. `None` probes common system fonts.
    pub path: Option<PathBuf>,
    /// Pixel size.
    pub size: f32,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            path: None,
            size: default_font_size(),
        }
    }
}

impl FontSettings {
    /// Load the configured font.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if no path is configured and no system font is
    /// found, or if the configured file cannot be read or parsed.
    pub fn load(&self) -> Result<WatermarkFont> {
        match &self.path {
            Some(path) => WatermarkFont::from_file(path, self.size).map_err(|e| match e {
                Error::Io(io) => Error::Font(format!("{}: {io}", path.display())),
                other => other,
            }),
            None => WatermarkFont::system_default(self.size)
                .ok_or_else(|| Error::Font("no system font found; set watermark.font.path".into())),
        }
    }
}

/// Placement and appearance of the trial watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialWatermarkSettings {
    /// Font for the watermark text.
    pub font: FontSettings,
    /// Horizontal offset in pixels from the centered position.
    pub offset_x: i32,
    /// Vertical offset in pixels from the centered position.
    pub offset_y: i32,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    /// Opacity percentage (`0..=100`).
    pub opacity: u8,
}

impl Default for TrialWatermarkSettings {
    fn default() -> Self {
        Self {
            font: FontSettings::default(),
            offset_x: 0,
            offset_y: 0,
            rotation: 0.0,
            opacity: default_opacity(),
        }
    }
}

/// Settings shared by every request. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stamp the trial watermark on previews.
    pub trial_mode: bool,
    /// Format used for the output buffer.
    pub output_format: PhotoFormat,
    /// Quality for the output buffer (`0..=100`).
    pub output_quality: u8,
    /// Trial watermark settings.
    pub watermark: TrialWatermarkSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trial_mode: false,
            output_format: PhotoFormat::default(),
            output_quality: default_output_quality(),
            watermark: TrialWatermarkSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse settings from a YAML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Config`]
    /// if it is malformed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Output quality clamped to `0..=100`.
    #[must_use]
    pub fn quality(&self) -> u8 {
        clamp_percent(self.output_quality)
    }
}
