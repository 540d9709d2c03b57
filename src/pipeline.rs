//! Preview orchestration: decode, fit, frame, watermark, encode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;

use crate::codec::{self, PhotoFormat};
use crate::compositor::{self, Watermark, WatermarkContent};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::geometry::{Alignment, Size};
use crate::text::{Color, WatermarkFont};

/// Text stamped on previews in trial mode.
pub const TRIAL_TEXT: &str = "TRIAL - VERSION";

/// Thickness of the preview frame in pixels.
pub const BORDER_WIDTH: u32 = 2;

/// Quality used for the on-screen preview buffer.
pub const PREVIEW_QUALITY: u8 = 100;

/// Cooperative cancellation flag shared between a caller and a running request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask any request holding this token to stop at its next stage boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!(stage, "request cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Result of a successful preview build.
#[derive(Debug, Clone)]
pub struct Preview {
    /// The resized, framed, optionally watermarked image at full quality.
    pub preview_bytes: Vec<u8>,
    /// The unresized source re-encoded at the configured format and quality.
    pub output_bytes: Vec<u8>,
    /// Dimensions of the decoded source.
    pub source_size: Size,
    /// Dimensions of the resized preview.
    pub preview_size: Size,
    /// Format of `output_bytes`.
    pub output_format: PhotoFormat,
}

impl Preview {
    /// Status text for a source file of `source_len` bytes, sizes in whole Kb.
    ///
    /// `File size 120Kb (4000x2000px), On saving 96Kb (300x150px)`
    #[must_use]
    pub fn status_line(&self, source_len: usize) -> String {
        format!(
            "File size {}Kb ({}x{}px), On saving {}Kb ({}x{}px)",
            source_len / 1024,
            self.source_size.width,
            self.source_size.height,
            self.output_bytes.len() / 1024,
            self.preview_size.width,
            self.preview_size.height,
        )
    }
}

/// The image pipeline, holding read-only settings and the trial font.
///
/// Create once and reuse for many requests; it is `Send + Sync`.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    trial_font: Option<WatermarkFont>,
}

impl Pipeline {
    /// Build a pipeline, loading the trial font when trial mode is on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if trial mode is enabled and the font cannot be
    /// loaded.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let trial_font = if config.trial_mode {
            Some(config.watermark.font.load()?)
        } else {
            None
        };
        Ok(Self { config, trial_font })
    }

    /// Build a pipeline with an explicit trial font.
    #[must_use]
    pub fn with_font(config: PipelineConfig, font: WatermarkFont) -> Self {
        Self {
            config,
            trial_font: Some(font),
        }
    }

    /// The settings this pipeline was built with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The trial watermark built from the configured settings, if trial mode
    /// is on.
    #[must_use]
    pub fn trial_watermark(&self) -> Option<Watermark> {
        if !self.config.trial_mode {
            return None;
        }
        let font = self.trial_font.clone()?;
        let settings = &self.config.watermark;
        Some(Watermark {
            content: WatermarkContent::Text {
                text: TRIAL_TEXT.to_string(),
                font,
                color: Color::WHITE,
            },
            alignment: Alignment::centered(),
            offset_x: settings.offset_x,
            offset_y: settings.offset_y,
            rotation: settings.rotation,
            opacity: settings.opacity,
        })
    }

    /// Build a preview of `source` fitted into `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `source` is not a readable image, or an
    /// encode error if either buffer cannot be produced. Use
    /// [`Error::user_message`] for the notification shown to the user.
    pub fn build_preview(&self, source: &[u8], bounds: Size) -> Result<Preview> {
        self.build_preview_with_cancel(source, bounds, &CancelToken::new())
    }

    /// Like [`build_preview`](Self::build_preview), checking `cancel` before
    /// each expensive stage.
    ///
    /// # Errors
    ///
    /// As [`build_preview`](Self::build_preview), plus [`Error::Cancelled`].
    pub fn build_preview_with_cancel(
        &self,
        source: &[u8],
        bounds: Size,
        cancel: &CancelToken,
    ) -> Result<Preview> {
        let result = self.run(source, bounds, cancel);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "{}", err.user_message());
        }
        result
    }

    fn run(&self, source: &[u8], bounds: Size, cancel: &CancelToken) -> Result<Preview> {
        cancel.check("decode")?;
        let original = codec::decode(source)?;
        let source_size = Size::new(original.width(), original.height());

        cancel.check("resize")?;
        let mut preview = compositor::resize(&original, bounds, true);
        let preview_size = Size::new(preview.width(), preview.height());
        tracing::debug!(
            source_width = source_size.width,
            source_height = source_size.height,
            width = preview_size.width,
            height = preview_size.height,
            "resized preview"
        );

        compositor::draw_border(&mut preview, BORDER_WIDTH, Color::DIM_GRAY);

        if let Some(watermark) = self.trial_watermark() {
            cancel.check("watermark")?;
            compositor::apply_watermark(&mut preview, &watermark);
        }

        cancel.check("encode")?;
        let output_bytes =
            codec::encode(&original, self.config.output_format, self.config.quality())?;
        let preview_bytes = codec::encode(
            &DynamicImage::ImageRgba8(preview),
            PhotoFormat::Jpeg,
            PREVIEW_QUALITY,
        )?;

        tracing::info!(
            source_width = source_size.width,
            source_height = source_size.height,
            width = preview_size.width,
            height = preview_size.height,
            output_len = output_bytes.len(),
            preview_len = preview_bytes.len(),
            "preview built"
        );

        Ok(Preview {
            preview_bytes,
            output_bytes,
            source_size,
            preview_size,
            output_format: self.config.output_format,
        })
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.png"` with [`PhotoFormat::Jpeg`] becomes `"photo_resized.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path, format: PhotoFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_resized.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([30, 140, 200, 255]));
        codec::encode(&DynamicImage::ImageRgba8(img), PhotoFormat::Png, 100).unwrap()
    }

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check("decode"), Err(Error::Cancelled)));
    }

    #[test]
    fn pipeline_without_trial_mode_needs_no_font() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        assert!(pipeline.trial_watermark().is_none());
    }

    #[test]
    fn trial_mode_with_missing_font_fails_to_build() {
        let mut config = PipelineConfig {
            trial_mode: true,
            ..PipelineConfig::default()
        };
        config.watermark.font.path = Some(PathBuf::from("/missing/font.ttf"));
        assert!(matches!(Pipeline::new(config), Err(Error::Font(_))));
    }

    #[test]
    fn preview_reports_sizes() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let preview = pipeline.build_preview(&png(400, 200), Size::new(100, 100)).unwrap();
        assert_eq!(preview.source_size, Size::new(400, 200));
        assert_eq!(preview.preview_size, Size::new(100, 50));

        let decoded = codec::decode(&preview.preview_bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));

        let output = codec::decode(&preview.output_bytes).unwrap();
        assert_eq!((output.width(), output.height()), (400, 200));
    }

    #[test]
    fn output_buffer_has_no_frame() {
        let config = PipelineConfig {
            output_format: PhotoFormat::Png,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let preview = pipeline.build_preview(&png(20, 20), Size::new(50, 50)).unwrap();

        let output = codec::decode(&preview.output_bytes).unwrap().to_rgba8();
        assert_eq!(*output.get_pixel(0, 0), Rgba([30, 140, 200, 255]));

        // Preview is framed in dim gray; JPEG keeps it close.
        let framed = codec::decode(&preview.preview_bytes).unwrap().to_rgb8();
        let corner = framed.get_pixel(0, 0);
        assert!(corner[0].abs_diff(105) < 12 && corner[2].abs_diff(105) < 12, "{corner:?}");
    }

    #[test]
    fn decode_failure_is_reported() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.build_preview(b"garbage", Size::new(10, 10)).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.user_message(), "Could not load image");
    }

    #[test]
    fn unsupported_output_format_is_reported() {
        let config = PipelineConfig {
            output_format: PhotoFormat::Emf,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let err = pipeline.build_preview(&png(8, 8), Size::new(4, 4)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(PhotoFormat::Emf)));
    }

    #[test]
    fn cancelled_request_stops_before_decode() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = pipeline
            .build_preview_with_cancel(&png(8, 8), Size::new(4, 4), &token)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn status_line_formats_kilobytes() {
        let preview = Preview {
            preview_bytes: vec![0; 10],
            output_bytes: vec![0; 3 * 1024 + 500],
            source_size: Size::new(4000, 2000),
            preview_size: Size::new(300, 150),
            output_format: PhotoFormat::Jpeg,
        };
        assert_eq!(
            preview.status_line(120 * 1024 + 1),
            "File size 120Kb (4000x2000px), On saving 3Kb (300x150px)"
        );
    }

    #[test]
    fn default_output_path_uses_format_extension() {
        let p = default_output_path(Path::new("/tmp/photo.png"), PhotoFormat::Jpeg);
        assert_eq!(p, PathBuf::from("/tmp/photo_resized.jpg"));

        let p = default_output_path(Path::new("image.bmp"), PhotoFormat::Tiff);
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "image_resized.tiff");
    }

    #[test]
    fn trial_watermark_uses_configured_placement() {
        let Some(font) = WatermarkFont::system_default(18.0) else {
            return;
        };
        let mut config = PipelineConfig {
            trial_mode: true,
            ..PipelineConfig::default()
        };
        config.watermark.rotation = -20.0;
        config.watermark.offset_x = 4;
        config.watermark.opacity = 70;
        let pipeline = Pipeline::with_font(config, font);

        let wm = pipeline.trial_watermark().unwrap();
        assert_eq!(wm.alignment, Alignment::centered());
        assert_eq!(wm.offset_x, 4);
        assert_eq!(wm.opacity, 70);
        assert!(matches!(&wm.content, WatermarkContent::Text { text, color, .. }
            if text == TRIAL_TEXT && *color == Color::WHITE));
    }
}
