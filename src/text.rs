//! Font loading, text measurement, and glyph rasterisation for text watermarks.

use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::geometry::Size;

/// Well-known TrueType locations probed by [`WatermarkFont::system_default`].
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// An opaque RGB color for text watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// The gray used for the preview frame.
    pub const DIM_GRAY: Self = Self::new(105, 105, 105);

    /// This color with the given alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

/// A parsed font face at a fixed pixel size. Clones share the face.
#[derive(Clone)]
pub struct WatermarkFont {
    font: Arc<FontVec>,
    size: f32,
}

impl std::fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkFont")
            .field("glyphs", &self.font.glyph_count())
            .field("size", &self.size)
            .finish()
    }
}

impl WatermarkFont {
    /// Parse a TrueType/OpenType font from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if the bytes are not a valid font or `size` is
    /// not a positive finite number.
    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self> {
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::Font(format!("invalid font size {size}")));
        }
        let font = FontVec::try_from_vec(data).map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self {
            font: Arc::new(font),
            size,
        })
    }

    /// Read and parse a font file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Font`] if
    /// it does not parse.
    pub fn from_file(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data, size)
    }

    /// Load the first parseable font from a list of common system locations.
    ///
    /// Returns `None` when no candidate exists on this machine.
    #[must_use]
    pub fn system_default(size: f32) -> Option<Self> {
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| Self::from_file(p, size).ok())
    }

    /// Pixel size of the font.
    #[must_use]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Measure the box `text` occupies when drawn in a single line.
    ///
    /// Width is the sum of advances plus kerning; height is the scaled line
    /// height. Both are rounded up to whole pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn measure(&self, text: &str) -> Size {
        let font: &FontVec = &self.font;
        let scaled = font.as_scaled(PxScale::from(self.size));

        let mut width = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        Size::new(
            width.ceil().max(0.0) as u32,
            scaled.height().ceil().max(0.0) as u32,
        )
    }

    /// Rasterise `text` into a transparent layer sized by [`measure`](Self::measure).
    ///
    /// Glyph coverage scales `color`'s alpha; the layer uses straight
    /// (non-premultiplied) alpha. Empty text yields an empty layer.
    #[must_use]
    pub fn render(&self, text: &str, color: Rgba<u8>) -> RgbaImage {
        let Size { width, height } = self.measure(text);
        let clear = Rgba([color[0], color[1], color[2], 0]);
        let mut layer = RgbaImage::from_pixel(width, height, clear);
        if width == 0 || height == 0 {
            return layer;
        }

        let font: &FontVec = &self.font;
        let scale = PxScale::from(self.size);
        let scaled = font.as_scaled(scale);
        let baseline = scaled.ascent();
        let max_alpha = f32::from(color[3]);

        let mut cursor = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let x = gx as i32 + bounds.min.x as i32;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let y = gy as i32 + bounds.min.y as i32;
                    let Ok(x) = u32::try_from(x) else { return };
                    let Ok(y) = u32::try_from(y) else { return };
                    if x >= width || y >= height {
                        return;
                    }

                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let alpha = (coverage.clamp(0.0, 1.0) * max_alpha).round() as u8;
                    let px = layer.get_pixel_mut(x, y);
                    // Overlapping glyph edges keep the stronger coverage.
                    px[3] = px[3].max(alpha);
                });
            }

            cursor += scaled.h_advance(id);
            prev = Some(id);
        }

        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> Option<WatermarkFont> {
        let font = WatermarkFont::system_default(24.0);
        if font.is_none() {
            eprintln!("no system font available, skipping");
        }
        font
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = WatermarkFont::from_bytes(vec![0, 1, 2, 3], 12.0).unwrap_err();
        assert!(matches!(err, Error::Font(_)));
    }

    #[test]
    fn from_bytes_rejects_non_positive_size() {
        let err = WatermarkFont::from_bytes(Vec::new(), 0.0).unwrap_err();
        assert!(err.to_string().contains("invalid font size"));
    }

    #[test]
    fn from_file_reports_missing_file_as_io() {
        let err = WatermarkFont::from_file(Path::new("/definitely/not/here.ttf"), 12.0)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn measure_grows_with_text_length() {
        let Some(font) = font() else { return };
        let short = font.measure("TRIAL");
        let long = font.measure("TRIAL - VERSION");
        assert!(long.width > short.width);
        assert_eq!(long.height, short.height);
        assert!(short.height >= 24);
    }

    #[test]
    fn measure_of_empty_text_has_zero_width() {
        let Some(font) = font() else { return };
        assert_eq!(font.measure("").width, 0);
    }

    #[test]
    fn render_matches_measured_size_and_paints_glyphs() {
        let Some(font) = font() else { return };
        let layer = font.render("TRIAL", Color::WHITE.with_alpha(200));
        let size = font.measure("TRIAL");
        assert_eq!(layer.dimensions(), (size.width, size.height));

        let max_alpha = layer.pixels().map(|p| p[3]).max().unwrap_or(0);
        assert!(max_alpha > 150 && max_alpha <= 200);
        assert!(layer.pixels().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
    }

    #[test]
    fn render_with_zero_alpha_is_fully_transparent() {
        let Some(font) = font() else { return };
        let layer = font.render("TRIAL", Color::WHITE.with_alpha(0));
        assert!(layer.pixels().all(|p| p[3] == 0));
    }
}
