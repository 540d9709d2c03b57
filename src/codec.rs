//! Decoding and format/quality-parameterised encoding.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Output raster formats a caller may request.
///
/// Not every format has an encoder; see [`PhotoFormat::image_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    /// Windows bitmap.
    Bmp,
    /// Enhanced metafile (no encoder).
    Emf,
    /// EXIF container (no encoder).
    Exif,
    /// GIF.
    Gif,
    /// Windows icon (at most 256x256).
    Icon,
    /// JPEG, the only format with a quality knob.
    #[default]
    Jpeg,
    /// PNG.
    Png,
    /// TIFF.
    Tiff,
    /// Windows metafile (no encoder).
    Wmf,
}

impl PhotoFormat {
    /// Every format, in declaration order.
    pub const ALL: [PhotoFormat; 9] = [
        PhotoFormat::Bmp,
        PhotoFormat::Emf,
        PhotoFormat::Exif,
        PhotoFormat::Gif,
        PhotoFormat::Icon,
        PhotoFormat::Jpeg,
        PhotoFormat::Png,
        PhotoFormat::Tiff,
        PhotoFormat::Wmf,
    ];

    /// The encoder backing this format, if one is registered.
    #[must_use]
    pub fn image_format(self) -> Option<ImageFormat> {
        match self {
            PhotoFormat::Bmp => Some(ImageFormat::Bmp),
            PhotoFormat::Gif => Some(ImageFormat::Gif),
            PhotoFormat::Icon => Some(ImageFormat::Ico),
            PhotoFormat::Jpeg => Some(ImageFormat::Jpeg),
            PhotoFormat::Png => Some(ImageFormat::Png),
            PhotoFormat::Tiff => Some(ImageFormat::Tiff),
            PhotoFormat::Emf | PhotoFormat::Exif | PhotoFormat::Wmf => None,
        }
    }

    /// Whether the encoder honours a quality parameter.
    #[must_use]
    pub fn supports_quality(self) -> bool {
        matches!(self, PhotoFormat::Jpeg)
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            PhotoFormat::Bmp => "bmp",
            PhotoFormat::Emf => "emf",
            PhotoFormat::Exif => "exif",
            PhotoFormat::Gif => "gif",
            PhotoFormat::Icon => "ico",
            PhotoFormat::Jpeg => "jpg",
            PhotoFormat::Png => "png",
            PhotoFormat::Tiff => "tiff",
            PhotoFormat::Wmf => "wmf",
        }
    }
}

impl fmt::Display for PhotoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for PhotoFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bmp" => Ok(PhotoFormat::Bmp),
            "emf" => Ok(PhotoFormat::Emf),
            "exif" => Ok(PhotoFormat::Exif),
            "gif" => Ok(PhotoFormat::Gif),
            "icon" | "ico" => Ok(PhotoFormat::Icon),
            "jpeg" | "jpg" => Ok(PhotoFormat::Jpeg),
            "png" => Ok(PhotoFormat::Png),
            "tiff" | "tif" => Ok(PhotoFormat::Tiff),
            "wmf" => Ok(PhotoFormat::Wmf),
            other => Err(format!("unknown photo format '{other}'")),
        }
    }
}

/// Clamp a percentage-style value to `0..=100`.
#[must_use]
pub fn clamp_percent(value: u8) -> u8 {
    value.min(100)
}

/// Decode an encoded raster image, guessing the format from its contents.
///
/// # Errors
///
/// Returns [`Error::Decode`] for unrecognised, truncated, or corrupt input.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decode(image::ImageError::IoError(e)))?;
    let image = reader.decode().map_err(Error::Decode)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        len = bytes.len(),
        "decoded image"
    );
    Ok(image)
}

/// Encode `image` as `format` into a fresh buffer.
///
/// `quality` is clamped to `0..=100` and passed to the encoder only for
/// formats that have a quality setting; JPEG treats 0 as 1. The input image is
/// never modified.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if no encoder is registered for
/// `format`, or [`Error::Encode`] if the encoder rejects the image.
pub fn encode(image: &DynamicImage, format: PhotoFormat, quality: u8) -> Result<Vec<u8>> {
    let image_format = format
        .image_format()
        .ok_or(Error::UnsupportedFormat(format))?;
    let quality = clamp_percent(quality);

    let mut cursor = Cursor::new(Vec::new());
    match image_format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality.max(1));
            encoder.encode_image(&rgb).map_err(Error::Encode)?;
        }
        ImageFormat::Gif | ImageFormat::Ico => {
            DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut cursor, image_format)
                .map_err(Error::Encode)?;
        }
        _ => {
            let normalized = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            normalized
                .write_to(&mut cursor, image_format)
                .map_err(Error::Encode)?;
        }
    }

    let bytes = cursor.into_inner();
    tracing::debug!(%format, quality, len = bytes.len(), "encoded image");
    Ok(bytes)
}

/// Encode `image` and write it to `path`.
///
/// # Errors
///
/// Propagates [`encode`] errors, and returns [`Error::Io`] if the file cannot
/// be written.
pub fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: PhotoFormat,
    quality: u8,
) -> Result<()> {
    let bytes = encode(image, format, quality)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
