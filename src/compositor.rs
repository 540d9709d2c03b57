//! Resampling and watermark compositing.
//!
//! Watermarks are composited by inverse mapping: every canvas pixel inside the
//! rotated watermark box is mapped back into watermark space, sampled with a
//! Catmull-Rom bicubic kernel in premultiplied alpha, and blended source-over.
//! Pixels outside the canvas are never visited, so off-canvas placement simply
//! clips.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::geometry::{self, Alignment, Point, RotationTransform, Size};
use crate::text::{Color, WatermarkFont};

/// The color treated as fully transparent in image watermarks.
pub const CHROMA_KEY: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Catmull-Rom (a = -0.5) cubic convolution.
const CUBIC_A: f32 = -0.5;

/// Samples with less alpha than this (on the 0..=255 scale) are not blended.
const MIN_VISIBLE_ALPHA: f32 = 1.0 / 512.0;

/// Which kind of watermark is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkMode {
    /// Rendered text.
    Text,
    /// A bitmap.
    Image,
}

/// What a watermark draws.
#[derive(Debug, Clone)]
pub enum WatermarkContent {
    /// A line of text in the given font and color.
    Text {
        /// Text to draw.
        text: String,
        /// Font face and size.
        font: WatermarkFont,
        /// Text color; opacity is applied separately.
        color: Color,
    },
    /// A bitmap drawn at its natural size.
    Image(RgbaImage),
}

/// A fully specified watermark.
#[derive(Debug, Clone)]
pub struct Watermark {
    /// Text or bitmap content.
    pub content: WatermarkContent,
    /// Placement on the canvas.
    pub alignment: Alignment,
    /// Horizontal offset in pixels, added after alignment.
    pub offset_x: i32,
    /// Vertical offset in pixels, added after alignment.
    pub offset_y: i32,
    /// Clockwise rotation in degrees around the watermark's own center.
    pub rotation: f32,
    /// Opacity percentage, clamped to `0..=100`.
    pub opacity: u8,
}

impl Watermark {
    /// The mode of this watermark's content.
    #[must_use]
    pub fn mode(&self) -> WatermarkMode {
        match self.content {
            WatermarkContent::Text { .. } => WatermarkMode::Text,
            WatermarkContent::Image(_) => WatermarkMode::Image,
        }
    }
}

/// Resize `image` into `bounds`.
///
/// With `maintain_aspect_ratio` the target comes from
/// [`geometry::aspect_fit`]; otherwise the image is stretched to exactly
/// `bounds`. The source fills the new canvas completely, with no letterboxing.
/// Resampling is bicubic (Catmull-Rom).
#[must_use]
pub fn resize(image: &DynamicImage, bounds: Size, maintain_aspect_ratio: bool) -> RgbaImage {
    let source = Size::new(image.width(), image.height());
    let target = if maintain_aspect_ratio {
        geometry::aspect_fit(source, bounds)
    } else {
        bounds
    };

    if target.is_empty() {
        return RgbaImage::new(target.width, target.height);
    }

    let rgba = image.to_rgba8();
    if target == source {
        return rgba;
    }
    imageops::resize(&rgba, target.width, target.height, FilterType::CatmullRom)
}

/// Draw an opaque rectangular frame `thickness` pixels wide along the inside
/// of the canvas edges.
pub fn draw_border(image: &mut RgbaImage, thickness: u32, color: Color) {
    let (w, h) = image.dimensions();
    let px = color.with_alpha(255);
    for y in 0..h {
        for x in 0..w {
            let edge = x < thickness
                || y < thickness
                || x >= w.saturating_sub(thickness)
                || y >= h.saturating_sub(thickness);
            if edge {
                image.put_pixel(x, y, px);
            }
        }
    }
}

/// Draw `text` onto `image` in place.
///
/// Opacity is folded into the text color as `alpha = opacity * 255 / 100`.
/// The text box is measured with `font`, placed with
/// [`geometry::anchor_point`], and rotated around its own center.
#[allow(clippy::too_many_arguments)]
pub fn apply_text_watermark<'a>(
    image: &'a mut RgbaImage,
    text: &str,
    font: &WatermarkFont,
    color: Color,
    alignment: Alignment,
    offset_x: i32,
    offset_y: i32,
    rotation: f32,
    opacity: u8,
) -> &'a mut RgbaImage {
    let alpha = u32::from(opacity.min(100)) * 255 / 100;
    // alpha <= 255
    #[allow(clippy::cast_possible_truncation)]
    let layer = font.render(text, color.with_alpha(alpha as u8));
    let size = Size::new(layer.width(), layer.height());

    let canvas = Size::new(image.width(), image.height());
    let anchor = geometry::anchor_point(canvas, size, alignment, offset_x, offset_y);
    let transform = geometry::rotation_transform(rotation, size, anchor);

    tracing::debug!(
        text,
        width = size.width,
        height = size.height,
        x = anchor.x,
        y = anchor.y,
        rotation,
        "drawing text watermark"
    );
    draw_layer(image, &layer, anchor, &transform);
    image
}

/// Draw `watermark` onto `image` in place.
///
/// Pure green `(0, 255, 0)` pixels in the watermark become fully transparent,
/// and the remaining alpha is multiplied by `opacity / 100`; RGB is left
/// untouched. The watermark keeps its natural size, is placed at the
/// truncated anchor point, and is rotated around its own center.
pub fn apply_image_watermark<'a>(
    image: &'a mut RgbaImage,
    watermark: &RgbaImage,
    alignment: Alignment,
    offset_x: i32,
    offset_y: i32,
    rotation: f32,
    opacity: u8,
) -> &'a mut RgbaImage {
    let size = Size::new(watermark.width(), watermark.height());
    let canvas = Size::new(image.width(), image.height());
    let anchor = geometry::anchor_point(canvas, size, alignment, offset_x, offset_y);
    let transform = geometry::rotation_transform(rotation, size, anchor);

    let layer = prepare_image_layer(watermark, opacity);
    let origin = Point::new(anchor.x.trunc(), anchor.y.trunc());

    tracing::debug!(
        width = size.width,
        height = size.height,
        x = origin.x,
        y = origin.y,
        rotation,
        opacity,
        "drawing image watermark"
    );
    draw_layer(image, &layer, origin, &transform);
    image
}

/// Apply a [`Watermark`] of either mode.
pub fn apply_watermark<'a>(image: &'a mut RgbaImage, watermark: &Watermark) -> &'a mut RgbaImage {
    match &watermark.content {
        WatermarkContent::Text { text, font, color } => apply_text_watermark(
            image,
            text,
            font,
            *color,
            watermark.alignment,
            watermark.offset_x,
            watermark.offset_y,
            watermark.rotation,
            watermark.opacity,
        ),
        WatermarkContent::Image(bitmap) => apply_image_watermark(
            image,
            bitmap,
            watermark.alignment,
            watermark.offset_x,
            watermark.offset_y,
            watermark.rotation,
            watermark.opacity,
        ),
    }
}

/// Chroma-key and alpha-scale a watermark bitmap.
fn prepare_image_layer(watermark: &RgbaImage, opacity: u8) -> RgbaImage {
    let factor = f32::from(opacity.min(100)) / 100.0;
    let mut layer = watermark.clone();
    for px in layer.pixels_mut() {
        if *px == CHROMA_KEY {
            *px = Rgba([0, 0, 0, 0]);
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                px[3] = (f32::from(px[3]) * factor).round() as u8;
            }
        }
    }
    layer
}

/// Composite `layer`, whose top-left sits at `origin` before rotation, onto
/// `canvas` under `transform`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn draw_layer(
    canvas: &mut RgbaImage,
    layer: &RgbaImage,
    origin: Point,
    transform: &RotationTransform,
) {
    let (lw, lh) = layer.dimensions();
    let (cw, ch) = canvas.dimensions();
    if lw == 0 || lh == 0 || cw == 0 || ch == 0 {
        return;
    }

    // Bounding box of the rotated layer in canvas space, padded by one pixel
    // for the bicubic support.
    let corners = [
        Point::new(origin.x, origin.y),
        Point::new(origin.x + lw as f32, origin.y),
        Point::new(origin.x, origin.y + lh as f32),
        Point::new(origin.x + lw as f32, origin.y + lh as f32),
    ]
    .map(|p| transform.apply(p));
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for c in corners {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return;
    }

    let x0 = (min_x.floor() as i64 - 1).max(0);
    let y0 = (min_y.floor() as i64 - 1).max(0);
    let x1 = (max_x.ceil() as i64 + 1).min(i64::from(cw));
    let y1 = (max_y.ceil() as i64 + 1).min(i64::from(ch));
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for y in y0..y1 {
        for x in x0..x1 {
            let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let local = transform.invert(centre);
            let u = local.x - origin.x - 0.5;
            let v = local.y - origin.y - 0.5;

            let src = sample_bicubic(layer, u, v);
            if src[3] < MIN_VISIBLE_ALPHA {
                continue;
            }

            let dst = canvas.get_pixel_mut(x as u32, y as u32);
            *dst = blend_over(*dst, src);
        }
    }
}

/// Catmull-Rom weight for a tap at distance `d`.
fn cubic_weight(d: f32) -> f32 {
    let d = d.abs();
    if d <= 1.0 {
        ((CUBIC_A + 2.0) * d - (CUBIC_A + 3.0)) * d * d + 1.0
    } else if d < 2.0 {
        ((CUBIC_A * d - 5.0 * CUBIC_A) * d + 8.0 * CUBIC_A) * d - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Sample `layer` at pixel-center coordinates `(u, v)`, treating everything
/// outside as transparent.
///
/// Returns premultiplied `[r, g, b, a]` in `0.0..=255.0`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn sample_bicubic(layer: &RgbaImage, u: f32, v: f32) -> [f32; 4] {
    let (w, h) = (i64::from(layer.width()), i64::from(layer.height()));
    let fu = u.floor();
    let fv = v.floor();
    let (tu, tv) = (u - fu, v - fv);
    let (iu, iv) = (fu as i64, fv as i64);

    if iu + 2 < 0 || iv + 2 < 0 || iu - 1 >= w || iv - 1 >= h {
        return [0.0; 4];
    }

    let wx = [
        cubic_weight(1.0 + tu),
        cubic_weight(tu),
        cubic_weight(1.0 - tu),
        cubic_weight(2.0 - tu),
    ];
    let wy = [
        cubic_weight(1.0 + tv),
        cubic_weight(tv),
        cubic_weight(1.0 - tv),
        cubic_weight(2.0 - tv),
    ];

    let mut acc = [0.0f32; 4];
    for (j, wyj) in wy.iter().enumerate() {
        let sy = iv - 1 + j as i64;
        if *wyj == 0.0 || !(0..h).contains(&sy) {
            continue;
        }
        for (i, wxi) in wx.iter().enumerate() {
            let sx = iu - 1 + i as i64;
            if *wxi == 0.0 || !(0..w).contains(&sx) {
                continue;
            }
            let p = layer.get_pixel(sx as u32, sy as u32);
            let weight = wxi * wyj;
            let a = f32::from(p[3]);
            let premul = a / 255.0;
            acc[0] += weight * f32::from(p[0]) * premul;
            acc[1] += weight * f32::from(p[1]) * premul;
            acc[2] += weight * f32::from(p[2]) * premul;
            acc[3] += weight * a;
        }
    }

    // Cubic overshoot: keep alpha in range and color within alpha.
    let a = acc[3].clamp(0.0, 255.0);
    [
        acc[0].clamp(0.0, a),
        acc[1].clamp(0.0, a),
        acc[2].clamp(0.0, a),
        a,
    ]
}

/// Source-over blend of a premultiplied sample onto a straight-alpha pixel.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_over(dst: Rgba<u8>, src: [f32; 4]) -> Rgba<u8> {
    let sa = src[3] / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| -> u8 {
        let d = f32::from(dst[i]) * da;
        let value = (src[i] + d * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
