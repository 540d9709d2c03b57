//! Size, placement, and rotation math for resizing and watermark layout.
//!
//! All functions here are pure. Placement never clamps: an anchor point may be
//! negative or lie past the canvas edge, and the compositor clips when drawing.

use serde::{Deserialize, Serialize};

/// A `(width, height)` pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A sub-pixel position on a canvas. Origin is the top-left corner, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal placement of a watermark on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    /// Flush with the left edge.
    Left,
    /// Centered horizontally.
    #[default]
    Center,
    /// Flush with the right edge.
    Right,
}

/// Vertical placement of a watermark on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    /// Flush with the top edge.
    Top,
    /// Centered vertically.
    #[default]
    Middle,
    /// Flush with the bottom edge.
    Bottom,
}

/// One of the nine watermark placements. Defaults to center/middle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// Horizontal component.
    pub horizontal: HorizontalAlignment,
    /// Vertical component.
    pub vertical: VerticalAlignment,
}

impl Alignment {
    /// Create an alignment from its two components.
    #[must_use]
    pub const fn new(horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Center/middle.
    #[must_use]
    pub const fn centered() -> Self {
        Self::new(HorizontalAlignment::Center, VerticalAlignment::Middle)
    }
}

/// Compute the largest size that fits inside `bounds` while keeping the
/// aspect ratio of `source`.
///
/// Each bound is first clamped down to the matching source side, so a source
/// that already fits is returned unchanged and nothing is ever upscaled.
/// The axis with the smaller scale factor lands exactly on its bound; the
/// other axis is truncated, never rounded up.
///
/// A non-empty source always yields at least one pixel per axis.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn aspect_fit(source: Size, bounds: Size) -> Size {
    if source.is_empty() {
        return Size::default();
    }

    let sw = u64::from(source.width);
    let sh = u64::from(source.height);
    let bw = u64::from(bounds.width).min(sw);
    let bh = u64::from(bounds.height).min(sh);

    // Compare bw/sw against bh/sh without leaving integer arithmetic.
    let (w, h) = if bw * sh <= bh * sw {
        (bw, sh * bw / sw)
    } else {
        (sw * bh / sh, bh)
    };

    // w <= sw and h <= sh, both of which came from u32.
    Size::new((w as u32).max(1), (h as u32).max(1))
}

/// Top-left point at which a watermark of `watermark` size is placed on a
/// `canvas`, before rotation.
///
/// Each axis is resolved independently from the alignment, then the signed
/// pixel offsets are added. The result is not clamped to the canvas.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn anchor_point(
    canvas: Size,
    watermark: Size,
    alignment: Alignment,
    offset_x: i32,
    offset_y: i32,
) -> Point {
    let free_w = canvas.width as f32 - watermark.width as f32;
    let free_h = canvas.height as f32 - watermark.height as f32;

    let x = match alignment.horizontal {
        HorizontalAlignment::Left => 0.0,
        HorizontalAlignment::Center => free_w / 2.0,
        HorizontalAlignment::Right => free_w,
    };
    let y = match alignment.vertical {
        VerticalAlignment::Top => 0.0,
        VerticalAlignment::Middle => free_h / 2.0,
        VerticalAlignment::Bottom => free_h,
    };

    Point::new(x + offset_x as f32, y + offset_y as f32)
}

/// A rotation about a fixed pivot, in canvas coordinates.
///
/// Positive angles turn clockwise on screen (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTransform {
    cos: f32,
    sin: f32,
    pivot: Point,
}

impl RotationTransform {
    /// Rotate by `angle_degrees` around `pivot`.
    #[must_use]
    pub fn rotate_at(angle_degrees: f32, pivot: Point) -> Self {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        Self { cos, sin, pivot }
    }

    /// The identity transform.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            cos: 1.0,
            sin: 0.0,
            pivot: Point::new(0.0, 0.0),
        }
    }

    /// The pivot point.
    #[must_use]
    pub const fn pivot(&self) -> Point {
        self.pivot
    }

    /// Map a point from watermark space to canvas space.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let dx = p.x - self.pivot.x;
        let dy = p.y - self.pivot.y;
        Point::new(
            self.pivot.x + dx * self.cos - dy * self.sin,
            self.pivot.y + dx * self.sin + dy * self.cos,
        )
    }

    /// Map a point from canvas space back to watermark space.
    #[must_use]
    pub fn invert(&self, p: Point) -> Point {
        let dx = p.x - self.pivot.x;
        let dy = p.y - self.pivot.y;
        Point::new(
            self.pivot.x + dx * self.cos + dy * self.sin,
            self.pivot.y - dx * self.sin + dy * self.cos,
        )
    }
}

/// Build the rotation for a watermark of `size` placed at `anchor`.
///
/// The pivot is the watermark's own center, `anchor + size / 2`, not the
/// canvas center.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rotation_transform(angle_degrees: f32, size: Size, anchor: Point) -> RotationTransform {
    let pivot = Point::new(
        anchor.x + size.width as f32 / 2.0,
        anchor.y + size.height as f32 / 2.0,
    );
    RotationTransform::rotate_at(angle_degrees, pivot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn aspect_fit_shrinks_wide_source() {
        assert_eq!(
            aspect_fit(Size::new(4000, 2000), Size::new(300, 300)),
            Size::new(300, 150)
        );
    }

    #[test]
    fn aspect_fit_never_upscales() {
        assert_eq!(
            aspect_fit(Size::new(100, 50), Size::new(300, 300)),
            Size::new(100, 50)
        );
    }

    #[test]
    fn aspect_fit_clamps_only_the_oversized_side() {
        // Height already fits, width does not.
        assert_eq!(
            aspect_fit(Size::new(600, 100), Size::new(300, 300)),
            Size::new(300, 50)
        );
        // Tall source.
        assert_eq!(
            aspect_fit(Size::new(1000, 3000), Size::new(400, 300)),
            Size::new(100, 300)
        );
    }

    #[test]
    fn aspect_fit_truncates_instead_of_rounding() {
        // 333 * 200 / 1000 = 66.6 -> 66
        assert_eq!(
            aspect_fit(Size::new(1000, 333), Size::new(200, 200)),
            Size::new(200, 66)
        );
    }

    #[test]
    fn aspect_fit_keeps_at_least_one_pixel() {
        assert_eq!(
            aspect_fit(Size::new(10_000, 1), Size::new(100, 100)),
            Size::new(100, 1)
        );
        assert_eq!(aspect_fit(Size::new(50, 50), Size::new(0, 0)), Size::new(1, 1));
    }

    #[test]
    fn aspect_fit_of_empty_source_is_empty() {
        assert!(aspect_fit(Size::new(0, 10), Size::new(100, 100)).is_empty());
    }

    #[test]
    fn anchor_point_center_middle() {
        let p = anchor_point(
            Size::new(300, 200),
            Size::new(100, 50),
            Alignment::centered(),
            0,
            0,
        );
        assert_eq!(p, Point::new(100.0, 75.0));
    }

    #[test]
    fn anchor_point_left_top_is_the_offset() {
        let align = Alignment::new(HorizontalAlignment::Left, VerticalAlignment::Top);
        for (dx, dy) in [(0, 0), (7, -3), (-250, 900)] {
            let p = anchor_point(Size::new(640, 480), Size::new(120, 40), align, dx, dy);
            #[allow(clippy::cast_precision_loss)]
            let expected = Point::new(dx as f32, dy as f32);
            assert_eq!(p, expected);
        }
    }

    #[test]
    fn anchor_point_covers_all_nine_alignments() {
        use HorizontalAlignment as H;
        use VerticalAlignment as V;

        let canvas = Size::new(300, 200);
        let wm = Size::new(100, 50);
        let cases = [
            (H::Left, V::Top, 0.0, 0.0),
            (H::Center, V::Top, 100.0, 0.0),
            (H::Right, V::Top, 200.0, 0.0),
            (H::Left, V::Middle, 0.0, 75.0),
            (H::Center, V::Middle, 100.0, 75.0),
            (H::Right, V::Middle, 200.0, 75.0),
            (H::Left, V::Bottom, 0.0, 150.0),
            (H::Center, V::Bottom, 100.0, 150.0),
            (H::Right, V::Bottom, 200.0, 150.0),
        ];
        for (h, v, x, y) in cases {
            let p = anchor_point(canvas, wm, Alignment::new(h, v), 5, -5);
            assert_eq!(p, Point::new(x + 5.0, y - 5.0), "{h:?}/{v:?}");
        }
    }

    #[test]
    fn anchor_point_allows_watermark_larger_than_canvas() {
        let p = anchor_point(
            Size::new(100, 100),
            Size::new(300, 50),
            Alignment::new(HorizontalAlignment::Right, VerticalAlignment::Middle),
            0,
            0,
        );
        assert_eq!(p, Point::new(-200.0, 25.0));
    }

    #[test]
    fn rotation_pivots_on_watermark_center() {
        let t = rotation_transform(90.0, Size::new(100, 50), Point::new(10.0, 20.0));
        assert_eq!(t.pivot(), Point::new(60.0, 45.0));
        // The pivot itself does not move.
        assert!(close(t.apply(t.pivot()), t.pivot()));
        // Clockwise on screen: a point to the right of the pivot moves below it.
        assert!(close(t.apply(Point::new(70.0, 45.0)), Point::new(60.0, 55.0)));
    }

    #[test]
    fn rotation_invert_undoes_apply() {
        let t = rotation_transform(-33.5, Size::new(80, 30), Point::new(-12.0, 40.0));
        let p = Point::new(123.0, -7.5);
        assert!(close(t.invert(t.apply(p)), p));
    }

    #[test]
    fn zero_rotation_is_exact() {
        let t = rotation_transform(0.0, Size::new(10, 10), Point::new(3.5, 4.5));
        let p = Point::new(17.25, 2.5);
        assert_eq!(t.apply(p), p);
        assert_eq!(t.invert(p), p);
        assert_eq!(RotationTransform::identity().apply(p), p);
    }

    proptest! {
        #[test]
        fn aspect_fit_stays_in_bounds_and_keeps_ratio(
            sw in 1u32..6000,
            sh in 1u32..6000,
            bw in 1u32..2000,
            bh in 1u32..2000,
        ) {
            let out = aspect_fit(Size::new(sw, sh), Size::new(bw, bh));

            prop_assert!(out.width >= 1 && out.height >= 1);
            prop_assert!(out.width <= bw.max(1) && out.height <= bh.max(1));
            prop_assert!(out.width <= sw && out.height <= sh);

            // Cross-multiplied ratio error is bounded by one truncated pixel.
            let lhs = u64::from(out.width) * u64::from(sh);
            let rhs = u64::from(out.height) * u64::from(sw);
            prop_assert!(lhs.abs_diff(rhs) <= u64::from(sw.max(sh)));
        }
    }
}
