//! Axis-aligned geometry for zone rectangles.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in source-image pixel space.
///
/// `width` and `height` are always strictly positive for rectangles
/// produced by detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X-coordinate of the top-left corner.
    pub x: u32,
    /// Y-coordinate of the top-left corner.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[inline]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// X-coordinate one past the right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Y-coordinate one past the bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in pixels.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width/height ratio.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Center point.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn center_distance(&self, other: &BoundingBox) -> f32 {
        let (cx, cy) = self.center();
        let (ox, oy) = other.center();
        ((cx - ox).powi(2) + (cy - oy).powi(2)).sqrt()
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }

    /// Overlap of the vertical spans of two boxes, as a fraction of the
    /// smaller span. Returns 0.0 when the spans are disjoint.
    ///
    /// Measuring against the smaller span lets a short line nested in a
    /// tall block still count as sharing its row.
    pub fn vertical_overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let top = self.y.max(other.y);
        let bottom = self.bottom().min(other.bottom());
        if bottom <= top {
            return 0.0;
        }
        let intersection = (bottom - top) as f32;
        let smaller = self.height.min(other.height).max(1) as f32;
        intersection / smaller
    }

    /// Expands the box by `margin` on every side, clamped to an image of
    /// the given dimensions.
    pub fn expand_within(&self, margin: u32, image_width: u32, image_height: u32) -> Self {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = (self.right() + margin).min(image_width);
        let bottom = (self.bottom() + margin).min(image_height);
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// True when the box lies entirely within an image of the given
    /// dimensions and has positive extent.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= image_width
            && self.bottom() <= image_height
    }
}
