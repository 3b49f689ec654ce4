use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in pixel space, stored as `(x, y, width, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Elongation of the box regardless of orientation, `>= 1.0` for any
    /// valid box.
    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(self.height) / self.width.min(self.height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0.0 || self.height <= 0.0 {
            bail!(
                "bounding box has non-positive dimensions {}x{}",
                self.width,
                self.height
            );
        }
        Ok(())
    }

    /// Intersection over union with `other`.
    ///
    /// Disjoint boxes and degenerate zero-area unions both yield `0.0`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x_left = self.x.max(other.x);
        let y_top = self.y.max(other.y);
        let x_right = (self.x + self.width).min(other.x + other.width);
        let y_bottom = (self.y + self.height).min(other.y + other.height);

        if x_right <= x_left || y_bottom <= y_top {
            return 0.0;
        }

        let intersection = (x_right - x_left) * (y_bottom - y_top);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }
}
