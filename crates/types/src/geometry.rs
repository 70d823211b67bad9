use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in PDF user space (points, origin bottom-left).
///
/// `x`/`y` always name the lower-left corner; `width` and `height` are never
/// negative once built through [`Rect::from_corners`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a rectangle from two opposite corners in any order, the way a
    /// PDF `/Rect` array may store them.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// A square anchored at this rectangle's origin whose side is the smaller
    /// of width and height. Checkboxes and radio buttons are drawn this way.
    pub fn square_at_origin(&self) -> Self {
        let size = self.width.min(self.height);
        Self { x: self.x, y: self.y, width: size, height: size }
    }

    /// The `[llx lly urx ury]` corner quadruple.
    pub fn corners(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.top()]
    }
}
