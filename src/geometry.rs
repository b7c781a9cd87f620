//! Integer layout geometry shared by the output layout, views and scene graph.

use serde::{Deserialize, Serialize};

/// Width and height in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Axis-aligned box in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_loc_and_size(loc: (i32, i32), size: Size) -> Self {
        Self::new(loc.0, loc.1, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Half-open containment test for a fractional point.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        !self.is_empty()
            && x >= f64::from(self.x)
            && x < f64::from(self.right())
            && y >= f64::from(self.y)
            && y < f64::from(self.bottom())
    }

    /// Smallest box covering both; empty boxes do not contribute.
    pub fn merge(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rectangle::new(x, y, right - x, bottom - y)
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Clamp a point into the box. The far edges are exclusive, so the
    /// result sits a sub-pixel inside them.
    pub fn closest_point(&self, x: f64, y: f64) -> (f64, f64) {
        const EDGE: f64 = 1.0 / 65536.0;
        if self.is_empty() {
            return (x, y);
        }
        let max_x = f64::from(self.right()) - EDGE;
        let max_y = f64::from(self.bottom()) - EDGE;
        (
            x.clamp(f64::from(self.x), max_x),
            y.clamp(f64::from(self.y), max_y),
        )
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_ignores_empty_boxes() {
        let a = Rectangle::new(0, 0, 1920, 1080);
        assert_eq!(a.merge(&Rectangle::default()), a);
        assert_eq!(Rectangle::default().merge(&a), a);

        let b = Rectangle::new(1920, 0, 1280, 720);
        assert_eq!(a.merge(&b), Rectangle::new(0, 0, 3200, 1080));
    }

    #[test]
    fn containment_is_half_open() {
        let r = Rectangle::new(10, 10, 100, 50);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(109.5, 59.5));
        assert!(!r.contains(110.0, 30.0));
        assert!(!r.contains(50.0, 60.0));
        assert!(!Rectangle::default().contains(0.0, 0.0));
    }

    #[test]
    fn closest_point_stays_inside() {
        let r = Rectangle::new(0, 0, 800, 600);
        let (x, y) = r.closest_point(2000.0, -40.0);
        assert!(r.contains(x, y));
        assert_eq!(y, 0.0);
        assert!(x > 799.0);
    }
}
