use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x && p.x < self.max_x() && p.y >= self.origin.y && p.y < self.max_y()
    }

    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.origin.x + dx,
            self.origin.y + dy,
            (self.size.width - 2.0 * dx).max(0.0),
            (self.size.height - 2.0 * dy).max(0.0),
        )
    }
}

#[cfg(target_os = "macos")]
mod cg {
    use objc2_core_foundation::{CGPoint, CGRect, CGSize};

    use super::{Point, Rect};

    impl From<CGRect> for Rect {
        fn from(r: CGRect) -> Self { Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height) }
    }

    impl From<Rect> for CGRect {
        fn from(r: Rect) -> Self {
            CGRect::new(
                CGPoint::new(r.origin.x, r.origin.y),
                CGSize::new(r.size.width, r.size.height),
            )
        }
    }

    impl From<CGPoint> for Point {
        fn from(p: CGPoint) -> Self { Point::new(p.x, p.y) }
    }
}
