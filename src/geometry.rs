//! Geometry helpers: points, sizes, rectangles, and the page-offset and
//! stacking-order computations markers are positioned with.
//!
//! Everything here is a pure function of the current layout as reported by
//! the [`Dom`] backend.

use crate::dom::{Dom, NodeId};

/// A 2D point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A 2D size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A rectangle with position and size, viewport-relative unless stated
/// otherwise by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Horizontal center of the rectangle.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Vertical middle of the rectangle.
    pub fn middle_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}

/// Page offset of an element: its viewport-relative bounding rect shifted by
/// the current scroll offset.
pub fn page_offset<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Point {
    let rect = dom.bounding_rect(node);
    let scroll = dom.scroll_offset();
    Point::new(rect.x + scroll.x, rect.y + scroll.y)
}

/// Stacking order a marker over `node` should use: one above the node's own
/// computed z-index. An unstyled node counts as layer 0.
pub fn stacking_order<D: Dom + ?Sized>(dom: &D, node: NodeId) -> i32 {
    dom.computed_z_index(node).unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_accessors() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.bottom(), 70.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.center_x(), 60.0);
        assert_eq!(rect.middle_y(), 45.0);
    }

    #[test]
    fn rect_contains_point() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_point(Point::new(5.0, 5.0)));
        assert!(rect.contains_point(Point::new(10.0, 10.0)));
        assert!(!rect.contains_point(Point::new(10.1, 5.0)));
    }
}
