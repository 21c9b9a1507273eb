//! ## Geometry primitives
//!
//! Plain value types for the planar points and minimum bounding rectangles (MBRs)
//! shared by the k-d tree and the R-tree: [`Point`], [`Rectangle`], and the distance
//! function the two trees must agree on.

use crate::civilization::Civilization;

/// A planar location carrying a [`Civilization`] payload.
///
/// By convention `x` is longitude and `y` is latitude. Two points are equal iff
/// their coordinates match exactly and their payload `id`s match; `name` and
/// `start_year` do not participate in equality.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub payload: Civilization,
}

impl Point {
    pub fn new(x: f64, y: f64, payload: Civilization) -> Self {
        Point { x, y, payload }
    }

    /// The degenerate rectangle `{x, y, x, y}` this point occupies.
    pub fn mbr(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.x, self.y)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.payload.id == other.payload.id
    }
}

/// Euclidean distance between a query given as `(lat, lon)` and a civilization's
/// `(latitude, longitude)`. Both the k-d tree and the R-tree route through this
/// single function so their nearest-neighbor results agree by construction.
pub fn lat_lon_distance(qlat: f64, qlon: f64, lat: f64, lon: f64) -> f64 {
    ((qlat - lat).powi(2) + (qlon - lon).powi(2)).sqrt()
}

/// An axis-aligned minimum bounding rectangle.
///
/// The canonical empty rectangle is the inverted sentinel returned by
/// [`Rectangle::empty`]; it combines as the identity element and has zero area.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rectangle {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rectangle {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Rectangle {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// The inverted sentinel rectangle: `combine(empty, r) == r` and `empty.area() == 0`.
    pub fn empty() -> Self {
        Rectangle {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    /// Area of the rectangle, or zero if it is inverted (empty).
    pub fn area(&self) -> f64 {
        (self.xmax - self.xmin).max(0.0) * (self.ymax - self.ymin).max(0.0)
    }

    /// The tight MBR of `self` and `other`.
    pub fn combine(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// In-place `combine`.
    pub fn expand(&mut self, other: &Rectangle) {
        self.xmin = self.xmin.min(other.xmin);
        self.ymin = self.ymin.min(other.ymin);
        self.xmax = self.xmax.max(other.xmax);
        self.ymax = self.ymax.max(other.ymax);
    }

    /// Non-strict overlap; shared edges count as intersecting.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(self.xmin > other.xmax
            || self.xmax < other.xmin
            || self.ymin > other.ymax
            || self.ymax < other.ymin)
    }

    /// Closed-box membership test for a point given as `(x, y)`.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        self.contains_xy(point.x, point.y)
    }

    /// Additional area `self` would need to grow to contain `other`.
    pub fn enlargement(&self, other: &Rectangle) -> f64 {
        self.combine(other).area() - self.area()
    }

    /// Exact Euclidean distance from `(px, py)` to the nearest point of the closed
    /// rectangle; zero when `(px, py)` lies inside or on the boundary.
    pub fn distance_to_point(&self, px: f64, py: f64) -> f64 {
        let dx = (self.xmin - px).max(px - self.xmax).max(0.0);
        let dy = (self.ymin - py).max(py - self.ymax).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn civ(id: i64) -> Civilization {
        Civilization::new(id, "test", 0.0, 0.0, 0)
    }

    #[test]
    fn empty_area_is_zero() {
        assert_eq!(Rectangle::empty().area(), 0.0);
    }

    #[test]
    fn combine_with_empty_is_identity() {
        let r = Rectangle::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Rectangle::empty().combine(&r), r);
        assert_eq!(r.combine(&Rectangle::empty()), r);
    }

    #[test]
    fn area_of_inverted_rect_is_zero() {
        let r = Rectangle::new(5.0, 5.0, 1.0, 1.0);
        assert_eq!(r.area(), 0.0);
    }

    #[test]
    fn intersects_is_closed() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b), "edge-touching rectangles must intersect");
    }

    #[test]
    fn contains_is_closed_box() {
        let r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_xy(0.0, 0.0));
        assert!(r.contains_xy(10.0, 10.0));
        assert!(!r.contains_xy(10.1, 5.0));
    }

    #[test]
    fn enlargement_of_contained_rect_is_zero() {
        let outer = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let inner = Rectangle::new(2.0, 2.0, 5.0, 5.0);
        assert_eq!(outer.enlargement(&inner), 0.0);
    }

    #[test]
    fn distance_to_point_inside_is_zero() {
        let r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to_point(5.0, 5.0), 0.0);
        assert_eq!(r.distance_to_point(0.0, 0.0), 0.0);
    }

    #[test]
    fn distance_to_point_outside_is_exact() {
        let r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to_point(13.0, 4.0), 3.0);
        assert_eq!(r.distance_to_point(13.0, 14.0), 5.0);
    }

    #[test]
    fn point_equality_ignores_name_and_year() {
        let a = Point::new(1.0, 2.0, Civilization::new(1, "Rome", 41.9, 12.5, -753));
        let b = Point::new(1.0, 2.0, Civilization::new(1, "Roma", 41.9, 12.5, 100));
        assert_eq!(a, b);
        let c = Point::new(1.0, 2.0, civ(2));
        assert_ne!(a, c);
    }
}
