//! # Geometry
//!
//! Document-space geometry. Everything here is in `f64` document pixels, with `+Y` down.

mod region;
mod shape;

pub use region::Region;
pub use shape::Shape;

pub type Point = cgmath::Point2<f64>;
pub type Vector = cgmath::Vector2<f64>;
/// A 2D affine transform, as a homogeneous 3x3 matrix (column-major, like the rest of `cgmath`).
pub type Affine = cgmath::Matrix3<f64>;

/// Affine translating by `(x, y)`.
#[must_use]
pub fn translation(x: f64, y: f64) -> Affine {
    Affine::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, x, y, 1.0)
}
/// Affine scaling about the origin.
#[must_use]
pub fn scaling(x: f64, y: f64) -> Affine {
    Affine::new(x, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, 1.0)
}
#[must_use]
pub fn transform_point(affine: &Affine, point: Point) -> Point {
    Point::new(
        affine.x.x * point.x + affine.y.x * point.y + affine.z.x,
        affine.x.y * point.x + affine.y.y * point.y + affine.z.y,
    )
}
/// Integer pixel offset moved by `by`, clamped to the `i32` range.
#[must_use]
pub fn offset_by(offset: [i32; 2], by: [i32; 2]) -> [i32; 2] {
    [offset[0].saturating_add(by[0]), offset[1].saturating_add(by[1])]
}
/// True if the affine maps axis-aligned rectangles to axis-aligned rectangles.
#[must_use]
pub fn is_axis_aligned(affine: &Affine) -> bool {
    affine.x.y == 0.0 && affine.y.x == 0.0
}

/// Axis-aligned rectangle. Width and height may be zero or negative, in which case it's empty.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    /// Rect spanning two corners, in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (left, right) = (a.x.min(b.x), a.x.max(b.x));
        let (top, bottom) = (a.y.min(b.y), a.y.max(b.y));
        Self::new(left, top, right - left, bottom - top)
    }
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Also catches NaN.
        !(self.width > 0.0 && self.height > 0.0)
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
    /// Overlapping area, or `None` if they don't overlap.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let rect = Self::new(
            left,
            top,
            self.right().min(other.right()) - left,
            self.bottom().min(other.bottom()) - top,
        );
        (!rect.is_empty()).then_some(rect)
    }
    #[must_use]
    pub fn translated(&self, by: Vector) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }
    /// Smallest rect with integer coordinates containing this one.
    #[must_use]
    pub fn round_out(&self) -> Self {
        let left = self.x.floor();
        let top = self.y.floor();
        Self::new(
            left,
            top,
            self.right().ceil() - left,
            self.bottom().ceil() - top,
        )
    }
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::SquareMatrix;

    #[test]
    fn offsets_saturate() {
        assert_eq!(offset_by([1, -2], [3, 4]), [4, 2]);
        assert_eq!(offset_by([5, -5], [i32::MAX, i32::MIN]), [i32::MAX, i32::MIN]);
    }

    #[test]
    fn affine_helpers() {
        let m = translation(10.0, -5.0) * scaling(2.0, 3.0);
        assert_eq!(transform_point(&m, Point::new(1.0, 1.0)), Point::new(12.0, -2.0));
        let inv = m.invert().unwrap();
        assert_eq!(transform_point(&inv, Point::new(12.0, -2.0)), Point::new(1.0, 1.0));
        assert!(is_axis_aligned(&m));
    }
    #[test]
    fn rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        // Touching edges don't overlap.
        let c = Rect::new(10.0, 0.0, 5.0, 5.0);
        assert_eq!(a.intersection(&c), None);
        assert!(Rect::new(0.0, 0.0, 0.0, 4.0).is_empty());
        assert!(Rect::new(0.0, 0.0, f64::NAN, 4.0).is_empty());
    }
}
