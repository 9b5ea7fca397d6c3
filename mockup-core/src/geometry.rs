//! Geometry primitives and the affine math behind hit-testing and drawing.
//!
//! All coordinates are in canvas space and all angles are in radians.
//! A layer's transform composes as
//! `translate(position) · rotate(rotation) · scale(scale)`, with the
//! artwork drawn centered at the origin of its local space.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (pixels from the left edge).
    pub x: f32,
    /// Y coordinate (pixels from the top edge).
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A displacement in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    /// Horizontal component.
    pub dx: f32,
    /// Vertical component.
    pub dy: f32,
}

impl Vector {
    /// Create a vector.
    #[must_use]
    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, rhs: Vector) -> Point {
        Point::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The larger of the two dimensions.
    #[must_use]
    pub fn dominant(self) -> f32 {
        self.width.max(self.height)
    }

    /// Uniformly scale both dimensions.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Fit this size into `max_width × max_height`, preserving aspect ratio.
    ///
    /// Never upscales: a size already inside the box is returned unchanged.
    #[must_use]
    pub fn fit_within(self, max_width: f32, max_height: f32) -> Self {
        if self.width <= 0.0 || self.height <= 0.0 {
            return self;
        }
        let factor = (max_width / self.width)
            .min(max_height / self.height)
            .min(1.0);
        self.scaled(factor)
    }
}

/// An axis-aligned rectangle (origin + size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from its left, top, right and bottom edges.
    #[must_use]
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// Create a rectangle of `size` centered on `center`.
    #[must_use]
    pub fn from_center(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Left edge.
    #[must_use]
    pub fn min_x(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    #[must_use]
    pub fn min_y(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Size of the rectangle.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Shrink the rectangle by `amount` on every side (negative grows it).
    #[must_use]
    pub fn inset(&self, amount: f32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            self.width - amount * 2.0,
            self.height - amount * 2.0,
        )
    }

    /// Whether both dimensions are finite and positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// A 2D affine transform.
///
/// Maps `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`. Multiplication
/// `lhs * rhs` applies `rhs` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    /// Row 1, column 1.
    pub a: f32,
    /// Row 2, column 1.
    pub b: f32,
    /// Row 1, column 2.
    pub c: f32,
    /// Row 2, column 2.
    pub d: f32,
    /// Horizontal translation.
    pub e: f32,
    /// Vertical translation.
    pub f: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Translation by `(dx, dy)`.
    #[must_use]
    pub const fn translate(dx: f32, dy: f32) -> Self {
        Self {
            e: dx,
            f: dy,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise rotation in radians (clockwise on a y-down canvas).
    #[must_use]
    pub fn rotate(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Uniform scale.
    #[must_use]
    pub const fn scale(factor: f32) -> Self {
        Self::scale_xy(factor, factor)
    }

    /// Non-uniform scale.
    #[must_use]
    pub const fn scale_xy(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Apply the transform to a point.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Matrix determinant.
    #[must_use]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse transform, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// The coefficients in `[a, b, c, d, e, f]` order.
    #[must_use]
    pub fn as_coeffs(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Mul for Affine {
    type Output = Affine;

    fn mul(self, rhs: Affine) -> Affine {
        Affine {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }
}

/// A rectangle of `size` centered at `center`, scaled then rotated about
/// its own center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    /// Center in canvas space (the layer position).
    pub center: Point,
    /// Unscaled size.
    pub size: Size,
    /// Uniform scale factor.
    pub scale: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl OrientedRect {
    /// Local-to-canvas transform: `translate · rotate · scale`.
    #[must_use]
    pub fn transform(&self) -> Affine {
        Affine::translate(self.center.x, self.center.y)
            * Affine::rotate(self.rotation)
            * Affine::scale(self.scale)
    }

    /// The four corners in canvas space, clockwise from local top-left.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.size.width / 2.0;
        let hh = self.size.height / 2.0;
        let t = self.transform();
        [
            t.apply(Point::new(-hw, -hh)),
            t.apply(Point::new(hw, -hh)),
            t.apply(Point::new(hw, hh)),
            t.apply(Point::new(-hw, hh)),
        ]
    }
}

/// Hit-test `point` against an oriented rectangle.
///
/// The point is moved into local space (inverse translate, inverse rotate,
/// inverse scale) and tested against `[-size/2, +size/2]`. Edges count as
/// inside.
#[must_use]
pub fn point_in_oriented_rect(point: Point, rect: &OrientedRect) -> bool {
    if rect.scale <= 0.0 || !rect.scale.is_finite() {
        return false;
    }
    let hw = rect.size.width / 2.0;
    let hh = rect.size.height / 2.0;
    let dx = point.x - rect.center.x;
    let dy = point.y - rect.center.y;

    if rect.rotation == 0.0 {
        return dx.abs() <= hw * rect.scale && dy.abs() <= hh * rect.scale;
    }

    let (sin, cos) = rect.rotation.sin_cos();
    let local_x = (dx * cos + dy * sin) / rect.scale;
    let local_y = (-dx * sin + dy * cos) / rect.scale;
    local_x.abs() <= hw && local_y.abs() <= hh
}

/// The smallest axis-aligned rectangle enclosing the oriented rectangle.
#[must_use]
pub fn axis_aligned_bounds(rect: &OrientedRect) -> Rect {
    let (sin, cos) = rect.rotation.sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let w = rect.size.width * rect.scale;
    let h = rect.size.height * rect.scale;
    Rect::from_center(rect.center, Size::new(w * cos + h * sin, w * sin + h * cos))
}
