use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Cross products smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-7;

const TWO_PI: f64 = 2.0 * PI;

/// A point or direction in diagram space.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

/// Polar form of a [`Vector2D`]; `angle` is in radians.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct PolarVector2D {
    pub radius: f64,
    pub angle: f64,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn to_polar(self) -> PolarVector2D {
        PolarVector2D {
            radius: self.magnitude(),
            angle: self.angle(),
        }
    }

    /// Rotate counterclockwise around the origin.
    pub fn rotate(self, angle: f64) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl PolarVector2D {
    pub const fn new(radius: f64, angle: f64) -> Self {
        Self { radius, angle }
    }

    pub fn to_cartesian(self) -> Vector2D {
        to_cartesian(self)
    }
}

impl From<PolarVector2D> for Vector2D {
    fn from(polar: PolarVector2D) -> Self {
        to_cartesian(polar)
    }
}

impl From<Vector2D> for PolarVector2D {
    fn from(v: Vector2D) -> Self {
        v.to_polar()
    }
}

impl Add for Vector2D {
    type Output = Vector2D;
    fn add(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, rhs: Vector2D) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;
    fn sub(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2D {
    fn sub_assign(&mut self, rhs: Vector2D) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;
    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;
    fn mul(self, rhs: f64) -> Vector2D {
        Vector2D::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector2D {
    type Output = Vector2D;
    fn div(self, rhs: f64) -> Vector2D {
        Vector2D::new(self.x / rhs, self.y / rhs)
    }
}

// ── Free-function forms ─────────────────────────────────────────────

pub fn add(v0: Vector2D, v1: Vector2D) -> Vector2D {
    v0 + v1
}

pub fn subtract(v0: Vector2D, v1: Vector2D) -> Vector2D {
    v0 - v1
}

pub fn negate(v: Vector2D) -> Vector2D {
    -v
}

pub fn scale(v: Vector2D, factor: f64) -> Vector2D {
    v * factor
}

/// Unit vector in the direction of `v`. The zero vector normalizes to itself.
pub fn normalize(v: Vector2D) -> Vector2D {
    let m = v.magnitude();
    if m == 0.0 {
        Vector2D::ZERO
    } else {
        v / m
    }
}

/// `v` rotated by +90°.
pub fn orthogonalize_left(v: Vector2D) -> Vector2D {
    Vector2D::new(-v.y, v.x)
}

/// `v` rotated by -90°.
pub fn orthogonalize_right(v: Vector2D) -> Vector2D {
    Vector2D::new(v.y, -v.x)
}

pub fn dot(v0: Vector2D, v1: Vector2D) -> f64 {
    v0.x * v1.x + v0.y * v1.y
}

/// z-component of the 3D cross product.
pub fn cross(v0: Vector2D, v1: Vector2D) -> f64 {
    v0.x * v1.y - v0.y * v1.x
}

pub fn magnitude(v: Vector2D) -> f64 {
    v.magnitude()
}

pub fn distance(v0: Vector2D, v1: Vector2D) -> f64 {
    (v1 - v0).magnitude()
}

pub fn to_polar(v: Vector2D) -> PolarVector2D {
    v.to_polar()
}

pub fn to_cartesian(polar: PolarVector2D) -> Vector2D {
    let (sin_a, cos_a) = polar.angle.sin_cos();
    Vector2D::new(polar.radius * cos_a, polar.radius * sin_a)
}

/// Component of `v` along `onto`. Projecting onto the zero vector gives zero.
pub fn project(v: Vector2D, onto: Vector2D) -> Vector2D {
    let denom = dot(onto, onto);
    if denom == 0.0 {
        return Vector2D::ZERO;
    }
    onto * (dot(v, onto) / denom)
}

/// Component of `v` perpendicular to `onto`.
pub fn reject(v: Vector2D, onto: Vector2D) -> Vector2D {
    v - project(v, onto)
}

/// Sign of the rotation from `dv0` to `dv1`: `1` counterclockwise, `-1` clockwise,
/// `0` when the cross product is within [`EPSILON`] of zero.
pub fn rotation_sign(dv0: Vector2D, dv1: Vector2D) -> i8 {
    let c = cross(dv0, dv1);
    if c.abs() < EPSILON {
        0
    } else if c > 0.0 {
        1
    } else {
        -1
    }
}

pub fn midpoint(v0: Vector2D, v1: Vector2D) -> Vector2D {
    (v0 + v1) * 0.5
}

pub fn lerp(v0: Vector2D, v1: Vector2D, t: f64) -> Vector2D {
    v0 + (v1 - v0) * t
}

/// Map an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TWO_PI;
    if a >= 0.0 {
        return a;
    }
    // Rounds up to 2π for tiny negative inputs.
    let wrapped = a + TWO_PI;
    if wrapped >= TWO_PI {
        0.0
    } else {
        wrapped
    }
}
