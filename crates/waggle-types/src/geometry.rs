//! Body-frame geometry: vectors, yaw rotations and the body pose.
//!
//! The world is y-up with the body's forward axis along +Z.  Rotations are
//! unit quaternions; every rotation the engine produces is a pure yaw about
//! the up axis, but the quaternion math is general.
//!
//! # Example
//!
//! ```rust
//! use waggle_types::geometry::{Quaternion, Vec3};
//!
//! // Facing +X is a 90° yaw.
//! let q = Quaternion::look_rotation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
//! let fwd = q.forward();
//! assert!((fwd.x - 1.0).abs() < 1e-5);
//! assert!(fwd.z.abs() < 1e-5);
//! ```

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Squared lengths below this are treated as the zero vector.
const DEGENERATE_SQR: f32 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector in world space (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);
    pub const RIGHT: Vec3 = Vec3::new(1.0, 0.0, 0.0);

    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Right-handed cross product, matching the `up × forward = right`
    /// convention of the body frame.
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near-)zero vector.
    pub fn normalized(self) -> Option<Self> {
        let sqr = self.length_squared();
        if sqr < DEGENERATE_SQR {
            return None;
        }
        Some(self * (1.0 / sqr.sqrt()))
    }

    /// Projection onto the ground plane (height dropped).
    pub fn flat(self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    /// Same vector with its height replaced.
    pub fn with_y(self, y: f32) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Planar distance between two points, ignoring height.
    pub fn flat_distance(self, other: Self) -> f32 {
        (other - self).flat().length()
    }

    /// Linear interpolation; `t` is not clamped.
    pub fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }

    /// Unsigned angle in degrees between two directions.  Returns `0.0` when
    /// either vector is degenerate.
    pub fn angle_deg(self, other: Self) -> f32 {
        let denom = (self.length_squared() * other.length_squared()).sqrt();
        if denom < DEGENERATE_SQR {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Signed angle in degrees from `self` to `other` about `axis`.
    ///
    /// Positive values turn clockwise when looking down `axis` (towards the
    /// body's right for the up axis).
    pub fn signed_angle_deg(self, other: Self, axis: Self) -> f32 {
        let sin = self.cross(other).dot(axis);
        let cos = self.dot(other);
        sin.atan2(cos).to_degrees()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (facing +Z).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `yaw_deg` degrees about the up axis.
    pub fn from_yaw_deg(yaw_deg: f32) -> Self {
        let half = yaw_deg.to_radians() * 0.5;
        Self::new(half.cos(), 0.0, half.sin(), 0.0)
    }

    /// Yaw rotation whose forward axis points along the planar part of
    /// `direction`.  `None` when `direction` has no planar component.
    pub fn look_rotation(direction: Vec3) -> Option<Self> {
        let flat = direction.flat().normalized()?;
        Some(Self::from_yaw_deg(flat.x.atan2(flat.z).to_degrees()))
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// The body forward axis (+Z) under this rotation.
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::FORWARD)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Angle in degrees of the rotation taking `self` to `other`.
    pub fn angle_deg(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        (2.0 * d.acos()).to_degrees()
    }

    fn normalized(self) -> Self {
        let n = self.dot(self).sqrt();
        if n < DEGENERATE_SQR {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Spherical interpolation along the shortest arc; `t` is clamped to
    /// `[0, 1]`.
    pub fn slerp(self, to: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut to = to;
        let mut cos = self.dot(to);
        if cos < 0.0 {
            to = Self::new(-to.w, -to.x, -to.y, -to.z);
            cos = -cos;
        }

        // Nearly parallel: normalised lerp is accurate and avoids 0/0.
        if cos > 0.9995 {
            return Self::new(
                self.w + (to.w - self.w) * t,
                self.x + (to.x - self.x) * t,
                self.y + (to.y - self.y) * t,
                self.z + (to.z - self.z) * t,
            )
            .normalized();
        }

        let theta0 = cos.acos();
        let sin0 = theta0.sin();
        let theta = theta0 * t;
        let s0 = (theta0 - theta).sin() / sin0;
        let s1 = theta.sin() / sin0;
        Self::new(
            self.w * s0 + to.w * s1,
            self.x * s0 + to.x * s1,
            self.y * s0 + to.y * s1,
            self.z * s0 + to.z * s1,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Angles
// ────────────────────────────────────────────────────────────────────────────

/// Interpolate between two angles (degrees) along the shortest arc.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    from + delta * t.clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// BodyPose
// ────────────────────────────────────────────────────────────────────────────

/// World pose of the agent body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyPose {
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl BodyPose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// Planar unit forward, falling back to +Z when the body is pitched
    /// straight up or down.
    pub fn forward_flat(&self) -> Vec3 {
        self.rotation
            .forward()
            .flat()
            .normalized()
            .unwrap_or(Vec3::FORWARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn up_cross_forward_is_right() {
        let r = Vec3::UP.cross(Vec3::FORWARD);
        assert!(approx(r.x, 1.0) && approx(r.y, 0.0) && approx(r.z, 0.0));
    }

    #[test]
    fn normalized_rejects_zero_vector() {
        assert!(Vec3::zero().normalized().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!(approx(n.length(), 1.0));
    }

    #[test]
    fn signed_angle_is_positive_towards_the_right() {
        let a = Vec3::FORWARD.signed_angle_deg(Vec3::RIGHT, Vec3::UP);
        assert!(approx(a, 90.0));
        let b = Vec3::FORWARD.signed_angle_deg(-Vec3::RIGHT, Vec3::UP);
        assert!(approx(b, -90.0));
    }

    #[test]
    fn angle_between_opposite_directions_is_180() {
        assert!(approx(Vec3::FORWARD.angle_deg(-Vec3::FORWARD), 180.0));
        assert!(approx(Vec3::zero().angle_deg(Vec3::FORWARD), 0.0));
    }

    #[test]
    fn look_rotation_points_forward_along_direction() {
        let q = Quaternion::look_rotation(Vec3::new(-2.0, 5.0, 0.0)).unwrap();
        let f = q.forward();
        assert!(approx(f.x, -1.0) && approx(f.z, 0.0));
        assert!(Quaternion::look_rotation(Vec3::UP).is_none());
    }

    #[test]
    fn slerp_halfway_between_yaws() {
        let a = Quaternion::identity();
        let b = Quaternion::from_yaw_deg(90.0);
        let mid = a.slerp(b, 0.5);
        assert!(approx(a.angle_deg(mid), 45.0));
        assert!(approx(mid.angle_deg(b), 45.0));
        assert_eq!(a.slerp(b, 1.0).angle_deg(b).round(), 0.0);
    }

    #[test]
    fn slerp_takes_the_short_way_round() {
        let a = Quaternion::from_yaw_deg(170.0);
        let b = Quaternion::from_yaw_deg(-170.0);
        let mid = a.slerp(b, 0.5);
        assert!(approx(a.angle_deg(mid), 10.0));
    }

    #[test]
    fn lerp_angle_wraps_across_zero() {
        assert!(approx(lerp_angle(350.0, 10.0, 0.5), 360.0));
        assert!(approx(lerp_angle(10.0, 350.0, 0.5), 0.0));
        assert!(approx(lerp_angle(0.0, 90.0, 2.0), 90.0));
    }

    #[test]
    fn forward_flat_of_identity_pose_is_plus_z() {
        let pose = BodyPose::default();
        let f = pose.forward_flat();
        assert!(approx(f.z, 1.0));
    }
}
