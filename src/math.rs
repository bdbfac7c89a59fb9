// FluxSand - Orientation Math Types
//
// Vector3, Quaternion and the cyclic angle type used for roll/pitch/yaw.

use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Neg, Sub};

// ---------------------------------------------------------------------------
// Vector3
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn scale(&self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ---------------------------------------------------------------------------
// Quaternion
// ---------------------------------------------------------------------------

/// Rotation quaternion, `q0` is the real part.  Rotates body frame into
/// world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub q0: f32,
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    pub const fn new(q0: f32, q1: f32, q2: f32, q3: f32) -> Self {
        Self { q0, q1, q2, q3 }
    }

    pub fn norm(&self) -> f32 {
        (self.q0 * self.q0 + self.q1 * self.q1 + self.q2 * self.q2 + self.q3 * self.q3).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.q0.is_finite() && self.q1.is_finite() && self.q2.is_finite() && self.q3.is_finite()
    }

    /// Unit-length copy, or `None` for a zero / non-finite quaternion.
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if !n.is_finite() || n == 0.0 {
            return None;
        }
        let r = 1.0 / n;
        Some(Self::new(self.q0 * r, self.q1 * r, self.q2 * r, self.q3 * r))
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.q0, -self.q1, -self.q2, -self.q3)
    }

    /// Hamilton product `self ⊗ rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let (a0, a1, a2, a3) = (self.q0, self.q1, self.q2, self.q3);
        let (b0, b1, b2, b3) = (rhs.q0, rhs.q1, rhs.q2, rhs.q3);
        Self::new(
            a0 * b0 - a1 * b1 - a2 * b2 - a3 * b3,
            a0 * b1 + a1 * b0 + a2 * b3 - a3 * b2,
            a0 * b2 - a1 * b3 + a2 * b0 + a3 * b1,
            a0 * b3 + a1 * b2 - a2 * b1 + a3 * b0,
        )
    }

    /// `q ⊗ (0, v) ⊗ q*`: body vector expressed in the world frame.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(&p).mul(&self.conjugate());
        Vector3::new(r.q1, r.q2, r.q3)
    }

    /// `q* ⊗ (0, v) ⊗ q`: world vector expressed in the body frame.
    pub fn rotate_inverse(&self, v: Vector3) -> Vector3 {
        self.conjugate().rotate(v)
    }

    /// Aerospace (yaw-pitch-roll) decomposition.
    pub fn to_euler(&self) -> EulerAngle {
        let Self { q0, q1, q2, q3 } = *self;
        let sin_pitch = 2.0 * (q0 * q2 - q1 * q3);

        if sin_pitch.abs() >= 1.0 {
            // Gimbal lock: roll and yaw share one axis, fold it all into yaw.
            let pitch = PI / 2.0 * sin_pitch.signum();
            let yaw = -2.0 * sin_pitch.signum() * q1.atan2(q0);
            return EulerAngle::new(0.0, pitch, yaw);
        }

        let roll = (2.0 * (q0 * q1 + q2 * q3)).atan2(1.0 - 2.0 * (q1 * q1 + q2 * q2));
        let pitch = sin_pitch.asin();
        let yaw = (2.0 * (q0 * q3 + q1 * q2)).atan2(1.0 - 2.0 * (q2 * q2 + q3 * q3));
        EulerAngle::new(roll, pitch, yaw)
    }

    /// Inverse of [`Quaternion::to_euler`].
    pub fn from_euler(euler: &EulerAngle) -> Self {
        let (sr, cr) = (euler.roll.value() * 0.5).sin_cos();
        let (sp, cp) = (euler.pitch.value() * 0.5).sin_cos();
        let (sy, cy) = (euler.yaw.value() * 0.5).sin_cos();
        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }
}

// ---------------------------------------------------------------------------
// CyclicAngle
// ---------------------------------------------------------------------------

/// Angle kept in `[0, 2π)`.  Subtracting two angles yields the shortest
/// signed arc in `[-π, π)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct CyclicAngle(f32);

impl CyclicAngle {
    pub fn new(radians: f32) -> Self {
        Self(wrap_tau(radians))
    }

    pub fn from_degrees(degrees: f32) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Canonical representative in `[0, 2π)`.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Same angle folded into `[-π, π)`.
    pub fn signed(&self) -> f32 {
        wrap_pi(self.0)
    }

    pub fn degrees(&self) -> f32 {
        self.0.to_degrees()
    }
}

impl From<f32> for CyclicAngle {
    fn from(radians: f32) -> Self {
        Self::new(radians)
    }
}

impl Add for CyclicAngle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.0 + rhs.0)
    }
}

impl Add<f32> for CyclicAngle {
    type Output = Self;

    fn add(self, rhs: f32) -> Self {
        Self::new(self.0 + rhs)
    }
}

impl AddAssign<f32> for CyclicAngle {
    fn add_assign(&mut self, rhs: f32) {
        *self = *self + rhs;
    }
}

impl Sub for CyclicAngle {
    type Output = f32;

    fn sub(self, rhs: Self) -> f32 {
        wrap_pi(self.0 - rhs.0)
    }
}

impl Sub<f32> for CyclicAngle {
    type Output = f32;

    fn sub(self, rhs: f32) -> f32 {
        self - CyclicAngle::new(rhs)
    }
}

impl Neg for CyclicAngle {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(TAU - self.0)
    }
}

fn wrap_tau(value: f32) -> f32 {
    let v = value.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if v >= TAU {
        0.0
    } else {
        v
    }
}

fn wrap_pi(value: f32) -> f32 {
    let mut v = value;
    while v >= PI {
        v -= TAU;
    }
    while v < -PI {
        v += TAU;
    }
    v
}

// ---------------------------------------------------------------------------
// EulerAngle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngle {
    pub roll: CyclicAngle,
    pub pitch: CyclicAngle,
    pub yaw: CyclicAngle,
}

impl EulerAngle {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self {
            roll: CyclicAngle::new(roll),
            pitch: CyclicAngle::new(pitch),
            yaw: CyclicAngle::new(yaw),
        }
    }

    pub fn without_yaw(&self) -> Self {
        Self {
            roll: self.roll,
            pitch: self.pitch,
            yaw: CyclicAngle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_angle_wraps_into_canonical_range() {
        assert!((CyclicAngle::new(-0.5).value() - (TAU - 0.5)).abs() < 1e-5);
        assert!((CyclicAngle::new(TAU + 1.0).value() - 1.0).abs() < 1e-5);
        assert_eq!(CyclicAngle::new(-1e-9).value(), 0.0);
        assert!((CyclicAngle::new(2.0) + 5.0).value() < TAU);
    }

    #[test]
    fn cyclic_subtraction_is_shortest_signed_arc() {
        let steps = 64;
        for i in 0..steps {
            for j in 0..steps {
                let a = CyclicAngle::new(TAU * i as f32 / steps as f32);
                let b = CyclicAngle::new(TAU * j as f32 / steps as f32);
                let d = a - b;
                assert!((-PI..PI).contains(&d), "{a:?} - {b:?} = {d}");
            }
        }

        let near_zero = CyclicAngle::new(0.1) - CyclicAngle::new(TAU - 0.1);
        assert!((near_zero - 0.2).abs() < 1e-5);
    }

    #[test]
    fn negation_mirrors_the_angle() {
        let a = CyclicAngle::new(1.0);
        assert!(((-a).value() - (TAU - 1.0)).abs() < 1e-5);
    }

    #[test]
    fn euler_round_trip() {
        let e = EulerAngle::new(0.3, -0.2, 1.1);
        let back = Quaternion::from_euler(&e).to_euler();
        assert!((back.roll - e.roll).abs() < 1e-4);
        assert!((back.pitch - e.pitch).abs() < 1e-4);
        assert!((back.yaw - e.yaw).abs() < 1e-4);
    }

    #[test]
    fn rotation_and_inverse_cancel() {
        let q = Quaternion::from_euler(&EulerAngle::new(0.4, 0.1, -0.7));
        let v = Vector3::new(1.0, -2.0, 0.5);
        let back = q.rotate_inverse(q.rotate(v));
        assert!((back - v).norm() < 1e-5);
    }

    #[test]
    fn singular_pitch_is_clamped() {
        let q = Quaternion::from_euler(&EulerAngle::new(0.0, PI / 2.0, 0.0));
        let e = q.to_euler();
        assert!((e.pitch.signed() - PI / 2.0).abs() < 1e-3);
    }
}
