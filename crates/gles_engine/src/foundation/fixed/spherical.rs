//! Spherical coordinates around the Y (up) axis
//!
//! - `r`: distance from the origin
//! - `theta`: deflection from +Y, in radians
//! - `phi`: rotation around +Y measured from +Z toward +X, in radians
//!
//! Both angles are kept in `[0, 2π)`.

use super::{Fp, FpVec3};
use serde::{Deserialize, Serialize};

/// Point expressed as `(r, theta, phi)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FpSpherical {
    /// Radial distance
    pub r: Fp,
    /// Deflection angle from the up axis
    pub theta: Fp,
    /// Rotation angle around the up axis
    pub phi: Fp,
}

impl FpSpherical {
    /// Create a coordinate, wrapping both angles into `[0, 2π)`
    #[must_use]
    pub const fn new(r: Fp, theta: Fp, phi: Fp) -> Self {
        Self {
            r,
            theta: theta.normalize_angle(),
            phi: phi.normalize_angle(),
        }
    }

    /// Convert from Cartesian coordinates.
    ///
    /// The origin maps to `(0, 0, 0)`. Points on the up axis get `phi = 0`.
    #[must_use]
    pub fn from_cartesian(v: FpVec3) -> Self {
        let r = v.length();
        if r.is_zero() {
            return Self::default();
        }

        let theta = v.y.div(r).acos();
        Self::new(r, theta, rotation_of(v.x, v.z))
    }

    /// Convert back to Cartesian coordinates
    #[must_use]
    pub fn to_cartesian(&self) -> FpVec3 {
        let horizontal = self.r.mul(self.theta.sin());
        FpVec3::new(
            horizontal.mul(self.phi.sin()),
            self.r.mul(self.theta.cos()),
            horizontal.mul(self.phi.cos()),
        )
    }

    /// Tilt away from (positive) or toward (negative) the up axis
    pub fn add_deflection(&mut self, delta: Fp) {
        self.theta = (self.theta + delta).normalize_angle();
    }

    /// Spin around the up axis
    pub fn add_rotation(&mut self, delta: Fp) {
        self.phi = (self.phi + delta).normalize_angle();
    }

    /// Move along the radius, never below zero
    pub fn add_radius(&mut self, delta: Fp) {
        self.r = (self.r + delta).max(Fp::ZERO);
    }
}

/// Angle of `(x, z)` around the up axis, by quadrant
fn rotation_of(x: Fp, z: Fp) -> Fp {
    if z.is_zero() {
        return match x.raw().signum() {
            1 => Fp::HALF_PI,
            -1 => -Fp::HALF_PI,
            _ => Fp::ZERO,
        };
    }

    let a = atan_of_ratio(x.abs(), z.abs());
    match (x.is_negative(), z.is_negative()) {
        (false, false) => a,
        (true, false) => -a,
        (false, true) => Fp::PI - a,
        (true, true) => a - Fp::PI,
    }
}

/// `atan(n / d)` for non-negative `n` and positive `d` without overflowing the quotient
fn atan_of_ratio(n: Fp, d: Fp) -> Fp {
    if n <= d {
        n.div(d).atan()
    } else {
        Fp::HALF_PI - d.div(n).atan()
    }
}
