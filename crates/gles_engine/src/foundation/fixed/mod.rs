//! # Q16.16 Fixed-Point Math
//!
//! Deterministic fixed-point arithmetic for the simulation and transform layers.
//! A value is a 32-bit signed integer with 16 integer bits and 16 fractional bits,
//! covering roughly `[-32768.0, 32767.99998]` with a resolution of `1/65536`.
//!
//! ## Numeric Contract
//!
//! - Every operation that can overflow widens to 64 bits before narrowing back.
//! - Narrowing wraps (two's complement), it never saturates or panics. The only
//!   exception is float conversion, which saturates like any `as` cast.
//! - `to_int` is an arithmetic shift and therefore rounds toward negative
//!   infinity: `to_int(-0.5) == -1`.
//! - Trigonometric, logarithmic and exponential functions round-trip through
//!   `f64` and the platform implementation.
//!
//! ## Submodules
//!
//! - [`vector`]: 2D/3D/4D fixed-point vectors
//! - [`matrix`]: quaternions and 4x4 transform matrices
//! - [`spherical`]: spherical coordinates around the Y (up) axis
//! - [`intersect`]: 2D segment intersection

pub mod intersect;
pub mod matrix;
pub mod spherical;
pub mod vector;

pub use intersect::{intersect_segments, Segment};
pub use matrix::{FpMat4, FpQuat};
pub use spherical::FpSpherical;
pub use vector::{FpVec2, FpVec3, FpVec4};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Number of fractional bits in the representation
pub const FRACTION_BITS: u32 = 16;

const ONE_RAW: i32 = 1 << FRACTION_BITS;
const SCALE: f64 = ONE_RAW as f64;

/// Q16.16 fixed-point scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fp(i32);

impl Fp {
    /// 0.0
    pub const ZERO: Self = Self(0);
    /// 1.0
    pub const ONE: Self = Self(ONE_RAW);
    /// 0.5
    pub const HALF: Self = Self(0x8000);
    /// 2.0
    pub const TWO: Self = Self(0x2_0000);
    /// π
    pub const PI: Self = Self(205_887);
    /// 2π
    pub const TWO_PI: Self = Self(411_775);
    /// π/2
    pub const HALF_PI: Self = Self(102_944);
    /// Euler's number
    pub const E: Self = Self(178_145);
    /// Radians per degree
    pub const DEG_TO_RAD: Self = Self(1_144);
    /// Degrees per radian
    pub const RAD_TO_DEG: Self = Self(3_754_936);
    /// Smallest positive value (1/65536)
    pub const EPSILON: Self = Self(1);
    /// Largest representable value
    pub const MAX: Self = Self(i32::MAX);
    /// Smallest representable value
    pub const MIN: Self = Self(i32::MIN);

    /// Wrap a raw Q16.16 bit pattern
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw Q16.16 bit pattern
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert an integer (`x << 16`)
    ///
    /// Integers outside `[-32768, 32767]` wrap.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self(value.wrapping_shl(FRACTION_BITS))
    }

    /// Convert to an integer by arithmetic shift.
    ///
    /// This floors: `-0.5` becomes `-1`, `1.75` becomes `1`.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACTION_BITS
    }

    /// Convert a float, truncating toward zero and saturating at the range limits
    #[must_use]
    pub fn from_float(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// Convert an `f64`, truncating toward zero and saturating at the range limits
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self((value * SCALE) as i32)
    }

    /// Convert to `f32`
    #[must_use]
    pub fn to_float(self) -> f32 {
        self.to_f64() as f32
    }

    /// Convert to `f64` (exact)
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / SCALE
    }

    /// Fixed-point multiply: widen, multiply, shift right 16, narrow.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub const fn mul(self, rhs: Self) -> Self {
        Self(((self.0 as i64 * rhs.0 as i64) >> FRACTION_BITS) as i32)
    }

    /// Fixed-point divide.
    ///
    /// The numerator is widened and shifted left 32 bits, divided by the plain
    /// denominator, and the quotient is shifted right 16 bits. Quotients that
    /// overflow wrap, like the narrowing in [`Fp::mul`].
    ///
    /// # Panics
    ///
    /// Dividing by zero is a precondition violation and panics. Use
    /// [`Fp::checked_div`] when the denominator is not known to be non-zero.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn div(self, rhs: Self) -> Self {
        assert!(rhs.0 != 0, "fixed-point division by zero ({self} / 0)");
        Self(((i64::from(self.0) << 32).wrapping_div(i64::from(rhs.0)) >> FRACTION_BITS) as i32)
    }

    /// Divide, returning `None` when `rhs` is zero
    #[must_use]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            None
        } else {
            Some(self.div(rhs))
        }
    }

    /// Square root by Newton-Raphson.
    ///
    /// Seeded at `(n + 1.0) / 2` and run for exactly 8 iterations regardless of
    /// convergence, so large inputs stop short of the exact root. Inputs of
    /// zero and one return immediately; negative inputs return zero.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        if self == Self::ONE {
            return Self::ONE;
        }

        let mut s = Self(((i64::from(self.0) + i64::from(ONE_RAW)) >> 1) as i32);
        for _ in 0..8 {
            s = Self(s.0.wrapping_add(self.div(s).0) >> 1);
        }
        s
    }

    /// Absolute value (wrapping at `MIN`)
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// Largest whole value not greater than `self`
    #[must_use]
    pub const fn floor(self) -> Self {
        Self(self.0 & !(ONE_RAW - 1))
    }

    /// Fractional part, always in `[0, 1)`
    #[must_use]
    pub const fn frac(self) -> Self {
        Self(self.0 & (ONE_RAW - 1))
    }

    /// Smaller of two values
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    /// Larger of two values
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    /// Whether the value is exactly zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether the value is strictly negative
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    fn map_f64(self, f: impl FnOnce(f64) -> f64) -> Self {
        Self::from_f64(f(self.to_f64()))
    }

    /// Sine of an angle in radians
    #[must_use]
    pub fn sin(self) -> Self {
        self.map_f64(f64::sin)
    }

    /// Cosine of an angle in radians
    #[must_use]
    pub fn cos(self) -> Self {
        self.map_f64(f64::cos)
    }

    /// Tangent of an angle in radians (saturates near the poles)
    #[must_use]
    pub fn tan(self) -> Self {
        self.map_f64(f64::tan)
    }

    /// Arc sine, input clamped to `[-1, 1]`
    #[must_use]
    pub fn asin(self) -> Self {
        self.map_f64(|v| v.clamp(-1.0, 1.0).asin())
    }

    /// Arc cosine, input clamped to `[-1, 1]`
    #[must_use]
    pub fn acos(self) -> Self {
        self.map_f64(|v| v.clamp(-1.0, 1.0).acos())
    }

    /// Arc tangent
    #[must_use]
    pub fn atan(self) -> Self {
        self.map_f64(f64::atan)
    }

    /// Four-quadrant arc tangent of `self / x`
    #[must_use]
    pub fn atan2(self, x: Self) -> Self {
        Self::from_f64(self.to_f64().atan2(x.to_f64()))
    }

    /// Natural logarithm. Non-positive inputs return [`Fp::MIN`].
    #[must_use]
    pub fn ln(self) -> Self {
        if self.0 <= 0 {
            return Self::MIN;
        }
        self.map_f64(f64::ln)
    }

    /// `e` raised to `self`, saturating at [`Fp::MAX`]
    #[must_use]
    pub fn exp(self) -> Self {
        self.map_f64(f64::exp)
    }

    /// `self` raised to `exponent`
    #[must_use]
    pub fn pow(self, exponent: Self) -> Self {
        Self::from_f64(self.to_f64().powf(exponent.to_f64()))
    }

    /// Convert radians to degrees
    #[must_use]
    pub const fn to_degrees(self) -> Self {
        self.mul(Self::RAD_TO_DEG)
    }

    /// Convert degrees to radians
    #[must_use]
    pub const fn to_radians(self) -> Self {
        self.mul(Self::DEG_TO_RAD)
    }

    /// Wrap an angle into `[0, 2π)`
    #[must_use]
    pub const fn normalize_angle(self) -> Self {
        Self(self.0.rem_euclid(Self::TWO_PI.0))
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.to_f64())
    }
}

impl Add for Fp {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fp {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fp {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fp {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fp {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Mul for Fp {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::mul(self, rhs)
    }
}

impl Div for Fp {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::div(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RESOLUTION: f32 = 1.0 / 65536.0;

    #[test]
    fn test_constants_are_exact_encodings() {
        assert_eq!(Fp::ONE.raw(), 0x10000);
        assert_eq!(Fp::HALF.raw(), 0x8000);
        assert_eq!(Fp::PI.raw(), 205_887);
        assert_abs_diff_eq!(Fp::PI.to_f64(), std::f64::consts::PI, epsilon = 1e-5);
        assert_abs_diff_eq!(Fp::TWO_PI.to_f64(), std::f64::consts::TAU, epsilon = 1e-5);
        assert_abs_diff_eq!(Fp::HALF_PI.to_f64(), std::f64::consts::FRAC_PI_2, epsilon = 1e-5);
        assert_abs_diff_eq!(Fp::E.to_f64(), std::f64::consts::E, epsilon = 1e-5);
    }

    #[test]
    fn test_float_round_trip_within_resolution() {
        let mut x = -32767.0_f32;
        while x <= 32767.0 {
            let back = Fp::from_float(x).to_float();
            assert!((back - x).abs() <= RESOLUTION, "{x} came back as {back}");
            x += 12.345;
        }
        for x in [0.0, 0.1, -0.1, 0.333_333, -1.5, 1.0e-5, 255.999] {
            let back = Fp::from_float(x).to_float();
            assert!((back - x).abs() <= RESOLUTION, "{x} came back as {back}");
        }
    }

    #[test]
    fn test_int_round_trip_is_exact() {
        for x in -32768..=32767 {
            assert_eq!(Fp::from_int(x).to_int(), x);
        }
    }

    #[test]
    fn test_to_int_rounds_toward_negative_infinity() {
        assert_eq!(Fp::from_float(1.75).to_int(), 1);
        assert_eq!(Fp::from_float(-0.5).to_int(), -1);
        assert_eq!(Fp::from_float(-1.25).to_int(), -2);
        assert_eq!(Fp::from_raw(-1).to_int(), -1);
    }

    #[test]
    fn test_from_float_truncates_toward_zero() {
        // 1.5 / 65536 is half way between two steps
        assert_eq!(Fp::from_f64(1.5 / 65536.0).raw(), 1);
        assert_eq!(Fp::from_f64(-1.5 / 65536.0).raw(), -1);
        assert_eq!(Fp::from_float(1.0e9), Fp::MAX);
        assert_eq!(Fp::from_float(-1.0e9), Fp::MIN);
    }

    #[test]
    fn test_mul_and_div_identities() {
        let samples = [0, 1, -1, 0x8000, -0x8000, 0x10000, 123_456, -987_654, i32::MAX, i32::MIN + 1];
        for raw in samples {
            let x = Fp::from_raw(raw);
            assert_eq!(Fp::ONE.mul(x), x);
            assert_eq!(x.mul(Fp::ONE), x);
            assert_eq!(x.div(Fp::ONE), x);
        }
    }

    #[test]
    fn test_mul_div_values() {
        let a = Fp::from_float(2.5);
        let b = Fp::from_float(-4.0);
        assert_eq!(a * b, Fp::from_int(-10));
        assert_eq!(Fp::from_int(10) / Fp::from_int(4), Fp::from_float(2.5));
        assert_eq!(Fp::from_int(1) / Fp::from_int(3), Fp::from_raw(21_845));
        // Arithmetic shift floors negative products
        assert_eq!(Fp::from_raw(-1).mul(Fp::HALF), Fp::from_raw(-1));
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_div_by_zero_panics() {
        let _ = Fp::ONE.div(Fp::ZERO);
    }

    #[test]
    fn test_checked_div() {
        assert_eq!(Fp::ONE.checked_div(Fp::ZERO), None);
        assert_eq!(Fp::ONE.checked_div(Fp::TWO), Some(Fp::HALF));
    }

    #[test]
    fn test_div_overflow_wraps() {
        // MIN << 32 is i64::MIN, so the widened quotient overflows
        let q = Fp::MIN.div(Fp::from_raw(-1));
        assert_eq!(q, Fp::ZERO);
        assert_eq!(Fp::MIN.checked_div(Fp::from_raw(-1)), Some(q));
        assert_eq!(Fp::MIN.div(Fp::ONE), Fp::MIN);
    }

    #[test]
    fn test_sqrt_short_circuits() {
        assert_eq!(Fp::ZERO.sqrt(), Fp::ZERO);
        assert_eq!(Fp::ONE.sqrt(), Fp::ONE);
        assert_eq!(Fp::from_int(-4).sqrt(), Fp::ZERO);
    }

    #[test]
    fn test_sqrt_of_squares() {
        for n in 0..=64 {
            let square = Fp::from_float((n * n) as f32);
            let root = square.sqrt().to_float();
            assert_abs_diff_eq!(root, n as f32, epsilon = 0.0001);
        }
        assert_abs_diff_eq!(Fp::from_float(2.0).sqrt().to_float(), std::f32::consts::SQRT_2, epsilon = 0.0001);
        assert_abs_diff_eq!(Fp::from_float(0.25).sqrt().to_float(), 0.5, epsilon = 0.0001);
    }

    #[test]
    fn test_sqrt_stops_after_eight_iterations() {
        // 181^2 is near the top of the range; eight steps from (n + 1) / 2 fall short
        let root = Fp::from_int(181 * 181).sqrt().to_float();
        assert!(root > 181.5 && root < 183.0, "root was {root}");
    }

    #[test]
    fn test_trig_round_trip() {
        assert_abs_diff_eq!(Fp::HALF_PI.sin().to_float(), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::PI.cos().to_float(), -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::from_float(0.5).tan().to_float(), 0.5_f32.tan(), epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::ONE.asin().to_float(), std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::ZERO.acos().to_float(), std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::ONE.atan().to_float(), std::f32::consts::FRAC_PI_4, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::ONE.atan2(-Fp::ONE).to_float(), 3.0 * std::f32::consts::FRAC_PI_4, epsilon = 1e-4);
        // Out-of-domain input is clamped instead of producing NaN
        assert_eq!(Fp::TWO.acos(), Fp::ZERO);
    }

    #[test]
    fn test_log_and_exp() {
        assert_abs_diff_eq!(Fp::E.ln().to_float(), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Fp::ONE.exp().to_float(), std::f32::consts::E, epsilon = 1e-4);
        assert_eq!(Fp::ZERO.ln(), Fp::MIN);
        assert_eq!(Fp::from_int(20).exp(), Fp::MAX);
        assert_abs_diff_eq!(Fp::TWO.pow(Fp::from_int(10)).to_float(), 1024.0, epsilon = 1e-3);
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!((Fp::TWO_PI + Fp::ONE).normalize_angle(), Fp::ONE);
        assert_eq!((-Fp::HALF_PI).normalize_angle(), Fp::TWO_PI - Fp::HALF_PI);
        assert_eq!(Fp::TWO_PI.normalize_angle(), Fp::ZERO);
    }

    #[test]
    fn test_floor_and_frac() {
        let x = Fp::from_float(-1.25);
        assert_eq!(x.floor(), Fp::from_int(-2));
        assert_eq!(x.frac(), Fp::from_float(0.75));
        assert_eq!(x.floor() + x.frac(), x);
    }

    #[test]
    fn test_degree_conversion() {
        assert_abs_diff_eq!(Fp::from_int(180).to_radians().to_float(), std::f32::consts::PI, epsilon = 1e-3);
        assert_abs_diff_eq!(Fp::PI.to_degrees().to_float(), 180.0, epsilon = 1e-2);
    }
}
