//! Fixed-point quaternions and 4x4 matrices
//!
//! `FpMat4` stores its elements row-major and follows the column-vector
//! convention (`M * v`), so the translation lives in elements 3, 7 and 11.
//! The mutating helpers (`translate`, `rotate`, `scale`) post-multiply the way
//! the fixed-function `glTranslate`/`glRotate`/`glScale` calls do.
//!
//! Operations that read the matrix while producing a new one (multiply,
//! transpose) work from a scratch copy, so `m.multiply_assign(&m.clone())` and
//! friends never observe half-written data.

use super::{Fp, FpVec3, FpVec4};
use crate::foundation::math::Mat4;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Rotation quaternion `(i, j, k, w)` in fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FpQuat {
    /// X (i) component of the vector part
    pub i: Fp,
    /// Y (j) component of the vector part
    pub j: Fp,
    /// Z (k) component of the vector part
    pub k: Fp,
    /// Scalar part
    pub w: Fp,
}

impl Default for FpQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FpQuat {
    /// No rotation
    pub const IDENTITY: Self = Self::new(Fp::ZERO, Fp::ZERO, Fp::ZERO, Fp::ONE);

    /// Create a quaternion from raw components
    #[must_use]
    pub const fn new(i: Fp, j: Fp, k: Fp, w: Fp) -> Self {
        Self { i, j, k, w }
    }

    /// Rotation of `angle` radians around `axis` (normalised here)
    #[must_use]
    pub fn from_axis_angle(axis: FpVec3, angle: Fp) -> Self {
        let half = angle.mul(Fp::HALF);
        let s = half.sin();
        let axis = axis.normalize();
        Self::new(axis.x.mul(s), axis.y.mul(s), axis.z.mul(s), half.cos())
    }

    /// Hamilton product `self * other` (apply `other` first)
    #[must_use]
    pub fn multiply(self, other: Self) -> Self {
        let (a, b) = (self, other);
        Self {
            i: a.w.mul(b.i) + a.i.mul(b.w) + a.j.mul(b.k) - a.k.mul(b.j),
            j: a.w.mul(b.j) - a.i.mul(b.k) + a.j.mul(b.w) + a.k.mul(b.i),
            k: a.w.mul(b.k) + a.i.mul(b.j) - a.j.mul(b.i) + a.k.mul(b.w),
            w: a.w.mul(b.w) - a.i.mul(b.i) - a.j.mul(b.j) - a.k.mul(b.k),
        }
    }

    /// Conjugate (inverse for unit quaternions)
    #[must_use]
    pub fn conjugate(self) -> Self {
        Self::new(-self.i, -self.j, -self.k, self.w)
    }

    /// Rotation matrix for this quaternion
    #[must_use]
    pub fn to_matrix(self) -> FpMat4 {
        FpMat4::from_quaternion(self)
    }
}

impl Mul for FpQuat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(rhs)
    }
}

/// 4x4 fixed-point transform matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FpMat4 {
    m: [Fp; 16],
}

impl Default for FpMat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl FpMat4 {
    /// Create a matrix from row-major elements
    #[must_use]
    pub const fn from_rows(m: [Fp; 16]) -> Self {
        Self { m }
    }

    /// Identity matrix
    #[must_use]
    pub const fn identity() -> Self {
        let mut m = [Fp::ZERO; 16];
        m[0] = Fp::ONE;
        m[5] = Fp::ONE;
        m[10] = Fp::ONE;
        m[15] = Fp::ONE;
        Self { m }
    }

    /// All-zero matrix
    #[must_use]
    pub const fn zero() -> Self {
        Self { m: [Fp::ZERO; 16] }
    }

    /// Translation by `v`
    #[must_use]
    pub const fn from_translation(v: FpVec3) -> Self {
        let mut out = Self::identity();
        out.m[3] = v.x;
        out.m[7] = v.y;
        out.m[11] = v.z;
        out
    }

    /// Non-uniform scale
    #[must_use]
    pub const fn from_scale(v: FpVec3) -> Self {
        let mut out = Self::identity();
        out.m[0] = v.x;
        out.m[5] = v.y;
        out.m[10] = v.z;
        out
    }

    /// Uniform scale
    #[must_use]
    pub const fn from_uniform_scale(s: Fp) -> Self {
        Self::from_scale(FpVec3::new(s, s, s))
    }

    /// Rotation of `angle` radians around `axis`, built through a quaternion
    #[must_use]
    pub fn from_axis_angle(axis: FpVec3, angle: Fp) -> Self {
        Self::from_quaternion(FpQuat::from_axis_angle(axis, angle))
    }

    /// Rotation matrix from a quaternion (right-handed).
    ///
    /// ```text
    /// | 1-2(jj+kk)   2(ij-kw)    2(ik+jw)   0 |
    /// | 2(ij+kw)    1-2(ii+kk)   2(jk-iw)   0 |
    /// | 2(ik-jw)     2(jk+iw)   1-2(ii+jj)  0 |
    /// | 0            0           0          1 |
    /// ```
    #[must_use]
    #[rustfmt::skip]
    pub fn from_quaternion(q: FpQuat) -> Self {
        let FpQuat { i, j, k, w } = q;
        let (ii, jj, kk) = (i.mul(i), j.mul(j), k.mul(k));
        let (ij, ik, jk) = (i.mul(j), i.mul(k), j.mul(k));
        let (iw, jw, kw) = (i.mul(w), j.mul(w), k.mul(w));
        let two = |x: Fp| x + x;

        Self::from_rows([
            Fp::ONE - two(jj + kk), two(ij - kw), two(ik + jw), Fp::ZERO,
            two(ij + kw), Fp::ONE - two(ii + kk), two(jk - iw), Fp::ZERO,
            two(ik - jw), two(jk + iw), Fp::ONE - two(ii + jj), Fp::ZERO,
            Fp::ZERO, Fp::ZERO, Fp::ZERO, Fp::ONE,
        ])
    }

    /// Element at `row`, `col`
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> Fp {
        self.m[row * 4 + col]
    }

    /// Set the element at `row`, `col`
    pub fn set(&mut self, row: usize, col: usize, value: Fp) {
        self.m[row * 4 + col] = value;
    }

    /// Row-major elements
    #[must_use]
    pub const fn as_rows(&self) -> &[Fp; 16] {
        &self.m
    }

    /// Reset every element to zero
    pub fn clear(&mut self) {
        self.m = [Fp::ZERO; 16];
    }

    /// Reset to the identity
    pub fn set_identity(&mut self) {
        *self = Self::identity();
    }

    /// Transpose in place
    pub fn transpose(&mut self) {
        let src = self.m;
        for row in 0..4 {
            for col in 0..4 {
                self.m[row * 4 + col] = src[col * 4 + row];
            }
        }
    }

    /// Transposed copy
    #[must_use]
    pub fn transposed(&self) -> Self {
        let mut out = *self;
        out.transpose();
        out
    }

    /// Matrix product `self * other`
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for row in 0..4 {
            for col in 0..4 {
                let mut sum = Fp::ZERO;
                for k in 0..4 {
                    sum += self.get(row, k).mul(other.get(k, col));
                }
                out.m[row * 4 + col] = sum;
            }
        }
        out
    }

    /// Replace `self` with `self * other`
    pub fn multiply_assign(&mut self, other: &Self) {
        *self = self.multiply(other);
    }

    /// Matrix-vector product `self * v`
    #[must_use]
    pub fn multiply_vec4(&self, v: FpVec4) -> FpVec4 {
        let row = |r: usize| {
            self.get(r, 0).mul(v.x) + self.get(r, 1).mul(v.y) + self.get(r, 2).mul(v.z) + self.get(r, 3).mul(v.w)
        };
        FpVec4::new(row(0), row(1), row(2), row(3))
    }

    /// Transform a point (`w = 1`)
    #[must_use]
    pub fn transform_point(&self, p: FpVec3) -> FpVec3 {
        self.multiply_vec4(p.extend(Fp::ONE)).xyz()
    }

    /// Transform a direction (`w = 0`, translation ignored)
    #[must_use]
    pub fn transform_vector(&self, v: FpVec3) -> FpVec3 {
        self.multiply_vec4(v.extend(Fp::ZERO)).xyz()
    }

    /// Post-multiply by a translation
    pub fn translate(&mut self, v: FpVec3) {
        self.multiply_assign(&Self::from_translation(v));
    }

    /// Post-multiply by a non-uniform scale
    pub fn scale(&mut self, v: FpVec3) {
        self.multiply_assign(&Self::from_scale(v));
    }

    /// Post-multiply by a uniform scale
    pub fn scale_uniform(&mut self, s: Fp) {
        self.multiply_assign(&Self::from_uniform_scale(s));
    }

    /// Post-multiply by a rotation of `angle` radians around `axis`
    pub fn rotate(&mut self, angle: Fp, axis: FpVec3) {
        self.multiply_assign(&Self::from_axis_angle(axis, angle));
    }

    /// Post-multiply by a quaternion rotation
    pub fn rotate_quaternion(&mut self, q: FpQuat) {
        self.multiply_assign(&Self::from_quaternion(q));
    }

    /// Convert to a floating-point matrix
    #[must_use]
    pub fn to_float(&self) -> Mat4 {
        Mat4::from_fn(|row, col| self.get(row, col).to_float())
    }

    /// Convert from a floating-point matrix
    #[must_use]
    pub fn from_float(m: &Mat4) -> Self {
        let mut out = Self::zero();
        for row in 0..4 {
            for col in 0..4 {
                out.set(row, col, Fp::from_float(m[(row, col)]));
            }
        }
        out
    }
}

impl Mul for FpMat4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}
