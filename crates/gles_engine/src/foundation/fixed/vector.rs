//! Fixed-point 2D, 3D and 4D vectors
//!
//! All vectors are `Copy` values, so every operation reads its inputs before it
//! writes its result and `a = a.add(b)` style reuse of the same storage is always
//! safe. Zero-length normalisation leaves the vector unchanged.

use super::Fp;
use crate::foundation::math::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

macro_rules! impl_vector_common {
    ($name:ident, $float:ident, $($field:ident),+) => {
        impl $name {
            /// All components zero
            pub const ZERO: Self = Self { $($field: Fp::ZERO),+ };

            /// Vector with every component set to `value`
            #[must_use]
            pub const fn splat(value: Fp) -> Self {
                Self { $($field: value),+ }
            }

            /// Component-wise sum
            #[allow(clippy::should_implement_trait)]
            #[must_use]
            pub fn add(self, other: Self) -> Self {
                Self { $($field: self.$field + other.$field),+ }
            }

            /// Component-wise difference `self - other`
            #[must_use]
            pub fn delta(self, other: Self) -> Self {
                Self { $($field: self.$field - other.$field),+ }
            }

            /// Multiply every component by `factor`
            #[must_use]
            pub fn scale(self, factor: Fp) -> Self {
                Self { $($field: self.$field.mul(factor)),+ }
            }

            /// Dot product, one fixed-point multiply per component
            #[must_use]
            pub fn dot(self, other: Self) -> Fp {
                let mut sum = Fp::ZERO;
                $(sum += self.$field.mul(other.$field);)+
                sum
            }

            /// Euclidean length using [`Fp::sqrt`]
            #[must_use]
            pub fn length(self) -> Fp {
                self.dot(self).sqrt()
            }

            /// Unit vector in the same direction, or `self` when the length is zero
            #[must_use]
            pub fn normalize(self) -> Self {
                let length = self.length();
                if length.is_zero() {
                    return self;
                }
                Self { $($field: self.$field.div(length)),+ }
            }

            /// Component-wise minimum
            #[must_use]
            pub fn min(self, other: Self) -> Self {
                Self { $($field: self.$field.min(other.$field)),+ }
            }

            /// Component-wise maximum
            #[must_use]
            pub fn max(self, other: Self) -> Self {
                Self { $($field: self.$field.max(other.$field)),+ }
            }

            /// Convert to the floating-point vector type
            #[must_use]
            pub fn to_float(self) -> $float {
                $float::new($(self.$field.to_float()),+)
            }

            /// Convert from the floating-point vector type
            #[must_use]
            pub fn from_float(v: &$float) -> Self {
                Self { $($field: Fp::from_float(v.$field)),+ }
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self::add(self, rhs)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                *self = Self::add(*self, rhs);
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                self.delta(rhs)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                *self = self.delta(rhs);
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self { $($field: -self.$field),+ }
            }
        }

        impl Mul<Fp> for $name {
            type Output = Self;

            fn mul(self, rhs: Fp) -> Self {
                self.scale(rhs)
            }
        }
    };
}

/// 2D fixed-point vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpVec2 {
    /// X component
    pub x: Fp,
    /// Y component
    pub y: Fp,
}

/// 3D fixed-point vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpVec3 {
    /// X component
    pub x: Fp,
    /// Y component
    pub y: Fp,
    /// Z component
    pub z: Fp,
}

/// 4D fixed-point vector (homogeneous point or quaternion storage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpVec4 {
    /// X component
    pub x: Fp,
    /// Y component
    pub y: Fp,
    /// Z component
    pub z: Fp,
    /// W component
    pub w: Fp,
}

impl_vector_common!(FpVec2, Vec2, x, y);
impl_vector_common!(FpVec3, Vec3, x, y, z);
impl_vector_common!(FpVec4, Vec4, x, y, z, w);

impl FpVec2 {
    /// Create a vector from components
    #[must_use]
    pub const fn new(x: Fp, y: Fp) -> Self {
        Self { x, y }
    }

    /// Create a vector from float components
    #[must_use]
    pub fn from_f32(x: f32, y: f32) -> Self {
        Self::new(Fp::from_float(x), Fp::from_float(y))
    }

    /// Z component of the 3D cross product of two planar vectors
    #[must_use]
    pub fn perp_dot(self, other: Self) -> Fp {
        self.x.mul(other.y) - self.y.mul(other.x)
    }
}

impl FpVec3 {
    /// Unit X axis
    pub const X: Self = Self::new(Fp::ONE, Fp::ZERO, Fp::ZERO);
    /// Unit Y axis (up)
    pub const Y: Self = Self::new(Fp::ZERO, Fp::ONE, Fp::ZERO);
    /// Unit Z axis
    pub const Z: Self = Self::new(Fp::ZERO, Fp::ZERO, Fp::ONE);

    /// Create a vector from components
    #[must_use]
    pub const fn new(x: Fp, y: Fp, z: Fp) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from float components
    #[must_use]
    pub fn from_f32(x: f32, y: f32, z: f32) -> Self {
        Self::new(Fp::from_float(x), Fp::from_float(y), Fp::from_float(z))
    }

    /// Create a vector from whole-number components
    #[must_use]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fp::from_int(x), Fp::from_int(y), Fp::from_int(z))
    }

    /// Right-handed cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y.mul(other.z) - self.z.mul(other.y),
            y: self.z.mul(other.x) - self.x.mul(other.z),
            z: self.x.mul(other.y) - self.y.mul(other.x),
        }
    }

    /// Extend to a 4D vector
    #[must_use]
    pub const fn extend(self, w: Fp) -> FpVec4 {
        FpVec4::new(self.x, self.y, self.z, w)
    }
}

impl FpVec4 {
    /// Create a vector from components
    #[must_use]
    pub const fn new(x: Fp, y: Fp, z: Fp, w: Fp) -> Self {
        Self { x, y, z, w }
    }

    /// Create a vector from float components
    #[must_use]
    pub fn from_f32(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self::new(Fp::from_float(x), Fp::from_float(y), Fp::from_float(z), Fp::from_float(w))
    }

    /// The first three components
    #[must_use]
    pub const fn xyz(self) -> FpVec3 {
        FpVec3::new(self.x, self.y, self.z)
    }

    /// Cross product of the XYZ parts; W is set to zero
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        self.xyz().cross(other.xyz()).extend(Fp::ZERO)
    }
}
