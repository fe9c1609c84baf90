//! Floating-point math types and helpers
//!
//! The float side of the engine uses nalgebra directly. Projection and camera
//! matrices follow the OpenGL (ES 1.x) conventions: right-handed eye space
//! looking down -Z and clip-space depth in `[-1, 1]`.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Vector helpers shared by the 2D, 3D and 4D float types
pub trait VecExt: Sized {
    /// Unit vector in the same direction, or the vector unchanged when its length is zero
    #[must_use]
    fn normalize_or_unchanged(&self) -> Self;
}

macro_rules! impl_vec_ext {
    ($($ty:ty),+) => {
        $(
            impl VecExt for $ty {
                fn normalize_or_unchanged(&self) -> Self {
                    let length = self.norm();
                    if length == 0.0 {
                        *self
                    } else {
                        self / length
                    }
                }
            }
        )+
    };
}

impl_vec_ext!(Vec2, Vec3, Vec4);

/// Extension trait for Mat4 with fixed-function style constructors
pub trait Mat4Ext {
    /// Perspective projection (`gluPerspective`), `fov_y` in radians
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection (`glOrtho`)
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Look-at view matrix (`gluLookAt`)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = 2.0 * far * near / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    #[rustfmt::skip]
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new(
            2.0 / (right - left), 0.0, 0.0, -(right + left) / (right - left),
            0.0, 2.0 / (top - bottom), 0.0, -(top + bottom) / (top - bottom),
            0.0, 0.0, -2.0 / (far - near), -(far + near) / (far - near),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize_or_unchanged();
        let right = forward.cross(&up).normalize_or_unchanged();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_normalize_zero_is_unchanged() {
        assert_eq!(Vec3::zeros().normalize_or_unchanged(), Vec3::zeros());
        assert_eq!(Vec2::zeros().normalize_or_unchanged(), Vec2::zeros());
        assert_relative_eq!(Vec3::new(0.0, 3.0, 4.0).normalize_or_unchanged(), Vec3::new(0.0, 0.6, 0.8), epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_matches_nalgebra() {
        let ours = Mat4::perspective(1.0, 1.5, 0.1, 100.0);
        let reference = Mat4::new_perspective(1.5, 1.0, 0.1, 100.0);
        assert_relative_eq!(ours, reference, epsilon = EPSILON);
    }

    #[test]
    fn test_orthographic_matches_nalgebra() {
        let ours = Mat4::orthographic(-2.0, 2.0, -1.0, 1.0, 0.5, 10.0);
        let reference = Mat4::new_orthographic(-2.0, 2.0, -1.0, 1.0, 0.5, 10.0);
        assert_relative_eq!(ours, reference, epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_maps_target_onto_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let target = view.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(target.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = EPSILON);
    }
}
