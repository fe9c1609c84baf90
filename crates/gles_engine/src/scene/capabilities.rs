//! Narrow capability contracts for scene nodes
//!
//! Nodes opt into the behaviours they support instead of inheriting them.
//! [`TransformNode`](super::TransformNode) spins itself through
//! [`Rotatable::rotate_by`], and applications adjust nodes fetched with
//! [`SceneTree::get_as_mut`](super::SceneTree::get_as_mut) through the same
//! traits. [`TouchRotateNode`](super::TouchRotateNode) exposes its drag
//! rotation as [`Rotatable`] too.

use crate::foundation::fixed::{Fp, FpVec3};
use crate::render::Color;

/// Something with a position
pub trait Movable {
    /// Current position
    fn position(&self) -> FpVec3;

    /// Set the position
    fn set_position(&mut self, position: FpVec3);

    /// Offset the position
    fn move_by(&mut self, delta: FpVec3) {
        let position = self.position();
        self.set_position(position + delta);
    }
}

/// Something with an orientation, expressed as an angle around an axis
pub trait Rotatable {
    /// Current angle in radians
    fn angle(&self) -> Fp;

    /// Current rotation axis
    fn axis(&self) -> FpVec3;

    /// Set angle and axis
    fn set_rotation(&mut self, angle: Fp, axis: FpVec3);

    /// Add to the angle around the current axis, wrapping into `[0, 2π)`
    fn rotate_by(&mut self, delta: Fp) {
        let (angle, axis) = (self.angle(), self.axis());
        self.set_rotation((angle + delta).normalize_angle(), axis);
    }
}

/// Something with a per-axis scale
pub trait Scalable {
    /// Current scale
    fn scale(&self) -> FpVec3;

    /// Set the scale
    fn set_scale(&mut self, scale: FpVec3);

    /// Multiply the scale uniformly
    fn scale_by(&mut self, factor: Fp) {
        let scale = self.scale();
        self.set_scale(scale * factor);
    }
}

/// Something with a colour
pub trait Colorable {
    /// Current colour
    fn color(&self) -> Color;

    /// Set the colour
    fn set_color(&mut self, color: Color);
}
