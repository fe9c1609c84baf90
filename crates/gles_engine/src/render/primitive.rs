//! # Render Primitives
//!
//! A [`Primitive`] is one atomic GPU state change or draw call. The render pass
//! appends primitives to a [`PrimitiveChain`] in depth-first scene order; the
//! render thread then replays the chain against a [`GpuContext`], one context
//! call per primitive, strictly in order.
//!
//! ## Lifecycle
//!
//! 1. The scheduler takes an empty chain (fresh or recycled) and tags it with the frame number
//! 2. Scene nodes append primitives during the render pass
//! 3. The chain crosses to the consumer, which drains it with [`PrimitiveChain::replay`]
//! 4. The drained chain (empty, capacity intact) is handed back for the next frame
//!
//! At most one frame's chain is being built and one replayed at any time.

use crate::foundation::fixed::{Fp, FpVec3};
use crate::foundation::math::Vec3;
use crate::render::context::GpuContext;
use crate::render::mesh::MeshHandle;
use crate::render::RenderResult;
use serde::{Deserialize, Serialize};

/// RGBA colour in fixed point, components nominally in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: Fp,
    /// Green
    pub g: Fp,
    /// Blue
    pub b: Fp,
    /// Alpha
    pub a: Fp,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(Fp::ONE, Fp::ONE, Fp::ONE, Fp::ONE);
    /// Opaque black
    pub const BLACK: Self = Self::new(Fp::ZERO, Fp::ZERO, Fp::ZERO, Fp::ONE);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::new(Fp::ZERO, Fp::ZERO, Fp::ZERO, Fp::ZERO);

    /// Create a colour from fixed-point components
    #[must_use]
    pub const fn new(r: Fp, g: Fp, b: Fp, a: Fp) -> Self {
        Self { r, g, b, a }
    }

    /// Create a colour from float components
    #[must_use]
    pub fn from_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::new(Fp::from_float(r), Fp::from_float(g), Fp::from_float(b), Fp::from_float(a))
    }

    /// Create a colour from an `[r, g, b, a]` array
    #[must_use]
    pub fn from_array(rgba: [f32; 4]) -> Self {
        Self::from_f32(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Components as floats
    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [self.r.to_float(), self.g.to_float(), self.b.to_float(), self.a.to_float()]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clip distance (> 0)
    pub near: f32,
    /// Far clip distance (> near)
    pub far: f32,
}

/// Orthographic projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orthographic {
    /// Left clip plane
    pub left: f32,
    /// Right clip plane
    pub right: f32,
    /// Bottom clip plane
    pub bottom: f32,
    /// Top clip plane
    pub top: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

/// One GPU operation with exactly the parameters it needs
#[derive(Debug, Clone)]
pub enum Primitive {
    /// Set the viewport to the full surface
    Viewport {
        /// Surface width in pixels
        width: u32,
        /// Surface height in pixels
        height: u32,
    },
    /// Clear colour and depth buffers
    Clear(Color),
    /// Set the current vertex colour
    SetColor(Color),
    /// Reset the model-view matrix
    LoadIdentity,
    /// Save the model-view matrix
    PushMatrix,
    /// Restore the last saved model-view matrix
    PopMatrix,
    /// Post-multiply a translation
    Translate(FpVec3),
    /// Post-multiply a rotation of `angle` radians around `axis`
    Rotate {
        /// Angle in radians
        angle: Fp,
        /// Rotation axis
        axis: FpVec3,
    },
    /// Post-multiply a scale
    Scale(FpVec3),
    /// Bind a mesh and draw its triangles
    DrawMesh(MeshHandle),
    /// Replace the projection with a perspective projection
    Perspective(Perspective),
    /// Replace the projection with an orthographic projection
    Orthographic(Orthographic),
    /// Post-multiply a camera look-at transform
    LookAt {
        /// Camera position
        eye: Vec3,
        /// Point looked at
        target: Vec3,
        /// Up direction
        up: Vec3,
    },
}

impl Primitive {
    /// Issue the single context call this primitive stands for
    ///
    /// # Errors
    ///
    /// Propagates the context's error for this call.
    pub fn apply<C: GpuContext + ?Sized>(&self, ctx: &mut C) -> RenderResult<()> {
        match self {
            Self::Viewport { width, height } => ctx.viewport(*width, *height),
            Self::Clear(color) => ctx.clear(*color),
            Self::SetColor(color) => ctx.set_color(*color),
            Self::LoadIdentity => ctx.load_identity(),
            Self::PushMatrix => ctx.push_matrix(),
            Self::PopMatrix => ctx.pop_matrix(),
            Self::Translate(v) => ctx.translate(*v),
            Self::Rotate { angle, axis } => ctx.rotate(*angle, *axis),
            Self::Scale(v) => ctx.scale(*v),
            Self::DrawMesh(mesh) => ctx.draw_mesh(mesh),
            Self::Perspective(p) => ctx.set_perspective(p),
            Self::Orthographic(o) => ctx.set_orthographic(o),
            Self::LookAt { eye, target, up } => ctx.look_at(*eye, *target, *up),
        }
    }

    /// Short name for logging
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Viewport { .. } => "viewport",
            Self::Clear(_) => "clear",
            Self::SetColor(_) => "set_color",
            Self::LoadIdentity => "load_identity",
            Self::PushMatrix => "push_matrix",
            Self::PopMatrix => "pop_matrix",
            Self::Translate(_) => "translate",
            Self::Rotate { .. } => "rotate",
            Self::Scale(_) => "scale",
            Self::DrawMesh(_) => "draw_mesh",
            Self::Perspective(_) => "perspective",
            Self::Orthographic(_) => "orthographic",
            Self::LookAt { .. } => "look_at",
        }
    }
}

/// Ordered list of primitives for one frame
#[derive(Debug, Default)]
pub struct PrimitiveChain {
    frame: u64,
    primitives: Vec<Primitive>,
}

impl PrimitiveChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chain with room for `capacity` primitives
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frame: 0,
            primitives: Vec::with_capacity(capacity),
        }
    }

    /// Frame number this chain was built for
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Tag the chain with a frame number
    pub fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// Append a primitive
    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    /// Number of primitives
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Iterate without consuming
    pub fn iter(&self) -> std::slice::Iter<'_, Primitive> {
        self.primitives.iter()
    }

    /// Drop all primitives, keeping the allocation for reuse
    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Replay every primitive against `ctx` in order, draining the chain.
    ///
    /// The context sees `begin_frame`, one call per primitive, then `end_frame`.
    /// The first failing call aborts the frame: the remaining primitives are
    /// discarded and `end_frame` is not issued. Either way the chain is empty
    /// afterwards, so it can only be consumed once.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the context.
    pub fn replay<C: GpuContext + ?Sized>(&mut self, ctx: &mut C) -> RenderResult<usize> {
        let frame = self.frame;
        ctx.begin_frame(frame)?;

        let mut issued = 0;
        for primitive in self.primitives.drain(..) {
            log::trace!("frame {frame}: {}", primitive.name());
            primitive.apply(ctx)?;
            issued += 1;
        }

        ctx.end_frame(frame)?;
        Ok(issued)
    }
}

impl<'a> IntoIterator for &'a PrimitiveChain {
    type Item = &'a Primitive;
    type IntoIter = std::slice::Iter<'a, Primitive>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Primitive> for PrimitiveChain {
    fn extend<T: IntoIterator<Item = Primitive>>(&mut self, iter: T) {
        self.primitives.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{GpuCall, RecordingContext};
    use crate::render::mesh::Mesh;
    use crate::render::RenderError;

    #[test]
    fn test_replay_issues_each_primitive_once_in_order() {
        let mesh = Mesh::quad(Fp::ONE).into_handle();
        let mut chain = PrimitiveChain::new();
        chain.set_frame(7);
        chain.push(Primitive::SetColor(Color::WHITE));
        chain.push(Primitive::DrawMesh(mesh));

        let mut ctx = RecordingContext::new();
        assert_eq!(chain.replay(&mut ctx).ok(), Some(2));
        assert_eq!(
            ctx.calls(),
            &[
                GpuCall::SetColor(Color::WHITE),
                GpuCall::DrawMesh { mesh: "quad".to_string(), triangles: 2 },
            ]
        );
        assert_eq!(ctx.completed_frames(), &[7]);

        // Drained: a second replay issues nothing
        assert!(chain.is_empty());
        assert_eq!(chain.replay(&mut ctx).ok(), Some(0));
        assert_eq!(ctx.calls().len(), 2);
    }

    #[test]
    fn test_failed_call_aborts_rest_of_frame() {
        let mut chain = PrimitiveChain::new();
        chain.push(Primitive::PushMatrix);
        chain.push(Primitive::DrawMesh(Mesh::quad(Fp::ONE).into_handle()));
        chain.push(Primitive::PopMatrix);

        let mut ctx = RecordingContext::failing_on_draw();
        let result = chain.replay(&mut ctx);
        assert!(matches!(result, Err(RenderError::Backend(_))));
        assert_eq!(ctx.calls(), &[GpuCall::PushMatrix]);
        assert!(ctx.completed_frames().is_empty());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_color_conversions() {
        let c = Color::from_array([0.5, 0.25, 1.0, 0.0]);
        assert_eq!(c.to_array(), [0.5, 0.25, 1.0, 0.0]);
        assert_eq!(Color::default(), Color::WHITE);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut chain = PrimitiveChain::with_capacity(16);
        chain.extend([Primitive::LoadIdentity, Primitive::PushMatrix]);
        assert_eq!(chain.iter().map(Primitive::name).collect::<Vec<_>>(), ["load_identity", "push_matrix"]);
        chain.clear();
        assert!(chain.is_empty());
        assert!(chain.primitives.capacity() >= 16);
    }
}
