//! GPU context abstraction
//!
//! [`GpuContext`] is the seam between the engine and a fixed-function graphics
//! API. A context is stateful and single-threaded: exactly one consumer drives
//! it, and calls arrive in primitive-chain order.

use crate::foundation::fixed::{Fp, FpVec3};
use crate::foundation::math::Vec3;
use crate::render::mesh::Mesh;
use crate::render::primitive::{Color, Orthographic, Perspective};
use crate::render::{RenderError, RenderResult};

/// Fixed-function drawing interface consumed by [`crate::render::PrimitiveChain::replay`]
pub trait GpuContext {
    /// Called before the first primitive of a frame
    fn begin_frame(&mut self, _frame: u64) -> RenderResult<()> {
        Ok(())
    }

    /// Called after the last primitive of a successfully replayed frame
    fn end_frame(&mut self, _frame: u64) -> RenderResult<()> {
        Ok(())
    }

    /// Set the viewport
    fn viewport(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Clear the colour and depth buffers
    fn clear(&mut self, color: Color) -> RenderResult<()>;

    /// Set the current colour
    fn set_color(&mut self, color: Color) -> RenderResult<()>;

    /// Reset the model-view matrix to identity
    fn load_identity(&mut self) -> RenderResult<()>;

    /// Push the model-view matrix
    fn push_matrix(&mut self) -> RenderResult<()>;

    /// Pop the model-view matrix
    fn pop_matrix(&mut self) -> RenderResult<()>;

    /// Post-multiply a translation
    fn translate(&mut self, v: FpVec3) -> RenderResult<()>;

    /// Post-multiply a rotation (radians)
    fn rotate(&mut self, angle: Fp, axis: FpVec3) -> RenderResult<()>;

    /// Post-multiply a scale
    fn scale(&mut self, v: FpVec3) -> RenderResult<()>;

    /// Bind and draw an indexed mesh
    fn draw_mesh(&mut self, mesh: &Mesh) -> RenderResult<()>;

    /// Replace the projection matrix with a perspective projection
    fn set_perspective(&mut self, perspective: &Perspective) -> RenderResult<()>;

    /// Replace the projection matrix with an orthographic projection
    fn set_orthographic(&mut self, ortho: &Orthographic) -> RenderResult<()>;

    /// Post-multiply a look-at camera transform
    fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> RenderResult<()>;
}

/// One recorded context call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    /// `viewport`
    Viewport(u32, u32),
    /// `clear`
    Clear(Color),
    /// `set_color`
    SetColor(Color),
    /// `load_identity`
    LoadIdentity,
    /// `push_matrix`
    PushMatrix,
    /// `pop_matrix`
    PopMatrix,
    /// `translate`
    Translate(FpVec3),
    /// `rotate`
    Rotate(Fp, FpVec3),
    /// `scale`
    Scale(FpVec3),
    /// `draw_mesh`, identified by name and triangle count
    DrawMesh {
        /// Mesh name
        mesh: String,
        /// Triangles drawn
        triangles: usize,
    },
    /// `set_perspective`
    Perspective(Perspective),
    /// `set_orthographic`
    Orthographic(Orthographic),
    /// `look_at`
    LookAt(Vec3, Vec3, Vec3),
}

/// Context that records calls instead of drawing
///
/// Used as a test double and for headless runs. Optionally fails every
/// `draw_mesh` call to exercise frame-abort paths.
#[derive(Debug, Default)]
pub struct RecordingContext {
    calls: Vec<GpuCall>,
    completed_frames: Vec<u64>,
    fail_draws: bool,
}

impl RecordingContext {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder whose `draw_mesh` always fails
    #[must_use]
    pub fn failing_on_draw() -> Self {
        Self {
            fail_draws: true,
            ..Self::default()
        }
    }

    /// Calls recorded so far
    #[must_use]
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Frames that reached `end_frame`
    #[must_use]
    pub fn completed_frames(&self) -> &[u64] {
        &self.completed_frames
    }

    /// Forget all recorded calls and frames
    pub fn reset(&mut self) {
        self.calls.clear();
        self.completed_frames.clear();
    }

    fn record(&mut self, call: GpuCall) -> RenderResult<()> {
        self.calls.push(call);
        Ok(())
    }
}

impl GpuContext for RecordingContext {
    fn end_frame(&mut self, frame: u64) -> RenderResult<()> {
        self.completed_frames.push(frame);
        Ok(())
    }

    fn viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.record(GpuCall::Viewport(width, height))
    }

    fn clear(&mut self, color: Color) -> RenderResult<()> {
        self.record(GpuCall::Clear(color))
    }

    fn set_color(&mut self, color: Color) -> RenderResult<()> {
        self.record(GpuCall::SetColor(color))
    }

    fn load_identity(&mut self) -> RenderResult<()> {
        self.record(GpuCall::LoadIdentity)
    }

    fn push_matrix(&mut self) -> RenderResult<()> {
        self.record(GpuCall::PushMatrix)
    }

    fn pop_matrix(&mut self) -> RenderResult<()> {
        self.record(GpuCall::PopMatrix)
    }

    fn translate(&mut self, v: FpVec3) -> RenderResult<()> {
        self.record(GpuCall::Translate(v))
    }

    fn rotate(&mut self, angle: Fp, axis: FpVec3) -> RenderResult<()> {
        self.record(GpuCall::Rotate(angle, axis))
    }

    fn scale(&mut self, v: FpVec3) -> RenderResult<()> {
        self.record(GpuCall::Scale(v))
    }

    fn draw_mesh(&mut self, mesh: &Mesh) -> RenderResult<()> {
        if self.fail_draws {
            return Err(RenderError::Backend(format!("draw of '{}' rejected", mesh.name())));
        }
        self.record(GpuCall::DrawMesh {
            mesh: mesh.name().to_string(),
            triangles: mesh.triangle_count(),
        })
    }

    fn set_perspective(&mut self, perspective: &Perspective) -> RenderResult<()> {
        self.record(GpuCall::Perspective(*perspective))
    }

    fn set_orthographic(&mut self, ortho: &Orthographic) -> RenderResult<()> {
        self.record(GpuCall::Orthographic(*ortho))
    }

    fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> RenderResult<()> {
        self.record(GpuCall::LookAt(eye, target, up))
    }
}
