//! Software fixed-function context
//!
//! A small GLES 1.x-style state machine that executes primitives on the CPU.
//! It keeps the model-view stack in fixed point like the rest of the scene
//! code, and the projection in float like the hardware it stands in for.
//! Nothing is rasterised; `draw_mesh` transforms vertices into window space
//! and accumulates [`DrawStats`].

use crate::foundation::fixed::{Fp, FpMat4, FpVec3};
use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec3, Vec4};
use crate::render::context::GpuContext;
use crate::render::mesh::Mesh;
use crate::render::primitive::{Color, Orthographic, Perspective};
use crate::render::{RenderError, RenderResult};

/// Default model-view stack depth (the GLES 1.x minimum is 16)
pub const DEFAULT_MAX_MATRIX_DEPTH: usize = 32;

/// Counters accumulated while replaying one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// `draw_mesh` calls
    pub draw_calls: u32,
    /// Triangles submitted
    pub triangles: u32,
    /// Vertices that landed inside the clip volume
    pub vertices_in_view: u32,
    /// Vertices submitted
    pub vertices_total: u32,
    /// `clear` calls
    pub clears: u32,
    /// Colour in effect for the last draw
    pub last_color: Option<Color>,
}

/// CPU implementation of [`GpuContext`]
#[derive(Debug)]
pub struct SoftwareContext {
    model_view: FpMat4,
    stack: Vec<FpMat4>,
    max_depth: usize,
    projection: Mat4,
    viewport: (u32, u32),
    color: Color,
    clear_color: Color,
    stats: DrawStats,
    last_frame: DrawStats,
    frames: u64,
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MATRIX_DEPTH)
    }
}

impl SoftwareContext {
    /// Create a context whose model-view stack holds at most `max_depth` saved matrices
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            model_view: FpMat4::identity(),
            stack: Vec::with_capacity(max_depth),
            max_depth,
            projection: Mat4::identity(),
            viewport: (1, 1),
            color: Color::WHITE,
            clear_color: Color::BLACK,
            stats: DrawStats::default(),
            last_frame: DrawStats::default(),
            frames: 0,
        }
    }

    /// Current model-view matrix
    #[must_use]
    pub const fn model_view(&self) -> &FpMat4 {
        &self.model_view
    }

    /// Current projection matrix
    #[must_use]
    pub const fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Number of saved model-view matrices
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Current viewport size
    #[must_use]
    pub const fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    /// Current colour
    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Colour of the last clear
    #[must_use]
    pub const fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Counters for the frame in progress
    #[must_use]
    pub const fn stats(&self) -> &DrawStats {
        &self.stats
    }

    /// Counters for the last completed frame
    #[must_use]
    pub const fn last_frame_stats(&self) -> &DrawStats {
        &self.last_frame
    }

    /// Frames completed so far
    #[must_use]
    pub const fn frames_completed(&self) -> u64 {
        self.frames
    }

    /// Project a model-space point to window coordinates (origin bottom-left).
    ///
    /// Returns `None` when the point falls outside the clip volume.
    #[must_use]
    pub fn project(&self, point: FpVec3) -> Option<Vec2> {
        let mvp = self.projection * self.model_view.to_float();
        self.clip_to_window(&(mvp * homogeneous(point)))
    }

    fn clip_to_window(&self, clip: &Vec4) -> Option<Vec2> {
        let w = clip.w;
        if w <= 0.0 || clip.x.abs() > w || clip.y.abs() > w || clip.z.abs() > w {
            return None;
        }
        let (width, height) = self.viewport;
        Some(Vec2::new(
            (clip.x / w + 1.0) * 0.5 * width as f32,
            (clip.y / w + 1.0) * 0.5 * height as f32,
        ))
    }
}

fn homogeneous(p: FpVec3) -> Vec4 {
    Vec4::new(p.x.to_float(), p.y.to_float(), p.z.to_float(), 1.0)
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl GpuContext for SoftwareContext {
    fn begin_frame(&mut self, frame: u64) -> RenderResult<()> {
        // A failed replay never reaches end_frame
        if !self.stack.is_empty() {
            log::debug!("frame {frame} starts with {} stale matrix pushes", self.stack.len());
            self.stack.clear();
        }
        self.model_view.set_identity();
        self.stats = DrawStats::default();
        Ok(())
    }

    fn end_frame(&mut self, frame: u64) -> RenderResult<()> {
        if !self.stack.is_empty() {
            log::warn!("frame {frame} ended with {} unbalanced matrix pushes", self.stack.len());
            self.stack.clear();
        }
        self.last_frame = self.stats;
        self.frames += 1;
        Ok(())
    }

    fn viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidState(format!("viewport {width}x{height} is empty")));
        }
        self.viewport = (width, height);
        Ok(())
    }

    fn clear(&mut self, color: Color) -> RenderResult<()> {
        self.clear_color = color;
        self.stats.clears += 1;
        Ok(())
    }

    fn set_color(&mut self, color: Color) -> RenderResult<()> {
        self.color = color;
        Ok(())
    }

    fn load_identity(&mut self) -> RenderResult<()> {
        self.model_view.set_identity();
        Ok(())
    }

    fn push_matrix(&mut self) -> RenderResult<()> {
        if self.stack.len() >= self.max_depth {
            return Err(RenderError::MatrixStackOverflow { depth: self.max_depth });
        }
        self.stack.push(self.model_view);
        Ok(())
    }

    fn pop_matrix(&mut self) -> RenderResult<()> {
        self.model_view = self.stack.pop().ok_or(RenderError::MatrixStackUnderflow)?;
        Ok(())
    }

    fn translate(&mut self, v: FpVec3) -> RenderResult<()> {
        self.model_view.translate(v);
        Ok(())
    }

    fn rotate(&mut self, angle: Fp, axis: FpVec3) -> RenderResult<()> {
        self.model_view.rotate(angle, axis);
        Ok(())
    }

    fn scale(&mut self, v: FpVec3) -> RenderResult<()> {
        self.model_view.scale(v);
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: &Mesh) -> RenderResult<()> {
        let mvp = self.projection * self.model_view.to_float();
        let in_view = mesh
            .vertices()
            .iter()
            .filter(|&&v| self.clip_to_window(&(mvp * homogeneous(v))).is_some())
            .count();

        self.stats.draw_calls += 1;
        self.stats.triangles += saturating_u32(mesh.triangle_count());
        self.stats.vertices_total += saturating_u32(mesh.vertices().len());
        self.stats.vertices_in_view += saturating_u32(in_view);
        self.stats.last_color = Some(self.color);
        Ok(())
    }

    fn set_perspective(&mut self, p: &Perspective) -> RenderResult<()> {
        if p.near <= 0.0 || p.far <= p.near {
            return Err(RenderError::InvalidState(format!(
                "perspective clip planes near={} far={} are invalid",
                p.near, p.far
            )));
        }
        self.projection = Mat4::perspective(p.fov_y, p.aspect, p.near, p.far);
        Ok(())
    }

    fn set_orthographic(&mut self, o: &Orthographic) -> RenderResult<()> {
        self.projection = Mat4::orthographic(o.left, o.right, o.bottom, o.top, o.near, o.far);
        Ok(())
    }

    fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> RenderResult<()> {
        self.model_view.multiply_assign(&FpMat4::from_float(&Mat4::look_at(eye, target, up)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_ortho() -> Orthographic {
        Orthographic {
            left: -2.0,
            right: 2.0,
            bottom: -2.0,
            top: 2.0,
            near: -2.0,
            far: 2.0,
        }
    }

    #[test]
    fn test_matrix_stack_limits() {
        let mut ctx = SoftwareContext::new(2);
        assert!(ctx.push_matrix().is_ok());
        assert!(ctx.push_matrix().is_ok());
        assert!(matches!(ctx.push_matrix(), Err(RenderError::MatrixStackOverflow { depth: 2 })));
        assert!(ctx.pop_matrix().is_ok());
        assert!(ctx.pop_matrix().is_ok());
        assert!(matches!(ctx.pop_matrix(), Err(RenderError::MatrixStackUnderflow)));
    }

    #[test]
    fn test_pop_restores_model_view() {
        let mut ctx = SoftwareContext::default();
        ctx.translate(FpVec3::from_ints(1, 2, 3)).ok();
        let saved = *ctx.model_view();
        ctx.push_matrix().ok();
        ctx.rotate(Fp::HALF_PI, FpVec3::Y).ok();
        ctx.scale(FpVec3::splat(Fp::TWO)).ok();
        assert_ne!(*ctx.model_view(), saved);
        ctx.pop_matrix().ok();
        assert_eq!(*ctx.model_view(), saved);
        assert_eq!(ctx.stack_depth(), 0);
    }

    #[test]
    fn test_draw_counts_visible_vertices() {
        let cube = Mesh::cube(Fp::ONE);
        let mut ctx = SoftwareContext::default();
        ctx.begin_frame(1).ok();
        ctx.set_orthographic(&unit_ortho()).ok();
        ctx.set_color(Color::BLACK).ok();
        ctx.draw_mesh(&cube).ok();

        ctx.translate(FpVec3::from_ints(10, 0, 0)).ok();
        ctx.draw_mesh(&cube).ok();
        ctx.end_frame(1).ok();

        let stats = ctx.last_frame_stats();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.triangles, 24);
        assert_eq!(stats.vertices_total, 16);
        assert_eq!(stats.vertices_in_view, 8);
        assert_eq!(stats.last_color, Some(Color::BLACK));
        assert_eq!(ctx.frames_completed(), 1);

        // Next frame starts from zero
        ctx.begin_frame(2).ok();
        assert_eq!(ctx.stats().draw_calls, 0);
    }

    #[test]
    fn test_failed_frame_does_not_leak_into_next() {
        use crate::render::primitive::{Primitive, PrimitiveChain};

        let mut ctx = SoftwareContext::new(1);
        let mut broken = PrimitiveChain::new();
        broken.set_frame(1);
        broken.extend([
            Primitive::Translate(FpVec3::from_ints(4, 0, 0)),
            Primitive::PushMatrix,
            Primitive::Viewport { width: 0, height: 0 },
        ]);
        assert!(broken.replay(&mut ctx).is_err());
        assert_eq!(ctx.stack_depth(), 1);

        let mut balanced = PrimitiveChain::new();
        balanced.set_frame(2);
        balanced.extend([Primitive::PushMatrix, Primitive::PopMatrix]);
        assert_eq!(balanced.replay(&mut ctx).unwrap(), 2);
        assert_eq!(ctx.stack_depth(), 0);
        assert_eq!(*ctx.model_view(), FpMat4::identity());
        assert_eq!(ctx.frames_completed(), 1);
    }

    #[test]
    fn test_project_to_window() {
        let mut ctx = SoftwareContext::default();
        ctx.viewport(200, 100).ok();
        ctx.set_orthographic(&unit_ortho()).ok();

        let centre = ctx.project(FpVec3::ZERO);
        assert!(centre.is_some());
        if let Some(p) = centre {
            assert_relative_eq!(p, Vec2::new(100.0, 50.0), epsilon = 1e-3);
        }

        let corner = ctx.project(FpVec3::from_ints(1, 1, 0));
        if let Some(p) = corner {
            assert_relative_eq!(p, Vec2::new(150.0, 75.0), epsilon = 1e-3);
        } else {
            panic!("corner should be visible");
        }

        assert!(ctx.project(FpVec3::from_ints(3, 0, 0)).is_none());
    }

    #[test]
    fn test_perspective_look_at_sees_origin() {
        let mut ctx = SoftwareContext::default();
        ctx.viewport(64, 64).ok();
        let perspective = Perspective { fov_y: 1.0, aspect: 1.0, near: 0.1, far: 100.0 };
        assert!(ctx.set_perspective(&perspective).is_ok());
        ctx.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y()).ok();

        let p = ctx.project(FpVec3::ZERO);
        assert!(p.is_some());
        if let Some(p) = p {
            assert_relative_eq!(p, Vec2::new(32.0, 32.0), epsilon = 1e-2);
        }

        // Behind the camera
        assert!(ctx.project(FpVec3::from_ints(0, 0, 10)).is_none());
    }

    #[test]
    fn test_invalid_state_rejected() {
        let mut ctx = SoftwareContext::default();
        assert!(matches!(ctx.viewport(0, 10), Err(RenderError::InvalidState(_))));
        let bad = Perspective { fov_y: 1.0, aspect: 1.0, near: 0.0, far: 1.0 };
        assert!(matches!(ctx.set_perspective(&bad), Err(RenderError::InvalidState(_))));
    }
}
