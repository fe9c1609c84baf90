//! Built-in scene nodes

use super::{Colorable, Movable, Node, Rotatable, Scalable, SceneResult, UpdateContext, UpdateFlags};
use crate::events::{Event, EventArg, EventType};
use crate::foundation::fixed::{Fp, FpSpherical, FpVec3};
use crate::foundation::math::Vec3;
use crate::input::InputEvent;
use crate::render::{Color, MeshHandle, Perspective, Primitive, PrimitiveChain, RenderError};

/// Node that only groups its children
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupNode;

impl GroupNode {
    /// Empty group
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Node for GroupNode {}

/// Translate, rotate and scale the subtree, optionally spinning at a constant rate
#[derive(Debug, Clone, Copy)]
pub struct TransformNode {
    translation: FpVec3,
    angle: Fp,
    axis: FpVec3,
    scale: FpVec3,
    spin: Fp,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformNode {
    /// Identity transform
    #[must_use]
    pub const fn new() -> Self {
        Self {
            translation: FpVec3::ZERO,
            angle: Fp::ZERO,
            axis: FpVec3::Y,
            scale: FpVec3::splat(Fp::ONE),
            spin: Fp::ZERO,
        }
    }

    /// Set the translation
    #[must_use]
    pub const fn with_translation(mut self, translation: FpVec3) -> Self {
        self.translation = translation;
        self
    }

    /// Set the rotation
    #[must_use]
    pub const fn with_rotation(mut self, angle: Fp, axis: FpVec3) -> Self {
        self.angle = angle;
        self.axis = axis;
        self
    }

    /// Set the scale
    #[must_use]
    pub const fn with_scale(mut self, scale: FpVec3) -> Self {
        self.scale = scale;
        self
    }

    /// Spin around the rotation axis at `radians_per_second`
    #[must_use]
    pub const fn with_spin(mut self, radians_per_second: Fp) -> Self {
        self.spin = radians_per_second;
        self
    }
}

impl Node for TransformNode {
    fn update(&mut self, ctx: &mut UpdateContext) -> SceneResult<UpdateFlags> {
        if self.spin.is_zero() {
            return Ok(UpdateFlags::empty());
        }
        self.rotate_by(self.spin * ctx.elapsed_seconds());
        Ok(UpdateFlags::REDRAW)
    }

    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        if self.translation != FpVec3::ZERO {
            chain.push(Primitive::Translate(self.translation));
        }
        if !self.angle.is_zero() {
            chain.push(Primitive::Rotate {
                angle: self.angle,
                axis: self.axis,
            });
        }
        if self.scale != FpVec3::splat(Fp::ONE) {
            chain.push(Primitive::Scale(self.scale));
        }
        Ok(())
    }

    fn brackets_children(&self) -> bool {
        true
    }
}

impl Movable for TransformNode {
    fn position(&self) -> FpVec3 {
        self.translation
    }

    fn set_position(&mut self, position: FpVec3) {
        self.translation = position;
    }
}

impl Rotatable for TransformNode {
    fn angle(&self) -> Fp {
        self.angle
    }

    fn axis(&self) -> FpVec3 {
        self.axis
    }

    fn set_rotation(&mut self, angle: Fp, axis: FpVec3) {
        self.angle = angle;
        self.axis = axis;
    }
}

impl Scalable for TransformNode {
    fn scale(&self) -> FpVec3 {
        self.scale
    }

    fn set_scale(&mut self, scale: FpVec3) {
        self.scale = scale;
    }
}

/// Set the current colour. Not bracketed: the colour carries on to later siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorNode {
    color: Color,
}

impl ColorNode {
    /// Node setting `color`
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Node for ColorNode {
    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        chain.push(Primitive::SetColor(self.color));
        Ok(())
    }
}

impl Colorable for ColorNode {
    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

/// Draw a mesh, optionally setting the colour first
#[derive(Debug, Clone, Default)]
pub struct MeshNode {
    mesh: Option<MeshHandle>,
    color: Option<Color>,
}

impl MeshNode {
    /// Node drawing `mesh`
    #[must_use]
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh: Some(mesh),
            color: None,
        }
    }

    /// Node with no mesh bound yet; rendering it is an error
    #[must_use]
    pub const fn empty() -> Self {
        Self { mesh: None, color: None }
    }

    /// Set the colour before drawing
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Replace the mesh
    pub fn set_mesh(&mut self, mesh: MeshHandle) {
        self.mesh = Some(mesh);
    }

    /// Bound mesh
    #[must_use]
    pub const fn mesh(&self) -> Option<&MeshHandle> {
        self.mesh.as_ref()
    }
}

impl Node for MeshNode {
    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        let mesh = self
            .mesh
            .as_ref()
            .ok_or_else(|| RenderError::InvalidState("mesh node rendered with no mesh bound".to_string()))?;
        if let Some(color) = self.color {
            chain.push(Primitive::SetColor(color));
        }
        chain.push(Primitive::DrawMesh(MeshHandle::clone(mesh)));
        Ok(())
    }
}

impl Colorable for MeshNode {
    fn color(&self) -> Color {
        self.color.unwrap_or_default()
    }

    fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }
}

/// Closest the camera may zoom to its target (1/8 unit)
const MIN_ORBIT_RADIUS: Fp = Fp::from_raw(0x2000);

/// Perspective camera orbiting a target point
///
/// The eye sits at `target + orbit` where `orbit` is in spherical coordinates
/// around +Y. The camera resets the model-view matrix, so it belongs at the
/// top of the tree, before anything it should see.
#[derive(Debug, Clone, Copy)]
pub struct CameraNode {
    orbit: FpSpherical,
    target: FpVec3,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl CameraNode {
    /// Camera at `distance` from the origin, tilted 60° off the up axis, 60° field of view
    #[must_use]
    pub fn new(distance: Fp) -> Self {
        Self {
            orbit: FpSpherical::new(distance, Fp::PI / Fp::from_int(3), Fp::ZERO),
            target: FpVec3::ZERO,
            fov_y: std::f32::consts::FRAC_PI_3,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Set the orbit
    #[must_use]
    pub const fn with_orbit(mut self, orbit: FpSpherical) -> Self {
        self.orbit = orbit;
        self
    }

    /// Set the clip planes
    #[must_use]
    pub const fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Current orbit
    #[must_use]
    pub const fn orbit(&self) -> FpSpherical {
        self.orbit
    }

    /// Move around the orbit: `deflection` tilts, `rotation` spins around +Y
    pub fn orbit_by(&mut self, deflection: Fp, rotation: Fp) {
        self.orbit.add_deflection(deflection);
        self.orbit.add_rotation(rotation);
    }

    /// Move toward (negative) or away from (positive) the target, stopping
    /// short of it so the view stays well defined
    pub fn zoom_by(&mut self, delta: Fp) {
        self.orbit.add_radius(delta);
        self.orbit.r = self.orbit.r.max(MIN_ORBIT_RADIUS);
    }

    /// Eye position
    #[must_use]
    pub fn eye(&self) -> FpVec3 {
        self.target + self.orbit.to_cartesian()
    }

    /// Width / height of the surface
    #[must_use]
    pub const fn aspect(&self) -> f32 {
        self.aspect
    }
}

impl Node for CameraNode {
    fn on_surface_changed(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        chain.push(Primitive::Perspective(Perspective {
            fov_y: self.fov_y,
            aspect: self.aspect,
            near: self.near,
            far: self.far,
        }));
        chain.push(Primitive::LoadIdentity);
        chain.push(Primitive::LookAt {
            eye: self.eye().to_float(),
            target: self.target.to_float(),
            up: Vec3::y(),
        });
        Ok(())
    }
}

impl Movable for CameraNode {
    fn position(&self) -> FpVec3 {
        self.target
    }

    fn set_position(&mut self, position: FpVec3) {
        self.target = position;
    }
}

impl Rotatable for CameraNode {
    fn angle(&self) -> Fp {
        self.orbit.phi
    }

    fn axis(&self) -> FpVec3 {
        FpVec3::Y
    }

    fn set_rotation(&mut self, angle: Fp, _axis: FpVec3) {
        self.orbit.phi = angle.normalize_angle();
    }
}

/// Set the viewport to the surface and clear it
#[derive(Debug, Clone, Copy)]
pub struct ClearNode {
    color: Color,
    size: (u32, u32),
}

impl ClearNode {
    /// Clear to `color`
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self { color, size: (0, 0) }
    }

    /// Last surface size seen
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Node for ClearNode {
    fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        let (width, height) = self.size;
        if width > 0 && height > 0 {
            chain.push(Primitive::Viewport { width, height });
        }
        chain.push(Primitive::Clear(self.color));
        Ok(())
    }
}

impl Colorable for ClearNode {
    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

/// Rotate the subtree by dragging a pointer
///
/// Horizontal drags spin around +Y, vertical drags tilt around +X. A completed
/// drag emits [`EventType::NodeTouched`] with the pointer id and release position.
#[derive(Debug, Clone, Copy)]
pub struct TouchRotateNode {
    yaw: Fp,
    pitch: Fp,
    sensitivity: Fp,
    pointer: Option<(u32, f32, f32)>,
    released_at: Option<(u32, f32, f32)>,
    dirty: bool,
}

impl Default for TouchRotateNode {
    fn default() -> Self {
        Self::new(Fp::from_float(0.01))
    }
}

impl TouchRotateNode {
    /// Rotate `sensitivity` radians per pixel dragged
    #[must_use]
    pub const fn new(sensitivity: Fp) -> Self {
        Self {
            yaw: Fp::ZERO,
            pitch: Fp::ZERO,
            sensitivity,
            pointer: None,
            released_at: None,
            dirty: false,
        }
    }

    /// Rotation around +Y
    #[must_use]
    pub const fn yaw(&self) -> Fp {
        self.yaw
    }

    /// Rotation around +X
    #[must_use]
    pub const fn pitch(&self) -> Fp {
        self.pitch
    }

    fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw = (self.yaw + Fp::from_float(dx) * self.sensitivity).normalize_angle();
        self.pitch = (self.pitch + Fp::from_float(dy) * self.sensitivity).normalize_angle();
        self.dirty = true;
    }
}

impl Node for TouchRotateNode {
    fn on_input(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::PointerDown { id, x, y } => {
                self.pointer = Some((id, x, y));
                true
            }
            InputEvent::PointerMove { id, x, y } => match self.pointer {
                Some((active, last_x, last_y)) if active == id => {
                    self.drag(x - last_x, y - last_y);
                    self.pointer = Some((id, x, y));
                    true
                }
                _ => false,
            },
            InputEvent::PointerUp { id, x, y } => match self.pointer {
                Some((active, last_x, last_y)) if active == id => {
                    if x != last_x || y != last_y {
                        self.drag(x - last_x, y - last_y);
                    }
                    self.pointer = None;
                    self.released_at = Some((id, x, y));
                    true
                }
                _ => false,
            },
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => false,
        }
    }

    fn update(&mut self, ctx: &mut UpdateContext) -> SceneResult<UpdateFlags> {
        if let Some((id, x, y)) = self.released_at.take() {
            let event = Event::new(EventType::NodeTouched, ctx.time())
                .with_arg("node", EventArg::Node(ctx.current_node().to_string()))
                .with_arg("pointer", EventArg::Id(id))
                .with_arg("position", EventArg::Position(x, y));
            ctx.emit(event);
        }
        if std::mem::take(&mut self.dirty) {
            Ok(UpdateFlags::REDRAW)
        } else {
            Ok(UpdateFlags::empty())
        }
    }

    fn render_prefix(&self, chain: &mut PrimitiveChain) -> SceneResult<()> {
        if !self.pitch.is_zero() {
            chain.push(Primitive::Rotate {
                angle: self.pitch,
                axis: FpVec3::X,
            });
        }
        if !self.yaw.is_zero() {
            chain.push(Primitive::Rotate {
                angle: self.yaw,
                axis: FpVec3::Y,
            });
        }
        Ok(())
    }

    fn brackets_children(&self) -> bool {
        true
    }
}

impl Rotatable for TouchRotateNode {
    fn angle(&self) -> Fp {
        self.yaw
    }

    fn axis(&self) -> FpVec3 {
        FpVec3::Y
    }

    fn set_rotation(&mut self, angle: Fp, _axis: FpVec3) {
        self.yaw = angle.normalize_angle();
        self.dirty = true;
    }
}
