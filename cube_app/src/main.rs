//! Cube demo application
//!
//! Spins a fixed-point cube under an orbiting camera and replays every frame
//! on the software GPU context. A scripted pointer drag stands in for touch
//! input. Pass a `.toml` or `.ron` config path to override the defaults.

use gles_engine::prelude::*;
use gles_engine::{core::ConfigError, render::DrawStats};
use thiserror::Error;

/// Frames to run when the config sets no limit
const DEFAULT_FRAMES: u64 = 120;

/// Frames during which the scripted drag is active
const DRAG_START: u64 = 20;
const DRAG_END: u64 = 50;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Default)]
struct CubeApp {
    camera: Option<NodeId>,
    cube: Option<NodeId>,
}

impl CubeApp {
    fn drag_step(engine: &mut Engine) {
        let frame = engine.frame() + 1;
        let x = (frame.saturating_sub(DRAG_START) * 4) as f32;
        let event = match frame {
            DRAG_START => InputEvent::PointerDown { id: 0, x, y: 0.0 },
            DRAG_END => InputEvent::PointerUp { id: 0, x, y: 0.0 },
            f if f > DRAG_START && f < DRAG_END => InputEvent::PointerMove { id: 0, x, y: x * 0.5 },
            _ => return,
        };
        if !engine.send_input(event) {
            log::warn!("Input dropped on frame {frame}");
        }
    }
}

impl Application for CubeApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let clear_color = engine.config().render.clear_color();
        let scene = engine.scene_mut();
        let root = scene.root();

        scene.insert(root, "clear", ClearNode::new(clear_color)).map_err(EngineError::from)?;
        let camera = scene
            .insert(root, "camera", CameraNode::new(Fp::from_int(6)))
            .map_err(EngineError::from)?;
        let touch = scene
            .insert(root, "touch", TouchRotateNode::default())
            .map_err(EngineError::from)?;
        let spin = scene
            .insert(touch, "spin", TransformNode::new().with_spin(Fp::HALF_PI))
            .map_err(EngineError::from)?;
        let cube = scene
            .insert(
                spin,
                "cube",
                MeshNode::new(Mesh::cube(Fp::ONE).into_handle()).with_color(Color::from_f32(0.9, 0.6, 0.2, 1.0)),
            )
            .map_err(EngineError::from)?;

        engine.events_mut().register_handler(
            EventType::NodeTouched,
            Box::new(|event: &Event| {
                if let Some((x, y)) = event.get_position() {
                    log::info!(
                        "{} released by pointer {} at ({x:.0}, {y:.0})",
                        event.get_node().unwrap_or("?"),
                        event.get_pointer().unwrap_or_default()
                    );
                }
                true
            }),
        );

        engine.resize(640, 480);
        self.camera = Some(camera);
        self.cube = Some(cube);
        log::info!("Scene ready with {} nodes", engine.scene().node_count());
        Ok(())
    }

    fn on_frame(&mut self, engine: &mut Engine) -> Result<AppControl, AppError> {
        Self::drag_step(engine);

        let camera = self.camera.ok_or_else(|| AppError::Custom("camera missing".into()))?;
        if let Some(node) = engine.scene_mut().get_as_mut::<CameraNode>(camera) {
            node.orbit_by(Fp::ZERO, Fp::from_float(0.01));
        }

        // The cube grows once the drag has been released
        if engine.frame() == DRAG_END {
            let cube = self.cube.ok_or_else(|| AppError::Custom("cube missing".into()))?;
            if let Some(node) = engine.scene_mut().get_as_mut::<MeshNode>(cube) {
                node.set_mesh(Mesh::cube(Fp::from_float(1.5)).into_handle());
            }
        }
        Ok(AppControl::Continue)
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        if let Some(path) = self.cube.and_then(|cube| engine.scene().path_of(cube)) {
            log::info!("Cleaning up, cube was at '{path}'");
        }
    }
}

fn log_draw_stats(stats: &DrawStats) {
    log::info!(
        "Last frame: {} draw calls, {} triangles, {}/{} vertices in view",
        stats.draw_calls,
        stats.triangles,
        stats.vertices_in_view,
        stats.vertices_total
    );
}

fn run() -> Result<(), DemoError> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    if config.max_frames.is_none() {
        config.max_frames = Some(DEFAULT_FRAMES);
    }
    gles_engine::foundation::logging::init_with_filter(&config.log_level);
    log::info!("Starting cube demo");

    let context = SoftwareContext::new(config.render.max_matrix_depth);
    let outcome = Engine::run(config, &mut CubeApp::default(), context)?;

    let stats = outcome.stats;
    log::info!(
        "{} frames ticked: {} rendered, {} skipped, {} failed, {} primitives, {} inputs consumed",
        stats.frames_ticked,
        stats.frames_rendered,
        stats.frames_skipped,
        stats.frames_failed,
        stats.primitives,
        stats.input_consumed
    );
    log_draw_stats(outcome.context.last_frame_stats());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("Cube demo failed: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
