//! # GLES Engine
//!
//! A small scene-graph engine with a deferred fixed-function render pipeline.
//!
//! ## Features
//!
//! - **Fixed-point math**: Q16.16 scalars, vectors, matrices and spherical coordinates
//! - **Scene tree**: arena-backed nodes with update and render passes
//! - **Deferred rendering**: each frame is recorded as a primitive chain and
//!   replayed on a dedicated render thread
//! - **Input and events**: bounded input queue, per-type event handlers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gles_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let scene = engine.scene_mut();
//!         let root = scene.root();
//!         scene
//!             .insert(root, "cube", MeshNode::new(Mesh::cube(Fp::ONE).into_handle()))
//!             .map_err(EngineError::from)?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_max_frames(60);
//!     let outcome = Engine::run(config, &mut MyApp, SoftwareContext::default())?;
//!     println!("{} frames rendered", outcome.stats.frames_rendered);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;

pub mod events;
pub mod foundation;
pub mod frame;
pub mod input;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppControl, AppError, Application};
pub use engine::{Engine, EngineError, RunOutcome};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, EngineConfig, InputConfig, RenderConfig},
        events::{Event, EventArg, EventSystem, EventType},
        foundation::{
            fixed::{Fp, FpMat4, FpSpherical, FpVec2, FpVec3, FpVec4},
            math::{Mat4, Vec2, Vec3, Vec4},
            time::{Clock, FixedStepClock, Stopwatch, SystemClock},
        },
        frame::{FrameOutput, FrameScheduler, FrameStats, RenderThread, ReplayStats},
        input::{InputEvent, InputQueue, KeyCode, OverflowPolicy},
        render::{Color, GpuContext, Mesh, MeshHandle, Primitive, PrimitiveChain, RecordingContext, SoftwareContext},
        scene::{
            CameraNode, ClearNode, ColorNode, Colorable, GroupNode, MeshNode, Movable, Node, NodeId, Rotatable,
            Scalable, SceneTree, TouchRotateNode, TransformNode, UpdateContext, UpdateFlags,
        },
        AppControl, AppError, Application, Engine, EngineError, RunOutcome,
    };
}
