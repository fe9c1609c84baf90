//! Application trait and lifecycle management

use crate::engine::{Engine, EngineError};
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive a scene with [`Engine::run`].
pub trait Application {
    /// Initialize the application
    ///
    /// Called once before the first frame. Build the scene tree and register
    /// event handlers here.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Called before every frame tick
    ///
    /// Return [`AppControl::Exit`] to stop the loop after the frames already
    /// handed to the render thread.
    fn on_frame(&mut self, _engine: &mut Engine) -> Result<AppControl, AppError> {
        Ok(AppControl::Continue)
    }

    /// Cleanup the application
    ///
    /// Called once when the loop ends, before the render thread is stopped.
    fn cleanup(&mut self, _engine: &mut Engine) {}
}

/// Whether the main loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppControl {
    /// Run another frame
    #[default]
    Continue,
    /// Leave the main loop
    Exit,
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
