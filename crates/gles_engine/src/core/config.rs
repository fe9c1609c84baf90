//! # Engine Configuration
//!
//! All settings structures in one place, serializable to TOML or RON through
//! the [`Config`] trait. Every field has a default, so a file only needs the
//! values it changes:
//!
//! ```toml
//! log_level = "debug"
//! target_fps = 30
//!
//! [input]
//! overflow = "DropNewest"
//! ```

use crate::input::OverflowPolicy;
use crate::render::Color;
use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// # Input Configuration
///
/// Bounds and backpressure for the input queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Maximum queued events
    pub capacity: usize,
    /// Minimum spacing between accepted pointer moves, in milliseconds
    pub throttle_ms: u64,
    /// What to drop when the queue is full
    pub overflow: OverflowPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            throttle_ms: 16,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

/// # Render Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Primitives preallocated per chain
    pub chain_capacity: usize,
    /// Model-view stack depth of the software context
    pub max_matrix_depth: usize,
    /// Background colour, RGBA in `[0, 1]`
    pub clear_color: [f32; 4],
}

impl RenderConfig {
    /// Background colour in fixed point
    #[must_use]
    pub fn clear_color(&self) -> Color {
        Color::from_array(self.clear_color)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chain_capacity: 256,
            max_matrix_depth: 32,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// # Engine Configuration
///
/// Core engine behavior: logging, frame pacing and the subsystem settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Target FPS for frame rate limiting (`None` runs unpaced)
    pub target_fps: Option<u32>,
    /// Stop after this many frames (`None` runs until the application quits)
    pub max_frames: Option<u64>,
    /// Input queue settings
    pub input: InputConfig,
    /// Render settings
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            target_fps: Some(60),
            max_frames: None,
            input: InputConfig::default(),
            render: RenderConfig::default(),
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set target FPS
    #[must_use]
    pub const fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.target_fps = fps;
        self
    }

    /// Stop after `frames` frames
    #[must_use]
    pub const fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == Some(0) {
            return Err(ConfigError::Invalid("target_fps must be at least 1".to_string()));
        }
        if self.input.capacity == 0 {
            return Err(ConfigError::Invalid("input.capacity must be at least 1".to_string()));
        }
        if self.render.chain_capacity == 0 {
            return Err(ConfigError::Invalid("render.chain_capacity must be at least 1".to_string()));
        }
        if self.render.max_matrix_depth == 0 {
            return Err(ConfigError::Invalid("render.max_matrix_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
