//! # Deferred Rendering
//!
//! Rendering is split in two halves that never touch each other's state:
//!
//! - **Build**: the scene tree's render pass appends [`Primitive`]s to a
//!   [`PrimitiveChain`]. This runs on the update thread and never calls the GPU.
//! - **Replay**: a single consumer walks the finished chain and issues exactly one
//!   [`GpuContext`] call per primitive, in order.
//!
//! Because the chain is a self-contained value, frame N can replay on the render
//! thread while frame N+1 is being simulated.
//!
//! ```
//! use gles_engine::foundation::fixed::Fp;
//! use gles_engine::render::{Color, Mesh, Primitive, PrimitiveChain, RecordingContext};
//!
//! let mut chain = PrimitiveChain::new();
//! chain.push(Primitive::SetColor(Color::WHITE));
//! chain.push(Primitive::DrawMesh(Mesh::cube(Fp::ONE).into_handle()));
//!
//! let mut ctx = RecordingContext::new();
//! assert_eq!(chain.replay(&mut ctx).ok(), Some(2));
//! ```

pub mod context;
pub mod mesh;
pub mod primitive;
pub mod software;

pub use context::{GpuCall, GpuContext, RecordingContext};
pub use mesh::{Mesh, MeshHandle};
pub use primitive::{Color, Orthographic, Perspective, Primitive, PrimitiveChain};
pub use software::{DrawStats, SoftwareContext};

use thiserror::Error;

/// Rendering errors
///
/// Any of these aborts the frame being replayed. The scheduler logs the failure
/// and moves on to the next frame; frames are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A precondition was violated, such as drawing a mesh node with no mesh
    #[error("Invalid render state: {0}")]
    InvalidState(String),

    /// `push_matrix` beyond the context's stack depth
    #[error("Matrix stack overflow (max depth {depth})")]
    MatrixStackOverflow {
        /// Configured maximum depth
        depth: usize,
    },

    /// `pop_matrix` with nothing saved
    #[error("Matrix stack underflow")]
    MatrixStackUnderflow,

    /// Mesh data failed validation
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Backend-specific failure
    ///
    /// Wraps errors from the concrete context so callers handle every backend
    /// the same way.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
