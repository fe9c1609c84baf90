//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Q16.16 fixed-point scalar, vector, matrix and spherical types
//! - Floating-point math types and projection helpers
//! - Frame clocks and timing
//! - Logging utilities

pub mod fixed;
pub mod logging;
pub mod math;
pub mod time;
