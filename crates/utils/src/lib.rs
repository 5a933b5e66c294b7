//! Shared utilities for stashd
//!
//! Helpers used across the workspace: XDG path resolution, tracing
//! initialisation and worker pool sizing.

pub mod parallelism;
pub mod tracing;
pub mod xdg;

pub use parallelism::*;
pub use xdg::*;
