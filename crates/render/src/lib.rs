//! Render Engine: owns the backend context, the current scene, and the frame
//! buffer the backend writes into.
//!
//! # Invariants
//! - The frame buffer is allocated once at `width * height` and never resized.
//! - Every render call releases the backend's transient pixel grid before it
//!   returns, on success and on failure.
//! - Teardown order is frame buffer, scene, backend context.
//!
//! [`SoftwareBackend`] is a CPU implementation of the backend boundary. It
//! shades exactly like the GPU backend and keeps counters so resource
//! discipline can be checked without a device.

mod engine;
mod frame;
mod software;
mod trace;

pub use engine::{Engine, RenderError, RenderView};
pub use frame::FrameBuffer;
pub use software::{BackendStats, SoftwareBackend, SoftwarePixels, SoftwareScene};
