//! wgpu compute backend for the futball ray tracer.
//!
//! Each scene is a set of immutable storage buffers rebuilt from a CPU-side
//! object list on every mutation. Rendering dispatches one invocation per
//! pixel and reads the result back through a mappable buffer.
//!
//! # Invariants
//! - Scene buffers are never written after creation.
//! - `render` returns only once the readback buffer is mapped.
//! - Released scenes and grids destroy their buffers immediately.

mod camera;
mod gpu;
mod shaders;

pub use gpu::{GpuPixels, GpuScene, WgpuBackend};
pub use shaders::BLIT_SHADER;
