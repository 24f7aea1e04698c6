//! Scene Store: the authoritative backend-resident scene and the boundary it
//! is exchanged across.
//!
//! # Invariants
//! - At most one scene handle is live at a time. Every mutation derives a new
//!   handle from the current one and releases the old one in the same call.
//! - Object indices are assigned by the backend in submission order and never
//!   change for the lifetime of the object.
//! - The last handle is released when the store is dropped, including on
//!   error paths.

pub mod backend;
pub mod store;

pub use backend::{BackendError, ComputeBackend, DeviceSelector, RenderRequest};
pub use store::SceneStore;
