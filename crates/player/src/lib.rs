//! Player: the avatar's physics state machine and the camera that follows it.
//!
//! # Invariants
//! - After every physics step the avatar's center is at or above
//!   `floor_y + radius`.
//! - While grounded, horizontal velocity is rebuilt from the held keys each
//!   step; while airborne it is frozen and only gravity acts.
//! - Look angles are always in range: yaw in `[0, 2π)`, pitch strictly
//!   inside `(-π/2, π/2)`.

pub mod camera;
pub mod controller;

pub use camera::{Eye, camera_behind};
pub use controller::{Motion, PlayerController, PlayerState};
