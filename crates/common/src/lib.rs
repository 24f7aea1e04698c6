//! Shared vocabulary for the futball workspace.
//!
//! # Invariants
//! - Math helpers are pure: no allocation, no global state.
//! - Tunables live in an immutable [`GameConfig`] passed by reference, never
//!   in process-wide statics.

pub mod config;
pub mod math;
pub mod types;

pub use config::{
    ArenaConfig, AvatarConfig, ConfigError, GameConfig, PhysicsConfig, RenderConfig,
    WindowConfig,
};
pub use math::{LookAngles, clamp_pitch, forward_vector, heading_vector, wrap_angle};
pub use types::{Color, Light, MovementIntent, Plane, PlaneIndex, Sphere, SphereIndex};
