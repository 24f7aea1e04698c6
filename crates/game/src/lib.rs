//! Frame Orchestrator: drives one tick at a time in a fixed order.
//!
//! # Invariants
//! - Each tick runs render, physics, avatar sync, input, in that order.
//!   The rendered frame therefore shows the state from before this tick's
//!   physics step.
//! - Everything runs on the calling thread; the only blocking point is the
//!   backend render call, plus the limiter's sleep between ticks.
//! - Shutting down releases the scene before the backend context.

mod arena;
mod game;
mod timing;

pub use arena::populate_arena;
pub use game::{FrameInfo, FrameSink, Game, GameError};
pub use timing::{FrameLimiter, FrameTimer};
