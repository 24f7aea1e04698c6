//! Input: the event vocabulary the game loop consumes.
//!
//! # Invariants
//! - Embodiments translate raw window events into [`InputEvent`]s; the game
//!   never sees platform types.
//! - Movement is level-triggered: [`KeyState`] holds which keys are down and
//!   is sampled once per physics tick.

pub mod event;

pub use event::{InputEvent, Key, KeyState};
