use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Distance kept from the poles so the derived camera basis never degenerates.
pub const PITCH_MARGIN: f32 = 0.001;

/// Largest pitch magnitude a [`LookAngles`] may hold.
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - PITCH_MARGIN;

/// Orientation as yaw (around +Y) and pitch (elevation), in radians.
///
/// Yaw lives in `[0, 2π)`; pitch lives strictly inside `(-π/2, π/2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookAngles {
    /// Build angles, wrapping yaw and clamping pitch into range.
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw: wrap_angle(yaw),
            pitch: clamp_pitch(pitch),
        }
    }

    /// Apply a yaw/pitch delta, keeping both components in range.
    pub fn turned(self, delta_yaw: f32, delta_pitch: f32) -> Self {
        Self::new(self.yaw + delta_yaw, self.pitch + delta_pitch)
    }

    /// Unit view direction for these angles.
    pub fn forward(&self) -> Vec3 {
        forward_vector(self.yaw, self.pitch)
    }
}

/// `(cos yaw · cos pitch, sin pitch, sin yaw · cos pitch)`
pub fn forward_vector(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        yaw.cos() * pitch.cos(),
        pitch.sin(),
        yaw.sin() * pitch.cos(),
    )
}

/// Horizontal unit vector for a yaw, ignoring pitch.
pub fn heading_vector(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, yaw.sin())
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Clamp a pitch into the open interval `(-π/2, π/2)`.
pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}
