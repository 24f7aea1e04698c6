use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Packed `0x00RRGGBB` color. Opaque to the simulation; the backend reads the
/// channel bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);
    pub const RED: Color = Color(0xFF0000);
    pub const GREEN: Color = Color(0x00FF00);
    pub const BLUE: Color = Color(0x0000FF);
    pub const YELLOW: Color = Color(0xFFFF00);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Channels scaled to `[0, 1]`.
    pub fn to_linear(self) -> Vec3 {
        Vec3::new(self.r() as f32, self.g() as f32, self.b() as f32) / 255.0
    }

    /// Pack `[0, 1]` channels, saturating out-of-range values.
    pub fn from_linear(rgb: Vec3) -> Self {
        let c = (rgb.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        Self::from_rgb(c.x as u8, c.y as u8, c.z as u8)
    }
}

/// A sphere as submitted to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub color: Color,
    pub shininess: f32,
}

/// An infinite plane through `point` with the given `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
    pub color: Color,
    pub shininess: f32,
}

/// A static point light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
}

/// Backend-assigned index of a sphere, stable for the sphere's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SphereIndex(pub i32);

/// Backend-assigned index of a plane, stable for the plane's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneIndex(pub i32);

/// Movement keys held during a physics tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementIntent {
    pub forward: bool,
    pub back: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub jump: bool,
    /// Yaw towards negative angles at the configured turn speed.
    pub turn_left: bool,
    pub turn_right: bool,
}

impl MovementIntent {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Signed turn direction: `-1`, `0` or `1`.
    pub fn turn_axis(&self) -> f32 {
        (self.turn_right as i8 - self.turn_left as i8) as f32
    }
}
