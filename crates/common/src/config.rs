//! Immutable game tunables.
//!
//! Every value has a default matching the shipped arena, so a partial YAML
//! file only needs the fields it changes.

use crate::types::{Color, Light};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Fixed window resolution and loop rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            target_fps: 60,
        }
    }
}

/// Parameters forwarded to the backend's render entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Horizontal field of view in degrees.
    pub fov: i32,
    pub bounce_limit: i32,
    pub ambient: Color,
    pub ambient_intensity: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov: 105,
            bounce_limit: 5,
            ambient: Color::WHITE,
            ambient_intensity: 0.0,
        }
    }
}

/// Player physics constants. Units are world units and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub move_speed: f32,
    /// Downward acceleration while airborne.
    pub gravity: f32,
    /// Vertical launch speed of a jump.
    pub jump_speed: f32,
    pub floor_y: f32,
    /// Yaw rate of the turn keys, in radians per second.
    pub turn_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            move_speed: 1000.0,
            gravity: 9.8 * 500.0,
            jump_speed: 1500.0,
            floor_y: 0.0,
            turn_speed: std::f32::consts::PI,
        }
    }
}

/// The player-controlled sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub radius: f32,
    pub color: Color,
    pub shininess: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            radius: 50.0,
            color: Color::RED,
            shininess: 0.1,
        }
    }
}

/// Static scenery: the floor plane and the point lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub floor_color: Color,
    pub floor_shininess: f32,
    pub lights: Vec<Light>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let light = |x: f32, y: f32, z: f32, color: Color| Light {
            position: Vec3::new(x, y, z),
            color,
            intensity: 1.0,
        };
        Self {
            floor_color: Color::WHITE,
            floor_shininess: 0.2,
            lights: vec![
                light(2000.0, 1000.0, 0.0, Color::RED),
                light(-2000.0, 3000.0, 0.0, Color::GREEN),
                light(0.0, 1000.0, 2000.0, Color::BLUE),
                light(0.0, 1000.0, -2000.0, Color::YELLOW),
            ],
        }
    }
}

/// All tunables, grouped by the component that reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub physics: PhysicsConfig,
    pub avatar: AvatarConfig,
    pub arena: ArenaConfig,
}

impl GameConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.window.width == 0 {
            return invalid("window.width", "must be positive");
        }
        if self.window.height == 0 {
            return invalid("window.height", "must be positive");
        }
        if self.window.target_fps == 0 {
            return invalid("window.target_fps", "must be positive");
        }
        if !(1..180).contains(&self.render.fov) {
            return invalid("render.fov", "must be between 1 and 179 degrees");
        }
        if self.render.bounce_limit < 0 {
            return invalid("render.bounce_limit", "must not be negative");
        }
        if !(self.avatar.radius > 0.0) {
            return invalid("avatar.radius", "must be positive");
        }
        Ok(())
    }

    /// Height at which the avatar rests on the floor.
    pub fn rest_height(&self) -> f32 {
        self.physics.floor_y + self.avatar.radius
    }

    /// Where the avatar starts: resting on the floor at the origin.
    pub fn spawn_point(&self) -> Vec3 {
        Vec3::new(0.0, self.rest_height(), 0.0)
    }
}
