use crate::camera::{Eye, camera_behind};
use futball_common::{GameConfig, LookAngles, MovementIntent, PhysicsConfig, heading_vector};
use glam::Vec3;
use std::f32::consts::FRAC_PI_2;

/// Contact state of the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    #[default]
    Grounded,
    Airborne,
}

/// Everything the physics step reads and writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub look: LookAngles,
    pub velocity: Vec3,
    pub motion: Motion,
}

impl PlayerState {
    /// At rest on the floor at the spawn point, looking down +X.
    pub fn spawn(config: &GameConfig) -> Self {
        Self {
            position: config.spawn_point(),
            look: LookAngles::default(),
            velocity: Vec3::ZERO,
            motion: Motion::Grounded,
        }
    }

    pub fn is_airborne(&self) -> bool {
        self.motion == Motion::Airborne
    }
}

/// Integrates movement intents and pointer deltas into the avatar state.
#[derive(Debug, Clone)]
pub struct PlayerController {
    physics: PhysicsConfig,
    radius: f32,
    screen_width: f32,
    screen_height: f32,
    state: PlayerState,
}

impl PlayerController {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            physics: config.physics.clone(),
            radius: config.avatar.radius,
            screen_width: config.window.width as f32,
            screen_height: config.window.height as f32,
            state: PlayerState::spawn(config),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Height of the avatar's center when it stands on the floor.
    pub fn rest_height(&self) -> f32 {
        self.physics.floor_y + self.radius
    }

    /// Chase camera for the current state.
    pub fn eye(&self) -> Eye {
        camera_behind(self.radius, self.state.position, self.state.look)
    }

    /// Advance the avatar by `dt` seconds.
    pub fn step(&mut self, intent: MovementIntent, dt: f32) {
        let s = &mut self.state;
        match s.motion {
            Motion::Airborne => {
                s.velocity.y -= self.physics.gravity * dt;
            }
            Motion::Grounded => {
                let speed = self.physics.move_speed;
                let heading = heading_vector(s.look.yaw);
                let side = heading_vector(s.look.yaw + FRAC_PI_2);

                let mut v = Vec3::ZERO;
                if intent.forward {
                    v += heading * speed;
                }
                if intent.back {
                    v -= heading * speed;
                }
                if intent.strafe_right {
                    v += side * speed;
                }
                if intent.strafe_left {
                    v -= side * speed;
                }
                if intent.jump {
                    v.y = self.physics.jump_speed;
                    s.motion = Motion::Airborne;
                    tracing::debug!(x = s.position.x, z = s.position.z, "jump");
                }
                s.velocity = v;
            }
        }

        s.position += s.velocity * dt;

        // turning works on the ground and in the air, after movement used
        // this tick's heading
        let turn = intent.turn_axis();
        if turn != 0.0 {
            s.look = s.look.turned(turn * self.physics.turn_speed * dt, 0.0);
        }

        let rest = self.physics.floor_y + self.radius;
        if s.position.y < rest {
            s.position.y = rest;
            s.velocity = Vec3::ZERO;
            if s.motion == Motion::Airborne {
                s.motion = Motion::Grounded;
                tracing::debug!(x = s.position.x, z = s.position.z, "landed");
            }
        }
    }

    /// Turn by a pointer delta in pixels: a full screen width is one radian
    /// of yaw, a full screen height one radian of pitch.
    pub fn apply_look(&mut self, dx: f32, dy: f32) {
        self.state.look = self
            .state
            .look
            .turned(dx / self.screen_width, dy / self.screen_height);
    }
}
