use futball_common::LookAngles;
use glam::Vec3;

/// How far behind the avatar the camera sits, in avatar radii.
pub const CHASE_DISTANCE_RADII: f32 = 10.0;

/// Lowest camera height allowed.
pub const MIN_CAMERA_HEIGHT: f32 = 1.0;

/// Render eye: where the camera is and where it looks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Eye {
    pub position: Vec3,
    pub look: LookAngles,
}

/// Chase camera placed `radius * 10` units behind `position` along the view
/// direction, never lower than [`MIN_CAMERA_HEIGHT`]. The look angles are
/// copied unchanged.
pub fn camera_behind(radius: f32, position: Vec3, look: LookAngles) -> Eye {
    let mut eye = position - look.forward() * (radius * CHASE_DISTANCE_RADII);
    eye.y = eye.y.max(MIN_CAMERA_HEIGHT);
    Eye {
        position: eye,
        look,
    }
}
