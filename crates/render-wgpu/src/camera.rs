use futball_common::LookAngles;
use futball_scene::RenderRequest;
use glam::Vec3;

/// Eye basis and image-plane extents for one render.
///
/// `fov` is horizontal; the vertical extent follows the frame's aspect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CameraBasis {
    pub eye: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub half_w: f32,
    pub half_h: f32,
}

impl CameraBasis {
    pub fn from_request(request: &RenderRequest) -> Self {
        // the request's angles are public fields, so re-clamp away from the poles
        let look = LookAngles::new(request.look.yaw, request.look.pitch);
        let forward = look.forward();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let half_w = ((request.fov as f32).to_radians() * 0.5).tan();
        Self {
            eye: request.eye,
            forward,
            right,
            up,
            half_w,
            half_h: half_w * request.height as f32 / request.width as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_common::Color;
    use std::f32::consts::FRAC_PI_2;

    fn request(yaw: f32, pitch: f32) -> RenderRequest {
        RenderRequest {
            width: 200,
            height: 100,
            fov: 90,
            eye: Vec3::ZERO,
            look: LookAngles::new(yaw, pitch),
            ambient: Color::WHITE,
            ambient_intensity: 0.0,
            bounce_limit: 1,
        }
    }

    #[test]
    fn basis_at_rest_looks_down_x() {
        let basis = CameraBasis::from_request(&request(0.0, 0.0));
        assert!((basis.forward - Vec3::X).length() < 1e-6);
        assert!((basis.right - Vec3::Z).length() < 1e-6);
        assert!((basis.up - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn vertical_extent_follows_aspect() {
        let basis = CameraBasis::from_request(&request(0.0, 0.0));
        assert!((basis.half_w - 1.0).abs() < 1e-6);
        assert!((basis.half_h - 0.5).abs() < 1e-6);
    }

    #[test]
    fn basis_stays_orthonormal_near_the_pole() {
        let basis = CameraBasis::from_request(&request(1.0, FRAC_PI_2));
        assert!((basis.right.length() - 1.0).abs() < 1e-3);
        assert!(basis.forward.dot(basis.right).abs() < 1e-3);
        assert!(basis.up.dot(basis.right).abs() < 1e-3);
    }

    #[test]
    fn unclamped_pole_pitch_gives_a_finite_basis() {
        let mut req = request(0.0, 0.0);
        req.look = LookAngles {
            yaw: 0.0,
            pitch: -FRAC_PI_2,
        };
        let basis = CameraBasis::from_request(&req);
        assert!(basis.forward.is_finite());
        assert!(basis.right.is_finite());
        assert!(basis.up.is_finite());
        assert!((basis.right.length() - 1.0).abs() < 1e-3);
    }
}
