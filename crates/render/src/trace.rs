//! Whitted-style CPU ray tracer.
//!
//! One primary ray per pixel center. Local shading is Lambert with hard
//! shadows and no distance attenuation; shininess splits each hit between its
//! local color and a mirror bounce.

use futball_common::{Light, LookAngles, Plane, Sphere};
use futball_scene::RenderRequest;
use glam::Vec3;

/// Minimum hit distance, so secondary rays do not re-hit their origin.
const T_MIN: f32 = 1e-3;
/// Offset applied along the normal before casting secondary rays.
const SURFACE_BIAS: f32 = 1e-2;

/// Flat object lists of one immutable scene.
#[derive(Debug, Clone, Default)]
pub(crate) struct SceneObjects {
    pub spheres: Vec<Sphere>,
    pub planes: Vec<Plane>,
    pub lights: Vec<Light>,
}

#[derive(Debug, Clone, Copy)]
struct Ray {
    origin: Vec3,
    dir: Vec3,
}

impl Ray {
    fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

struct Hit {
    t: f32,
    point: Vec3,
    /// Unit normal facing against the incoming ray.
    normal: Vec3,
    color: Vec3,
    shininess: f32,
}

/// Pinhole camera derived from the request's eye and look angles.
struct Camera {
    eye: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    half_w: f32,
    half_h: f32,
    width: f32,
    height: f32,
}

impl Camera {
    fn new(request: &RenderRequest) -> Self {
        let look = LookAngles::new(request.look.yaw, request.look.pitch);
        let forward = look.forward();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let half_w = (request.fov as f32).to_radians() * 0.5;
        let half_w = half_w.tan();
        let width = request.width as f32;
        let height = request.height as f32;
        Self {
            eye: request.eye,
            forward,
            right,
            up,
            half_w,
            half_h: half_w * height / width,
            width,
            height,
        }
    }

    fn primary_ray(&self, x: u32, y: u32) -> Ray {
        let ndc_x = (x as f32 + 0.5) / self.width * 2.0 - 1.0;
        let ndc_y = 1.0 - (y as f32 + 0.5) / self.height * 2.0;
        let dir = self.forward + self.right * (ndc_x * self.half_w) + self.up * (ndc_y * self.half_h);
        Ray {
            origin: self.eye,
            dir: dir.normalize(),
        }
    }
}

/// Trace a full frame into `out`, which holds `width * height` pixels.
pub(crate) fn render_into(objects: &SceneObjects, request: &RenderRequest, out: &mut [u32]) {
    debug_assert_eq!(out.len(), request.pixel_count());
    let camera = Camera::new(request);
    let width = request.width as u32;
    for (i, pixel) in out.iter_mut().enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        let rgb = trace(objects, camera.primary_ray(x, y), request);
        *pixel = futball_common::Color::from_linear(rgb).0;
    }
}

fn trace(objects: &SceneObjects, mut ray: Ray, request: &RenderRequest) -> Vec3 {
    let ambient = request.ambient.to_linear() * request.ambient_intensity;
    let mut color = Vec3::ZERO;
    let mut weight = 1.0;

    for bounce in 0..=request.bounce_limit {
        let Some(hit) = nearest_hit(objects, &ray) else {
            color += ambient * weight;
            break;
        };
        let local = shade(objects, &hit, ambient);
        color += local * (weight * (1.0 - hit.shininess));
        weight *= hit.shininess;
        if weight <= 0.0 || bounce == request.bounce_limit {
            break;
        }
        let reflected = ray.dir - hit.normal * (2.0 * ray.dir.dot(hit.normal));
        ray = Ray {
            origin: hit.point + hit.normal * SURFACE_BIAS,
            dir: reflected.normalize(),
        };
    }
    color
}

fn shade(objects: &SceneObjects, hit: &Hit, ambient: Vec3) -> Vec3 {
    let mut light_sum = ambient;
    let origin = hit.point + hit.normal * SURFACE_BIAS;
    for light in &objects.lights {
        let to_light = light.position - origin;
        let distance = to_light.length();
        let l = to_light / distance;
        let lambert = hit.normal.dot(l);
        if lambert <= 0.0 {
            continue;
        }
        let shadow = Ray { origin, dir: l };
        if nearest_hit(objects, &shadow).is_some_and(|h| h.t < distance) {
            continue;
        }
        light_sum += light.color.to_linear() * (light.intensity * lambert);
    }
    hit.color * light_sum
}

fn nearest_hit(objects: &SceneObjects, ray: &Ray) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for sphere in &objects.spheres {
        if let Some(t) = intersect_sphere(sphere, ray) {
            if best.as_ref().is_none_or(|b| t < b.t) {
                let point = ray.at(t);
                best = Some(Hit {
                    t,
                    point,
                    normal: facing((point - sphere.center) / sphere.radius, ray.dir),
                    color: sphere.color.to_linear(),
                    shininess: sphere.shininess,
                });
            }
        }
    }
    for plane in &objects.planes {
        if let Some(t) = intersect_plane(plane, ray) {
            if best.as_ref().is_none_or(|b| t < b.t) {
                best = Some(Hit {
                    t,
                    point: ray.at(t),
                    normal: facing(plane.normal.normalize(), ray.dir),
                    color: plane.color.to_linear(),
                    shininess: plane.shininess,
                });
            }
        }
    }
    best
}

fn facing(normal: Vec3, dir: Vec3) -> Vec3 {
    if normal.dot(dir) > 0.0 { -normal } else { normal }
}

fn intersect_sphere(sphere: &Sphere, ray: &Ray) -> Option<f32> {
    let oc = ray.origin - sphere.center;
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let near = -b - root;
    if near > T_MIN {
        return Some(near);
    }
    let far = -b + root;
    (far > T_MIN).then_some(far)
}

fn intersect_plane(plane: &Plane, ray: &Ray) -> Option<f32> {
    let normal = plane.normal.normalize();
    let denom = normal.dot(ray.dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (plane.point - ray.origin).dot(normal) / denom;
    (t > T_MIN).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_common::Color;
    use std::f32::consts::FRAC_PI_2;

    fn request(width: i32, height: i32) -> RenderRequest {
        RenderRequest {
            width,
            height,
            fov: 90,
            eye: Vec3::new(-500.0, 50.0, 0.0),
            look: LookAngles::default(),
            ambient: Color::WHITE,
            ambient_intensity: 0.0,
            bounce_limit: 2,
        }
    }

    fn red_ball() -> Sphere {
        Sphere {
            center: Vec3::new(0.0, 50.0, 0.0),
            radius: 50.0,
            color: Color::RED,
            shininess: 0.0,
        }
    }

    fn white_light(position: Vec3) -> Light {
        Light {
            position,
            color: Color::WHITE,
            intensity: 1.0,
        }
    }

    #[test]
    fn sphere_intersection_hits_near_side() {
        let ray = Ray {
            origin: Vec3::new(-500.0, 50.0, 0.0),
            dir: Vec3::X,
        };
        let t = intersect_sphere(&red_ball(), &ray).unwrap();
        assert!((t - 450.0).abs() < 1e-3);
    }

    #[test]
    fn ray_parallel_to_plane_misses() {
        let floor = Plane {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            color: Color::WHITE,
            shininess: 0.0,
        };
        let ray = Ray {
            origin: Vec3::new(0.0, 10.0, 0.0),
            dir: Vec3::X,
        };
        assert!(intersect_plane(&floor, &ray).is_none());
    }

    #[test]
    fn lit_sphere_fills_the_center_pixel() {
        let objects = SceneObjects {
            spheres: vec![red_ball()],
            lights: vec![white_light(Vec3::new(-1000.0, 50.0, 0.0))],
            ..SceneObjects::default()
        };
        let req = RenderRequest {
            fov: 30,
            ..request(16, 16)
        };
        let mut out = vec![0; req.pixel_count()];
        render_into(&objects, &req, &mut out);

        let center = Color(out[8 * 16 + 8]);
        assert!(center.r() > 200, "center pixel {:06x}", center.0);
        assert_eq!((center.g(), center.b()), (0, 0));
        // corners look past the ball into empty space with no ambient
        assert_eq!(out[0], 0);
    }

    #[test]
    fn occluded_light_leaves_shadow() {
        // the ball sits between the light and the floor point below it
        let objects = SceneObjects {
            spheres: vec![red_ball()],
            planes: vec![Plane {
                point: Vec3::ZERO,
                normal: Vec3::Y,
                color: Color::WHITE,
                shininess: 0.0,
            }],
            lights: vec![white_light(Vec3::new(0.0, 1000.0, 0.0))],
        };
        let hit = Hit {
            t: 1.0,
            point: Vec3::ZERO,
            normal: Vec3::Y,
            color: Vec3::ONE,
            shininess: 0.0,
        };
        assert_eq!(shade(&objects, &hit, Vec3::ZERO), Vec3::ZERO);

        let open = Hit {
            point: Vec3::new(500.0, 0.0, 0.0),
            ..hit
        };
        assert!(shade(&objects, &open, Vec3::ZERO).x > 0.0);
    }

    #[test]
    fn mirror_reflects_what_it_faces() {
        // a perfect mirror floor seen from above shows the sky ambient
        let objects = SceneObjects {
            planes: vec![Plane {
                point: Vec3::ZERO,
                normal: Vec3::Y,
                color: Color::BLACK,
                shininess: 1.0,
            }],
            ..SceneObjects::default()
        };
        let req = RenderRequest {
            ambient_intensity: 0.5,
            ..request(4, 4)
        };
        let ray = Ray {
            origin: Vec3::new(0.0, 10.0, 0.0),
            dir: Vec3::new(1.0, -1.0, 0.0).normalize(),
        };
        let rgb = trace(&objects, ray, &req);
        assert!((rgb - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn zero_bounce_limit_stops_at_first_hit() {
        let objects = SceneObjects {
            planes: vec![Plane {
                point: Vec3::ZERO,
                normal: Vec3::Y,
                color: Color::BLACK,
                shininess: 1.0,
            }],
            ..SceneObjects::default()
        };
        let req = RenderRequest {
            ambient_intensity: 0.5,
            bounce_limit: 0,
            ..request(4, 4)
        };
        let ray = Ray {
            origin: Vec3::new(0.0, 10.0, 0.0),
            dir: Vec3::new(1.0, -1.0, 0.0).normalize(),
        };
        assert_eq!(trace(&objects, ray, &req), Vec3::ZERO);
    }

    #[test]
    fn straight_up_pitch_renders_without_nan() {
        let objects = SceneObjects {
            lights: vec![white_light(Vec3::new(0.0, 1000.0, 0.0))],
            ..SceneObjects::default()
        };
        let req = RenderRequest {
            look: LookAngles {
                yaw: 0.0,
                pitch: FRAC_PI_2,
            },
            ambient_intensity: 0.25,
            ..request(4, 4)
        };
        let camera = Camera::new(&req);
        assert!(camera.right.is_finite());
        assert!(camera.up.is_finite());

        let mut out = vec![0; req.pixel_count()];
        render_into(&objects, &req, &mut out);
        // every ray misses and picks up the ambient term
        assert!(out.iter().all(|&p| p == Color::from_rgb(64, 64, 64).0));
    }
}
