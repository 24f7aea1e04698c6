use crate::trace::{self, SceneObjects};
use futball_common::{Light, Plane, PlaneIndex, Sphere, SphereIndex};
use futball_scene::{BackendError, ComputeBackend, DeviceSelector, RenderRequest};
use glam::Vec3;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Handle and grid counters for a [`SoftwareBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub scenes_created: u64,
    pub scenes_released: u64,
    pub grids_created: u64,
    pub grids_released: u64,
}

impl BackendStats {
    pub fn live_scenes(&self) -> u64 {
        self.scenes_created - self.scenes_released
    }

    pub fn live_grids(&self) -> u64 {
        self.grids_created - self.grids_released
    }
}

/// Immutable CPU-side scene. Each mutation derives a fresh object list.
pub struct SoftwareScene {
    id: u64,
    objects: Rc<SceneObjects>,
}

/// Result of one software render.
pub struct SoftwarePixels {
    id: u64,
    pixels: Vec<u32>,
}

/// CPU implementation of the compute-backend boundary.
///
/// Panics if a scene or grid is released twice or was never issued by this
/// backend.
pub struct SoftwareBackend {
    next_id: Cell<u64>,
    live_scenes: RefCell<BTreeSet<u64>>,
    live_grids: RefCell<BTreeSet<u64>>,
    stats: Cell<BackendStats>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            live_scenes: RefCell::new(BTreeSet::new()),
            live_grids: RefCell::new(BTreeSet::new()),
            stats: Cell::new(BackendStats::default()),
        }
    }

    pub fn stats(&self) -> BackendStats {
        self.stats.get()
    }

    fn issue_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn issue_scene(&self, objects: SceneObjects) -> SoftwareScene {
        let id = self.issue_id();
        self.live_scenes.borrow_mut().insert(id);
        self.bump(|s| s.scenes_created += 1);
        SoftwareScene {
            id,
            objects: Rc::new(objects),
        }
    }

    fn bump(&self, f: impl FnOnce(&mut BackendStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for SoftwareBackend {
    type Scene = SoftwareScene;
    type PixelGrid = SoftwarePixels;

    fn create(selector: &DeviceSelector) -> Result<Self, BackendError> {
        if let Some(hint) = selector.hint() {
            tracing::debug!(hint, "software backend ignores device hint");
        }
        tracing::info!("using software ray tracer");
        Ok(Self::new())
    }

    fn name(&self) -> &str {
        "software"
    }

    fn empty_scene(&self) -> Result<SoftwareScene, BackendError> {
        Ok(self.issue_scene(SceneObjects::default()))
    }

    fn add_sphere(
        &self,
        scene: &SoftwareScene,
        sphere: &Sphere,
    ) -> Result<(SoftwareScene, SphereIndex), BackendError> {
        let mut objects = (*scene.objects).clone();
        let index = SphereIndex(objects.spheres.len() as i32);
        objects.spheres.push(*sphere);
        Ok((self.issue_scene(objects), index))
    }

    fn add_plane(
        &self,
        scene: &SoftwareScene,
        plane: &Plane,
    ) -> Result<(SoftwareScene, PlaneIndex), BackendError> {
        let mut objects = (*scene.objects).clone();
        let index = PlaneIndex(objects.planes.len() as i32);
        objects.planes.push(*plane);
        Ok((self.issue_scene(objects), index))
    }

    fn add_light(&self, scene: &SoftwareScene, light: &Light) -> Result<SoftwareScene, BackendError> {
        let mut objects = (*scene.objects).clone();
        objects.lights.push(*light);
        Ok(self.issue_scene(objects))
    }

    fn set_sphere_radius(
        &self,
        scene: &SoftwareScene,
        index: SphereIndex,
        radius: f32,
    ) -> Result<SoftwareScene, BackendError> {
        let mut objects = (*scene.objects).clone();
        objects.spheres[index.0 as usize].radius = radius;
        Ok(self.issue_scene(objects))
    }

    fn set_sphere_positions(
        &self,
        scene: &SoftwareScene,
        indices: &[SphereIndex],
        xs: &[f32],
        ys: &[f32],
        zs: &[f32],
    ) -> Result<SoftwareScene, BackendError> {
        let mut objects = (*scene.objects).clone();
        for (i, index) in indices.iter().enumerate() {
            objects.spheres[index.0 as usize].center = Vec3::new(xs[i], ys[i], zs[i]);
        }
        Ok(self.issue_scene(objects))
    }

    fn render(
        &self,
        scene: &SoftwareScene,
        request: &RenderRequest,
    ) -> Result<SoftwarePixels, BackendError> {
        request.validate()?;
        let mut pixels = vec![0; request.pixel_count()];
        trace::render_into(&scene.objects, request, &mut pixels);

        let id = self.issue_id();
        self.live_grids.borrow_mut().insert(id);
        self.bump(|s| s.grids_created += 1);
        Ok(SoftwarePixels { id, pixels })
    }

    fn read_pixels(&self, grid: &SoftwarePixels, out: &mut [u32]) -> Result<(), BackendError> {
        if out.len() != grid.pixels.len() {
            return Err(BackendError::Readback(format!(
                "grid holds {} pixels, destination {}",
                grid.pixels.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&grid.pixels);
        Ok(())
    }

    fn release_scene(&self, scene: SoftwareScene) {
        assert!(
            self.live_scenes.borrow_mut().remove(&scene.id),
            "scene {} released twice or never issued",
            scene.id
        );
        self.bump(|s| s.scenes_released += 1);
    }

    fn release_pixel_grid(&self, grid: SoftwarePixels) {
        assert!(
            self.live_grids.borrow_mut().remove(&grid.id),
            "pixel grid {} released twice or never issued",
            grid.id
        );
        self.bump(|s| s.grids_released += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_common::{Color, LookAngles};

    fn request() -> RenderRequest {
        RenderRequest {
            width: 4,
            height: 2,
            fov: 90,
            eye: Vec3::new(0.0, 50.0, 0.0),
            look: LookAngles::default(),
            ambient: Color::WHITE,
            ambient_intensity: 1.0,
            bounce_limit: 1,
        }
    }

    #[test]
    fn mutations_do_not_touch_the_source_scene() {
        let backend = SoftwareBackend::new();
        let empty = backend.empty_scene().unwrap();
        let sphere = Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
            color: Color::RED,
            shininess: 0.0,
        };
        let (with_ball, index) = backend.add_sphere(&empty, &sphere).unwrap();
        assert_eq!(index, SphereIndex(0));
        assert!(empty.objects.spheres.is_empty());
        assert_eq!(with_ball.objects.spheres.len(), 1);

        let moved = backend
            .set_sphere_positions(&with_ball, &[index], &[1.0], &[2.0], &[3.0])
            .unwrap();
        assert_eq!(with_ball.objects.spheres[0].center, Vec3::ZERO);
        assert_eq!(moved.objects.spheres[0].center, Vec3::new(1.0, 2.0, 3.0));

        backend.release_scene(empty);
        backend.release_scene(with_ball);
        backend.release_scene(moved);
        assert_eq!(backend.stats().live_scenes(), 0);
    }

    #[test]
    fn render_issues_a_grid_of_the_requested_size() {
        let backend = SoftwareBackend::new();
        let scene = backend.empty_scene().unwrap();
        let grid = backend.render(&scene, &request()).unwrap();
        let mut out = vec![0; 8];
        backend.read_pixels(&grid, &mut out).unwrap();
        // nothing to hit: every pixel is the full ambient color
        assert!(out.iter().all(|&p| p == Color::WHITE.0));

        assert_eq!(backend.stats().live_grids(), 1);
        backend.release_pixel_grid(grid);
        backend.release_scene(scene);
        assert_eq!(backend.stats().live_grids(), 0);
    }

    #[test]
    fn readback_into_wrong_size_fails() {
        let backend = SoftwareBackend::new();
        let scene = backend.empty_scene().unwrap();
        let grid = backend.render(&scene, &request()).unwrap();
        let mut out = vec![0; 3];
        assert!(matches!(
            backend.read_pixels(&grid, &mut out),
            Err(BackendError::Readback(_))
        ));
        backend.release_pixel_grid(grid);
        backend.release_scene(scene);
    }

    #[test]
    fn invalid_request_is_rejected_before_tracing() {
        let backend = SoftwareBackend::new();
        let scene = backend.empty_scene().unwrap();
        let bad = RenderRequest {
            height: 0,
            ..request()
        };
        assert!(backend.render(&scene, &bad).is_err());
        assert_eq!(backend.stats().grids_created, 0);
        backend.release_scene(scene);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let backend = SoftwareBackend::new();
        let scene = backend.empty_scene().unwrap();
        let forged = SoftwareScene {
            id: scene.id,
            objects: scene.objects.clone(),
        };
        backend.release_scene(scene);
        backend.release_scene(forged);
    }
}
