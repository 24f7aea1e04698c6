use crate::backend::{BackendError, ComputeBackend};
use futball_common::{Light, Plane, PlaneIndex, Sphere, SphereIndex};
use glam::Vec3;
use std::rc::Rc;

/// Owner of the single live scene handle.
///
/// All scene mutations go through explicit operations. Each one submits a
/// delta to the backend, swaps in the returned handle, and releases the
/// previous handle before returning, so callers never see or keep a stale
/// handle.
pub struct SceneStore<B: ComputeBackend> {
    backend: Rc<B>,
    /// `None` only while the store is being dropped.
    current: Option<B::Scene>,
    spheres: i32,
    planes: i32,
    lights: i32,
    mutations: u64,
}

impl<B: ComputeBackend> SceneStore<B> {
    /// Start from the backend's empty scene.
    pub fn new(backend: Rc<B>) -> Result<Self, BackendError> {
        let empty = backend.empty_scene()?;
        tracing::debug!(backend = backend.name(), "scene store created");
        Ok(Self {
            backend,
            current: Some(empty),
            spheres: 0,
            planes: 0,
            lights: 0,
            mutations: 0,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The current scene handle. Borrowed, never handed out by value.
    pub fn current(&self) -> &B::Scene {
        self.current
            .as_ref()
            .expect("scene handle is live until the store is dropped")
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres as usize
    }

    pub fn plane_count(&self) -> usize {
        self.planes as usize
    }

    pub fn light_count(&self) -> usize {
        self.lights as usize
    }

    /// Number of handle-replacing operations performed so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> Result<SphereIndex, BackendError> {
        let (next, index) = self.backend.add_sphere(self.current(), &sphere)?;
        debug_assert_eq!(index.0, self.spheres, "spheres are indexed in submission order");
        self.replace(next);
        self.spheres += 1;
        tracing::trace!(index = index.0, radius = sphere.radius, "added sphere");
        Ok(index)
    }

    pub fn add_plane(&mut self, plane: Plane) -> Result<PlaneIndex, BackendError> {
        let (next, index) = self.backend.add_plane(self.current(), &plane)?;
        debug_assert_eq!(index.0, self.planes, "planes are indexed in submission order");
        self.replace(next);
        self.planes += 1;
        tracing::trace!(index = index.0, "added plane");
        Ok(index)
    }

    pub fn add_light(&mut self, light: Light) -> Result<(), BackendError> {
        let next = self.backend.add_light(self.current(), &light)?;
        self.replace(next);
        self.lights += 1;
        tracing::trace!(intensity = light.intensity, "added light");
        Ok(())
    }

    /// # Panics
    /// If `index` was not produced by this store.
    pub fn set_sphere_radius(&mut self, index: SphereIndex, radius: f32) -> Result<(), BackendError> {
        self.check_sphere(index);
        let next = self.backend.set_sphere_radius(self.current(), index, radius)?;
        self.replace(next);
        Ok(())
    }

    /// Move each sphere in `indices` to the matching entry of `positions`.
    ///
    /// # Panics
    /// If the slices differ in length or an index was not produced by this
    /// store.
    pub fn set_sphere_positions(
        &mut self,
        indices: &[SphereIndex],
        positions: &[Vec3],
    ) -> Result<(), BackendError> {
        assert_eq!(
            indices.len(),
            positions.len(),
            "one position per sphere index"
        );
        for &index in indices {
            self.check_sphere(index);
        }
        let xs: Vec<f32> = positions.iter().map(|p| p.x).collect();
        let ys: Vec<f32> = positions.iter().map(|p| p.y).collect();
        let zs: Vec<f32> = positions.iter().map(|p| p.z).collect();
        let next = self
            .backend
            .set_sphere_positions(self.current(), indices, &xs, &ys, &zs)?;
        self.replace(next);
        Ok(())
    }

    fn check_sphere(&self, index: SphereIndex) {
        assert!(
            (0..self.spheres).contains(&index.0),
            "sphere index {} out of range ({} spheres)",
            index.0,
            self.spheres
        );
    }

    /// Swap in `next` and release the handle it replaces.
    fn replace(&mut self, next: B::Scene) {
        if let Some(previous) = self.current.replace(next) {
            self.backend.release_scene(previous);
        }
        self.mutations += 1;
    }
}

impl<B: ComputeBackend> Drop for SceneStore<B> {
    fn drop(&mut self) {
        if let Some(last) = self.current.take() {
            self.backend.release_scene(last);
            tracing::debug!(mutations = self.mutations, "scene store released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceSelector, RenderRequest};
    use futball_common::Color;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeSet;

    /// Backend that only tracks handle lifetimes and object positions.
    #[derive(Default)]
    struct LedgerBackend {
        next_id: Cell<u64>,
        live: RefCell<BTreeSet<u64>>,
        released: Cell<u64>,
        fail_next: Cell<bool>,
    }

    struct LedgerScene {
        id: u64,
        spheres: Vec<Sphere>,
        planes: usize,
    }

    impl LedgerBackend {
        fn derive(&self, spheres: Vec<Sphere>, planes: usize) -> Result<LedgerScene, BackendError> {
            if self.fail_next.replace(false) {
                return Err(BackendError::OutOfMemory("ledger".into()));
            }
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.live.borrow_mut().insert(id);
            Ok(LedgerScene {
                id,
                spheres,
                planes,
            })
        }

        fn live(&self) -> usize {
            self.live.borrow().len()
        }
    }

    impl ComputeBackend for LedgerBackend {
        type Scene = LedgerScene;
        type PixelGrid = ();

        fn create(_selector: &DeviceSelector) -> Result<Self, BackendError> {
            Ok(Self::default())
        }

        fn name(&self) -> &str {
            "ledger"
        }

        fn empty_scene(&self) -> Result<LedgerScene, BackendError> {
            self.derive(Vec::new(), 0)
        }

        fn add_sphere(
            &self,
            scene: &LedgerScene,
            sphere: &Sphere,
        ) -> Result<(LedgerScene, SphereIndex), BackendError> {
            let mut spheres = scene.spheres.clone();
            spheres.push(*sphere);
            let index = SphereIndex(scene.spheres.len() as i32);
            Ok((self.derive(spheres, scene.planes)?, index))
        }

        fn add_plane(
            &self,
            scene: &LedgerScene,
            _plane: &Plane,
        ) -> Result<(LedgerScene, PlaneIndex), BackendError> {
            let index = PlaneIndex(scene.planes as i32);
            Ok((self.derive(scene.spheres.clone(), scene.planes + 1)?, index))
        }

        fn add_light(&self, scene: &LedgerScene, _light: &Light) -> Result<LedgerScene, BackendError> {
            self.derive(scene.spheres.clone(), scene.planes)
        }

        fn set_sphere_radius(
            &self,
            scene: &LedgerScene,
            index: SphereIndex,
            radius: f32,
        ) -> Result<LedgerScene, BackendError> {
            let mut spheres = scene.spheres.clone();
            spheres[index.0 as usize].radius = radius;
            self.derive(spheres, scene.planes)
        }

        fn set_sphere_positions(
            &self,
            scene: &LedgerScene,
            indices: &[SphereIndex],
            xs: &[f32],
            ys: &[f32],
            zs: &[f32],
        ) -> Result<LedgerScene, BackendError> {
            let mut spheres = scene.spheres.clone();
            for (i, index) in indices.iter().enumerate() {
                spheres[index.0 as usize].center = Vec3::new(xs[i], ys[i], zs[i]);
            }
            self.derive(spheres, scene.planes)
        }

        fn render(&self, _scene: &LedgerScene, _request: &RenderRequest) -> Result<(), BackendError> {
            Ok(())
        }

        fn read_pixels(&self, _grid: &(), _out: &mut [u32]) -> Result<(), BackendError> {
            Ok(())
        }

        fn release_scene(&self, scene: LedgerScene) {
            assert!(self.live.borrow_mut().remove(&scene.id), "double release of {}", scene.id);
            self.released.set(self.released.get() + 1);
        }

        fn release_pixel_grid(&self, _grid: ()) {}
    }

    fn ball(x: f32) -> Sphere {
        Sphere {
            center: Vec3::new(x, 0.0, 0.0),
            radius: 1.0,
            color: Color::RED,
            shininess: 0.0,
        }
    }

    fn light() -> Light {
        Light {
            position: Vec3::new(0.0, 10.0, 0.0),
            color: Color::WHITE,
            intensity: 1.0,
        }
    }

    fn floor() -> Plane {
        Plane {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            color: Color::WHITE,
            shininess: 0.2,
        }
    }

    fn store() -> SceneStore<LedgerBackend> {
        SceneStore::new(Rc::new(LedgerBackend::default())).unwrap()
    }

    #[test]
    fn new_store_holds_one_handle() {
        let s = store();
        assert_eq!(s.backend().live(), 1);
        assert_eq!(s.mutations(), 0);
    }

    #[test]
    fn every_mutation_releases_exactly_one_handle() {
        let mut s = store();
        let a = s.add_sphere(ball(0.0)).unwrap();
        s.add_plane(floor()).unwrap();
        s.add_light(light()).unwrap();
        s.set_sphere_radius(a, 2.0).unwrap();
        s.set_sphere_positions(&[a], &[Vec3::ONE]).unwrap();

        assert_eq!(s.mutations(), 5);
        assert_eq!(s.backend().live(), 1);
        // the empty scene plus one per mutation were created
        assert_eq!(s.backend().next_id.get(), 6);
        assert_eq!(s.backend().released.get(), 5);
    }

    #[test]
    fn dropping_store_releases_last_handle() {
        let backend = Rc::new(LedgerBackend::default());
        {
            let mut s = SceneStore::new(backend.clone()).unwrap();
            s.add_light(light()).unwrap();
        }
        assert_eq!(backend.live(), 0);
        assert_eq!(backend.released.get(), 2);
    }

    #[test]
    fn indices_are_stable_across_unrelated_mutations() {
        let mut s = store();
        let first = s.add_sphere(ball(0.0)).unwrap();
        let plane = s.add_plane(floor()).unwrap();
        s.add_light(light()).unwrap();
        let second = s.add_sphere(ball(5.0)).unwrap();

        assert_eq!(first, SphereIndex(0));
        assert_eq!(second, SphereIndex(1));
        assert_eq!(plane, PlaneIndex(0));

        s.set_sphere_positions(&[second], &[Vec3::new(9.0, 0.0, 0.0)])
            .unwrap();
        let spheres = &s.current().spheres;
        assert_eq!(spheres[0].center, Vec3::ZERO);
        assert_eq!(spheres[1].center, Vec3::new(9.0, 0.0, 0.0));
    }

    #[test]
    fn failed_mutation_keeps_current_handle() {
        let mut s = store();
        s.add_sphere(ball(0.0)).unwrap();
        s.backend().fail_next.set(true);
        assert!(s.add_light(light()).is_err());

        assert_eq!(s.backend().live(), 1);
        assert_eq!(s.light_count(), 0);
        assert_eq!(s.current().spheres.len(), 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_is_fatal() {
        let mut s = store();
        s.add_sphere(ball(0.0)).unwrap();
        let _ = s.set_sphere_radius(SphereIndex(3), 1.0);
    }

    #[test]
    #[should_panic(expected = "one position per sphere index")]
    fn mismatched_bulk_update_is_fatal() {
        let mut s = store();
        let a = s.add_sphere(ball(0.0)).unwrap();
        let _ = s.set_sphere_positions(&[a], &[Vec3::ZERO, Vec3::ONE]);
    }
}
