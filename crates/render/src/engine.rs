use crate::frame::FrameBuffer;
use futball_common::{Color, LookAngles, RenderConfig};
use futball_scene::{BackendError, ComputeBackend, DeviceSelector, RenderRequest, SceneStore};
use glam::Vec3;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("frame size {width}x{height} is empty")]
    EmptyFrame { width: u32, height: u32 },
}

/// Per-frame render parameters: the eye and the lighting/quality knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Horizontal field of view in degrees.
    pub fov: i32,
    pub eye: Vec3,
    pub look: LookAngles,
    pub ambient: Color,
    pub ambient_intensity: f32,
    pub bounce_limit: i32,
}

impl RenderView {
    /// View from `eye` with the quality settings of `config`.
    pub fn from_config(config: &RenderConfig, eye: Vec3, look: LookAngles) -> Self {
        Self {
            fov: config.fov,
            eye,
            look,
            ambient: config.ambient,
            ambient_intensity: config.ambient_intensity,
            bounce_limit: config.bounce_limit,
        }
    }

    /// Same view with a different reflection depth.
    pub fn with_bounce_limit(self, bounce_limit: i32) -> Self {
        Self {
            bounce_limit,
            ..self
        }
    }
}

/// Owner of the backend context, the scene, and the frame buffer.
///
/// Field order is drop order: the frame buffer goes first, then the scene
/// store releases the last scene handle, then the context itself.
pub struct Engine<B: ComputeBackend> {
    frame: FrameBuffer,
    scene: SceneStore<B>,
    backend: Rc<B>,
}

impl<B: ComputeBackend> Engine<B> {
    /// Initialize the backend, an empty scene, and a zeroed
    /// `width * height` frame buffer.
    pub fn create(width: u32, height: u32, selector: &DeviceSelector) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyFrame { width, height });
        }
        let backend = Rc::new(B::create(selector)?);
        let scene = SceneStore::new(Rc::clone(&backend))?;
        tracing::info!(backend = backend.name(), width, height, "render engine created");
        Ok(Self {
            frame: FrameBuffer::new(width, height),
            scene,
            backend,
        })
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scene(&self) -> &SceneStore<B> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneStore<B> {
        &mut self.scene
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Trace the current scene into the frame buffer. Blocks until the
    /// backend is done.
    pub fn render(&mut self, view: &RenderView) -> Result<(), RenderError> {
        let _span = tracing::debug_span!("render").entered();
        let request = RenderRequest {
            width: self.frame.width() as i32,
            height: self.frame.height() as i32,
            fov: view.fov,
            eye: view.eye,
            look: view.look,
            ambient: view.ambient,
            ambient_intensity: view.ambient_intensity,
            bounce_limit: view.bounce_limit,
        };
        let grid = self.backend.render(self.scene.current(), &request)?;
        let grid = GridGuard {
            backend: &*self.backend,
            grid: Some(grid),
        };
        self.backend.read_pixels(grid.get(), self.frame.pixels_mut())?;
        Ok(())
    }

    /// Release the frame buffer, the scene, and the backend context, in that
    /// order. The engine is consumed.
    pub fn destroy(self) {
        let Self {
            frame,
            scene,
            backend,
        } = self;
        drop(frame);
        let mutations = scene.mutations();
        drop(scene);
        drop(backend);
        tracing::info!(mutations, "render engine destroyed");
    }
}

/// Releases a transient pixel grid when it goes out of scope.
struct GridGuard<'a, B: ComputeBackend> {
    backend: &'a B,
    grid: Option<B::PixelGrid>,
}

impl<B: ComputeBackend> GridGuard<'_, B> {
    fn get(&self) -> &B::PixelGrid {
        self.grid.as_ref().expect("grid is held until the guard drops")
    }
}

impl<B: ComputeBackend> Drop for GridGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(grid) = self.grid.take() {
            self.backend.release_pixel_grid(grid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoftwareBackend;
    use futball_common::Plane;

    fn view() -> RenderView {
        RenderView {
            fov: 90,
            eye: Vec3::new(0.0, 50.0, 0.0),
            look: LookAngles::default(),
            ambient: Color::WHITE,
            ambient_intensity: 0.5,
            bounce_limit: 3,
        }
    }

    fn engine(width: u32, height: u32) -> Engine<SoftwareBackend> {
        Engine::create(width, height, &DeviceSelector::any()).unwrap()
    }

    #[test]
    fn create_rejects_empty_frame() {
        let err = Engine::<SoftwareBackend>::create(0, 10, &DeviceSelector::any()).err();
        assert!(matches!(err, Some(RenderError::EmptyFrame { .. })));
    }

    #[test]
    fn plane_only_scene_fills_the_whole_frame() {
        let mut engine = engine(16, 12);
        engine
            .scene_mut()
            .add_plane(Plane {
                point: Vec3::ZERO,
                normal: Vec3::Y,
                color: Color::RED,
                shininess: 0.0,
            })
            .unwrap();
        engine.render(&view()).unwrap();

        let frame = engine.frame();
        assert_eq!(frame.len(), 16 * 12);
        // ambient-only: the floor shows half-lit red, the sky half gray
        assert_eq!(frame.pixel(0, 11), Color::from_rgb(128, 0, 0).0);
        assert_eq!(frame.pixel(0, 0), Color::from_rgb(128, 128, 128).0);
    }

    #[test]
    fn render_releases_its_pixel_grid() {
        let mut engine = engine(8, 8);
        for _ in 0..3 {
            engine.render(&view()).unwrap();
        }
        let stats = engine.backend().stats();
        assert_eq!(stats.grids_created, 3);
        assert_eq!(stats.live_grids(), 0);
        assert_eq!(stats.live_scenes(), 1);
    }

    #[test]
    fn failed_render_leaves_frame_untouched() {
        let mut engine = engine(4, 4);
        let bad = RenderView {
            bounce_limit: -1,
            ..view()
        };
        assert!(engine.render(&bad).is_err());
        assert!(engine.frame().pixels().iter().all(|&p| p == 0));
        assert_eq!(engine.backend().stats().live_grids(), 0);
    }

    #[test]
    fn view_from_config_copies_quality_settings() {
        let config = RenderConfig::default();
        let v = RenderView::from_config(&config, Vec3::ONE, LookAngles::default());
        assert_eq!(v.fov, 105);
        assert_eq!(v.bounce_limit, 5);
        assert_eq!(v.eye, Vec3::ONE);
    }
}
