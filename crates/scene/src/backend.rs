use futball_common::{Color, Light, LookAngles, Plane, PlaneIndex, Sphere, SphereIndex};
use glam::Vec3;

/// Failures reported by a compute backend. All of them are fatal to a
/// running session: there is no safe intermediate scene to resume from.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("no usable compute device ({0})")]
    NoDevice(String),
    #[error("device request failed: {0}")]
    DeviceRequest(String),
    #[error("backend resources exhausted: {0}")]
    OutOfMemory(String),
    #[error("pixel readback failed: {0}")]
    Readback(String),
    #[error("invalid render request: {0}")]
    InvalidRequest(String),
}

/// Optional hint naming the compute device to use. Read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector(Option<String>);

impl DeviceSelector {
    /// No preference: the backend picks its default device.
    pub fn any() -> Self {
        Self(None)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::from(Some(name.into()))
    }

    pub fn hint(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Case-insensitive substring match against a device name. A selector
    /// without a hint matches everything.
    pub fn matches(&self, device_name: &str) -> bool {
        match &self.0 {
            Some(hint) => device_name
                .to_ascii_lowercase()
                .contains(&hint.to_ascii_lowercase()),
            None => true,
        }
    }
}

impl From<Option<String>> for DeviceSelector {
    fn from(value: Option<String>) -> Self {
        // an empty or blank value means "unset"
        Self(value.filter(|s| !s.trim().is_empty()))
    }
}

/// Parameters of one call to the backend's render entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub width: i32,
    pub height: i32,
    /// Horizontal field of view in degrees.
    pub fov: i32,
    pub eye: Vec3,
    pub look: LookAngles,
    pub ambient: Color,
    pub ambient_intensity: f32,
    pub bounce_limit: i32,
}

impl RenderRequest {
    pub fn pixel_count(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(BackendError::InvalidRequest(format!(
                "frame size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.bounce_limit < 0 {
            return Err(BackendError::InvalidRequest(format!(
                "negative bounce limit {}",
                self.bounce_limit
            )));
        }
        Ok(())
    }
}

/// The narrow contract a ray-tracing backend exposes.
///
/// Scenes are opaque and append/rebuild oriented: every mutation takes the
/// current scene by reference and returns a brand-new one. The caller owns
/// both afterwards and must hand the old one back through
/// [`release_scene`](Self::release_scene). [`SceneStore`](crate::SceneStore)
/// does that bookkeeping; nothing else should hold scenes.
///
/// Dropping the backend value destroys its execution context.
pub trait ComputeBackend {
    /// Opaque backend-resident scene. Deliberately not `Clone`.
    type Scene;
    /// Transient result of one render call.
    type PixelGrid;

    /// Create the backend configuration and execution context.
    fn create(selector: &DeviceSelector) -> Result<Self, BackendError>
    where
        Self: Sized;

    /// Human-readable backend/device name for logs.
    fn name(&self) -> &str;

    fn empty_scene(&self) -> Result<Self::Scene, BackendError>;

    fn add_sphere(
        &self,
        scene: &Self::Scene,
        sphere: &Sphere,
    ) -> Result<(Self::Scene, SphereIndex), BackendError>;

    fn add_plane(
        &self,
        scene: &Self::Scene,
        plane: &Plane,
    ) -> Result<(Self::Scene, PlaneIndex), BackendError>;

    fn add_light(&self, scene: &Self::Scene, light: &Light) -> Result<Self::Scene, BackendError>;

    fn set_sphere_radius(
        &self,
        scene: &Self::Scene,
        index: SphereIndex,
        radius: f32,
    ) -> Result<Self::Scene, BackendError>;

    /// Move the spheres named by `indices` to `(xs[i], ys[i], zs[i])`.
    /// All four slices have the same length.
    fn set_sphere_positions(
        &self,
        scene: &Self::Scene,
        indices: &[SphereIndex],
        xs: &[f32],
        ys: &[f32],
        zs: &[f32],
    ) -> Result<Self::Scene, BackendError>;

    /// Trace one frame. Blocks until the backend has finished.
    fn render(
        &self,
        scene: &Self::Scene,
        request: &RenderRequest,
    ) -> Result<Self::PixelGrid, BackendError>;

    /// Copy a finished grid into `out` (`width * height` packed pixels,
    /// row-major from the top-left).
    fn read_pixels(&self, grid: &Self::PixelGrid, out: &mut [u32]) -> Result<(), BackendError>;

    fn release_scene(&self, scene: Self::Scene);

    fn release_pixel_grid(&self, grid: Self::PixelGrid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_without_hint_matches_anything() {
        assert!(DeviceSelector::any().matches("NVIDIA GeForce RTX 3080"));
        assert!(DeviceSelector::any().hint().is_none());
    }

    #[test]
    fn selector_matches_case_insensitively() {
        let s = DeviceSelector::named("geforce");
        assert!(s.matches("NVIDIA GeForce RTX 3080"));
        assert!(!s.matches("Intel(R) UHD Graphics 620"));
    }

    #[test]
    fn blank_selector_means_no_preference() {
        assert_eq!(DeviceSelector::from(Some("  ".to_string())), DeviceSelector::any());
        assert_eq!(DeviceSelector::from(None), DeviceSelector::any());
    }

    #[test]
    fn empty_request_is_rejected() {
        let request = RenderRequest {
            width: 0,
            height: 10,
            fov: 90,
            eye: Vec3::ZERO,
            look: LookAngles::default(),
            ambient: Color::WHITE,
            ambient_intensity: 0.0,
            bounce_limit: 1,
        };
        assert!(matches!(
            request.validate(),
            Err(BackendError::InvalidRequest(_))
        ));
        assert_eq!(request.pixel_count(), 0);
    }
}
