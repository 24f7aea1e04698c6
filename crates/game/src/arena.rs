use futball_common::{GameConfig, Plane, Sphere, SphereIndex};
use futball_scene::{BackendError, ComputeBackend, SceneStore};
use glam::Vec3;

/// Submit the static arena and the avatar: the floor plane, every configured
/// light, then the avatar sphere at the spawn point. Returns the avatar's
/// sphere index.
pub fn populate_arena<B: ComputeBackend>(
    store: &mut SceneStore<B>,
    config: &GameConfig,
) -> Result<SphereIndex, BackendError> {
    store.add_plane(Plane {
        point: Vec3::new(0.0, config.physics.floor_y, 0.0),
        normal: Vec3::Y,
        color: config.arena.floor_color,
        shininess: config.arena.floor_shininess,
    })?;
    for light in &config.arena.lights {
        store.add_light(*light)?;
    }
    let avatar = store.add_sphere(Sphere {
        center: config.spawn_point(),
        radius: config.avatar.radius,
        color: config.avatar.color,
        shininess: config.avatar.shininess,
    })?;
    tracing::info!(
        lights = config.arena.lights.len(),
        avatar = avatar.0,
        "arena populated"
    );
    Ok(avatar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_render::SoftwareBackend;
    use std::rc::Rc;

    #[test]
    fn arena_has_floor_lights_and_avatar() {
        let backend = Rc::new(SoftwareBackend::new());
        let mut store = SceneStore::new(Rc::clone(&backend)).unwrap();
        let config = GameConfig::default();
        let avatar = populate_arena(&mut store, &config).unwrap();

        assert_eq!(avatar, SphereIndex(0));
        assert_eq!(store.plane_count(), 1);
        assert_eq!(store.light_count(), 4);
        assert_eq!(store.sphere_count(), 1);
        assert_eq!(backend.stats().live_scenes(), 1);
        assert_eq!(backend.stats().scenes_released, 6);
    }
}
