use crate::present::Presenter;
use futball_common::GameConfig;
use futball_game::{FrameLimiter, Game};
use futball_input::{InputEvent, Key};
use futball_scene::{ComputeBackend, DeviceSelector};
use std::collections::HashSet;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Keys that steer the avatar; released in bulk when focus is lost.
const MOVEMENT_KEYS: [Key; 7] = [
    Key::Forward,
    Key::Back,
    Key::StrafeLeft,
    Key::StrafeRight,
    Key::Jump,
    Key::TurnLeft,
    Key::TurnRight,
];

/// Every physical key that [`map_key`] binds.
const BOUND_KEYS: [KeyCode; 12] = [
    KeyCode::KeyW,
    KeyCode::ArrowUp,
    KeyCode::KeyS,
    KeyCode::ArrowDown,
    KeyCode::KeyA,
    KeyCode::KeyD,
    KeyCode::Space,
    KeyCode::ArrowLeft,
    KeyCode::ArrowRight,
    KeyCode::KeyZ,
    KeyCode::KeyX,
    KeyCode::Escape,
];

/// Physical key bindings.
pub fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(Key::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(Key::Back),
        KeyCode::KeyA => Some(Key::StrafeLeft),
        KeyCode::KeyD => Some(Key::StrafeRight),
        KeyCode::Space => Some(Key::Jump),
        KeyCode::ArrowLeft => Some(Key::TurnLeft),
        KeyCode::ArrowRight => Some(Key::TurnRight),
        KeyCode::KeyZ => Some(Key::FewerBounces),
        KeyCode::KeyX => Some(Key::MoreBounces),
        KeyCode::Escape => Some(Key::Escape),
        _ => None,
    }
}

/// Winit driver for [`Game`]: one tick per pass of the event loop.
pub struct DesktopApp<B: ComputeBackend> {
    config: GameConfig,
    selector: DeviceSelector,
    // game before presenter so the engine is torn down first
    game: Option<Game<B>>,
    presenter: Option<Presenter>,
    limiter: FrameLimiter,
    pending: Vec<InputEvent>,
    /// Physical keys currently down, so that releasing one of two aliases
    /// keeps the logical key held.
    held: HashSet<KeyCode>,
    error: Option<anyhow::Error>,
}

/// Translate a physical press or release into a logical key event, or
/// `None` if it changes nothing.
fn key_transition(
    held: &mut HashSet<KeyCode>,
    code: KeyCode,
    pressed: bool,
) -> Option<InputEvent> {
    let key = map_key(code)?;
    if pressed {
        held.insert(code);
        return Some(InputEvent::Key { key, pressed });
    }
    held.remove(&code);
    let alias_down = held.iter().any(|&other| map_key(other) == Some(key));
    (!alias_down).then_some(InputEvent::Key { key, pressed })
}

impl<B: ComputeBackend> DesktopApp<B> {
    pub fn new(config: GameConfig, selector: DeviceSelector) -> Self {
        let limiter = FrameLimiter::new(config.window.target_fps);
        Self {
            config,
            selector,
            game: None,
            presenter: None,
            limiter,
            pending: Vec::new(),
            held: HashSet::new(),
            error: None,
        }
    }

    /// The error that stopped the loop, if any.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = PhysicalSize::new(self.config.window.width, self.config.window.height);
        let attrs = Window::default_attributes()
            .with_title("Futball")
            .with_inner_size(size)
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attrs)?);

        if let Err(e) = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        {
            tracing::warn!("cursor grab unavailable: {e}");
        }
        window.set_cursor_visible(false);

        let presenter = Presenter::new(
            window,
            self.config.window.width,
            self.config.window.height,
        )?;
        let game = Game::<B>::new(self.config.clone(), &self.selector)?;
        tracing::info!(
            backend = game.engine().backend().name(),
            width = self.config.window.width,
            height = self.config.window.height,
            "game started"
        );

        self.presenter = Some(presenter);
        self.game = Some(game);
        self.limiter = FrameLimiter::new(self.config.window.target_fps);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        if let Some(game) = self.game.take() {
            game.shutdown();
        }
        event_loop.exit();
    }
}

impl<B: ComputeBackend> ApplicationHandler for DesktopApp<B> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() || self.error.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(presenter) = &mut self.presenter {
            presenter.on_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                self.pending.push(InputEvent::Quit);
            }
            WindowEvent::Resized(size) => {
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.held.clear();
                self.pending.extend(
                    MOVEMENT_KEYS
                        .iter()
                        .map(|&key| InputEvent::Key { key, pressed: false }),
                );
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if let Some(event) = key_transition(&mut self.held, code, pressed) {
                    self.pending.push(event);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            let focused = self
                .presenter
                .as_ref()
                .is_some_and(|p| p.window().has_focus());
            if focused {
                self.pending.push(InputEvent::PointerMotion {
                    dx: delta.0 as f32,
                    dy: delta.1 as f32,
                });
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(game), Some(presenter)) = (&mut self.game, &mut self.presenter) else {
            return;
        };

        let dt = self.limiter.delay().as_secs_f32();
        let result = game.tick(dt, presenter, self.pending.drain(..));
        if let Err(e) = result {
            self.fail(event_loop, e.into());
            return;
        }

        if !game.is_running() {
            if let Some(game) = self.game.take() {
                game.shutdown();
            }
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_space_and_escape_are_bound() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::Forward));
        assert_eq!(map_key(KeyCode::KeyS), Some(Key::Back));
        assert_eq!(map_key(KeyCode::KeyA), Some(Key::StrafeLeft));
        assert_eq!(map_key(KeyCode::KeyD), Some(Key::StrafeRight));
        assert_eq!(map_key(KeyCode::Space), Some(Key::Jump));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn arrows_turn_and_alias_forward_back() {
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Key::Forward));
        assert_eq!(map_key(KeyCode::ArrowDown), Some(Key::Back));
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Key::TurnLeft));
        assert_eq!(map_key(KeyCode::ArrowRight), Some(Key::TurnRight));
        assert_eq!(map_key(KeyCode::KeyZ), Some(Key::FewerBounces));
        assert_eq!(map_key(KeyCode::KeyX), Some(Key::MoreBounces));
    }

    #[test]
    fn releasing_one_alias_keeps_the_key_held() {
        let mut held = HashSet::new();
        let press = |key| Some(InputEvent::Key { key, pressed: true });
        let release = |key| Some(InputEvent::Key { key, pressed: false });

        assert_eq!(key_transition(&mut held, KeyCode::KeyW, true), press(Key::Forward));
        assert_eq!(key_transition(&mut held, KeyCode::ArrowUp, true), press(Key::Forward));
        assert_eq!(key_transition(&mut held, KeyCode::ArrowUp, false), None);
        assert_eq!(key_transition(&mut held, KeyCode::KeyW, false), release(Key::Forward));
        assert_eq!(key_transition(&mut held, KeyCode::KeyQ, true), None);
        assert!(held.is_empty());
    }

    #[test]
    fn focus_loss_releases_every_movement_key() {
        assert!(!MOVEMENT_KEYS.contains(&Key::Escape));
        for code in BOUND_KEYS {
            let key = map_key(code).unwrap();
            let held_key = !matches!(key, Key::Escape | Key::FewerBounces | Key::MoreBounces);
            assert_eq!(MOVEMENT_KEYS.contains(&key), held_key, "{code:?}");
        }
    }
}
