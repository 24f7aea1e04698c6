use crate::arena::populate_arena;
use futball_common::{GameConfig, SphereIndex};
use futball_input::{InputEvent, Key, KeyState};
use futball_player::{Eye, PlayerController};
use futball_render::{Engine, FrameBuffer, RenderError, RenderView};
use futball_scene::{BackendError, ComputeBackend, DeviceSelector};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("scene update failed: {0}")]
    Backend(#[from] BackendError),
    #[error("frame presentation failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// What was rendered this tick, handed to the [`FrameSink`] with the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub tick: u64,
    /// Duration of the tick in seconds, as handed to physics.
    pub dt: f32,
    pub eye: Eye,
    /// Reflection bounces the frame was traced with.
    pub bounce_limit: i32,
}

impl FrameInfo {
    /// Instantaneous rate implied by `dt`.
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }
}

/// Where finished frames go: a window, a file, or nowhere.
pub trait FrameSink {
    fn present(&mut self, frame: &FrameBuffer, info: &FrameInfo) -> Result<(), GameError>;
}

impl FrameSink for () {
    fn present(&mut self, _frame: &FrameBuffer, _info: &FrameInfo) -> Result<(), GameError> {
        Ok(())
    }
}

/// The game loop state: engine, player, held keys, and the avatar's sphere.
pub struct Game<B: ComputeBackend> {
    config: GameConfig,
    engine: Engine<B>,
    player: PlayerController,
    keys: KeyState,
    avatar: SphereIndex,
    bounce_limit: i32,
    running: bool,
    ticks: u64,
}

impl<B: ComputeBackend> Game<B> {
    /// Create the engine at the configured window size and populate the
    /// arena. `config` must already be validated.
    pub fn new(config: GameConfig, selector: &DeviceSelector) -> Result<Self, GameError> {
        let mut engine = Engine::<B>::create(config.window.width, config.window.height, selector)?;
        let avatar = populate_arena(engine.scene_mut(), &config)?;
        let player = PlayerController::new(&config);
        let bounce_limit = config.render.bounce_limit;
        Ok(Self {
            config,
            engine,
            player,
            keys: KeyState::new(),
            avatar,
            bounce_limit,
            running: true,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine<B> {
        &self.engine
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    pub fn avatar(&self) -> SphereIndex {
        self.avatar
    }

    /// Reflection depth used for the next render. Starts at the configured
    /// value and is changed by the bounce keys.
    pub fn bounce_limit(&self) -> i32 {
        self.bounce_limit
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one tick: render the previous state and present it, step physics
    /// by `dt` seconds, push the avatar's new position into the scene, then
    /// apply `events`.
    pub fn tick<S, I>(&mut self, dt: f32, sink: &mut S, events: I) -> Result<(), GameError>
    where
        S: FrameSink + ?Sized,
        I: IntoIterator<Item = InputEvent>,
    {
        let _span = tracing::info_span!("tick", n = self.ticks).entered();

        let eye = self.player.eye();
        let view = RenderView::from_config(&self.config.render, eye.position, eye.look)
            .with_bounce_limit(self.bounce_limit);
        self.engine.render(&view)?;
        let info = FrameInfo {
            tick: self.ticks,
            dt,
            eye,
            bounce_limit: self.bounce_limit,
        };
        sink.present(self.engine.frame(), &info)?;

        self.player.step(self.keys.intent(), dt);

        let position = self.player.state().position;
        self.engine
            .scene_mut()
            .set_sphere_positions(&[self.avatar], &[position])?;

        for event in events {
            self.handle_event(event);
        }

        self.ticks += 1;
        Ok(())
    }

    /// Apply one input event.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Quit | InputEvent::Key {
                key: Key::Escape,
                pressed: true,
            } => {
                if self.running {
                    tracing::info!(tick = self.ticks, "quit requested");
                }
                self.running = false;
            }
            InputEvent::Key {
                key: Key::FewerBounces,
                pressed: true,
            } => {
                self.bounce_limit = (self.bounce_limit - 1).max(1);
                tracing::debug!(bounce_limit = self.bounce_limit, "fewer bounces");
            }
            InputEvent::Key {
                key: Key::MoreBounces,
                pressed: true,
            } => {
                self.bounce_limit = self.bounce_limit.saturating_add(1);
                tracing::debug!(bounce_limit = self.bounce_limit, "more bounces");
            }
            InputEvent::Key { key, pressed } => {
                self.keys.apply(key, pressed);
            }
            InputEvent::PointerMotion { dx, dy } => {
                self.player.apply_look(dx, dy);
            }
        }
    }

    /// Stop the loop and release the engine: frame buffer, scene, context.
    pub fn shutdown(self) {
        tracing::info!(ticks = self.ticks, "shutting down");
        self.engine.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_render::SoftwareBackend;

    fn small_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.window.width = 32;
        config.window.height = 24;
        config
    }

    fn game() -> Game<SoftwareBackend> {
        Game::new(small_config(), &DeviceSelector::any()).unwrap()
    }

    #[test]
    fn new_game_is_running_at_spawn() {
        let g = game();
        assert!(g.is_running());
        assert_eq!(g.ticks(), 0);
        assert_eq!(g.avatar(), SphereIndex(0));
        assert_eq!(g.player().state().position.y, 50.0);
    }

    #[test]
    fn quit_and_escape_stop_the_loop() {
        let mut g = game();
        g.handle_event(InputEvent::Key {
            key: Key::Escape,
            pressed: false,
        });
        assert!(g.is_running());
        g.handle_event(InputEvent::Key {
            key: Key::Escape,
            pressed: true,
        });
        assert!(!g.is_running());

        let mut g = game();
        g.handle_event(InputEvent::Quit);
        assert!(!g.is_running());
    }

    #[test]
    fn key_events_update_held_keys() {
        let mut g = game();
        g.handle_event(InputEvent::Key {
            key: Key::Forward,
            pressed: true,
        });
        assert!(g.keys().is_down(Key::Forward));
    }

    #[test]
    fn pointer_motion_turns_player() {
        let mut g = game();
        g.handle_event(InputEvent::PointerMotion { dx: 16.0, dy: 0.0 });
        assert!((g.player().state().look.yaw - 0.5).abs() < 1e-5);
    }

    fn press(key: Key) -> InputEvent {
        InputEvent::Key { key, pressed: true }
    }

    #[test]
    fn bounce_keys_adjust_limit_down_to_one() {
        let mut g = game();
        assert_eq!(g.bounce_limit(), 5);
        g.handle_event(press(Key::MoreBounces));
        assert_eq!(g.bounce_limit(), 6);
        // releases do nothing
        g.handle_event(InputEvent::Key {
            key: Key::MoreBounces,
            pressed: false,
        });
        assert_eq!(g.bounce_limit(), 6);

        for _ in 0..10 {
            g.handle_event(press(Key::FewerBounces));
        }
        assert_eq!(g.bounce_limit(), 1);
        assert!(g.keys().intent().is_idle());
    }

    #[test]
    fn rendered_frame_reports_current_bounce_limit() {
        struct LastInfo(Option<FrameInfo>);
        impl FrameSink for LastInfo {
            fn present(&mut self, _frame: &FrameBuffer, info: &FrameInfo) -> Result<(), GameError> {
                self.0 = Some(*info);
                Ok(())
            }
        }

        let mut g = game();
        let mut sink = LastInfo(None);
        g.tick(1.0 / 60.0, &mut sink, [press(Key::FewerBounces)]).unwrap();
        assert_eq!(sink.0.map(|i| i.bounce_limit), Some(5));
        g.tick(1.0 / 60.0, &mut sink, Vec::<InputEvent>::new()).unwrap();
        assert_eq!(sink.0.map(|i| i.bounce_limit), Some(4));
    }

    #[test]
    fn tick_keeps_one_live_scene() {
        let mut g = game();
        for _ in 0..5 {
            g.tick(1.0 / 60.0, &mut (), Vec::<InputEvent>::new()).unwrap();
        }
        let stats = g.engine().backend().stats();
        assert_eq!(stats.live_scenes(), 1);
        assert_eq!(stats.live_grids(), 0);
        // empty scene, six arena objects, one position update per tick
        assert_eq!(stats.scenes_created, 1 + 6 + 5);
        assert_eq!(g.ticks(), 5);
    }

    #[test]
    fn frame_info_reports_rate() {
        let info = FrameInfo {
            tick: 0,
            dt: 0.02,
            eye: Eye::default(),
            bounce_limit: 5,
        };
        assert!((info.fps() - 50.0).abs() < 1e-3);
    }
}
