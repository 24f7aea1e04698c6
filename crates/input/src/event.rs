use futball_common::MovementIntent;

/// A logical key. Embodiments map their physical keys onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Jump,
    TurnLeft,
    TurnRight,
    /// One reflection bounce fewer, down to a single bounce. Acts on press.
    FewerBounces,
    /// One reflection bounce more. Acts on press.
    MoreBounces,
    /// Requests the loop to stop, same as [`InputEvent::Quit`].
    Escape,
}

/// One input occurrence, drained once per tick by the game loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Quit,
    Key { key: Key, pressed: bool },
    /// Relative pointer motion in pixels.
    PointerMotion { dx: f32, dy: f32 },
}

/// Which movement keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    intent: MovementIntent,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press or release. Returns false for keys that carry no
    /// movement state.
    pub fn apply(&mut self, key: Key, pressed: bool) -> bool {
        let slot = match key {
            Key::Forward => &mut self.intent.forward,
            Key::Back => &mut self.intent.back,
            Key::StrafeLeft => &mut self.intent.strafe_left,
            Key::StrafeRight => &mut self.intent.strafe_right,
            Key::Jump => &mut self.intent.jump,
            Key::TurnLeft => &mut self.intent.turn_left,
            Key::TurnRight => &mut self.intent.turn_right,
            Key::FewerBounces | Key::MoreBounces | Key::Escape => return false,
        };
        if *slot != pressed {
            tracing::trace!(?key, pressed, "key state changed");
        }
        *slot = pressed;
        true
    }

    pub fn is_down(&self, key: Key) -> bool {
        match key {
            Key::Forward => self.intent.forward,
            Key::Back => self.intent.back,
            Key::StrafeLeft => self.intent.strafe_left,
            Key::StrafeRight => self.intent.strafe_right,
            Key::Jump => self.intent.jump,
            Key::TurnLeft => self.intent.turn_left,
            Key::TurnRight => self.intent.turn_right,
            Key::FewerBounces | Key::MoreBounces | Key::Escape => false,
        }
    }

    /// Snapshot of the held keys for a physics tick.
    pub fn intent(&self) -> MovementIntent {
        self.intent
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.intent = MovementIntent::default();
    }
}
