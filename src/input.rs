use std::collections::HashSet;

use winit::event::KeyEvent;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Discrete actions produced by key presses; movement and FOV keys are
/// continuous and read from `KeyboardState` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    ToggleFoveation,
    ToggleWireframe,
    DumpPose,
}

/// Snapshot of which keys are currently held
#[derive(Debug, Default, Clone)]
pub struct KeyboardState {
    down: HashSet<KeyCode>,
}

impl KeyboardState {
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.down.contains(&key)
    }

    pub fn set_down(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.down.insert(key);
        } else {
            self.down.remove(&key);
        }
    }
}

/// Input collected between frames. Window callbacks only push into this;
/// the render loop drains it exactly once per frame boundary.
#[derive(Debug, Default)]
pub struct InputState {
    keyboard: KeyboardState,
    events: Vec<InputEvent>,
    mouse_dx: f64,
    mouse_dy: f64,
}

/// One frame's worth of drained input
#[derive(Debug, Default, Clone)]
pub struct FrameInput {
    pub events: Vec<InputEvent>,
    pub mouse_delta: (f32, f32),
}

impl InputState {
    pub fn handle_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state.is_pressed();
        self.keyboard.set_down(code, pressed);

        if pressed && !event.repeat {
            match code {
                KeyCode::ShiftLeft => self.events.push(InputEvent::ToggleFoveation),
                KeyCode::Space => self.events.push(InputEvent::ToggleWireframe),
                KeyCode::Digit1 => self.events.push(InputEvent::DumpPose),
                _ => {}
            }
        }
    }

    /// Raw mouse motion; positive dy is interpreted as looking up
    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_dx += dx;
        self.mouse_dy -= dy;
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Takes the queued events and accumulated mouse motion; held-key state
    /// persists across frames.
    pub fn drain(&mut self) -> FrameInput {
        let input = FrameInput {
            events: std::mem::take(&mut self.events),
            mouse_delta: (self.mouse_dx as f32, self.mouse_dy as f32),
        };
        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_state_tracks_held_keys() {
        let mut keys = KeyboardState::default();
        keys.set_down(KeyCode::KeyW, true);
        assert!(keys.is_down(KeyCode::KeyW));
        keys.set_down(KeyCode::KeyW, false);
        assert!(!keys.is_down(KeyCode::KeyW));
    }

    #[test]
    fn drain_clears_events_and_mouse_motion() {
        let mut input = InputState::default();
        input.events.push(InputEvent::DumpPose);
        input.handle_mouse_motion(4.0, -2.0);

        let frame = input.drain();
        assert_eq!(frame.events, vec![InputEvent::DumpPose]);
        assert_eq!(frame.mouse_delta, (4.0, 2.0));

        let next = input.drain();
        assert!(next.events.is_empty());
        assert_eq!(next.mouse_delta, (0.0, 0.0));
    }

    #[test]
    fn mouse_motion_accumulates_between_drains() {
        let mut input = InputState::default();
        input.handle_mouse_motion(1.0, 0.0);
        input.handle_mouse_motion(2.0, 0.0);
        assert_eq!(input.drain().mouse_delta.0, 3.0);
    }

    #[test]
    fn vertical_mouse_motion_is_inverted() {
        let mut input = InputState::default();
        input.handle_mouse_motion(0.0, 5.0);
        // moving the mouse down (positive dy) looks down
        assert_eq!(input.drain().mouse_delta.1, -5.0);
    }
}
