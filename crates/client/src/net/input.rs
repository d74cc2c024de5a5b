//! Keyboard-driven input capture for the terminal client. There is no mouse/3D view here
//! (the teacher's `wgpu`/`winit` render stack is out of scope, spec.md's Non-goals), so
//! look/aim is approximated with the arrow keys feeding `mouse_delta` each frame they're held,
//! exactly like a real client would feed accumulated mouse motion.

use std::collections::HashSet;

use crossterm::event::KeyCode;
use netphys_core::{InputFlags, InputWire};

const LOOK_RATE: f32 = 90.0; // degrees/sec equivalent fed as mouse_delta units

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
}

impl InputState {
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Converts currently-held keys into one `InputWire` sample (spec.md §3/SPEC_FULL.md §3).
    pub fn to_wire(&self, dt: f32) -> InputWire {
        let mut movement = [0.0f32; 2];
        if self.is_held(KeyCode::Char('d')) {
            movement[0] += 1.0;
        }
        if self.is_held(KeyCode::Char('a')) {
            movement[0] -= 1.0;
        }
        if self.is_held(KeyCode::Char('w')) {
            movement[1] += 1.0;
        }
        if self.is_held(KeyCode::Char('s')) {
            movement[1] -= 1.0;
        }

        let mut mouse_delta = [0.0f32; 2];
        if self.is_held(KeyCode::Right) {
            mouse_delta[0] += LOOK_RATE * dt;
        }
        if self.is_held(KeyCode::Left) {
            mouse_delta[0] -= LOOK_RATE * dt;
        }
        if self.is_held(KeyCode::Down) {
            mouse_delta[1] += LOOK_RATE * dt;
        }
        if self.is_held(KeyCode::Up) {
            mouse_delta[1] -= LOOK_RATE * dt;
        }

        let mut flags = InputFlags::empty();
        if self.is_held(KeyCode::Char(' ')) {
            flags |= InputFlags::JUMP;
        }
        if self.is_held(KeyCode::Char('f')) {
            flags |= InputFlags::FIRE;
        }

        InputWire {
            movement,
            mouse_delta,
            mouse_pos: [0.0, 0.0],
            flags,
            extra_axes: [0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_right_combine_on_the_movement_axes() {
        let mut input = InputState::default();
        input.set_key(KeyCode::Char('w'), true);
        input.set_key(KeyCode::Char('d'), true);

        let wire = input.to_wire(1.0 / 60.0);
        assert_eq!(wire.movement, [1.0, 1.0]);
    }

    #[test]
    fn releasing_a_key_clears_its_axis() {
        let mut input = InputState::default();
        input.set_key(KeyCode::Char('w'), true);
        input.set_key(KeyCode::Char('w'), false);

        let wire = input.to_wire(1.0 / 60.0);
        assert_eq!(wire.movement, [0.0, 0.0]);
    }

    #[test]
    fn jump_and_fire_map_to_flags() {
        let mut input = InputState::default();
        input.set_key(KeyCode::Char(' '), true);
        input.set_key(KeyCode::Char('f'), true);

        let wire = input.to_wire(1.0 / 60.0);
        assert!(wire.jump());
        assert!(wire.fire());
    }
}
