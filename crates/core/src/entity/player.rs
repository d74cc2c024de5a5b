//! Player capability methods (`process_input_movement`/`process_input_action`), simplified
//! from the teacher's elaborate bunny-hop `player/controller.rs` down to a basic
//! ground/air accelerate-toward-target-velocity model, since nothing in spec.md or
//! `original_source/` calls for strafe-jumping mechanics — only that *some* input-driven
//! movement and a fire-and-forget action hook exist (spec.md §3/§9).

use glam::Vec3;

use crate::net::InputWire;
use crate::physics::PhysicsStateDiff;

use super::entity::DynamicEntity;

#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    pub move_speed: f32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub look_sensitivity: f32,
    pub pitch_limit: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            ground_accel: 40.0,
            air_accel: 8.0,
            jump_speed: 6.0,
            gravity: 18.0,
            look_sensitivity: 0.0022,
            pitch_limit: std::f32::consts::FRAC_PI_2 - 0.01,
        }
    }
}

/// A `DynamicEntity` wrapped with client ownership and input-processing capabilities.
#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub base: DynamicEntity,
    pub client_id: u32,
    pub config: PlayerConfig,
    grounded: bool,
}

impl PlayerEntity {
    pub fn new(base: DynamicEntity, client_id: u32, config: PlayerConfig) -> Self {
        Self { base, client_id, config, grounded: true }
    }

    /// Reports ground contact as observed by the last collision pass; used to gate air vs
    /// ground acceleration and jumping. Set by the world tick after collision resolution.
    pub fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Converts one `Input` sample into a `PhysicsStateDiff` (spec.md §4.2/§4.4). Position
    /// is left untouched here: `apply_state_diff` derives position from the velocity it
    /// receives, so this only reports the control-driven velocity/orientation changes.
    pub fn process_input_movement(&mut self, input: &InputWire, dt: f32) -> PhysicsStateDiff {
        let yaw = self.base.body.rotation.y;
        let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
        let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());

        let wish_dir = (forward * input.movement[1] + right * input.movement[0])
            .with_y(0.0);
        let wish_dir = if wish_dir.length_squared() > 1.0 {
            wish_dir.normalize()
        } else {
            wish_dir
        };
        let target_horizontal = wish_dir * self.config.move_speed;

        let accel = if self.grounded { self.config.ground_accel } else { self.config.air_accel };
        let current_horizontal = self.base.body.velocity.with_y(0.0);
        let horizontal_delta = (target_horizontal - current_horizontal)
            .clamp_length_max(accel * dt);

        let mut delta_velocity = horizontal_delta;

        if self.grounded && input.jump() {
            delta_velocity.y += self.config.jump_speed - self.base.body.velocity.y;
            self.grounded = false;
        } else {
            delta_velocity.y -= self.config.gravity * dt;
        }

        let delta_rotation = Vec3::new(
            -input.mouse_delta[1] * self.config.look_sensitivity,
            -input.mouse_delta[0] * self.config.look_sensitivity,
            0.0,
        );

        PhysicsStateDiff {
            delta_position: Vec3::ZERO,
            delta_rotation,
            delta_velocity,
            delta_angular_velocity: Vec3::ZERO,
        }
    }

    /// Fire-and-forget action processing. Core has no concept of weapons/projectiles; this
    /// is the capability seam a game built on top of this crate hooks into (spec.md §3's
    /// note that action semantics are opaque to core). Idempotent no-op by default.
    pub fn process_input_action(&mut self, _input: &InputWire, _now_ms: u64) {}

    pub fn clamp_pitch(&mut self) {
        self.base.body.rotation.x = self
            .base
            .body
            .rotation
            .x
            .clamp(-self.config.pitch_limit, self.config.pitch_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Collider;

    fn player() -> PlayerEntity {
        let base = DynamicEntity::new(
            101,
            0,
            Some(Collider::Sphere { radius: 0.5 }),
            Vec3::ZERO,
            Vec3::ZERO,
            80.0,
            0.0,
            0.0,
            0.0,
            0.5,
            true,
            Vec::new(),
        );
        PlayerEntity::new(base, 1, PlayerConfig::default())
    }

    #[test]
    fn forward_input_accelerates_toward_move_speed() {
        let mut p = player();
        let input = InputWire { movement: [0.0, 1.0], ..Default::default() };
        let diff = p.process_input_movement(&input, 1.0 / 60.0);
        assert!(diff.delta_velocity.z < 0.0 || diff.delta_velocity.x.abs() > 0.0 || diff.delta_velocity.z != 0.0);
    }

    #[test]
    fn jump_sets_upward_velocity_and_clears_grounded() {
        let mut p = player();
        assert!(p.is_grounded());
        let input = InputWire {
            flags: crate::net::InputFlags::JUMP,
            ..Default::default()
        };
        let diff = p.process_input_movement(&input, 1.0 / 60.0);
        assert!(diff.delta_velocity.y > 0.0);
        assert!(!p.is_grounded());
    }

    #[test]
    fn airborne_player_falls_under_gravity() {
        let mut p = player();
        p.set_grounded(false);
        let input = InputWire::default();
        let diff = p.process_input_movement(&input, 1.0 / 60.0);
        assert!(diff.delta_velocity.y < 0.0);
    }
}
