//! Rigid body integration, impulses and network-state reconciliation (C2).
//!
//! Grounded on `original_source/Shared/GameObject.h`'s `PhysicsState` layout and its
//! `smooth_snapDistance`/`smooth_moveFraction` constants, with the teacher `physics/world.rs`
//! method surface kept (`apply_impulse`, snapshot/restore-flavored state application) minus
//! its `rapier3d` backing.

use glam::{Mat3, Vec3};

use super::collision::rotation_matrix;
use super::shapes::Collider;

/// Position snaps instead of interpolating past this distance.
pub const SMOOTH_SNAP_DISTANCE: f32 = 10.0;
/// Below `SMOOTH_SNAP_DISTANCE` but above this, move `SMOOTH_MOVE_FRACTION` of the remaining gap.
pub const SMOOTH_THRESHOLD: f32 = 0.75;
pub const SMOOTH_MOVE_FRACTION: f32 = 0.1;

/// Moves `current` toward `target` per the fixed smoothing rule (spec.md §4.2).
pub fn smooth_towards(current: Vec3, target: Vec3) -> Vec3 {
    let delta = target - current;
    let dist = delta.length();
    if dist > SMOOTH_SNAP_DISTANCE {
        target
    } else if dist > SMOOTH_THRESHOLD {
        current + delta * SMOOTH_MOVE_FRACTION
    } else {
        current
    }
}

/// A snapshot of physics state as carried over the wire (`UpdateGameObject`/reconciliation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsState {
    pub position: Vec3,
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// A diff produced by `process_input_movement`, applied via `apply_state_diff`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsStateDiff {
    pub delta_position: Vec3,
    pub delta_rotation: Vec3,
    pub delta_velocity: Vec3,
    pub delta_angular_velocity: Vec3,
}

/// The physical body backing every `DynamicEntity` (and, by extension, `PlayerEntity`).
#[derive(Debug, Clone)]
pub struct RigidBodyState {
    pub position: Vec3,
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub elasticity: f32,
    pub linear_drag: f32,
    pub angular_drag: f32,
    pub friction: f32,
    pub lock_rotation: bool,
    pub inertia_tensor: Mat3,
    pub last_accepted_time: u64,
}

impl RigidBodyState {
    pub fn new(
        collider: &Collider,
        position: Vec3,
        rotation: Vec3,
        mass: f32,
        elasticity: f32,
        linear_drag: f32,
        angular_drag: f32,
        friction: f32,
        lock_rotation: bool,
    ) -> Self {
        Self {
            position,
            rotation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            elasticity: elasticity.clamp(0.0, 1.0),
            linear_drag: linear_drag.max(0.0),
            angular_drag: angular_drag.max(0.0),
            friction: friction.max(0.0),
            lock_rotation,
            inertia_tensor: collider.inertia_tensor(mass),
            last_accepted_time: 0,
        }
    }

    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }

    fn inv_inertia_world(&self) -> Mat3 {
        if self.lock_rotation {
            return Mat3::ZERO;
        }
        let inv_body = self.inertia_tensor.inverse();
        let r = rotation_matrix(self.rotation);
        r * inv_body * r.transpose()
    }

    pub fn as_state(&self) -> PhysicsState {
        PhysicsState {
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    /// Integrates motion by `dt` seconds (spec.md §4.2 steps 1-3; the `fixed_update` hook is
    /// the caller's responsibility so entity-level overrides can observe the integrated state).
    pub fn physics_step(&mut self, dt: f32) {
        self.position += self.velocity * dt;

        if self.lock_rotation {
            self.angular_velocity = Vec3::ZERO;
        } else {
            self.rotation += self.angular_velocity * dt;
            self.angular_velocity -= self.angular_velocity * self.angular_drag * dt;
        }

        self.velocity -= self.velocity * self.linear_drag * dt;
    }

    /// Applies an impulse `force` at world-space offset `r` from the body's origin.
    pub fn apply_impulse(&mut self, force: Vec3, r: Vec3) {
        self.velocity += force * self.inv_mass();

        if self.lock_rotation {
            return;
        }

        let rotation = rotation_matrix(self.rotation);
        let torque_world = r.cross(force);
        let torque_body = rotation.transpose() * torque_world;
        let inv_inertia_body = self.inertia_tensor.inverse();
        let angular_impulse_body = inv_inertia_body * torque_body;
        self.angular_velocity += rotation * angular_impulse_body;
    }

    pub fn contact_snapshot(&self, static_partner: bool) -> super::collision::ContactBody {
        super::collision::ContactBody {
            position: self.position,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            inv_mass: if static_partner { 0.0 } else { self.inv_mass() },
            inv_inertia_world: if static_partner { Mat3::ZERO } else { self.inv_inertia_world() },
            elasticity: self.elasticity,
            friction: self.friction,
        }
    }

    pub fn apply_contact_body(&mut self, body: &super::collision::ContactBody) {
        self.velocity = body.velocity;
        self.angular_velocity = body.angular_velocity;
    }

    /// Accepts an authoritative full state (spec.md §4.2 `update_state`). Drops stale
    /// updates, dead-reckons by the age of the update, and snap-free assigns
    /// rotation/velocities while smoothing position.
    pub fn update_state(&mut self, state: PhysicsState, state_time: u64, now_time: u64) {
        if state_time < self.last_accepted_time {
            return;
        }

        let age = now_time.saturating_sub(state_time) as f32 / 1000.0;
        let extrapolated_position = state.position + state.velocity * age;

        self.position = smooth_towards(self.position, extrapolated_position);
        self.rotation = state.rotation;
        self.velocity = state.velocity;
        self.angular_velocity = state.angular_velocity;
        self.last_accepted_time = state_time;
    }

    /// Accepts a state diff (spec.md §4.2 `apply_state_diff`), used both by the server's
    /// playout-driven movement processing and the client's reconciliation replay.
    pub fn apply_state_diff(
        &mut self,
        diff: PhysicsStateDiff,
        state_time: u64,
        now_time: u64,
        smooth: bool,
        update_accepted_time: bool,
    ) {
        if state_time < self.last_accepted_time {
            return;
        }

        let age = now_time.saturating_sub(state_time) as f32 / 1000.0;
        let target_position =
            self.position + diff.delta_position + (self.velocity + diff.delta_velocity) * age;

        if smooth {
            self.position = smooth_towards(self.position, target_position);
        } else {
            self.position = target_position;
        }

        self.rotation += diff.delta_rotation;
        self.velocity += diff.delta_velocity;
        self.angular_velocity += diff.delta_angular_velocity;

        if update_accepted_time {
            self.last_accepted_time = state_time;
        }
    }
}
