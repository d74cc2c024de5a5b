//! World entity taxonomy (C2): `StaticEntity`, `DynamicEntity`, `PlayerEntity` as a tagged
//! variant plus capability methods, per spec.md §9's polymorphism note. Grounded on teacher
//! `snapshot/entity.rs`'s wire encode/decode shape, generalized from `Quat` to Euler `Vec3`
//! rotation to match `physics::RigidBodyState`.

use glam::Vec3;

use crate::net::{ColliderWire, DynamicRecord, StaticRecord};
use crate::physics::{Collider, ContactBody, Placement, RigidBodyState};

use super::player::PlayerEntity;

fn collider_from_wire(wire: &ColliderWire) -> Option<Collider> {
    match wire {
        ColliderWire::None => None,
        ColliderWire::Sphere { radius } => Some(Collider::Sphere { radius: *radius }),
        ColliderWire::OrientedBox { half_extents } => {
            Some(Collider::OrientedBox { half_extents: *half_extents })
        }
    }
}

fn collider_to_wire(collider: Option<Collider>) -> ColliderWire {
    match collider {
        None => ColliderWire::None,
        Some(Collider::Sphere { radius }) => ColliderWire::Sphere { radius },
        Some(Collider::OrientedBox { half_extents }) => ColliderWire::OrientedBox { half_extents },
    }
}

/// A non-moving, non-networked-individually world fixture. Has no `objectId` (spec.md §3):
/// statics are bootstrapped in bulk via `CreateStaticObjects`, never created/destroyed
/// one at a time.
#[derive(Debug, Clone)]
pub struct StaticEntity {
    pub type_id: i32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub collider: Option<Collider>,
}

impl StaticEntity {
    pub fn from_record(record: &StaticRecord) -> Self {
        Self {
            type_id: record.type_id,
            position: record.position,
            rotation: record.rotation,
            collider: collider_from_wire(&record.collider),
        }
    }

    pub fn to_record(&self) -> StaticRecord {
        StaticRecord {
            type_id: self.type_id,
            collider: collider_to_wire(self.collider),
            position: self.position,
            rotation: self.rotation,
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        self.collider.map(|c| Placement::new(c, self.position, self.rotation))
    }
}

/// A physically-simulated, individually networked world object (spec.md §3). `PlayerEntity`
/// wraps one of these with input-processing capabilities rather than inheriting from it, to
/// keep the `objectId → entity` registry free of cyclic references (spec.md §9).
#[derive(Debug, Clone)]
pub struct DynamicEntity {
    pub object_id: u32,
    pub type_id: i32,
    pub collider: Option<Collider>,
    pub body: RigidBodyState,
    /// Game-specific fields opaque to core, carried verbatim over the wire.
    pub app_fields: Vec<u8>,
}

impl DynamicEntity {
    pub fn new(
        object_id: u32,
        type_id: i32,
        collider: Option<Collider>,
        position: Vec3,
        rotation: Vec3,
        mass: f32,
        elasticity: f32,
        linear_drag: f32,
        angular_drag: f32,
        friction: f32,
        lock_rotation: bool,
        app_fields: Vec<u8>,
    ) -> Self {
        let body = RigidBodyState::new(
            collider.as_ref().unwrap_or(&Collider::Sphere { radius: 0.0 }),
            position,
            rotation,
            mass,
            elasticity,
            linear_drag,
            angular_drag,
            friction,
            lock_rotation,
        );
        Self { object_id, type_id, collider, body, app_fields }
    }

    pub fn from_record(object_id: u32, record: &DynamicRecord) -> Self {
        let collider = collider_from_wire(&record.collider);
        let mut entity = Self::new(
            object_id,
            record.type_id,
            collider,
            record.position,
            record.rotation,
            record.mass,
            record.elasticity,
            record.linear_drag,
            record.angular_drag,
            record.friction,
            record.lock_rotation,
            record.app_fields.clone(),
        );
        entity.body.velocity = record.velocity;
        entity.body.angular_velocity = record.angular_velocity;
        entity
    }

    pub fn to_record(&self) -> DynamicRecord {
        DynamicRecord {
            type_id: self.type_id,
            collider: collider_to_wire(self.collider),
            position: self.body.position,
            rotation: self.body.rotation,
            velocity: self.body.velocity,
            angular_velocity: self.body.angular_velocity,
            mass: self.body.mass,
            elasticity: self.body.elasticity,
            linear_drag: self.body.linear_drag,
            angular_drag: self.body.angular_drag,
            friction: self.body.friction,
            lock_rotation: self.body.lock_rotation,
            app_fields: self.app_fields.clone(),
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        self.collider.map(|c| Placement::new(c, self.body.position, self.body.rotation))
    }

    pub fn contact_body(&self, static_partner: bool) -> Option<ContactBody> {
        self.collider.map(|_| self.body.contact_snapshot(static_partner))
    }

    pub fn apply_contact_body(&mut self, body: &ContactBody) {
        self.body.apply_contact_body(body);
    }

    /// `fixed_update` hook: no-op by default, overridden by `PlayerEntity`'s playout-driven
    /// movement path rather than this generic tick (spec.md §4.2).
    pub fn physics_step(&mut self, dt: f32) {
        self.body.physics_step(dt);
    }
}

/// Tagged variant over everything that can occupy an `objectId` slot in the world registry.
#[derive(Debug, Clone)]
pub enum NetworkedEntity {
    Object(DynamicEntity),
    Player(PlayerEntity),
}

impl NetworkedEntity {
    pub fn object_id(&self) -> u32 {
        match self {
            NetworkedEntity::Object(o) => o.object_id,
            NetworkedEntity::Player(p) => p.base.object_id,
        }
    }

    pub fn body(&self) -> &RigidBodyState {
        match self {
            NetworkedEntity::Object(o) => &o.body,
            NetworkedEntity::Player(p) => &p.base.body,
        }
    }

    pub fn body_mut(&mut self) -> &mut RigidBodyState {
        match self {
            NetworkedEntity::Object(o) => &mut o.body,
            NetworkedEntity::Player(p) => &mut p.base.body,
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        match self {
            NetworkedEntity::Object(o) => o.placement(),
            NetworkedEntity::Player(p) => p.base.placement(),
        }
    }

    pub fn contact_body(&self) -> Option<ContactBody> {
        match self {
            NetworkedEntity::Object(o) => o.contact_body(false),
            NetworkedEntity::Player(p) => p.base.contact_body(false),
        }
    }

    pub fn apply_contact_body(&mut self, body: &ContactBody) {
        match self {
            NetworkedEntity::Object(o) => o.apply_contact_body(body),
            NetworkedEntity::Player(p) => p.base.apply_contact_body(body),
        }
    }

    pub fn physics_step(&mut self, dt: f32) {
        match self {
            NetworkedEntity::Object(o) => o.physics_step(dt),
            NetworkedEntity::Player(_) => {
                // Player motion is driven by the playout buffer's `process_input_movement`
                // calls; the generic per-tick `physics_step` only integrates drag/gravity.
                self.body_mut().physics_step(dt);
            }
        }
    }

    pub fn as_player(&self) -> Option<&PlayerEntity> {
        match self {
            NetworkedEntity::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerEntity> {
        match self {
            NetworkedEntity::Player(p) => Some(p),
            _ => None,
        }
    }
}
