//! Entity registry (C2/C4 boundary): `objectId → entity` storage, id allocation, the
//! per-tick physics + collision pass. Generalized from teacher `snapshot/world.rs`'s
//! `HashMap<u32, Entity>` registry (`spawn`/`despawn`/`next_entity_id`), dropping its
//! delta-snapshot machinery (spec.md §4.4 step 4 broadcasts a full `UPDATE` every tick).

use std::collections::HashMap;

use crate::physics::{self, ContactBody};

use super::entity::{DynamicEntity, NetworkedEntity, StaticEntity};
use super::player::PlayerEntity;

/// First object id handed out; ids below this are reserved for client ids (spec.md §3).
pub const FIRST_OBJECT_ID: u32 = 101;
pub const FIRST_CLIENT_ID: u32 = 1;

pub struct World {
    pub statics: Vec<StaticEntity>,
    entities: Vec<NetworkedEntity>,
    index: HashMap<u32, usize>,
    next_object_id: u32,
    dead: Vec<u32>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            statics: Vec::new(),
            entities: Vec::new(),
            index: HashMap::new(),
            next_object_id: FIRST_OBJECT_ID,
            dead: Vec::new(),
        }
    }

    pub fn add_static(&mut self, entity: StaticEntity) {
        self.statics.push(entity);
    }

    /// Allocates the next `objectId` and hands it to `factory`, which must return an entity
    /// stamped with that id (spec.md §4.4's `gameObjectFactory` contract). Rejects a
    /// mismatched id rather than silently fixing it up, per spec.md §7's factory-failure
    /// handling.
    pub fn spawn_dynamic(&mut self, factory: impl FnOnce(u32) -> DynamicEntity) -> Option<u32> {
        let id = self.next_object_id;
        let entity = factory(id);
        if entity.object_id != id {
            log::error!("gameObjectFactory returned mismatched object id {} (expected {id})", entity.object_id);
            return None;
        }
        self.next_object_id += 1;
        self.insert(NetworkedEntity::Object(entity));
        Some(id)
    }

    /// A player's `objectId` is its `clientId` (spec.md §4.4's `applyServerUpdate` relies on
    /// `objectId == clientId` to recognize the owning client's own mirror). The id is supplied
    /// by the caller rather than drawn from a counter of our own: `ConnectionManager` is the
    /// sole authority on `clientId` assignment (stamped at `ConnectionRequest` time), and a
    /// second counter here could drift from it if handshakes complete out of request order.
    pub fn spawn_player(
        &mut self,
        client_id: u32,
        factory: impl FnOnce(u32) -> PlayerEntity,
    ) -> Option<u32> {
        let object_id = client_id;
        let entity = factory(object_id);
        if entity.base.object_id != object_id || entity.client_id != client_id {
            log::error!("clientObjectFactory returned mismatched ids for client {client_id}");
            return None;
        }
        self.insert(NetworkedEntity::Player(entity));
        Some(object_id)
    }

    /// Removes a player's entity immediately on disconnect, bypassing `despawn`'s
    /// reserved-id guard — client disconnect is a distinct path from the generic
    /// `destroy_object`, per spec.md §4.4's "Client disconnect" paragraph.
    pub fn remove_player(&mut self, object_id: u32) -> bool {
        self.remove(object_id)
    }

    /// Inserts an entity already stamped with its id, bypassing `spawn_dynamic`/`spawn_player`'s
    /// counters. Used by client mirrors, whose ids are dictated by
    /// `CREATE_GAME_OBJECT`/`CREATE_CLIENT_OBJECT` rather than locally allocated (spec.md §3's
    /// "Client-side mirror").
    pub fn insert_mirror(&mut self, entity: NetworkedEntity) {
        self.insert(entity);
    }

    /// Removes any entity by id immediately, regardless of range. The server's own removal
    /// paths (`despawn` + deferred drain, `remove_player`) wrap this with their own timing and
    /// id-range rules; client mirrors call it directly on `DESTROY_GAME_OBJECT`.
    pub fn remove(&mut self, object_id: u32) -> bool {
        let Some(idx) = self.index.remove(&object_id) else { return false };
        self.entities.swap_remove(idx);
        if let Some(moved) = self.entities.get(idx) {
            self.index.insert(moved.object_id(), idx);
        }
        true
    }

    fn insert(&mut self, entity: NetworkedEntity) {
        let id = entity.object_id();
        self.index.insert(id, self.entities.len());
        self.entities.push(entity);
    }

    /// Marks an object for destruction; the broadcast is deferred to the caller's tick drain
    /// (spec.md §4.4's `destroyObject` defers the reliable `DESTROY` to the tick boundary).
    pub fn despawn(&mut self, object_id: u32) -> bool {
        if object_id < FIRST_OBJECT_ID {
            return false;
        }
        if self.index.contains_key(&object_id) {
            self.dead.push(object_id);
            true
        } else {
            false
        }
    }

    pub fn drain_dead(&mut self) -> Vec<u32> {
        let dead: Vec<u32> = std::mem::take(&mut self.dead);
        for id in &dead {
            if let Some(idx) = self.index.remove(id) {
                self.entities.swap_remove(idx);
                if let Some(moved) = self.entities.get(idx) {
                    self.index.insert(moved.object_id(), idx);
                }
            }
        }
        dead
    }

    pub fn get(&self, object_id: u32) -> Option<&NetworkedEntity> {
        self.index.get(&object_id).map(|&i| &self.entities[i])
    }

    pub fn get_mut(&mut self, object_id: u32) -> Option<&mut NetworkedEntity> {
        self.index.get(&object_id).copied().map(move |i| &mut self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkedEntity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NetworkedEntity> {
        self.entities.iter_mut()
    }

    /// Integrates every dynamic/player entity by `dt` (spec.md §4.2's `physics_step`).
    pub fn physics_step(&mut self, dt: f32) {
        for entity in &mut self.entities {
            entity.physics_step(dt);
        }
    }

    /// Runs one collision sub-step: every entity against every static, then every distinct
    /// entity pair exactly once (`i < j` in registry order). Spec.md §4.4's five named
    /// categories (dynamics×statics, dynamics×dynamics, dynamics×players, players×statics,
    /// players×players) collapse to these two loops once the registry holds both kinds
    /// uniformly — the category split only matters for clarity, not for the dispatch logic.
    pub fn run_collisions(&mut self) {
        for entity in &mut self.entities {
            let Some(placement) = entity.placement() else { continue };
            for static_entity in &self.statics {
                let Some(static_placement) = static_entity.placement() else { continue };
                if let Some(contact) = physics::detect(&placement, &static_placement) {
                    let mut body = entity.contact_body().expect("placement implies collider");
                    let mut static_body = ContactBody::static_partner(static_entity.position, 1.0);
                    physics::resolve_collision(&mut body, &mut static_body, &contact, false);

                    let mut pos = body.position;
                    physics::positional_correction(
                        &mut pos,
                        None,
                        contact.normal,
                        contact.penetration,
                        body.inv_mass,
                        0.0,
                    );

                    entity.apply_contact_body(&body);
                    entity.body_mut().position = pos;
                    mark_grounded_if_vertical(entity, contact.normal);
                }
            }
        }

        let len = self.entities.len();
        for i in 0..len {
            for j in (i + 1)..len {
                let (left, right) = self.entities.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];

                let (Some(pa), Some(pb)) = (a.placement(), b.placement()) else { continue };
                let Some(contact) = physics::detect(&pa, &pb) else { continue };

                let mut body_a = a.contact_body().expect("placement implies collider");
                let mut body_b = b.contact_body().expect("placement implies collider");
                physics::resolve_collision(&mut body_a, &mut body_b, &contact, true);

                let mut pos_a = body_a.position;
                let mut pos_b = body_b.position;
                physics::positional_correction(
                    &mut pos_a,
                    Some(&mut pos_b),
                    contact.normal,
                    contact.penetration,
                    body_a.inv_mass,
                    body_b.inv_mass,
                );

                a.apply_contact_body(&body_a);
                b.apply_contact_body(&body_b);
                a.body_mut().position = pos_a;
                b.body_mut().position = pos_b;
                mark_grounded_if_vertical(a, contact.normal);
                mark_grounded_if_vertical(b, -contact.normal);
            }
        }
    }
}

fn mark_grounded_if_vertical(entity: &mut NetworkedEntity, normal_into_other: glam::Vec3) {
    // The entity's own surface normal points away from it, i.e. the negation of the `a -> b`
    // contact normal it was resolved with.
    if let Some(player) = entity.as_player_mut() {
        if -normal_into_other.y > 0.5 {
            player.set_grounded(true);
        }
    }
}
