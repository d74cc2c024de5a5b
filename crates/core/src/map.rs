//! Static-world bootstrap helper. Kept in simplified form from teacher `map/objects.rs`;
//! grounded in `original_source/Server/Server.cpp`'s initial `createObject` calls for the
//! static world. `MapObjectKind::DynamicBox` is dropped — spawning a `DynamicEntity` needs
//! the full mass/elasticity/drag/friction set from `entity::DynamicEntity::new`, which this
//! helper doesn't have enough information to fill in; level code constructs those directly.

use glam::Vec3;

use crate::entity::StaticEntity;
use crate::physics::Collider;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapObjectKind {
    Ground,
    StaticBox,
}

#[derive(Debug, Clone)]
pub struct MapObject {
    pub kind: MapObjectKind,
    pub type_id: i32,
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl MapObject {
    pub fn ground(type_id: i32, position: Vec3, half_size: f32) -> Self {
        Self {
            kind: MapObjectKind::Ground,
            type_id,
            position,
            half_extents: Vec3::new(half_size, 0.1, half_size),
        }
    }

    pub fn static_box(type_id: i32, position: Vec3, half_extents: Vec3) -> Self {
        Self { kind: MapObjectKind::StaticBox, type_id, position, half_extents }
    }

    pub fn to_static_entity(&self) -> StaticEntity {
        StaticEntity {
            type_id: self.type_id,
            position: self.position,
            rotation: Vec3::ZERO,
            collider: Some(Collider::OrientedBox { half_extents: self.half_extents }),
        }
    }
}

/// A full static-world layout, ready to hand to `entity::World::add_static` one at a time
/// or flatten for `net::chunk_static_objects`.
#[derive(Debug, Clone, Default)]
pub struct MapBlueprint {
    pub objects: Vec<MapObject>,
}

impl MapBlueprint {
    pub fn new() -> Self {
        Self { objects: Vec::new() }
    }

    pub fn add(&mut self, object: MapObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn static_entities(&self) -> Vec<StaticEntity> {
        self.objects.iter().map(MapObject::to_static_entity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_plane_is_a_thin_wide_box() {
        let ground = MapObject::ground(0, Vec3::ZERO, 50.0);
        assert_eq!(ground.half_extents, Vec3::new(50.0, 0.1, 50.0));
    }

    #[test]
    fn blueprint_flattens_to_static_entities_in_insertion_order() {
        let mut blueprint = MapBlueprint::new();
        blueprint
            .add(MapObject::ground(0, Vec3::ZERO, 50.0))
            .add(MapObject::static_box(1, Vec3::new(5.0, 1.0, 0.0), Vec3::splat(1.0)));

        let entities = blueprint.static_entities();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].type_id, 0);
        assert_eq!(entities[1].type_id, 1);
    }
}
