mod entity;
mod player;
mod world;

pub use entity::{DynamicEntity, NetworkedEntity, StaticEntity};
pub use player::{PlayerConfig, PlayerEntity};
pub use world::{FIRST_CLIENT_ID, FIRST_OBJECT_ID, World};
