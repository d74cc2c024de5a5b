mod collision;
mod rigidbody;
mod shapes;

pub use collision::{
    Contact, ContactBody, Placement, detect, positional_correction, resolve_collision,
    rotation_matrix,
};
pub use rigidbody::{
    PhysicsState, PhysicsStateDiff, RigidBodyState, SMOOTH_MOVE_FRACTION, SMOOTH_SNAP_DISTANCE,
    SMOOTH_THRESHOLD, smooth_towards,
};
pub use shapes::Collider;
