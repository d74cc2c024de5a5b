pub mod entity;
pub mod map;
pub mod net;
pub mod physics;
pub mod playout;
pub mod ring_buffer;
pub mod tick;

pub use entity::{DynamicEntity, FIRST_CLIENT_ID, FIRST_OBJECT_ID, NetworkedEntity, PlayerConfig, PlayerEntity, StaticEntity, World};
pub use map::{MapBlueprint, MapObject, MapObjectKind};
pub use net::{
    AckTracker, ClientConnection, Codec, ColliderWire, ConnectionManager, ConnectionState,
    DEFAULT_PORT, DEFAULT_TICK_RATE, DynamicRecord, InputEntry, InputFlags, InputWire,
    MAX_PACKET_SIZE, Message, NetworkEndpoint, NetworkSimulator, NetworkStats, PROTOCOL_MAGIC,
    PROTOCOL_VERSION, Packet, PacketHeader, PacketLossSimulation, PendingPacket, ProtocolError,
    ReceiveTracker, StaticRecord, chunk_static_objects, ewma_rtt, sequence_greater_than,
};
pub use physics::{
    Collider, Contact, ContactBody, Placement, PhysicsState, PhysicsStateDiff, RigidBodyState,
    SMOOTH_MOVE_FRACTION, SMOOTH_SNAP_DISTANCE, SMOOTH_THRESHOLD, detect, positional_correction,
    resolve_collision, rotation_matrix, smooth_towards,
};
pub use playout::{PlayoutBuffer, PlayoutEntry};
pub use ring_buffer::RingBuffer;
pub use tick::FixedTimestep;
