mod connection;
mod endpoint;
mod protocol;
mod simulator;
mod stats;
mod tracking;

pub use connection::{ClientConnection, ConnectionManager, ConnectionState};
pub use endpoint::NetworkEndpoint;
pub use protocol::{
    Codec, ColliderWire, DEFAULT_PORT, DEFAULT_TICK_RATE, DynamicRecord, InputEntry, InputFlags,
    InputWire, MAX_PACKET_SIZE, Message, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet, PacketHeader,
    ProtocolError, StaticRecord, chunk_static_objects, sequence_greater_than,
};
pub use simulator::NetworkSimulator;
pub use stats::{NetworkStats, PacketLossSimulation};
pub use tracking::{AckTracker, PendingPacket, ReceiveTracker, ewma_rtt};
