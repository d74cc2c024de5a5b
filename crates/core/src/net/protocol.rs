//! Wire protocol (C6): message taxonomy and little-endian byte framing.
//!
//! Messages are framed by hand rather than through an opaque archive format because
//! `CreateStaticObjects` bootstrap packets are built incrementally against an MTU budget
//! (see `chunk_static_objects`) — a whole-struct archive can't be split mid-write.

use glam::Vec3;

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4E_50_48_59; // "NPHY"
pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_TICK_RATE: u32 = 60;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("buffer ended while decoding {0}")]
    Truncated(&'static str),
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("invalid collider shape id {0}")]
    InvalidShapeId(i32),
    #[error("packet header magic/version mismatch")]
    BadHeader,
}

/// Encodes to and decodes from a flat little-endian byte buffer.
pub trait Codec: Sized {
    fn encode(&self, buf: &mut Vec<u8>);
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError>;
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize, what: &'static str) -> Result<&'a [u8], ProtocolError> {
    let end = *pos + n;
    if end > buf.len() {
        return Err(ProtocolError::Truncated(what));
    }
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

macro_rules! impl_codec_num {
    ($t:ty, $n:expr, $what:expr) => {
        impl Codec for $t {
            fn encode(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
            fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
                let bytes = take(buf, pos, $n, $what)?;
                Ok(<$t>::from_le_bytes(bytes.try_into().unwrap()))
            }
        }
    };
}

impl_codec_num!(u8, 1, "u8");
impl_codec_num!(u16, 2, "u16");
impl_codec_num!(u32, 4, "u32");
impl_codec_num!(u64, 8, "u64");
impl_codec_num!(i32, 4, "i32");
impl_codec_num!(f32, 4, "f32");

impl Codec for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(u8::decode(buf, pos)? != 0)
    }
}

/// `x, y, z` in declared order, IEEE-754 little-endian, per spec.md §6.
impl Codec for Vec3 {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.x.encode(buf);
        self.y.encode(buf);
        self.z.encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(Vec3::new(
            f32::decode(buf, pos)?,
            f32::decode(buf, pos)?,
            f32::decode(buf, pos)?,
        ))
    }
}

impl Codec for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        let bytes = self.as_bytes();
        (bytes.len() as u16).encode(buf);
        buf.extend_from_slice(bytes);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let len = u16::decode(buf, pos)? as usize;
        let bytes = take(buf, pos, len, "string")?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::Truncated("string utf8"))
    }
}

impl<T: Codec> Codec for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        (self.len() as u16).encode(buf);
        for item in self {
            item.encode(buf);
        }
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let len = u16::decode(buf, pos)? as usize;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode(buf, pos)?);
        }
        Ok(items)
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
    pub ack: u32,
    pub ack_bitfield: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32, ack: u32, ack_bitfield: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
            ack,
            ack_bitfield,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

impl Codec for PacketHeader {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.magic.encode(buf);
        self.version.encode(buf);
        self.sequence.encode(buf);
        self.ack.encode(buf);
        self.ack_bitfield.encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let header = Self {
            magic: u32::decode(buf, pos)?,
            version: u32::decode(buf, pos)?,
            sequence: u32::decode(buf, pos)?,
            ack: u32::decode(buf, pos)?,
            ack_bitfield: u32::decode(buf, pos)?,
        };
        if !header.is_valid() {
            return Err(ProtocolError::BadHeader);
        }
        Ok(header)
    }
}

/// `Collider` on the wire: `{shapeId: i32, ...shape-specific}`, `shapeId = -1` for none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderWire {
    None,
    Sphere { radius: f32 },
    OrientedBox { half_extents: Vec3 },
}

impl ColliderWire {
    pub const SHAPE_SPHERE: i32 = 0;
    pub const SHAPE_BOX: i32 = 1;
}

impl Codec for ColliderWire {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            ColliderWire::None => (-1i32).encode(buf),
            ColliderWire::Sphere { radius } => {
                Self::SHAPE_SPHERE.encode(buf);
                radius.encode(buf);
            }
            ColliderWire::OrientedBox { half_extents } => {
                Self::SHAPE_BOX.encode(buf);
                half_extents.encode(buf);
            }
        }
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let shape_id = i32::decode(buf, pos)?;
        match shape_id {
            -1 => Ok(ColliderWire::None),
            Self::SHAPE_SPHERE => Ok(ColliderWire::Sphere {
                radius: f32::decode(buf, pos)?,
            }),
            Self::SHAPE_BOX => Ok(ColliderWire::OrientedBox {
                half_extents: Vec3::decode(buf, pos)?,
            }),
            other => Err(ProtocolError::InvalidShapeId(other)),
        }
    }
}

/// One record inside a `CreateStaticObjects` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticRecord {
    pub type_id: i32,
    pub collider: ColliderWire,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Codec for StaticRecord {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.type_id.encode(buf);
        self.collider.encode(buf);
        self.position.encode(buf);
        self.rotation.encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(Self {
            type_id: i32::decode(buf, pos)?,
            collider: ColliderWire::decode(buf, pos)?,
            position: Vec3::decode(buf, pos)?,
            rotation: Vec3::decode(buf, pos)?,
        })
    }
}

/// Shared physics fields carried by `CreateGameObject`/`CreateClientObject`.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    pub type_id: i32,
    pub collider: ColliderWire,
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
    pub app_fields: Vec<u8>,
}

impl Codec for DynamicRecord {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.type_id.encode(buf);
        self.collider.encode(buf);
        self.position.encode(buf);
        self.rotation.encode(buf);
        self.velocity.encode(buf);
        self.angular_velocity.encode(buf);
        self.mass.encode(buf);
        self.elasticity.encode(buf);
        self.linear_drag.encode(buf);
        self.angular_drag.encode(buf);
        self.friction.encode(buf);
        self.lock_rotation.encode(buf);
        (self.app_fields.len() as u16).encode(buf);
        buf.extend_from_slice(&self.app_fields);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let type_id = i32::decode(buf, pos)?;
        let collider = ColliderWire::decode(buf, pos)?;
        let position = Vec3::decode(buf, pos)?;
        let rotation = Vec3::decode(buf, pos)?;
        let velocity = Vec3::decode(buf, pos)?;
        let angular_velocity = Vec3::decode(buf, pos)?;
        let mass = f32::decode(buf, pos)?;
        let elasticity = f32::decode(buf, pos)?;
        let linear_drag = f32::decode(buf, pos)?;
        let angular_drag = f32::decode(buf, pos)?;
        let friction = f32::decode(buf, pos)?;
        let lock_rotation = bool::decode(buf, pos)?;
        let len = u16::decode(buf, pos)? as usize;
        let app_fields = take(buf, pos, len, "app_fields")?.to_vec();
        Ok(Self {
            type_id,
            collider,
            position,
            rotation,
            velocity,
            angular_velocity,
            mass,
            elasticity,
            linear_drag,
            angular_drag,
            friction,
            lock_rotation,
            app_fields,
        })
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputFlags: u8 {
        const JUMP    = 1 << 0;
        const FIRE    = 1 << 1;
        const EXTRA_0 = 1 << 2;
        const EXTRA_1 = 1 << 3;
    }
}

impl Codec for InputFlags {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.bits().encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(InputFlags::from_bits_truncate(u8::decode(buf, pos)?))
    }
}

/// Wire form of `Input` (spec.md §3, expanded in SPEC_FULL.md §3): movement stick, mouse
/// delta/pos, jump/fire, and a small opaque bag of extra bool/float slots.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputWire {
    pub movement: [f32; 2],
    pub mouse_delta: [f32; 2],
    pub mouse_pos: [f32; 2],
    pub flags: InputFlags,
    pub extra_axes: [f32; 2],
}

impl InputWire {
    pub fn jump(&self) -> bool {
        self.flags.contains(InputFlags::JUMP)
    }
    pub fn fire(&self) -> bool {
        self.flags.contains(InputFlags::FIRE)
    }
}

impl Codec for InputWire {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.movement[0].encode(buf);
        self.movement[1].encode(buf);
        self.mouse_delta[0].encode(buf);
        self.mouse_delta[1].encode(buf);
        self.mouse_pos[0].encode(buf);
        self.mouse_pos[1].encode(buf);
        self.flags.encode(buf);
        self.extra_axes[0].encode(buf);
        self.extra_axes[1].encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(Self {
            movement: [f32::decode(buf, pos)?, f32::decode(buf, pos)?],
            mouse_delta: [f32::decode(buf, pos)?, f32::decode(buf, pos)?],
            mouse_pos: [f32::decode(buf, pos)?, f32::decode(buf, pos)?],
            flags: InputFlags::decode(buf, pos)?,
            extra_axes: [f32::decode(buf, pos)?, f32::decode(buf, pos)?],
        })
    }
}

/// One entry of a batched `ClientInput` message: `{timeOffset, input}` per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEntry {
    pub time_offset_ms: u64,
    pub input: InputWire,
}

impl Codec for InputEntry {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.time_offset_ms.encode(buf);
        self.input.encode(buf);
    }
    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        Ok(Self {
            time_offset_ms: u64::decode(buf, pos)?,
            input: InputWire::decode(buf, pos)?,
        })
    }
}

/// The full message taxonomy (spec.md §6), plus the ambient connection-handshake messages
/// of SPEC_FULL.md §10/C8 that make "assign cid" concrete.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ConnectionRequest { client_salt: u64 },
    ConnectionChallenge { server_salt: u64, challenge: u64 },
    ChallengeResponse { combined_salt: u64 },
    ConnectionAccepted { client_id: u32 },
    ConnectionDenied { reason: String },
    Disconnect,
    Ping { timestamp_ms: u64 },
    Pong { timestamp_ms: u64 },

    CreateStaticObjects { records: Vec<StaticRecord> },
    CreateGameObject { object_id: u32, record: DynamicRecord },
    CreateClientObject { playout_delay_ms: u64, client_id: u32, record: DynamicRecord },
    DestroyGameObject { object_id: u32 },
    UpdateGameObject {
        timestamp_ms: u64,
        object_id: u32,
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
        angular_velocity: Vec3,
    },
    ClientInput { timestamp_ms: u64, entries: Vec<InputEntry> },
}

macro_rules! tags {
    ($($name:ident = $val:expr),* $(,)?) => {
        $(const $name: u8 = $val;)*
    };
}

tags! {
    TAG_CONNECTION_REQUEST = 0,
    TAG_CONNECTION_CHALLENGE = 1,
    TAG_CHALLENGE_RESPONSE = 2,
    TAG_CONNECTION_ACCEPTED = 3,
    TAG_CONNECTION_DENIED = 4,
    TAG_DISCONNECT = 5,
    TAG_PING = 6,
    TAG_PONG = 7,
    TAG_CREATE_STATIC_OBJECTS = 8,
    TAG_CREATE_GAME_OBJECT = 9,
    TAG_CREATE_CLIENT_OBJECT = 10,
    TAG_DESTROY_GAME_OBJECT = 11,
    TAG_UPDATE_GAME_OBJECT = 12,
    TAG_CLIENT_INPUT = 13,
}

impl Message {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Message::ConnectionRequest { client_salt } => {
                buf.push(TAG_CONNECTION_REQUEST);
                client_salt.encode(buf);
            }
            Message::ConnectionChallenge { server_salt, challenge } => {
                buf.push(TAG_CONNECTION_CHALLENGE);
                server_salt.encode(buf);
                challenge.encode(buf);
            }
            Message::ChallengeResponse { combined_salt } => {
                buf.push(TAG_CHALLENGE_RESPONSE);
                combined_salt.encode(buf);
            }
            Message::ConnectionAccepted { client_id } => {
                buf.push(TAG_CONNECTION_ACCEPTED);
                client_id.encode(buf);
            }
            Message::ConnectionDenied { reason } => {
                buf.push(TAG_CONNECTION_DENIED);
                reason.encode(buf);
            }
            Message::Disconnect => buf.push(TAG_DISCONNECT),
            Message::Ping { timestamp_ms } => {
                buf.push(TAG_PING);
                timestamp_ms.encode(buf);
            }
            Message::Pong { timestamp_ms } => {
                buf.push(TAG_PONG);
                timestamp_ms.encode(buf);
            }
            Message::CreateStaticObjects { records } => {
                buf.push(TAG_CREATE_STATIC_OBJECTS);
                records.encode(buf);
            }
            Message::CreateGameObject { object_id, record } => {
                buf.push(TAG_CREATE_GAME_OBJECT);
                object_id.encode(buf);
                record.encode(buf);
            }
            Message::CreateClientObject { playout_delay_ms, client_id, record } => {
                buf.push(TAG_CREATE_CLIENT_OBJECT);
                playout_delay_ms.encode(buf);
                client_id.encode(buf);
                record.encode(buf);
            }
            Message::DestroyGameObject { object_id } => {
                buf.push(TAG_DESTROY_GAME_OBJECT);
                object_id.encode(buf);
            }
            Message::UpdateGameObject {
                timestamp_ms,
                object_id,
                position,
                rotation,
                velocity,
                angular_velocity,
            } => {
                buf.push(TAG_UPDATE_GAME_OBJECT);
                timestamp_ms.encode(buf);
                object_id.encode(buf);
                position.encode(buf);
                rotation.encode(buf);
                velocity.encode(buf);
                angular_velocity.encode(buf);
            }
            Message::ClientInput { timestamp_ms, entries } => {
                buf.push(TAG_CLIENT_INPUT);
                timestamp_ms.encode(buf);
                entries.encode(buf);
            }
        }
    }

    pub fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, ProtocolError> {
        let tag = u8::decode(buf, pos)?;
        match tag {
            TAG_CONNECTION_REQUEST => Ok(Message::ConnectionRequest {
                client_salt: u64::decode(buf, pos)?,
            }),
            TAG_CONNECTION_CHALLENGE => Ok(Message::ConnectionChallenge {
                server_salt: u64::decode(buf, pos)?,
                challenge: u64::decode(buf, pos)?,
            }),
            TAG_CHALLENGE_RESPONSE => Ok(Message::ChallengeResponse {
                combined_salt: u64::decode(buf, pos)?,
            }),
            TAG_CONNECTION_ACCEPTED => Ok(Message::ConnectionAccepted {
                client_id: u32::decode(buf, pos)?,
            }),
            TAG_CONNECTION_DENIED => Ok(Message::ConnectionDenied {
                reason: String::decode(buf, pos)?,
            }),
            TAG_DISCONNECT => Ok(Message::Disconnect),
            TAG_PING => Ok(Message::Ping {
                timestamp_ms: u64::decode(buf, pos)?,
            }),
            TAG_PONG => Ok(Message::Pong {
                timestamp_ms: u64::decode(buf, pos)?,
            }),
            TAG_CREATE_STATIC_OBJECTS => Ok(Message::CreateStaticObjects {
                records: Vec::decode(buf, pos)?,
            }),
            TAG_CREATE_GAME_OBJECT => Ok(Message::CreateGameObject {
                object_id: u32::decode(buf, pos)?,
                record: DynamicRecord::decode(buf, pos)?,
            }),
            TAG_CREATE_CLIENT_OBJECT => Ok(Message::CreateClientObject {
                playout_delay_ms: u64::decode(buf, pos)?,
                client_id: u32::decode(buf, pos)?,
                record: DynamicRecord::decode(buf, pos)?,
            }),
            TAG_DESTROY_GAME_OBJECT => Ok(Message::DestroyGameObject {
                object_id: u32::decode(buf, pos)?,
            }),
            TAG_UPDATE_GAME_OBJECT => Ok(Message::UpdateGameObject {
                timestamp_ms: u64::decode(buf, pos)?,
                object_id: u32::decode(buf, pos)?,
                position: Vec3::decode(buf, pos)?,
                rotation: Vec3::decode(buf, pos)?,
                velocity: Vec3::decode(buf, pos)?,
                angular_velocity: Vec3::decode(buf, pos)?,
            }),
            TAG_CLIENT_INPUT => Ok(Message::ClientInput {
                timestamp_ms: u64::decode(buf, pos)?,
                entries: Vec::decode(buf, pos)?,
            }),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

/// Splits `records` into chunks that each fit within `budget` bytes once framed as a
/// `CreateStaticObjects` message, so the caller can emit one reliable packet per chunk and
/// let the client concatenate them (spec.md §4.4 step 2, scenario 6).
pub fn chunk_static_objects(records: &[StaticRecord], budget: usize) -> Vec<Vec<StaticRecord>> {
    let mut chunks = Vec::new();
    let mut current: Vec<StaticRecord> = Vec::new();
    let mut current_size = 3usize; // tag + u16 len prefix

    for record in records {
        let mut probe = Vec::new();
        record.encode(&mut probe);
        if !current.is_empty() && current_size + probe.len() > budget {
            chunks.push(std::mem::take(&mut current));
            current_size = 3;
        }
        current_size += probe.len();
        current.push(record.clone());
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: PacketHeader,
    pub message: Message,
}

impl Packet {
    pub fn new(header: PacketHeader, message: Message) -> Self {
        Self { header, message }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        self.header.encode(&mut buf);
        self.message.encode(&mut buf);
        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut pos = 0;
        let header = PacketHeader::decode(data, &mut pos)?;
        let message = Message::decode(data, &mut pos)?;
        Ok(Self { header, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_comparison() {
        assert!(sequence_greater_than(2, 1));
        assert!(!sequence_greater_than(1, 2));
        assert!(sequence_greater_than(0, u32::MAX));
        assert!(!sequence_greater_than(u32::MAX, 0));
    }

    #[test]
    fn collider_roundtrip() {
        for collider in [
            ColliderWire::None,
            ColliderWire::Sphere { radius: 2.5 },
            ColliderWire::OrientedBox {
                half_extents: Vec3::new(1.0, 2.0, 3.0),
            },
        ] {
            let mut buf = Vec::new();
            collider.encode(&mut buf);
            let mut pos = 0;
            assert_eq!(ColliderWire::decode(&buf, &mut pos).unwrap(), collider);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn test_packet_serialization() {
        let header = PacketHeader::new(7, 3, 0b101);
        let message = Message::UpdateGameObject {
            timestamp_ms: 123_456,
            object_id: 101,
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.1, 0.2, 0.3),
            velocity: Vec3::new(-1.0, 0.0, 0.5),
            angular_velocity: Vec3::ZERO,
        };
        let packet = Packet::new(header, message.clone());
        let bytes = packet.serialize();
        let decoded = Packet::deserialize(&bytes).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.message, message);
    }

    #[test]
    fn static_object_chunking_fits_budget_and_preserves_all_records() {
        let records: Vec<StaticRecord> = (0..200)
            .map(|i| StaticRecord {
                type_id: i,
                collider: ColliderWire::Sphere { radius: 1.0 },
                position: Vec3::new(i as f32, 0.0, 0.0),
                rotation: Vec3::ZERO,
            })
            .collect();

        let chunks = chunk_static_objects(&records, 256);
        assert!(chunks.len() > 1, "expected the budget to force multiple packets");

        let mut total = 0;
        for chunk in &chunks {
            let message = Message::CreateStaticObjects { records: chunk.clone() };
            let mut buf = Vec::new();
            message.encode(&mut buf);
            assert!(buf.len() <= 256 + 64, "chunk exceeded budget by more than one record");
            total += chunk.len();
        }
        assert_eq!(total, 200);
    }

    #[test]
    fn dynamic_record_roundtrip_preserves_every_field() {
        let record = DynamicRecord {
            type_id: 7,
            collider: ColliderWire::OrientedBox {
                half_extents: Vec3::new(0.5, 1.0, 0.5),
            },
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 1.57, 0.0),
            velocity: Vec3::new(0.1, 0.0, -0.2),
            angular_velocity: Vec3::ZERO,
            mass: 12.0,
            elasticity: 0.4,
            linear_drag: 0.05,
            angular_drag: 0.1,
            friction: 0.6,
            lock_rotation: true,
            app_fields: vec![1, 2, 3],
        };
        let mut buf = Vec::new();
        record.encode(&mut buf);
        let mut pos = 0;
        assert_eq!(DynamicRecord::decode(&buf, &mut pos).unwrap(), record);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn client_input_with_zero_entries_decodes_as_heartbeat() {
        let message = Message::ClientInput {
            timestamp_ms: 42,
            entries: Vec::new(),
        };
        let mut buf = Vec::new();
        message.encode(&mut buf);
        let mut pos = 0;
        let decoded = Message::decode(&buf, &mut pos).unwrap();
        match decoded {
            Message::ClientInput { entries, .. } => assert!(entries.is_empty()),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn truncated_buffer_is_reported_not_panicked() {
        let mut buf = Vec::new();
        Message::Ping { timestamp_ms: 1 }.encode(&mut buf);
        buf.truncate(buf.len() - 2);
        let mut pos = 0;
        assert!(Message::decode(&buf, &mut pos).is_err());
    }
}
