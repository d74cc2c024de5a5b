use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;

use netphys_core::{
    ClientConnection, Collider, ConnectionManager, ConnectionState, DynamicEntity, FixedTimestep,
    InputEntry, MAX_PACKET_SIZE, Message, NetworkEndpoint, NetworkStats, NetworkedEntity, Packet,
    PacketHeader, PacketLossSimulation, PlayerConfig, PlayerEntity, PlayoutBuffer, StaticEntity,
    World, chunk_static_objects,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

/// `CreateStaticObjects` bootstrap chunks at 95% of the transport MTU (spec.md §4.4 step 2).
const STATIC_CHUNK_BUDGET_FRACTION: f32 = 0.95;
const PLAYER_TYPE_ID: i32 = 0;

pub struct GameServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    config: ServerConfig,
    world: World,
    playouts: HashMap<u32, PlayoutBuffer>,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    start_time: Instant,
    tick: u64,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(bind_addr)?;
        let timestep = FixedTimestep::new(config.tick_rate);

        Ok(Self {
            endpoint,
            connections: ConnectionManager::new(config.max_clients),
            world: World::new(),
            playouts: HashMap::new(),
            timestep,
            last_tick_time: Instant::now(),
            start_time: Instant::now(),
            tick: 0,
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
            config,
        })
    }

    /// Adds a static world fixture, broadcast in bulk to every client at connect time
    /// (spec.md §4.4 step 2). Must be called before any client connects.
    pub fn add_static(&mut self, entity: StaticEntity) {
        self.world.add_static(entity);
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown_connections();
    }

    pub fn shutdown_connections(&mut self) {
        let client_ids: Vec<u32> = self.connections.iter().map(|c| c.client_id).collect();
        for client_id in client_ids {
            self.kick_client(client_id);
        }
    }

    pub fn kick_client(&mut self, client_id: u32) {
        if self.connections.get(client_id).is_some() {
            let _ = self.send_to_client(client_id, Message::Disconnect);
        }
        self.remove_client(client_id, DisconnectReason::Kicked);
    }

    pub fn set_packet_loss_sim(&mut self, client_id: u32, sim: PacketLossSimulation) {
        if let Some(client) = self.connections.get_mut(client_id) {
            client.packet_loss_sim = sim;
        }
    }

    fn remove_client(&mut self, client_id: u32, reason: DisconnectReason) {
        let Some(client) = self.connections.remove(client_id) else { return };
        self.playouts.remove(&client_id);
        if let Some(entity_id) = client.entity_id {
            self.world.remove_player(entity_id);
            self.broadcast_except(client_id, Message::DestroyGameObject { object_id: entity_id });
        }
        self.pending_events
            .push_back(ServerEvent::ClientDisconnected { client_id, reason });
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.timestep.accumulate(delta.as_secs_f32());

        if let Err(e) = self.process_network() {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("network error: {e}"),
            });
        }

        while self.timestep.consume_tick() {
            self.tick();
        }

        let timed_out = self.connections.cleanup_timed_out();
        for client_id in timed_out {
            self.remove_client(client_id, DisconnectReason::Timeout);
        }
    }

    fn tick(&mut self) {
        self.tick += 1;
        let dt = self.timestep.dt();
        let now = self.now_ms();

        self.process_inputs(now, dt);
        self.world.physics_step(dt);
        self.world.run_collisions();

        for object_id in self.world.drain_dead() {
            self.broadcast(Message::DestroyGameObject { object_id });
        }

        self.broadcast_updates(now);
    }

    /// Playout-driven player movement (spec.md §4.4): every client's buffer is drained up to
    /// the current server time and each ready entry feeds `process_input_movement`, then the
    /// opaque `process_input_action` hook.
    fn process_inputs(&mut self, now_ms: u64, dt: f32) {
        let client_ids: Vec<u32> = self.playouts.keys().copied().collect();
        for client_id in client_ids {
            let Some(buffer) = self.playouts.get_mut(&client_id) else { continue };
            let ready = buffer.drain_ready(now_ms);
            if ready.is_empty() {
                continue;
            }

            let Some(client) = self.connections.get(client_id) else { continue };
            let Some(object_id) = client.entity_id else { continue };

            for entry in ready {
                let Some(entity) = self.world.get_mut(object_id) else { break };
                let Some(player) = entity.as_player_mut() else { break };

                let diff = player.process_input_movement(&entry.input, dt);
                player
                    .base
                    .body
                    .apply_state_diff(diff, entry.key_ms, entry.key_ms, false, true);
                player.clamp_pitch();
                player.process_input_action(&entry.input, entry.key_ms);
            }
        }
    }

    fn broadcast_updates(&mut self, now_ms: u64) {
        let updates: Vec<Message> = self
            .world
            .iter()
            .map(|entity| {
                let body = entity.body();
                Message::UpdateGameObject {
                    timestamp_ms: now_ms,
                    object_id: entity.object_id(),
                    position: body.position,
                    rotation: body.rotation,
                    velocity: body.velocity,
                    angular_velocity: body.angular_velocity,
                }
            })
            .collect();

        for update in updates {
            self.broadcast(update);
        }
    }

    fn process_network(&mut self) -> io::Result<()> {
        let packets = self.endpoint.receive()?;
        for (packet, addr) in packets {
            self.handle_packet(packet, addr)?;
        }
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> io::Result<()> {
        if let Some(client) = self.connections.get_by_addr_mut(&addr) {
            client.receive_tracker.record_received(packet.header.sequence);
            client.process_ack(packet.header.ack, packet.header.ack_bitfield);
        }

        match packet.message {
            Message::ConnectionRequest { client_salt } => {
                self.handle_connection_request(addr, client_salt)?;
            }
            Message::ChallengeResponse { combined_salt } => {
                self.handle_challenge_response(addr, combined_salt)?;
            }
            Message::ClientInput { timestamp_ms, entries } => {
                self.handle_client_input(addr, timestamp_ms, entries);
            }
            Message::Ping { timestamp_ms } => {
                self.handle_ping(addr, timestamp_ms)?;
            }
            Message::Disconnect => {
                self.handle_disconnect(addr);
            }
            _ => {}
        }

        if let Some(client) = self.connections.get_by_addr_mut(&addr) {
            client.touch();
        }

        Ok(())
    }

    fn handle_connection_request(&mut self, addr: SocketAddr, client_salt: u64) -> io::Result<()> {
        self.pending_events
            .push_back(ServerEvent::ClientConnecting { addr });

        let (server_salt, challenge, send_sequence) =
            match self.connections.get_or_create_pending(addr, client_salt) {
                Ok(client) => (client.server_salt, client.combined_salt(), client.send_sequence),
                Err(reason) => {
                    let header = PacketHeader::new(0, 0, 0);
                    let packet =
                        Packet::new(header, Message::ConnectionDenied { reason: reason.to_string() });
                    self.endpoint.send_to(&packet, addr)?;
                    self.pending_events
                        .push_back(ServerEvent::ConnectionDenied { addr, reason: reason.to_string() });
                    return Ok(());
                }
            };

        let header = PacketHeader::new(send_sequence, 0, 0);
        if let Some(client) = self.connections.get_by_addr_mut(&addr) {
            client.send_sequence = client.send_sequence.wrapping_add(1);
        }
        let packet = Packet::new(header, Message::ConnectionChallenge { server_salt, challenge });
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn handle_challenge_response(&mut self, addr: SocketAddr, combined_salt: u64) -> io::Result<()> {
        let Some(client) = self.connections.get_by_addr_mut(&addr) else { return Ok(()) };
        if combined_salt != client.combined_salt() {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("invalid challenge response from {addr}"),
            });
            return Ok(());
        }
        client.state = ConnectionState::Connected;
        let client_id = client.client_id;

        self.finish_connect(client_id, addr)
    }

    /// Spawns the client's player via `World::spawn_player`'s factory contract and sends the
    /// full connect sequence (spec.md §4.4): static world in MTU-budgeted chunks, every
    /// existing dynamic/player object, the client's own `CreateClientObject`, then a
    /// broadcast of the new player to everyone else.
    fn finish_connect(&mut self, client_id: u32, addr: SocketAddr) -> io::Result<()> {
        let spawned = self.world.spawn_player(client_id, |object_id| {
            let base = DynamicEntity::new(
                object_id,
                PLAYER_TYPE_ID,
                Some(Collider::Sphere { radius: 0.5 }),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::ZERO,
                80.0,
                0.1,
                0.05,
                0.0,
                0.6,
                true,
                Vec::new(),
            );
            PlayerEntity::new(base, client_id, PlayerConfig::default())
        });

        let Some(object_id) = spawned else {
            self.pending_events
                .push_back(ServerEvent::Error { message: "clientObjectFactory failed".into() });
            self.remove_client(client_id, DisconnectReason::Graceful);
            return Ok(());
        };

        if let Some(client) = self.connections.get_mut(client_id) {
            client.entity_id = Some(object_id);
        }
        self.playouts.insert(client_id, PlayoutBuffer::new());

        self.pending_events
            .push_back(ServerEvent::ClientConnected { client_id, addr, entity_id: object_id });

        self.send_bootstrap(client_id, object_id)
    }

    fn send_bootstrap(&mut self, client_id: u32, object_id: u32) -> io::Result<()> {
        let budget = (MAX_PACKET_SIZE as f32 * STATIC_CHUNK_BUDGET_FRACTION) as usize;
        let static_records: Vec<_> = self.world.statics.iter().map(|s| s.to_record()).collect();
        for chunk in chunk_static_objects(&static_records, budget) {
            self.send_to_client(client_id, Message::CreateStaticObjects { records: chunk })?;
        }

        let existing: Vec<Message> = self
            .world
            .iter()
            .filter(|e| e.object_id() != object_id)
            .map(|e| {
                let record = match e {
                    NetworkedEntity::Object(o) => o.to_record(),
                    NetworkedEntity::Player(p) => p.base.to_record(),
                };
                Message::CreateGameObject { object_id: e.object_id(), record }
            })
            .collect();
        for message in existing {
            self.send_to_client(client_id, message)?;
        }

        let Some(entity) = self.world.get(object_id) else { return Ok(()) };
        let record = match entity {
            NetworkedEntity::Player(p) => p.base.to_record(),
            NetworkedEntity::Object(o) => o.to_record(),
        };
        self.send_to_client(
            client_id,
            Message::CreateClientObject {
                playout_delay_ms: self.config.playout_delay_ms,
                client_id,
                record: record.clone(),
            },
        )?;

        self.broadcast_except(client_id, Message::CreateGameObject { object_id, record });
        Ok(())
    }

    fn handle_client_input(&mut self, addr: SocketAddr, timestamp_ms: u64, entries: Vec<InputEntry>) {
        let _ = timestamp_ms;
        let Some(client) = self.connections.get_by_addr(&addr) else { return };
        if client.state != ConnectionState::Connected {
            return;
        }
        let client_id = client.client_id;
        let rtt_half_ms = (client.rtt_smoothed_ms / 2.0) as u64;

        let Some(buffer) = self.playouts.get_mut(&client_id) else { return };
        for entry in entries {
            let key_ms = entry.time_offset_ms.saturating_add(rtt_half_ms);
            buffer.push(key_ms, entry.input);
        }
    }

    fn handle_ping(&mut self, addr: SocketAddr, timestamp_ms: u64) -> io::Result<()> {
        let header = PacketHeader::new(0, 0, 0);
        let packet = Packet::new(header, Message::Pong { timestamp_ms });
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        let Some(client_id) = self.connections.get_by_addr(&addr).map(|c| c.client_id) else { return };
        self.remove_client(client_id, DisconnectReason::Graceful);
    }

    fn send_to_client(&mut self, client_id: u32, message: Message) -> io::Result<()> {
        let Some(client) = self.connections.get_mut(client_id) else { return Ok(()) };
        let addr = client.addr;
        let (ack, ack_bitfield) = client.receive_tracker.ack_data();
        let header = PacketHeader::new(client.send_sequence, ack, ack_bitfield);
        client.ack_tracker.track_packet(header.sequence);
        client.send_sequence = client.send_sequence.wrapping_add(1);
        let packet = Packet::new(header, message);
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn broadcast(&mut self, message: Message) {
        let ids: Vec<u32> = self
            .connections
            .iter()
            .filter(|c| c.state == ConnectionState::Connected)
            .map(|c| c.client_id)
            .collect();
        for client_id in ids {
            if let Err(e) = self.send_to_client(client_id, message.clone()) {
                self.pending_events.push_back(ServerEvent::Error {
                    message: format!("broadcast failed for {client_id}: {e}"),
                });
            }
        }
    }

    fn broadcast_except(&mut self, except_client_id: u32, message: Message) {
        let ids: Vec<u32> = self
            .connections
            .iter()
            .filter(|c| c.state == ConnectionState::Connected && c.client_id != except_client_id)
            .map(|c| c.client_id)
            .collect();
        for client_id in ids {
            let _ = self.send_to_client(client_id, message.clone());
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            tick: self.tick,
            client_count: self.connections.connected_count(),
            max_clients: self.config.max_clients,
            entity_count: self.world.iter().count(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            network_stats: self.endpoint.stats().clone(),
        }
    }

    pub fn client_infos(&self) -> Vec<crate::tui::ClientInfo> {
        self.connections
            .iter()
            .filter(|c| c.state == ConnectionState::Connected)
            .map(|c: &ClientConnection| crate::tui::ClientInfo {
                client_id: c.client_id,
                addr: c.addr.to_string(),
                entity_id: c.entity_id,
                connected_secs: c.last_receive_time.elapsed().as_secs(),
                rtt_ms: c.rtt_smoothed_ms,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub tick: u64,
    pub client_count: usize,
    pub max_clients: usize,
    pub entity_count: usize,
    pub uptime_secs: u64,
    pub network_stats: NetworkStats,
}
