use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

use netphys_core::{
    ColliderWire, ConnectionManager, ConnectionState, DynamicRecord, InputEntry, InputFlags,
    InputWire, Message, NetworkEndpoint, Packet, PacketHeader,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(40000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

fn generate_salt() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64,
    );
    hasher.finish()
}

fn dummy_record() -> DynamicRecord {
    DynamicRecord {
        type_id: 0,
        collider: ColliderWire::Sphere { radius: 0.5 },
        position: glam::Vec3::ZERO,
        rotation: glam::Vec3::ZERO,
        velocity: glam::Vec3::ZERO,
        angular_velocity: glam::Vec3::ZERO,
        mass: 1.0,
        elasticity: 0.5,
        linear_drag: 0.1,
        angular_drag: 0.1,
        friction: 0.5,
        lock_rotation: false,
        app_fields: Vec::new(),
    }
}

fn wait_for_packet(
    endpoint: &mut NetworkEndpoint,
    timeout_ms: u64,
) -> Option<Vec<(Packet, SocketAddr)>> {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = endpoint.receive().unwrap();
        if !received.is_empty() {
            return Some(received);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn test_connection_handshake_full_flow() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let mut connections = ConnectionManager::new(32);
    let client_salt = generate_salt();

    client_endpoint.set_remote(server_addr);
    let request = Packet::new(
        PacketHeader::new(0, 0, 0),
        Message::ConnectionRequest { client_salt },
    );
    client_endpoint.send(&request).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, from_addr) = &received[0];
    match &packet.message {
        Message::ConnectionRequest { client_salt: salt } => {
            assert_eq!(*salt, client_salt);

            let client = connections
                .get_or_create_pending(*from_addr, *salt)
                .unwrap();
            let server_salt = client.server_salt;
            let challenge = client.combined_salt();

            let header = PacketHeader::new(client.send_sequence, 0, 0);
            client.send_sequence += 1;

            let response = Packet::new(
                header,
                Message::ConnectionChallenge {
                    server_salt,
                    challenge,
                },
            );
            server_endpoint.send_to(&response, *from_addr).unwrap();
        }
        _ => panic!("Expected ConnectionRequest"),
    }

    let received = wait_for_packet(&mut client_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::ConnectionChallenge {
            server_salt,
            challenge,
        } => {
            let expected = client_salt ^ server_salt;
            assert_eq!(*challenge, expected);

            let response = Packet::new(
                PacketHeader::new(1, 0, 0),
                Message::ChallengeResponse {
                    combined_salt: expected,
                },
            );
            client_endpoint.send(&response).unwrap();
        }
        _ => panic!("Expected ConnectionChallenge"),
    }

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, from_addr) = &received[0];
    match &packet.message {
        Message::ChallengeResponse { combined_salt } => {
            let client = connections.get_by_addr_mut(from_addr).unwrap();
            assert_eq!(*combined_salt, client.combined_salt());

            client.state = ConnectionState::Connected;
            let client_id = client.client_id;

            let header = PacketHeader::new(client.send_sequence, 0, 0);
            client.send_sequence += 1;

            // This server's real accept signal is `CreateClientObject`, not
            // `ConnectionAccepted` (see client/src/net/client.rs) — exercised here directly
            // since that is what a connecting client actually waits on.
            let accepted = Packet::new(
                header,
                Message::CreateClientObject {
                    playout_delay_ms: 100,
                    client_id,
                    record: dummy_record(),
                },
            );
            server_endpoint.send_to(&accepted, *from_addr).unwrap();
        }
        _ => panic!("Expected ChallengeResponse"),
    }

    let received = wait_for_packet(&mut client_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::CreateClientObject { client_id, .. } => {
            assert!(*client_id > 0);
        }
        _ => panic!("Expected CreateClientObject"),
    }

    assert_eq!(connections.connected_count(), 1);
}

#[test]
fn test_connection_denied_server_full() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let mut connections = ConnectionManager::new(0);
    let client_salt = generate_salt();

    client_endpoint.set_remote(server_addr);
    let request = Packet::new(
        PacketHeader::new(0, 0, 0),
        Message::ConnectionRequest { client_salt },
    );
    client_endpoint.send(&request).unwrap();

    let received =
        wait_for_packet(&mut server_endpoint, 200).expect("No packet received on server");
    assert_eq!(received.len(), 1);

    let (packet, from_addr) = &received[0];
    match &packet.message {
        Message::ConnectionRequest { client_salt: salt } => {
            match connections.get_or_create_pending(*from_addr, *salt) {
                Ok(_) => panic!("Should have been denied"),
                Err(reason) => {
                    let header = PacketHeader::new(0, 0, 0);
                    let denied = Packet::new(
                        header,
                        Message::ConnectionDenied {
                            reason: reason.to_string(),
                        },
                    );
                    server_endpoint.send_to(&denied, *from_addr).unwrap();
                }
            }
        }
        _ => panic!("Expected ConnectionRequest"),
    }

    let received =
        wait_for_packet(&mut client_endpoint, 200).expect("No packet received on client");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::ConnectionDenied { reason } => {
            assert!(reason.contains("full"));
        }
        _ => panic!("Expected ConnectionDenied"),
    }
}

#[test]
fn test_invalid_challenge_response_rejected() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let mut connections = ConnectionManager::new(32);
    let client_salt = generate_salt();

    client_endpoint.set_remote(server_addr);
    let request = Packet::new(
        PacketHeader::new(0, 0, 0),
        Message::ConnectionRequest { client_salt },
    );
    client_endpoint.send(&request).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    let (_, from_addr) = &received[0];

    let client = connections
        .get_or_create_pending(*from_addr, client_salt)
        .unwrap();
    let server_salt = client.server_salt;
    let challenge = client.combined_salt();

    let header = PacketHeader::new(client.send_sequence, 0, 0);
    client.send_sequence += 1;

    let response = Packet::new(
        header,
        Message::ConnectionChallenge {
            server_salt,
            challenge,
        },
    );
    server_endpoint.send_to(&response, *from_addr).unwrap();

    let _ = wait_for_packet(&mut client_endpoint, 200).expect("No packet received");

    let wrong_salt = 0xDEADBEEF;
    let response = Packet::new(
        PacketHeader::new(1, 0, 0),
        Message::ChallengeResponse {
            combined_salt: wrong_salt,
        },
    );
    client_endpoint.send(&response).unwrap();

    let _ = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");

    let client = connections.get_by_addr(from_addr).unwrap();
    assert_eq!(client.state, ConnectionState::Connecting);
    assert_eq!(connections.connected_count(), 0);
}

#[test]
fn test_ping_pong() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let timestamp_ms = 12345u64;

    client_endpoint.set_remote(server_addr);
    let ping = Packet::new(PacketHeader::new(0, 0, 0), Message::Ping { timestamp_ms });
    client_endpoint.send(&ping).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, from_addr) = &received[0];
    match &packet.message {
        Message::Ping { timestamp_ms: ts } => {
            let header = PacketHeader::new(0, 0, 0);
            let pong = Packet::new(header, Message::Pong { timestamp_ms: *ts });
            server_endpoint.send_to(&pong, *from_addr).unwrap();
        }
        _ => panic!("Expected Ping"),
    }

    let received = wait_for_packet(&mut client_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::Pong { timestamp_ms: ts } => {
            assert_eq!(*ts, timestamp_ms);
        }
        _ => panic!("Expected Pong"),
    }
}

#[test]
fn test_client_input_transmission() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let input = InputWire {
        movement: [1.0, 0.5],
        mouse_delta: [1.5, -0.5],
        flags: InputFlags::JUMP | InputFlags::FIRE,
        ..Default::default()
    };
    let entries = vec![InputEntry { time_offset_ms: 50, input }];

    client_endpoint.set_remote(server_addr);
    let packet = Packet::new(
        PacketHeader::new(0, 0, 0),
        Message::ClientInput { timestamp_ms: 100, entries },
    );
    client_endpoint.send(&packet).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::ClientInput { timestamp_ms, entries } => {
            assert_eq!(*timestamp_ms, 100);
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].time_offset_ms, 50);
            assert!(entries[0].input.jump());
            assert!(entries[0].input.fire());
            assert!((entries[0].input.movement[0] - 1.0).abs() < 0.01);
        }
        _ => panic!("Expected ClientInput"),
    }
}

#[test]
fn test_update_game_object_transmission() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    let packet = Packet::new(
        PacketHeader::new(0, 0, 0),
        Message::UpdateGameObject {
            timestamp_ms: 123456789,
            object_id: 1,
            position: glam::Vec3::new(10.0, 20.0, 30.0),
            rotation: glam::Vec3::ZERO,
            velocity: glam::Vec3::new(5.0, -2.5, 0.0),
            angular_velocity: glam::Vec3::ZERO,
        },
    );
    server_endpoint.send_to(&packet, client_addr).unwrap();

    let received = wait_for_packet(&mut client_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    match &packet.message {
        Message::UpdateGameObject {
            timestamp_ms,
            object_id,
            position,
            ..
        } => {
            assert_eq!(*timestamp_ms, 123456789);
            assert_eq!(*object_id, 1);
            assert!((position.x - 10.0).abs() < 0.001);
        }
        _ => panic!("Expected UpdateGameObject"),
    }
}

#[test]
fn test_disconnect_packet() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    client_endpoint.set_remote(server_addr);
    let packet = Packet::new(PacketHeader::new(0, 0, 0), Message::Disconnect);
    client_endpoint.send(&packet).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);

    let (packet, _) = &received[0];
    assert!(matches!(&packet.message, Message::Disconnect));
}

#[test]
fn test_packet_sequence_numbers() {
    let port = next_port();
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let _endpoint = NetworkEndpoint::bind(addr).unwrap();

    let p1 = Packet::new(PacketHeader::new(0, 0, 0), Message::Ping { timestamp_ms: 1 });
    let p2 = Packet::new(PacketHeader::new(1, 0, 0), Message::Ping { timestamp_ms: 2 });
    let p3 = Packet::new(PacketHeader::new(2, 0, 0), Message::Ping { timestamp_ms: 3 });

    assert_eq!(p1.header.sequence, 0);
    assert_eq!(p2.header.sequence, 1);
    assert_eq!(p3.header.sequence, 2);
}

#[test]
fn test_multiple_clients_connect() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut connections = ConnectionManager::new(32);

    for i in 0..3u16 {
        let client_port = port + 2 + i;
        let client_addr: SocketAddr = format!("127.0.0.1:{}", client_port).parse().unwrap();
        let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

        let client_salt = generate_salt();
        client_endpoint.set_remote(server_addr);

        let request = Packet::new(
            PacketHeader::new(0, 0, 0),
            Message::ConnectionRequest { client_salt },
        );
        client_endpoint.send(&request).unwrap();

        let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
        assert_eq!(received.len(), 1);

        let (packet, from_addr) = &received[0];
        if let Message::ConnectionRequest { client_salt: salt } = &packet.message {
            let client = connections
                .get_or_create_pending(*from_addr, *salt)
                .unwrap();
            client.state = ConnectionState::Connected;
        }
    }

    assert_eq!(connections.connected_count(), 3);
    assert_eq!(connections.total_count(), 3);
}

#[test]
fn test_receive_tracker_zero_sequence() {
    let port = next_port();
    let server_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let client_addr: SocketAddr = format!("127.0.0.1:{}", port + 1).parse().unwrap();

    let mut server_endpoint = NetworkEndpoint::bind(server_addr).unwrap();
    let mut client_endpoint = NetworkEndpoint::bind(client_addr).unwrap();

    client_endpoint.set_remote(server_addr);
    let packet = Packet::new(PacketHeader::new(0, 0, 0), Message::Ping { timestamp_ms: 0 });
    client_endpoint.send(&packet).unwrap();

    let received = wait_for_packet(&mut server_endpoint, 200).expect("No packet received");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.header.sequence, 0);
}
