mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::ServerConfig;
use events::ServerEvent;
use netphys_core::{MapBlueprint, MapObject, PacketLossSimulation};
use server::GameServer;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "netphys-server")]
#[command(about = "Authoritative tick server for the network-replicated physics sim")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = netphys_core::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = netphys_core::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    #[arg(long, default_value_t = 100)]
    playout_delay_ms: u64,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Enable global packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let global_packet_loss = if args.simulate_packet_loss {
        Some(PacketLossSimulation {
            enabled: true,
            loss_percent: args.loss_percent,
            min_latency_ms: args.min_latency,
            max_latency_ms: args.max_latency,
            jitter_ms: args.jitter,
        })
    } else {
        None
    };

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        playout_delay_ms: args.playout_delay_ms,
        global_packet_loss,
    };

    let mut server = GameServer::new(&bind_addr, config)?;
    for entity in default_map().static_entities() {
        server.add_static(entity);
    }

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("server started on {}", server.local_addr());
        server.run();
        log::info!("server shutting down");
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

/// A minimal static world: one ground plane. Applications embedding this crate supply their
/// own map; this is just enough for the binary to be runnable standalone.
fn default_map() -> MapBlueprint {
    let mut blueprint = MapBlueprint::new();
    blueprint.add(MapObject::ground(0, glam::Vec3::ZERO, 50.0));
    blueprint
}

fn run_with_tui(server: &mut GameServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            match event {
                ServerEvent::ClientConnecting { addr } => {
                    log::info!("connection request from {addr}");
                }
                ServerEvent::ClientConnected { client_id, addr, entity_id } => {
                    log::info!("client {client_id} connected from {addr} (entity {entity_id})");
                }
                ServerEvent::ClientDisconnected { client_id, reason } => {
                    log::info!("client {client_id} {}", reason.as_str());
                }
                ServerEvent::ConnectionDenied { addr, reason } => {
                    log::warn!("connection denied to {addr}: {reason}");
                }
                ServerEvent::Error { message } => {
                    log::error!("{message}");
                }
            }
        }

        if let Some(client_id) = tui_state.take_pending_kick() {
            server.kick_client(client_id);
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let clients = server.client_infos();
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Up => tui_state.select_prev(clients.len()),
                        KeyCode::Down => tui_state.select_next(clients.len()),
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            tui_state.request_kick(&clients);
                        }
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        let clients = server.client_infos();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &clients);
        })?;
    }

    server.shutdown_connections();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
