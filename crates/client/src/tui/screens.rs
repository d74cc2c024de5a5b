use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};

use crate::net::NetworkClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    Connect,
    Connecting,
    InGame,
}

pub fn render(
    frame: &mut Frame,
    screen: Screen,
    selected: usize,
    connect_input: &str,
    connect_error: Option<&str>,
    client: &Option<NetworkClient>,
    fps: f32,
) {
    let area = frame.area();

    let block = Block::default()
        .title(" netphys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Min(0)])
        .split(area)[0];

    match screen {
        Screen::MainMenu => render_main_menu(frame, inner, selected),
        Screen::Connect => render_connect(frame, inner, connect_input, connect_error),
        Screen::Connecting => render_connecting(frame, inner, client),
        Screen::InGame => render_in_game(frame, inner, client, fps),
    }
}

fn render_main_menu(frame: &mut Frame, area: Rect, selected: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    let title = r#"
          _               _
 _ __   __| |_ _ __ | |__  _   _ ___
| '_ \ / _` | '_ \| '_ \| | | / __|
| | | | (_| | |_) | | | | |_| \__ \
|_| |_|\__,_| .__/|_| |_|\__, |___/
            |_|          |___/
"#;

    let title_widget = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);
    frame.render_widget(title_widget, chunks[0]);

    let menu_items = vec![
        ListItem::new("  Connect to Server"),
        ListItem::new("  Quit"),
    ];

    let menu_items: Vec<ListItem> = menu_items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if i == selected {
                item.style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                item.style(Style::default().fg(Color::White))
            }
        })
        .collect();

    let menu = List::new(menu_items).block(
        Block::default()
            .title(" Menu ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    let menu_area = centered_rect(40, 7, chunks[2]);
    frame.render_widget(menu, menu_area);

    let help = Paragraph::new("↑↓ Navigate  Enter Select  Q Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[3]);
}

fn render_connect(frame: &mut Frame, area: Rect, input: &str, error: Option<&str>) {
    let dialog_area = centered_rect(50, 10, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .title(" Connect to Server ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(dialog, dialog_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(dialog_area);

    let label = Paragraph::new("Server Address:").style(Style::default().fg(Color::White));
    frame.render_widget(label, inner[0]);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let input_text = Paragraph::new(format!("{}_", input))
        .style(Style::default().fg(Color::White))
        .block(input_block);
    frame.render_widget(input_text, inner[1]);

    if let Some(err) = error {
        let error_text = Paragraph::new(err)
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        frame.render_widget(error_text, inner[2]);
    }

    let help = Paragraph::new("Enter Connect  Esc Cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, inner[3]);
}

fn render_connecting(frame: &mut Frame, area: Rect, client: &Option<NetworkClient>) {
    let dialog_area = centered_rect(40, 8, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .title(" Connecting ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(dialog, dialog_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(dialog_area);

    let status = if let Some(client) = client {
        if let Some(err) = client.connect_error() {
            format!("Connection failed: {}", err)
        } else {
            let state = format!("{:?}", client.state());
            format!("Status: {}\n\nPlease wait...", state)
        }
    } else {
        "Initializing connection...".to_string()
    };

    let status_text = Paragraph::new(status)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center);
    frame.render_widget(status_text, inner[0]);

    let help = Paragraph::new("Esc Cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, inner[1]);
}

/// Live debug/observer view of the replicated world (spec.md §3/§10): every entity the
/// client currently holds a mirror of, the client's own object marked out, and the
/// connection stats `NetworkClient::stats` tracks.
fn render_in_game(frame: &mut Frame, area: Rect, client: &Option<NetworkClient>, fps: f32) {
    let Some(client) = client else { return };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_stats_line(frame, chunks[0], client, fps);

    let own_id = client.client_id();
    let mut rows: Vec<ListItem> = client
        .world()
        .iter()
        .map(|entity| {
            let pos = entity.body().position;
            let you = if Some(entity.object_id()) == own_id { " (you)" } else { "" };
            let label = format!(
                "#{:<5} pos ({:>6.2}, {:>6.2}, {:>6.2}){}",
                entity.object_id(),
                pos.x,
                pos.y,
                pos.z,
                you
            );
            let style = if you.is_empty() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            };
            ListItem::new(label).style(style)
        })
        .collect();

    if rows.is_empty() {
        rows.push(ListItem::new("(no entities replicated yet)"));
    }

    let list = List::new(rows).block(
        Block::default()
            .title(" World ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(list, chunks[1]);

    let help = Paragraph::new("WASD move  Arrows look  Space jump  F fire  Q leave")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[2]);
}

fn render_stats_line(frame: &mut Frame, area: Rect, client: &NetworkClient, fps: f32) {
    let client_id = client
        .client_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let stats = client.stats();

    let lines = vec![
        Line::from(vec![
            Span::styled("client ", Style::default().fg(Color::DarkGray)),
            Span::styled(client_id, Style::default().fg(Color::White)),
            Span::raw("   "),
            Span::styled("rtt ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.1}ms", stats.rtt_ms), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            Span::styled("loss ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:.1}%", stats.packet_loss_percent),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("   "),
            Span::styled("fps ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}", fps), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("sent ", Style::default().fg(Color::DarkGray)),
            Span::styled(stats.packets_sent.to_string(), Style::default().fg(Color::White)),
            Span::raw("   "),
            Span::styled("recv ", Style::default().fg(Color::DarkGray)),
            Span::styled(stats.packets_received.to_string(), Style::default().fg(Color::White)),
        ]),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Connection ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(widget, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
