mod screens;

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::debug::DebugStats;
use crate::net::{ClientConfig, InputState, NetworkClient};

pub use screens::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Connect(SocketAddr),
    Disconnect,
    ChangeScreen(Screen),
}

/// Keys `InputState`/`InputWire` actually read (spec.md §3's movement/look/jump/fire axes);
/// anything else is left alone rather than stamped into the held-key set.
fn is_gameplay_key(code: KeyCode) -> bool {
    matches!(
        code,
        KeyCode::Char('w' | 'a' | 's' | 'd' | 'f' | ' ')
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
    )
}

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    screen: Screen,
    client: Option<NetworkClient>,
    connect_input: String,
    connect_error: Option<String>,
    selected_index: usize,
    should_quit: bool,
    keyboard_enhancement: bool,
    in_game_input: InputState,
    last_frame: Instant,
    debug_stats: DebugStats,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        // Without this, most terminals only ever report key-press events, so a held
        // movement key would never register as released (spec.md §3's input is a
        // held-key sample, not a one-shot tap).
        let keyboard_enhancement = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .is_ok();

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            screen: Screen::MainMenu,
            client: None,
            connect_input: String::from("127.0.0.1:27015"),
            connect_error: None,
            selected_index: 0,
            should_quit: false,
            keyboard_enhancement,
            in_game_input: InputState::default(),
            last_frame: Instant::now(),
            debug_stats: DebugStats::new(),
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.last_frame = Instant::now();

        while !self.should_quit {
            let dt = self.last_frame.elapsed().as_secs_f32().max(1.0 / 240.0);
            self.last_frame = Instant::now();

            self.tick(dt)?;
            self.draw()?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_event(key)?;
                }
            }
        }

        Ok(())
    }

    fn tick(&mut self, dt: f32) -> io::Result<()> {
        self.debug_stats.record_frame(dt);

        let Some(client) = &mut self.client else { return Ok(()) };

        let wire = (self.screen == Screen::InGame).then(|| self.in_game_input.to_wire(dt));
        client.update(dt, wire.as_ref())?;

        if client.is_connected() && self.screen == Screen::Connecting {
            self.screen = Screen::InGame;
        }

        Ok(())
    }

    fn draw(&mut self) -> io::Result<()> {
        let screen = self.screen;
        let selected = self.selected_index;
        let connect_input = self.connect_input.clone();
        let connect_error = self.connect_error.clone();
        let client = &self.client;
        let fps = self.debug_stats.fps();

        self.terminal.draw(|frame| {
            screens::render(
                frame,
                screen,
                selected,
                &connect_input,
                connect_error.as_deref(),
                client,
                fps,
            );
        })?;

        Ok(())
    }

    fn handle_key_event(&mut self, key: crossterm::event::KeyEvent) -> io::Result<()> {
        if self.screen == Screen::InGame
            && is_gameplay_key(key.code)
            && key.code != KeyCode::Char('q')
        {
            let pressed = key.kind != KeyEventKind::Release;
            self.in_game_input.set_key(key.code, pressed);
            // Without keyboard enhancement there is no release event, so a single tap
            // reads as one frame of input rather than a stuck key.
            if !self.keyboard_enhancement && key.kind == KeyEventKind::Press {
                self.in_game_input.set_key(key.code, false);
            }
        }

        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let action = self.handle_key(key.code, key.modifiers);
        self.process_action(action)
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Action {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.screen {
            Screen::MainMenu => self.handle_main_menu_key(code),
            Screen::Connect => self.handle_connect_key(code),
            Screen::Connecting => self.handle_connecting_key(code),
            Screen::InGame => self.handle_in_game_key(code),
        }
    }

    fn handle_main_menu_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_index = self.selected_index.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_index = (self.selected_index + 1).min(1);
                Action::None
            }
            KeyCode::Enter => match self.selected_index {
                0 => Action::ChangeScreen(Screen::Connect),
                1 => Action::Quit,
                _ => Action::None,
            },
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => Action::None,
        }
    }

    fn handle_connect_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Esc => {
                self.connect_error = None;
                Action::ChangeScreen(Screen::MainMenu)
            }
            KeyCode::Enter => {
                if let Ok(addr) = self.connect_input.parse() {
                    self.connect_error = None;
                    Action::Connect(addr)
                } else {
                    self.connect_error = Some("Invalid address format".to_string());
                    Action::None
                }
            }
            KeyCode::Backspace => {
                self.connect_input.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '.' || c == ':' {
                    self.connect_input.push(c);
                }
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_connecting_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Esc => {
                if let Some(client) = &mut self.client {
                    let _ = client.disconnect();
                }
                self.client = None;
                Action::ChangeScreen(Screen::MainMenu)
            }
            _ => Action::None,
        }
    }

    fn handle_in_game_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char('q') => Action::Disconnect,
            _ => Action::None,
        }
    }

    fn process_action(&mut self, action: Action) -> io::Result<()> {
        match action {
            Action::None => {}
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Connect(addr) => {
                self.connect_to_server(addr)?;
            }
            Action::Disconnect => {
                if let Some(client) = &mut self.client {
                    let _ = client.disconnect();
                }
                self.client = None;
                self.screen = Screen::MainMenu;
                self.selected_index = 0;
                self.in_game_input = InputState::default();
            }
            Action::ChangeScreen(screen) => {
                self.screen = screen;
                self.selected_index = 0;
            }
        }

        Ok(())
    }

    fn connect_to_server(&mut self, addr: SocketAddr) -> io::Result<()> {
        // Also used by `run()`'s `--server` fast path before the event loop starts.
        let config = ClientConfig::default();
        let mut client = NetworkClient::new(config)?;

        if let Err(e) = client.connect(addr) {
            self.connect_error = Some(format!("Connection failed: {}", e));
            return Ok(());
        }

        self.client = Some(client);
        self.screen = Screen::Connecting;

        Ok(())
    }

    pub fn restore_terminal(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        if self.keyboard_enhancement {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        )?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

pub fn run(initial_server: Option<SocketAddr>) -> io::Result<()> {
    let mut tui = Tui::new()?;
    if let Some(addr) = initial_server {
        tui.connect_to_server(addr)?;
    }
    let result = tui.run();
    tui.restore_terminal()?;
    result
}
