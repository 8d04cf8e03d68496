// Main TUI application using ratatui
// Owns the terminal, turns key presses into wheel commands, and carries out
// the effects the Pod asks for (catalog requests, credential persistence)

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, PLAYER_PROBE_INTERVAL, POSITION_POLL_INTERVAL};
use crate::player::mpv::{spawn_probe, MpvHandle, MpvProcess, Notify, PlayerEvent};
use crate::player::poll::PollTimer;
use crate::pod::{Command, Effect, Pod};
use crate::ui::navigation::{Screen, WheelInput};
use crate::ui::views::{self, Inputs, CUSTOM_ROW, FIRST_TRACK_ROW};
use crate::youtube::catalog::CatalogClient;
use crate::youtube::credential::{persist_api_key, KeyValueStore};

const INPUT_POLL: Duration = Duration::from_millis(50);
const NEED_KEY_MESSAGE: &str = "Set an API key in Settings first.";

type PodCommand = Command<MpvHandle>;

pub struct PodApp {
    pod: Pod<MpvHandle>,
    catalog: CatalogClient,
    store: Option<KeyValueStore>,
    config: Config,
    tx: mpsc::UnboundedSender<PodCommand>,
    rx: mpsc::UnboundedReceiver<PodCommand>,
    poll_timer: PollTimer<PodCommand>,
    probe: Option<JoinHandle<()>>,
    mpv: Option<MpvProcess>,
    // text fields and list cursor live here, the Pod never sees keystrokes
    search_query: String,
    custom_playlist: String,
    api_key_draft: String,
    list_cursor: usize,
    seen_revision: u64,
    editing_custom: bool,
    should_quit: bool,
    status_message: String,
}

impl PodApp {
    pub fn new(config: Config, store: Option<KeyValueStore>, credential: Option<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let poll_timer = PollTimer::new(tx.clone(), || Command::PollTick, POSITION_POLL_INTERVAL);
        let pod = Pod::new(credential);
        let seen_revision = pod.playlist().revision();

        PodApp {
            pod,
            catalog: CatalogClient::new(config.api_base.clone()),
            store,
            config,
            tx,
            rx,
            poll_timer,
            probe: None,
            mpv: None,
            search_query: String::new(),
            custom_playlist: String::new(),
            api_key_draft: String::new(),
            list_cursor: 0,
            seen_revision,
            editing_custom: false,
            should_quit: false,
            status_message: String::new(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.start_player();
        let result = self.event_loop(&mut terminal);
        self.shutdown().await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
        loop {
            terminal.draw(|f| views::draw(f, &self.pod, &self.inputs()))?;

            // catalog completions, player lifecycle and poll ticks
            while let Ok(command) = self.rx.try_recv() {
                self.dispatch(command);
            }

            if event::poll(INPUT_POLL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    fn inputs(&self) -> Inputs<'_> {
        Inputs {
            search_query: &self.search_query,
            custom_playlist: &self.custom_playlist,
            api_key_draft: &self.api_key_draft,
            list_cursor: self.list_cursor,
            editing_custom: self.editing_custom,
            status_message: &self.status_message,
        }
    }

    fn start_player(&mut self) {
        let binary = self.config.mpv_binary.clone();
        match MpvProcess::spawn(&binary, &self.config.mpv_socket) {
            Ok(process) => self.mpv = Some(process),
            Err(e) => {
                warn!(binary = %binary, error = %e, "could not start mpv");
                self.status_message = format!("Could not start {}, playback is unavailable", binary);
            }
        }

        let tx = self.tx.clone();
        let notify: Notify = Arc::new(move |event: PlayerEvent| match event {
            PlayerEvent::Attached(handle) => {
                let _ = tx.send(Command::PlayerAttached(handle));
            }
            PlayerEvent::Ready => {
                let _ = tx.send(Command::PlayerReady);
            }
            PlayerEvent::Error(message) => warn!(message = %message, "player reported an error"),
        });
        self.probe = Some(spawn_probe(
            self.config.mpv_socket.clone(),
            PLAYER_PROBE_INTERVAL,
            notify,
        ));
        self.dispatch(Command::PlayerProbeStarted);
    }

    async fn shutdown(&mut self) {
        self.poll_timer.stop();
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
        if let Some(mpv) = self.mpv.take() {
            mpv.shutdown().await;
        }
        info!("shut down");
    }

    fn dispatch(&mut self, command: PodCommand) {
        let previous_screen = self.pod.screen();
        if let Some(effect) = self.pod.apply(command) {
            self.run_effect(effect);
        }
        // the key field opens holding the current key, so Enter alone keeps it
        if self.pod.screen() == Screen::Settings && previous_screen != Screen::Settings {
            self.api_key_draft = self.pod.credential().to_string();
        }
        self.poll_timer.sync(self.pod.poll_key());
        self.sync_list_cursor();
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchPlaylist {
                request,
                source,
                credential,
                label,
            } => {
                let catalog = self.catalog.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = catalog.fetch_playlist(&source, &credential).await;
                    let _ = tx.send(Command::PlaylistFetched { request, label, result });
                });
            }
            Effect::Search {
                request,
                query,
                credential,
                title,
            } => {
                let catalog = self.catalog.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = catalog.search(&query, &credential).await;
                    let _ = tx.send(Command::SearchFinished { request, title, result });
                });
            }
            Effect::PersistCredential(value) => match &self.store {
                Some(store) => {
                    if let Err(e) = persist_api_key(store, value.as_deref()) {
                        warn!(error = %e, "could not persist API key");
                        self.status_message = "Could not save the API key, it is kept for this session".to_string();
                    }
                }
                None => debug!("no credential store, API key kept for this session only"),
            },
        }
    }

    // ==========================================
    // PLAYLIST SCREEN ROWS
    // ==========================================

    fn row_count(&self) -> usize {
        let playlist = self.pod.playlist();
        let below = if playlist.is_empty() {
            usize::from(!playlist.empty_hint().is_empty())
        } else {
            playlist.len()
        };
        FIRST_TRACK_ROW + below
    }

    // A new track list puts the cursor on its first track
    fn sync_list_cursor(&mut self) {
        let revision = self.pod.playlist().revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.list_cursor = FIRST_TRACK_ROW;
        }
        self.list_cursor = self.list_cursor.min(self.row_count() - 1);
    }

    fn activate_row(&mut self) {
        let row = self.list_cursor;
        if row < CUSTOM_ROW {
            self.require_credential();
            self.dispatch(Command::LoadPreset(row));
        } else if row == CUSTOM_ROW {
            self.editing_custom = true;
        } else if row - FIRST_TRACK_ROW < self.pod.playlist().len() {
            self.dispatch(Command::SelectTrack(row - FIRST_TRACK_ROW));
        }
    }

    fn require_credential(&mut self) {
        if self.pod.credential().is_empty() {
            self.status_message = NEED_KEY_MESSAGE.to_string();
        }
    }

    // ==========================================
    // KEYS
    // ==========================================

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        self.status_message.clear();

        if self.in_text_entry() {
            self.handle_text_key(key.code);
        } else {
            self.handle_wheel_key(key.code);
        }
    }

    fn in_text_entry(&self) -> bool {
        match self.pod.screen() {
            Screen::Search | Screen::Settings => true,
            Screen::Playlist => self.editing_custom,
            _ => false,
        }
    }

    fn text_buffer(&mut self) -> Option<&mut String> {
        match self.pod.screen() {
            Screen::Search => Some(&mut self.search_query),
            Screen::Settings => Some(&mut self.api_key_draft),
            Screen::Playlist if self.editing_custom => Some(&mut self.custom_playlist),
            _ => None,
        }
    }

    fn handle_text_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => {
                if let Some(buffer) = self.text_buffer() {
                    buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(buffer) = self.text_buffer() {
                    buffer.pop();
                }
            }
            KeyCode::Enter => self.submit_text(),
            KeyCode::Esc => {
                if self.editing_custom {
                    self.editing_custom = false;
                } else {
                    self.dispatch(Command::Wheel(WheelInput::Menu));
                }
            }
            KeyCode::Left => self.dispatch(Command::Wheel(WheelInput::Prev)),
            KeyCode::Right => self.dispatch(Command::Wheel(WheelInput::Next)),
            KeyCode::Tab => self.dispatch(Command::TogglePlay),
            _ => {}
        }
    }

    fn submit_text(&mut self) {
        match self.pod.screen() {
            Screen::Search => {
                self.require_credential();
                let query = self.search_query.trim().to_string();
                self.dispatch(Command::RunSearch(query));
            }
            Screen::Settings => {
                let draft = self.api_key_draft.clone();
                self.dispatch(Command::SetCredential(draft));
                self.api_key_draft = self.pod.credential().to_string();
                // a persistence failure already left its own message
                if self.status_message.is_empty() {
                    self.status_message = if self.pod.credential().is_empty() {
                        "API key cleared".to_string()
                    } else {
                        "API key saved".to_string()
                    };
                }
            }
            Screen::Playlist if self.editing_custom => {
                self.editing_custom = false;
                self.require_credential();
                let source = self.custom_playlist.trim().to_string();
                self.dispatch(Command::LoadCustomPlaylist(source));
            }
            _ => {}
        }
    }

    fn handle_wheel_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('m') => self.dispatch(Command::Wheel(WheelInput::Menu)),
            KeyCode::Right | KeyCode::Char('n') | KeyCode::Char('l') => {
                self.dispatch(Command::Wheel(WheelInput::Next))
            }
            KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('h') => {
                self.dispatch(Command::Wheel(WheelInput::Prev))
            }
            KeyCode::Char(' ') | KeyCode::Tab => self.dispatch(Command::TogglePlay),
            KeyCode::Up | KeyCode::Char('k') => self.scroll(false),
            KeyCode::Down | KeyCode::Char('j') => self.scroll(true),
            KeyCode::Enter => match self.pod.screen() {
                Screen::Playlist => self.activate_row(),
                _ => self.dispatch(Command::Wheel(WheelInput::Center)),
            },
            _ => {}
        }
    }

    fn scroll(&mut self, down: bool) {
        match self.pod.screen() {
            Screen::Menu => {
                let input = if down { WheelInput::Next } else { WheelInput::Prev };
                self.dispatch(Command::Wheel(input));
            }
            Screen::Playlist => {
                self.list_cursor = if down {
                    (self.list_cursor + 1).min(self.row_count() - 1)
                } else {
                    self.list_cursor.saturating_sub(1)
                };
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut PodApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut PodApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn test_app(credential: Option<&str>) -> PodApp {
        let config = Config {
            // nothing listens here, requests fail fast
            api_base: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        PodApp::new(config, None, credential.map(str::to_string))
    }

    fn open_menu_item(app: &mut PodApp, downs: usize) {
        for _ in 0..downs {
            press(app, KeyCode::Down);
        }
        press(app, KeyCode::Enter);
    }

    #[tokio::test]
    async fn arrow_keys_drive_the_menu() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 3);
        assert_eq!(app.pod.screen(), Screen::Settings);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.pod.screen(), Screen::Menu);
        assert_eq!(app.pod.menu_cursor(), 3);
    }

    #[tokio::test]
    async fn letters_are_text_on_the_search_screen() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 2);
        assert_eq!(app.pod.screen(), Screen::Search);

        type_text(&mut app, "qmj");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.search_query, "qm");
        assert!(!app.should_quit);
        assert_eq!(app.pod.screen(), Screen::Search);
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_text_entry() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 2);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn search_without_key_prompts_for_one() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 2);
        type_text(&mut app, "lofi");
        press(&mut app, KeyCode::Enter);

        assert!(!app.pod.search_status().searching);
        assert_eq!(app.status_message, NEED_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn failed_search_request_surfaces_a_message() {
        let mut app = test_app(Some("KEY"));
        open_menu_item(&mut app, 2);
        type_text(&mut app, "lofi");
        press(&mut app, KeyCode::Enter);
        assert!(app.pod.search_status().searching);

        let command = tokio::time::timeout(Duration::from_secs(10), app.rx.recv())
            .await
            .expect("search should complete")
            .expect("channel open");
        app.dispatch(command);

        assert!(!app.pod.search_status().searching);
        assert_eq!(
            app.pod.search_status().error,
            Some("Search failed. Check your API key or try again.")
        );
        assert_eq!(app.pod.screen(), Screen::Search);
    }

    #[tokio::test]
    async fn settings_enter_stores_trimmed_key() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 3);
        type_text(&mut app, " AIza ");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.pod.credential(), "AIza");
        assert_eq!(app.api_key_draft, "AIza");
        assert_eq!(app.status_message, "API key saved");
    }

    #[tokio::test]
    async fn unedited_settings_keep_the_stored_key() {
        let mut app = test_app(Some("AIzaStored"));
        open_menu_item(&mut app, 3);
        assert_eq!(app.api_key_draft, "AIzaStored");

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.pod.credential(), "AIzaStored");
        assert_eq!(app.status_message, "API key saved");

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.pod.credential(), "AIzaStored");
    }

    #[tokio::test]
    async fn clearing_the_settings_field_removes_the_key() {
        let mut app = test_app(Some("AIz"));
        open_menu_item(&mut app, 3);
        for _ in 0..3 {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.pod.credential(), "");
        assert_eq!(app.status_message, "API key cleared");
    }

    #[tokio::test]
    async fn custom_row_toggles_text_entry() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 1);
        assert_eq!(app.pod.screen(), Screen::Playlist);

        for _ in 0..CUSTOM_ROW {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.editing_custom);

        type_text(&mut app, "PLq");
        assert_eq!(app.custom_playlist, "PLq");
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(!app.editing_custom);
        assert_eq!(app.pod.screen(), Screen::Playlist);
    }

    #[tokio::test]
    async fn playlist_cursor_stays_within_rows() {
        let mut app = test_app(None);
        open_menu_item(&mut app, 1);

        // presets, the custom row and the empty-playlist hint
        for _ in 0..20 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.list_cursor, FIRST_TRACK_ROW);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.pod.screen(), Screen::Playlist);

        for _ in 0..20 {
            press(&mut app, KeyCode::Up);
        }
        assert_eq!(app.list_cursor, 0);
    }

    #[tokio::test]
    async fn preset_row_issues_a_search() {
        let mut app = test_app(Some("KEY"));
        open_menu_item(&mut app, 1);
        press(&mut app, KeyCode::Enter);
        assert!(app.pod.search_status().searching);
    }
}
