// Application state of the player
// Owns the navigation state, the playlist and the playback controller.
// Every mutation goes through Pod::apply(Command); anything that has to
// happen outside (network requests, persistence) comes back as an Effect
// for the event loop to carry out.

use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::player::controller::{PlaybackController, PlaybackState, Readiness};
use crate::player::handle::PlaybackHandle;
use crate::player::playlist::{Playlist, Track};
use crate::player::poll::PollKey;
use crate::ui::navigation::{Navigator, Screen, Step, Transition, WheelInput};

pub const SEARCH_RESULTS_TITLE: &str = "Search results";
pub const CUSTOM_PLAYLIST_TITLE: &str = "Custom playlist";
pub const EMPTY_PLAYLIST_HINT: &str = "No videos found in this playlist.";
pub const EMPTY_SEARCH_HINT: &str = "No results. Try a different search.";

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub label: &'static str,
    pub query: &'static str,
}

// Presets are searches rather than fixed playlist ids, so they keep working
// when a given playlist disappears
pub const PRESETS: [Preset; 4] = [
    Preset { label: "Chill Lofi Beats", query: "chill lofi hip hop mix" },
    Preset { label: "Jazz Vibes", query: "jazz vibes playlist" },
    Preset { label: "Synthwave / Retrowave", query: "synthwave retrowave mix" },
    Preset { label: "Indie Mix", query: "indie rock mix" },
];

pub type RequestId = u64;

pub enum Command<H> {
    Wheel(WheelInput),
    TogglePlay,
    Activate(Screen),
    SelectTrack(usize),
    RunSearch(String),
    LoadPreset(usize),
    LoadCustomPlaylist(String),
    SetCredential(String),
    PlayerProbeStarted,
    PlayerAttached(H),
    PlayerReady,
    PollTick,
    PlaylistFetched {
        request: RequestId,
        label: String,
        result: Result<Vec<Track>, CatalogError>,
    },
    SearchFinished {
        request: RequestId,
        title: String,
        result: Result<Vec<Track>, CatalogError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPlaylist {
        request: RequestId,
        source: String,
        credential: String,
        label: String,
    },
    Search {
        request: RequestId,
        query: String,
        credential: String,
        title: String,
    },
    PersistCredential(Option<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStatus {
    pub searching: bool,
    pub error: Option<&'static str>,
}

pub struct Pod<H> {
    nav: Navigator,
    playlist: Playlist,
    player: PlaybackController<H>,
    credential: String,
    search: SearchStatus,
    next_request: RequestId,
    latest_request: Option<RequestId>,
    // the search `searching` is waiting on, whether or not it is still the latest request
    pending_search: Option<RequestId>,
}

impl<H: PlaybackHandle> Pod<H> {
    pub fn new(credential: Option<String>) -> Self {
        Pod {
            nav: Navigator::new(),
            playlist: Playlist::new(),
            player: PlaybackController::new(),
            credential: credential.unwrap_or_default(),
            search: SearchStatus::default(),
            next_request: 1,
            latest_request: None,
            pending_search: None,
        }
    }

    // ==========================================
    // READ SIDE, USED BY THE VIEWS
    // ==========================================

    pub fn screen(&self) -> Screen {
        self.nav.screen()
    }

    pub fn menu_cursor(&self) -> usize {
        self.nav.menu_cursor()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn playback(&self) -> &PlaybackState {
        self.player.state()
    }

    pub fn readiness(&self) -> Readiness {
        self.player.readiness()
    }

    pub fn search_status(&self) -> &SearchStatus {
        &self.search
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    // The poll timer runs while this is Some; a new value means re-arm
    pub fn poll_key(&self) -> Option<PollKey> {
        if self.player.is_ready() && self.playlist.current().is_some() {
            Some(PollKey {
                revision: self.playlist.revision(),
                index: self.playlist.current_index(),
            })
        } else {
            None
        }
    }

    // ==========================================
    // WRITE SIDE
    // ==========================================

    pub fn apply(&mut self, command: Command<H>) -> Option<Effect> {
        match command {
            Command::Wheel(input) => {
                if let Transition::StepTrack(step) = self.nav.handle(input) {
                    self.step(step);
                }
                None
            }
            Command::TogglePlay => {
                self.toggle_play();
                None
            }
            Command::Activate(screen) => {
                self.nav.activate(screen);
                None
            }
            Command::SelectTrack(index) => {
                self.select_track(index);
                None
            }
            Command::RunSearch(query) => self.start_search(query, SEARCH_RESULTS_TITLE.to_string()),
            Command::LoadPreset(index) => {
                let preset = PRESETS.get(index)?;
                self.start_search(format!("{} music", preset.query), preset.label.to_string())
            }
            Command::LoadCustomPlaylist(raw) => self.start_playlist_fetch(raw),
            Command::SetCredential(value) => {
                self.credential = value.trim().to_string();
                let persisted = (!self.credential.is_empty()).then(|| self.credential.clone());
                Some(Effect::PersistCredential(persisted))
            }
            Command::PlayerProbeStarted => {
                self.player.begin_probe();
                None
            }
            Command::PlayerAttached(handle) => {
                self.player.attach(handle);
                None
            }
            Command::PlayerReady => {
                // earlier play intent and track changes are not replayed;
                // the next toggle or track change loads what is current
                self.player.mark_ready();
                None
            }
            Command::PollTick => {
                self.player.poll();
                None
            }
            Command::PlaylistFetched { request, label, result } => {
                self.finish_playlist_fetch(request, label, result);
                None
            }
            Command::SearchFinished { request, title, result } => {
                self.finish_search(request, title, result);
                None
            }
        }
    }

    // Loads the current track (if any) and sets the transport to `playing`
    fn cue_current(&mut self, playing: bool) {
        if let Some(track) = self.playlist.current().cloned() {
            self.player.load(&track);
        }
        self.player.set_playing(playing);
    }

    fn step(&mut self, step: Step) {
        match step {
            Step::Forward => self.playlist.advance(),
            Step::Backward => self.playlist.retreat(),
        };
        self.cue_current(true);
    }

    fn select_track(&mut self, index: usize) {
        self.playlist.select(index);
        self.nav.activate(Screen::NowPlaying);
        self.cue_current(true);
    }

    fn toggle_play(&mut self) {
        let playing = !self.player.state().is_playing;
        if playing {
            if let Some(track) = self.playlist.current().cloned() {
                self.player.ensure_loaded(&track);
            }
        }
        self.player.set_playing(playing);
    }

    fn issue_request(&mut self) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        self.latest_request = Some(request);
        request
    }

    // Completions of anything but the newest request are dropped, so a slow
    // stale response can't overwrite a newer one
    fn is_current_request(&self, request: RequestId) -> bool {
        if self.latest_request == Some(request) {
            true
        } else {
            debug!(request, latest = ?self.latest_request, "dropping stale catalog response");
            false
        }
    }

    fn start_search(&mut self, query: String, title: String) -> Option<Effect> {
        if self.credential.is_empty() || query.trim().is_empty() {
            return None;
        }
        self.search = SearchStatus {
            searching: true,
            error: None,
        };
        let request = self.issue_request();
        self.pending_search = Some(request);
        Some(Effect::Search {
            request,
            query,
            credential: self.credential.clone(),
            title,
        })
    }

    fn finish_search(&mut self, request: RequestId, title: String, result: Result<Vec<Track>, CatalogError>) {
        // a playlist fetch may have superseded this search; it still ends the wait
        if self.pending_search == Some(request) {
            self.pending_search = None;
            self.search.searching = false;
        }
        if !self.is_current_request(request) {
            return;
        }

        match result {
            Ok(tracks) => {
                info!(count = tracks.len(), title = %title, "search results loaded");
                self.playlist.replace(tracks, title, EMPTY_SEARCH_HINT);
                self.cue_current(false);
                self.nav.activate(Screen::Playlist);
            }
            Err(e) => {
                match e {
                    CatalogError::Request(_) | CatalogError::Parse(_) => {
                        warn!(error = %e, "search failed")
                    }
                    _ => info!(outcome = %e, "search returned nothing usable"),
                }
                self.search.error = Some(e.user_message());
            }
        }
    }

    fn start_playlist_fetch(&mut self, source: String) -> Option<Effect> {
        if self.credential.is_empty() || source.trim().is_empty() {
            return None;
        }
        let request = self.issue_request();
        Some(Effect::FetchPlaylist {
            request,
            source,
            credential: self.credential.clone(),
            label: CUSTOM_PLAYLIST_TITLE.to_string(),
        })
    }

    fn finish_playlist_fetch(&mut self, request: RequestId, label: String, result: Result<Vec<Track>, CatalogError>) {
        if !self.is_current_request(request) {
            return;
        }
        match result {
            Ok(tracks) => {
                let hint = if tracks.is_empty() { EMPTY_PLAYLIST_HINT } else { "" };
                self.playlist.replace(tracks, label, hint);
                self.cue_current(true);
                self.nav.activate(Screen::Playlist);
            }
            // best effort: prior playlist stays as it was
            Err(e) => warn!(error = %e, "failed to load playlist"),
        }
    }
}
