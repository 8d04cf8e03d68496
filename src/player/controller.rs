// ==========================================
// PLAYBACK CONTROLLER
// ==========================================
// Wraps the single external player handle.
// It handles:
// - Tracking readiness of the external player (Uninitialized -> PollingForRuntime -> Ready)
// - Issuing load / play / pause commands, only while ready
// - Mirroring the transport position and duration by polling
//
// Commands issued before the player is ready are dropped, not queued.
// Every failure of the handle is logged and swallowed.

use tracing::{debug, warn};

use super::handle::PlaybackHandle;
use super::playlist::Track;

// ==========================================
// READINESS ENUM
// ==========================================
// Uninitialized:     nothing has tried to reach the player runtime yet
// PollingForRuntime: the probe is retrying, or a handle exists but has not
//                    signalled initialization
// Ready:             the handle accepts commands; terminal, never left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Uninitialized,
    PollingForRuntime,
    Ready,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub player_ready: bool,
    // Which video the handle currently has loaded, to skip redundant loads
    pub last_loaded_id: Option<String>,
}

pub struct PlaybackController<H> {
    handle: Option<H>,
    readiness: Readiness,
    state: PlaybackState,
}

impl<H: PlaybackHandle> Default for PlaybackController<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PlaybackHandle> PlaybackController<H> {
    pub fn new() -> Self {
        PlaybackController {
            handle: None,
            readiness: Readiness::Uninitialized,
            state: PlaybackState::default(),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    // ==========================================
    // READINESS TRANSITIONS
    // ==========================================
    pub fn begin_probe(&mut self) {
        if self.readiness == Readiness::Uninitialized {
            debug!("player: probing for runtime");
            self.readiness = Readiness::PollingForRuntime;
        }
    }

    // The probe constructed a handle. Only the first one is kept:
    // a handle is never torn down and recreated.
    pub fn attach(&mut self, handle: H) -> bool {
        if self.handle.is_some() {
            warn!("player: handle already attached, ignoring another one");
            return false;
        }
        self.handle = Some(handle);
        if self.readiness == Readiness::Uninitialized {
            self.readiness = Readiness::PollingForRuntime;
        }
        true
    }

    // The handle signalled it finished initializing
    pub fn mark_ready(&mut self) {
        if self.handle.is_none() {
            warn!("player: ready signal without a handle, ignoring");
            return;
        }
        if self.readiness != Readiness::Ready {
            debug!("player: ready");
        }
        self.readiness = Readiness::Ready;
        self.state.player_ready = true;
    }

    fn ready_handle(&mut self) -> Option<&mut H> {
        if self.readiness == Readiness::Ready {
            self.handle.as_mut()
        } else {
            None
        }
    }

    // ==========================================
    // PLAYBACK CONTROL: load()
    // ==========================================
    // Loads a track into the player and resets the transport readings.
    // No-op while not ready.
    pub fn load(&mut self, track: &Track) {
        let Some(handle) = self.ready_handle() else {
            return;
        };
        match handle.load_by_id(&track.id) {
            Ok(()) => {
                debug!(id = %track.id, "player: loaded");
                self.state.last_loaded_id = Some(track.id.clone());
                self.state.position_seconds = 0.0;
                self.state.duration_seconds = 0.0;
            }
            Err(e) => warn!(id = %track.id, error = %e, "player: failed to load video"),
        }
    }

    // Loads only when the handle holds some other video
    pub fn ensure_loaded(&mut self, track: &Track) {
        if self.state.last_loaded_id.as_deref() != Some(track.id.as_str()) {
            self.load(track);
        }
    }

    // ==========================================
    // PLAYBACK CONTROL: set_playing()
    // ==========================================
    // Records the play intent and actuates it if the player is ready.
    // Intent recorded before readiness is not replayed later.
    pub fn set_playing(&mut self, playing: bool) {
        self.state.is_playing = playing;
        let Some(handle) = self.ready_handle() else {
            return;
        };
        let result = if playing { handle.play() } else { handle.pause() };
        if let Err(e) = result {
            warn!(playing, error = %e, "player: transport command failed");
        }
    }

    // ==========================================
    // PLAYBACK INFO: poll()
    // ==========================================
    // Refreshes position and duration from the handle.
    // Non-finite readings and failed reads keep the previous values.
    pub fn poll(&mut self) -> (f64, f64) {
        if let Some(handle) = self.ready_handle() {
            let time = handle.current_time();
            let duration = handle.duration();

            match time {
                Ok(t) if t.is_finite() => self.state.position_seconds = t.max(0.0),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "player: position read failed"),
            }
            match duration {
                Ok(d) if d.is_finite() => self.state.duration_seconds = d.max(0.0),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "player: duration read failed"),
            }
        }
        (self.state.position_seconds, self.state.duration_seconds)
    }
}
