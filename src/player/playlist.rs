// ==========================================
// PLAYLIST MODULE
// ==========================================
// The in-memory track list the click-wheel steps through.
// It handles:
// - Replacing the whole list after a catalog fetch (no incremental merge)
// - Wrapping next/previous navigation
// - Keeping the current index clamped into range
// - A revision counter so timers can tell one list from the next

// ==========================================
// TRACK STRUCT
// ==========================================
// A playable unit: the YouTube video id and the title shown on screen.
// Tracks are only built by the catalog client and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Track {
            id: id.into(),
            title: title.into(),
        }
    }
}

pub const DEFAULT_TITLE: &str = "Playlist";
pub const DEFAULT_EMPTY_HINT: &str = "Go to Settings to load a playlist.";

// ==========================================
// PLAYLIST STRUCT
// ==========================================
// tracks: the ordered list, replaced wholesale on every successful fetch
// current_index: 0-based; meaningful only while tracks is non-empty
// title / empty_hint: labels for the playlist screen
// revision: bumped on every replace, identifies "this" track list
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
    current_index: usize,
    title: String,
    empty_hint: String,
    revision: u64,
}

impl Default for Playlist {
    fn default() -> Self {
        Playlist::new()
    }
}

impl Playlist {
    pub fn new() -> Self {
        Playlist {
            tracks: Vec::new(),
            current_index: 0,
            title: DEFAULT_TITLE.to_string(),
            empty_hint: DEFAULT_EMPTY_HINT.to_string(),
            revision: 0,
        }
    }

    // ==========================================
    // REPLACE: replace()
    // ==========================================
    // Swaps in a freshly fetched list and rewinds to the first track.
    // Example:
    // - Before: [A, B, C] at index 2, revision 4
    // - replace([D, E], "Jazz", "")
    // - After:  [D, E] at index 0, revision 5
    pub fn replace(&mut self, tracks: Vec<Track>, title: impl Into<String>, empty_hint: impl Into<String>) {
        self.tracks = tracks;
        self.current_index = 0;
        self.title = title.into();
        self.empty_hint = empty_hint.into();
        self.revision += 1;
    }

    // ==========================================
    // NAVIGATION: advance() / retreat()
    // ==========================================
    // Step the index forward or backward, wrapping around the ends.
    // The modulus base is max(len, 1) so an empty list stays at 0
    // instead of dividing by zero.
    //
    // Returns the track now current, or None when the list is empty.
    pub fn advance(&mut self) -> Option<&Track> {
        let base = self.tracks.len().max(1);
        self.current_index = (self.current_index + 1) % base;
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&Track> {
        let base = self.tracks.len().max(1);
        self.current_index = (self.current_index + base - 1) % base;
        self.current()
    }

    // Jump straight to an index (list selection). Out of range values are
    // clamped to the last track.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        self.current_index = index.min(self.tracks.len().saturating_sub(1));
        self.current()
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn empty_hint(&self) -> &str {
        &self.empty_hint
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
