// Error types shared across the player
// Every failure here is recoverable: callers log and keep going

use thiserror::Error;

// Failures of the remote catalog (YouTube Data API).
// NoResults / NoPlayableResults are outcomes the user needs to tell apart,
// so they live next to the transport errors instead of being empty Vecs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service returned no items")]
    NoResults,

    #[error("no item carried both a video id and a title")]
    NoPlayableResults,
}

impl CatalogError {
    // Message shown on the search screen
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::NoResults => "No results. Try a different search.",
            CatalogError::NoPlayableResults => "No playable results found.",
            CatalogError::Request(_) | CatalogError::Parse(_) => {
                "Search failed. Check your API key or try again."
            }
        }
    }
}

// Failures raised by the external playback handle.
// These are swallowed at every call site; readiness of the player is racy.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("player command failed: {0}")]
    Command(String),

    #[error("player connection is gone")]
    Disconnected,
}

// Failures of the local key-value store holding the API key
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not find config directory")]
    NoConfigDir,

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
