// Entry point for ytpod, a click-wheel player for YouTube playlists and searches

mod config;
mod error;
mod logging;
mod player;
mod pod;
mod ui;
mod youtube;

use tracing::warn;

use config::Config;
use ui::app::PodApp;
use youtube::credential::{KeyValueStore, API_KEY_SLOT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Logging is best effort; the player works without it
    if let Err(e) = logging::init(&config.log_path()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let store = match KeyValueStore::new(config.config_dir.clone()) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "credential store unavailable");
            None
        }
    };

    let stored_key = store.as_ref().and_then(|s| match s.get(API_KEY_SLOT) {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "could not read stored API key");
            None
        }
    });
    let credential = config.api_key_override.clone().or(stored_key);

    let mut app = PodApp::new(config, store, credential);
    app.run().await
}
