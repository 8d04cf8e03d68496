// Runtime configuration
// Everything has a default; environment variables override them

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

// Both timers in the app tick at this rate
pub const PLAYER_PROBE_INTERVAL: Duration = Duration::from_millis(500);
pub const POSITION_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Config {
    // Base URL of the YouTube Data API
    pub api_base: String,
    // API key from the environment, takes precedence over the stored one
    pub api_key_override: Option<String>,
    pub mpv_binary: String,
    pub mpv_socket: PathBuf,
    // Where credentials.json lives
    pub config_dir: Option<PathBuf>,
    // Where ytpod.log lives
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_override: None,
            mpv_binary: "mpv".to_string(),
            mpv_socket: std::env::temp_dir().join("ytpod-mpv.sock"),
            config_dir: dirs::config_dir().map(|d| d.join("ytpod")),
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("ytpod"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(base) = non_empty("YTPOD_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        config.api_key_override = non_empty("YTPOD_API_KEY").map(|k| k.trim().to_string());
        if let Some(bin) = non_empty("YTPOD_MPV") {
            config.mpv_binary = bin;
        }
        if let Some(sock) = non_empty("YTPOD_MPV_SOCKET") {
            config.mpv_socket = PathBuf::from(sock);
        }
        config
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("ytpod.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_public_api() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.mpv_binary, "mpv");
        assert!(config.api_key_override.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("YTPOD_API_BASE", "http://localhost:9000/v3/"),
            ("YTPOD_API_KEY", "  abc  "),
            ("YTPOD_MPV", "/opt/mpv"),
            ("YTPOD_MPV_SOCKET", "/tmp/x.sock"),
        ]));
        assert_eq!(config.api_base, "http://localhost:9000/v3");
        assert_eq!(config.api_key_override.as_deref(), Some("abc"));
        assert_eq!(config.mpv_binary, "/opt/mpv");
        assert_eq!(config.mpv_socket, PathBuf::from("/tmp/x.sock"));
    }

    #[test]
    fn blank_key_is_ignored() {
        let config = Config::from_lookup(lookup_from(&[("YTPOD_API_KEY", "   ")]));
        assert!(config.api_key_override.is_none());
    }
}
