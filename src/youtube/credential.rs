// Local key-value store for the YouTube API key
// Keeps the key across sessions in a small JSON object file; every failure
// is reported to the caller, who logs it and carries on without persistence

use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::error::StoreError;

pub const API_KEY_SLOT: &str = "ytpod.apiKey";

pub struct KeyValueStore {
    path: PathBuf,
}

impl KeyValueStore {
    pub fn new(config_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        let config_dir = config_dir.ok_or(StoreError::NoConfigDir)?;
        fs::create_dir_all(&config_dir)?;
        Ok(KeyValueStore {
            path: config_dir.join("credentials.json"),
        })
    }

    fn load_map(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn save_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.load_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.load_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.save_map(&map)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.load_map()?;
        if map.remove(key).is_some() {
            self.save_map(&map)?;
        }
        Ok(())
    }
}

// Mirrors the in-memory credential: empty clears the slot
pub fn persist_api_key(store: &KeyValueStore, api_key: Option<&str>) -> Result<(), StoreError> {
    match api_key {
        Some(key) if !key.is_empty() => store.set(API_KEY_SLOT, key),
        _ => store.remove(API_KEY_SLOT),
    }
}
