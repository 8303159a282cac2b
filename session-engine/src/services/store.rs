//! Durable key/value persistence for tokens and device identity.
//!
//! The session store is the sole writer of the persisted keys; every other
//! component reads through it instead of caching tokens itself.

use crate::models::{DeviceIdentity, TokenPair};
use crate::services::EngineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Durable string key/value storage. Absence is a value, not an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    fn put(&self, key: &str, value: &str) -> Result<(), anyhow::Error>;
    fn remove(&self, key: &str) -> Result<(), anyhow::Error>;
}

/// File-backed store persisting a flat JSON document.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store, loading any existing document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("Corrupt session store at {:?}: {}", path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read session store at {:?}: {}",
                    path,
                    e
                ))
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), anyhow::Error> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .map_err(|e| anyhow::anyhow!("Failed to write session store at {:?}: {}", self.path, e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Store mutex poisoned: {}", e))?
            .remove(key);
        Ok(())
    }
}

/// Typed facade over the raw key/value store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Persist both tokens. Scheduling the refresh timer and reloading
    /// permissions are the orchestrator's responsibility, not the store's.
    pub fn store_tokens(&self, pair: &TokenPair) -> Result<(), EngineError> {
        self.inner
            .put(ACCESS_TOKEN_KEY, &pair.access_token)
            .map_err(EngineError::Storage)?;
        self.inner
            .put(REFRESH_TOKEN_KEY, &pair.refresh_token)
            .map_err(EngineError::Storage)?;
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn token_pair(&self) -> Option<TokenPair> {
        match (self.access_token(), self.refresh_token()) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        }
    }

    /// Remove both tokens; removing already-absent keys is not an error.
    pub fn clear_tokens(&self) -> Result<(), EngineError> {
        self.inner
            .remove(ACCESS_TOKEN_KEY)
            .map_err(EngineError::Storage)?;
        self.inner
            .remove(REFRESH_TOKEN_KEY)
            .map_err(EngineError::Storage)?;
        Ok(())
    }

    /// Return the persisted device id, generating and persisting one on
    /// first access.
    pub fn get_or_create_device_id(&self) -> Result<String, EngineError> {
        if let Some(existing) = self.read(DEVICE_ID_KEY) {
            return Ok(existing);
        }

        let identity = DeviceIdentity::generate();
        self.inner
            .put(DEVICE_ID_KEY, &identity.device_id)
            .map_err(EngineError::Storage)?;
        tracing::info!(device_id = %identity.device_id, "Generated device identity");
        Ok(identity.device_id)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Session store read failed");
                None
            }
        }
    }
}
