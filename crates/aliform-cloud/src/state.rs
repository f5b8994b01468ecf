//! State management for managed resources
//!
//! Manages the `.aliform/state.json` file which records, for every declared
//! resource, the remote id and the attributes last read from the cloud.

use crate::error::{CloudError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".aliform";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_PENDING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const LOCK_STALE_HOURS: i64 = 1;

/// All resources known to the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by address ("type.name"), in a stable order
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resource(&mut self, address: String, state: ResourceState) {
        self.resources.insert(address, state);
        self.updated_at = Utc::now();
    }

    pub fn remove_resource(&mut self, address: &str) -> Option<ResourceState> {
        let removed = self.resources.remove(address);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get_resource(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    /// Look up `attribute` of the resource at `address`; `id` yields the remote id
    pub fn lookup(&self, address: &str, attribute: &str) -> Option<Value> {
        let resource = self.resources.get(address)?;
        if attribute == "id" {
            return Some(Value::String(resource.id.clone()));
        }
        resource.attributes.get(attribute).cloned()
    }
}

/// One managed resource, or the last result of a data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Remote id (`vpc-...`, `vsw-...`)
    pub id: String,

    pub resource_type: String,

    /// Attributes as last read from the cloud
    pub attributes: Map<String, Value>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Replace the attributes after a refresh, keeping the creation time
    pub fn refresh(&mut self, id: impl Into<String>, attributes: Map<String, Value>) {
        self.id = id.into();
        self.attributes = attributes;
        self.updated_at = Utc::now();
    }
}

/// Reads and writes `.aliform/` under a project root
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!(dir = %self.dir.display(), "Created state directory");
        }
        Ok(())
    }

    /// Current state; empty when no state file exists yet
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No state file yet");
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content).map_err(|e| {
            CloudError::StateError(format!("{} is not a valid state file: {}", path.display(), e))
        })?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(
            serial = state.serial,
            resources = state.resources.len(),
            "Loaded state"
        );
        Ok(state)
    }

    /// Write `state` with the next serial; the previous file becomes the backup
    ///
    /// The new content goes to a temporary file first, so an interrupted save
    /// leaves the old state in place.
    pub async fn save(&self, state: &mut GlobalState) -> Result<()> {
        self.ensure_dir().await?;

        state.serial += 1;
        let content = serde_json::to_string_pretty(state)?;
        let path = self.state_path();
        let pending = self.dir.join(STATE_PENDING);
        fs::write(&pending, content).await?;

        if path.exists() {
            fs::copy(&path, self.dir.join(STATE_BACKUP)).await?;
        }
        fs::rename(&pending, &path).await?;

        tracing::debug!(
            serial = state.serial,
            resources = state.resources.len(),
            "Saved state"
        );
        Ok(())
    }

    /// Take the lock file; a lock older than an hour is taken over
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_dir().await?;
        let lock_path = self.dir.join(LOCK_FILE);

        if let Some(existing) = read_lock(&lock_path).await? {
            let age = Utc::now().signed_duration_since(existing.acquired_at);
            if age < TimeDelta::hours(LOCK_STALE_HOURS) {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} (pid {}) since {}",
                    existing.holder, existing.pid, existing.acquired_at
                )));
            }
            tracing::warn!(
                holder = %existing.holder,
                since = %existing.acquired_at,
                "Taking over a stale state lock"
            );
            fs::remove_file(&lock_path).await?;
        }

        let info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&info)?;

        // create_new: two processes racing for the lock cannot both win
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(
                    "State was locked by another process".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&content).await?;
        file.flush().await?;

        tracing::debug!(pid = info.pid, "Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

async fn read_lock(path: &Path) -> Result<Option<LockInfo>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held while a command may write state; the lock file goes away on drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => {
                tracing::debug!("Released state lock");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
