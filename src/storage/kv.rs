use std::collections::{BTreeMap, HashMap as StdHashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::storage::KvBackend;

/// On-disk encoding of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Pretty JSON object of key -> value; human readable.
    #[default]
    Json,
    /// Compact bincode envelope.
    Bincode,
}

impl FromStr for SnapshotFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "bincode" => Ok(SnapshotFormat::Bincode),
            other => Err(AppError::user("bad_snapshot_format".to_string(), format!("unknown snapshot format '{}'", other))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct StoreSettings {
    /// Display name used in log lines.
    pub name: String,
    /// Optional write-through persistence; `None` keeps the store purely in memory.
    #[serde(default)]
    pub persistence: Option<PersistenceSettings>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PersistenceSettings {
    /// Snapshot file rewritten after every mutation
    pub path: PathBuf,
    #[serde(default)]
    pub format: SnapshotFormat,
}

/// Bincode envelope; JSON snapshots are the bare map.
#[derive(Serialize, Deserialize)]
struct Snapshot { version: u32, created_ms: i64, entries: Vec<(String, String)> }

/// A single named in-memory KV store.
#[derive(Clone)]
pub struct KvStore {
    settings: StoreSettings,
    map: Arc<parking_lot::RwLock<StdHashMap<String, String>>>,
    /// Serializes snapshot writes so two mutations never interleave on disk
    persist_lock: Arc<parking_lot::Mutex<()>>,
}

impl KvStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings, map: Arc::new(parking_lot::RwLock::new(StdHashMap::new())), persist_lock: Arc::new(parking_lot::Mutex::new(())) }
    }

    /// Volatile store; nothing survives the process.
    pub fn in_memory(name: &str) -> Self {
        Self::new(StoreSettings { name: name.to_string(), persistence: None })
    }

    /// Open a store persisted at `path`, loading the existing snapshot if present.
    pub fn open(path: impl AsRef<Path>, format: SnapshotFormat) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let s = Self::new(StoreSettings { name, persistence: Some(PersistenceSettings { path, format }) });
        s.load_snapshot()?;
        Ok(s)
    }

    /// Write the whole map to the snapshot file (temp file + rename). No-op when volatile.
    pub fn save_snapshot(&self) -> AppResult<()> {
        let Some(p) = self.settings.persistence.as_ref() else { return Ok(()); };
        let _guard = self.persist_lock.lock();
        let entries: BTreeMap<String, String> = self.map.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let bytes = match p.format {
            SnapshotFormat::Json => serde_json::to_vec_pretty(&entries)?,
            SnapshotFormat::Bincode => {
                let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);
                let snap = Snapshot { version: 1, created_ms: now_ms, entries: entries.into_iter().collect() };
                bincode::serialize(&snap)?
            }
        };
        let tmp = p.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &p.path)?;
        debug!(target: "civic::storage", "snapshot saved store='{}' path='{}' bytes={}", self.settings.name, p.path.display(), bytes.len());
        Ok(())
    }

    /// Replace memory with the snapshot file contents. A missing file leaves the store empty;
    /// an unreadable one is `AppError::Corrupt`.
    pub fn load_snapshot(&self) -> AppResult<()> {
        let Some(p) = self.settings.persistence.as_ref() else { return Ok(()); };
        if !p.path.exists() { return Ok(()); }
        let bytes = std::fs::read(&p.path)?;
        let entries: Vec<(String, String)> = match p.format {
            SnapshotFormat::Json => {
                let m: BTreeMap<String, String> = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::corrupt("malformed_snapshot".to_string(), format!("{}: {}", p.path.display(), e))
                })?;
                m.into_iter().collect()
            }
            SnapshotFormat::Bincode => {
                let snap: Snapshot = bincode::deserialize(&bytes)?;
                snap.entries
            }
        };
        let mut w = self.map.write();
        w.clear();
        let n = entries.len();
        w.extend(entries);
        info!(target: "civic::storage", "snapshot loaded store='{}' keys={}", self.settings.name, n);
        Ok(())
    }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }

    /// Put `prev` back under `key` after a failed snapshot write, so memory keeps
    /// matching the file.
    fn restore(&self, key: &str, prev: Option<String>) {
        let mut w = self.map.write();
        match prev {
            Some(v) => { w.insert(key.to_string(), v); }
            None => { w.remove(key); }
        }
    }
}

impl KvBackend for KvStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> AppResult<()> {
        let prev = self.map.write().insert(key.to_string(), value);
        if let Err(e) = self.save_snapshot() {
            self.restore(key, prev);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<bool> {
        let Some(prev) = self.map.write().remove(key) else { return Ok(false); };
        if let Err(e) = self.save_snapshot() {
            self.restore(key, Some(prev));
            return Err(e);
        }
        Ok(true)
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.map.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
