//! Durable tab state persistence
//!
//! A [`StateStore`] mirrors the persisted subset of every non-errored tab
//! record, keyed by tab id. The whole mapping is stored as one JSON value
//! under the logical key `"state"`; another process sharing the same medium
//! sees our writes through a storage-change notification and vice versa.
//!
//! Implementations:
//! - [`JsonFileStore`] - a JSON file guarded by `fs2` advisory locks
//! - [`MemoryStore`] - an in-memory medium that several handles can share

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use tabside_core::prelude::*;
use tabside_core::{PersistedTab, TabId, TabRecord};

/// The serialized mapping, ordered by tab id so snapshots are stable
pub type PersistedTabs = BTreeMap<TabId, PersistedTab>;

/// Durable mapping from tab id to its persisted record
pub trait StateStore: Send {
    /// Every persisted record
    fn all(&self) -> &PersistedTabs;

    fn get(&self, tab_id: TabId) -> Option<PersistedTab> {
        self.all().get(&tab_id).copied()
    }

    fn set(&mut self, tab_id: TabId, tab: PersistedTab) -> Result<()>;

    fn unset(&mut self, tab_id: TabId) -> Result<()>;

    /// Re-read the backing medium into memory
    fn reload(&mut self) -> Result<()>;

    /// The serialized form of [`StateStore::all`], as the medium holds it
    fn snapshot(&self) -> String {
        serialize_tabs(self.all())
    }
}

/// Serialize a mapping the way every store writes it
pub fn serialize_tabs(tabs: &PersistedTabs) -> String {
    // BTreeMap<TabId, PersistedTab> serialization cannot fail
    serde_json::to_string(tabs).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a serialized mapping; an empty string is an empty mapping
pub fn parse_tabs(content: &str) -> Result<PersistedTabs> {
    if content.trim().is_empty() {
        return Ok(PersistedTabs::new());
    }
    Ok(serde_json::from_str(content)?)
}

/// Whether an external storage value describes what `store` already holds.
///
/// Compared textually first, then structurally so a writer with different
/// formatting does not force a resync.
pub fn snapshot_matches(store: &dyn StateStore, new_value: Option<&str>) -> bool {
    let new_value = new_value.unwrap_or("");
    if store.snapshot() == new_value {
        return true;
    }
    match parse_tabs(new_value) {
        Ok(tabs) => &tabs == store.all(),
        Err(_) => false,
    }
}

/// In-memory tab records rebuilt from everything the store holds
pub fn records_from_store(store: &dyn StateStore) -> HashMap<TabId, TabRecord> {
    store
        .all()
        .iter()
        .map(|(id, persisted)| (*id, TabRecord::from_persisted(*id, persisted)))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON file store
// ─────────────────────────────────────────────────────────────────────────────

/// Store backed by a JSON file.
///
/// Every mutation rewrites the file under an exclusive lock; reloads read it
/// under a shared lock, so concurrent processes never observe a torn write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tabs: PersistedTabs,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::store(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }

        let tabs = read_tabs_file(&path)?;
        info!("Opened state store {:?} with {} tab(s)", path, tabs.len());
        Ok(Self { path, tabs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        write_tabs_file(&self.path, &self.tabs)
    }
}

impl StateStore for JsonFileStore {
    fn all(&self) -> &PersistedTabs {
        &self.tabs
    }

    fn set(&mut self, tab_id: TabId, tab: PersistedTab) -> Result<()> {
        if self.tabs.get(&tab_id) == Some(&tab) {
            return Ok(());
        }
        self.tabs.insert(tab_id, tab);
        self.persist()
    }

    fn unset(&mut self, tab_id: TabId) -> Result<()> {
        if self.tabs.remove(&tab_id).is_none() {
            return Ok(());
        }
        self.persist()
    }

    fn reload(&mut self) -> Result<()> {
        self.tabs = read_tabs_file(&self.path)?;
        debug!("Reloaded {} tab(s) from {:?}", self.tabs.len(), self.path);
        Ok(())
    }
}

/// Read the mapping from disk.
///
/// A missing file is an empty store. A corrupt file is logged and treated
/// as empty; the next write replaces it.
fn read_tabs_file(path: &Path) -> Result<PersistedTabs> {
    let Some(content) = read_locked(path)? else {
        debug!("No state store at {:?}, starting empty", path);
        return Ok(PersistedTabs::new());
    };

    match parse_tabs(&content) {
        Ok(tabs) => Ok(tabs),
        Err(e) => {
            warn!("Ignoring corrupt state store {:?}: {}", path, e);
            Ok(PersistedTabs::new())
        }
    }
}

/// Raw file contents read under a shared lock; `None` if the file is missing
pub(crate) fn read_locked(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(format!("Failed to open {:?}", path)),
    };

    FileExt::lock_shared(&file).map_err(|_| Error::store_locked(path))?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    let _ = FileExt::unlock(&file);
    read.context(format!("Failed to read {:?}", path))?;

    Ok(Some(content))
}

fn write_tabs_file(path: &Path, tabs: &PersistedTabs) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::store(format!("Failed to open {:?}: {}", path, e)))?;

    // Truncate only once the lock is held so readers never see an empty file
    FileExt::lock_exclusive(&file).map_err(|_| Error::store_locked(path))?;
    let written = (|| -> std::io::Result<()> {
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialize_tabs(tabs).as_bytes())?;
        file.flush()
    })();
    let _ = FileExt::unlock(&file);

    written.map_err(|e| Error::store(format!("Failed to write {:?}: {}", path, e)))?;
    trace!("Wrote {} tab(s) to {:?}", tabs.len(), path);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// A shared in-memory medium holding the serialized mapping
#[derive(Debug, Clone, Default)]
pub struct SharedMedium(Arc<Mutex<String>>);

impl SharedMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current serialized value
    pub fn read(&self) -> String {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn write(&self, value: String) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }
}

/// Store over a [`SharedMedium`]; clones of the medium act like separate
/// windows sharing one storage area
#[derive(Debug, Default)]
pub struct MemoryStore {
    medium: SharedMedium,
    tabs: PersistedTabs,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a handle over an existing medium
    pub fn with_medium(medium: SharedMedium) -> Result<Self> {
        let tabs = parse_tabs(&medium.read())?;
        Ok(Self { medium, tabs })
    }

    pub fn medium(&self) -> &SharedMedium {
        &self.medium
    }
}

impl StateStore for MemoryStore {
    fn all(&self) -> &PersistedTabs {
        &self.tabs
    }

    fn set(&mut self, tab_id: TabId, tab: PersistedTab) -> Result<()> {
        self.tabs.insert(tab_id, tab);
        self.medium.write(serialize_tabs(&self.tabs));
        Ok(())
    }

    fn unset(&mut self, tab_id: TabId) -> Result<()> {
        self.tabs.remove(&tab_id);
        self.medium.write(serialize_tabs(&self.tabs));
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.tabs = parse_tabs(&self.medium.read())?;
        Ok(())
    }
}
