use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::Error;
use crate::registry::Registry;

pub const SNAPSHOT_VERSION: u32 = 1;

// ── Data model ─────────────────────────────────────────────────────────────

/// Identity data of one registered source. The capability itself is never
/// persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub id: String,
    pub label: String,
}

/// Serializable projection of a [`Registry`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u32,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, Error> {
        let snapshot: Snapshot = serde_json::from_str(s)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

// ── Persist & restore ──────────────────────────────────────────────────────

/// Capture the `(id, label)` pairs of `registry` in registration order.
///
/// Any id and label `register` accepts is representable, so this only fails
/// if a future encoding narrows that.
pub fn persist(registry: &Registry) -> Result<Snapshot, Error> {
    let entries: Vec<SnapshotEntry> = registry
        .list_entries()
        .map(|(id, label)| SnapshotEntry { id, label })
        .collect();
    tracing::debug!(entries = entries.len(), "persisted registry");
    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        entries,
    })
}

/// Rebuild a registry, asking `resolver` for the live capability of every id.
///
/// Stops at the first id the resolver cannot supply.
pub fn restore<F>(snapshot: &Snapshot, mut resolver: F) -> Result<Registry, Error>
where
    F: FnMut(&str) -> Option<Arc<dyn Capability>>,
{
    let registry = Registry::new();
    for entry in &snapshot.entries {
        let capability =
            resolver(&entry.id).ok_or_else(|| Error::MissingCapability(entry.id.clone()))?;
        registry.register(entry.id.clone(), capability, entry.label.clone())?;
    }
    tracing::debug!(entries = registry.len(), "restored registry");
    Ok(registry)
}

/// Like [`restore`], but the supplied capabilities must match the snapshot
/// exactly: ids missing from the map fail with `MissingCapability`, extra ids
/// with `UnexpectedCapabilities`.
pub fn restore_exact(
    snapshot: &Snapshot,
    mut capabilities: HashMap<String, Arc<dyn Capability>>,
) -> Result<Registry, Error> {
    let registry = restore(snapshot, |id| capabilities.remove(id))?;
    if !capabilities.is_empty() {
        let mut extra: Vec<String> = capabilities.into_keys().collect();
        extra.sort();
        return Err(Error::UnexpectedCapabilities(extra));
    }
    Ok(registry)
}

// ── Storage ────────────────────────────────────────────────────────────────

/// Data directory: `COMPOSE_DATA_DIR`, else the platform data dir, else
/// `.compose` in the working directory.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COMPOSE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("compose"))
        .unwrap_or_else(|| PathBuf::from(".compose"))
}

/// Default snapshot file: `COMPOSE_SNAPSHOT` or `{data_dir}/index.json`.
pub fn default_snapshot_path() -> PathBuf {
    if let Ok(p) = std::env::var("COMPOSE_SNAPSHOT") {
        return PathBuf::from(p);
    }
    data_dir().join("index.json")
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    atomic_write(path, &snapshot.to_json()?)?;
    tracing::debug!(path = %path.display(), "wrote snapshot");
    Ok(())
}

/// A missing file surfaces as [`Error::Io`] with `ErrorKind::NotFound`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, Error> {
    let s = std::fs::read_to_string(path)?;
    Snapshot::from_json(&s)
}

fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
