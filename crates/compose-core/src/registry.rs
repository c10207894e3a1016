use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::capability::Capability;
use crate::error::Error;

// ── Data model ─────────────────────────────────────────────────────────────

/// A registered source: stable id, live capability, routing label.
#[derive(Clone)]
pub struct RegistryEntry {
    pub id: String,
    pub capability: Arc<dyn Capability>,
    pub label: String,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Immutable view of the registry at one point in time.
#[derive(Default)]
pub(crate) struct Entries {
    ordered: Vec<RegistryEntry>,
    by_id: HashMap<String, usize>,
}

impl Entries {
    fn from_ordered(ordered: Vec<RegistryEntry>) -> Self {
        let by_id = ordered
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { ordered, by_id }
    }

    fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.by_id.get(id).map(|&i| &self.ordered[i])
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, RegistryEntry> {
        self.ordered.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.ordered.len()
    }
}

// ── Registry ───────────────────────────────────────────────────────────────

/// Ordered mapping from source id to capability.
///
/// Copy-on-write: mutations build a new [`Entries`] under the write lock and
/// swap it in, so readers holding an older snapshot are never disturbed.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Arc<Entries>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `capability` under `id`. Fails without touching the registry
    /// if `id` is already taken.
    pub fn register(
        &self,
        id: impl Into<String>,
        capability: Arc<dyn Capability>,
        label: impl Into<String>,
    ) -> Result<(), Error> {
        let id = id.into();
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if guard.get(&id).is_some() {
            return Err(Error::DuplicateId(id));
        }
        let mut ordered = guard.ordered.clone();
        ordered.push(RegistryEntry {
            id: id.clone(),
            capability,
            label: label.into(),
        });
        *guard = Arc::new(Entries::from_ordered(ordered));
        tracing::debug!(id = %id, sources = guard.len(), "registered source");
        Ok(())
    }

    /// Remove `id` and hand its capability back; tearing it down is up to
    /// the caller.
    pub fn unregister(&self, id: &str) -> Result<Arc<dyn Capability>, Error> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(&idx) = guard.by_id.get(id) else {
            return Err(Error::NotFound(id.to_string()));
        };
        let mut ordered = guard.ordered.clone();
        let removed = ordered.remove(idx);
        *guard = Arc::new(Entries::from_ordered(ordered));
        tracing::debug!(id, sources = guard.len(), "unregistered source");
        Ok(removed.capability)
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Capability>, Error> {
        self.snapshot()
            .get(id)
            .map(|e| e.capability.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn label(&self, id: &str) -> Result<String, Error> {
        self.snapshot()
            .get(id)
            .map(|e| e.label.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(id, label)` pairs in registration order.
    ///
    /// The iterator owns a snapshot taken at call time; registrations made
    /// while it is alive are not observed. Call again to restart.
    pub fn list_entries(&self) -> ListEntries {
        ListEntries {
            entries: self.snapshot(),
            pos: 0,
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Entries> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Lazy iterator returned by [`Registry::list_entries`].
pub struct ListEntries {
    entries: Arc<Entries>,
    pos: usize,
}

impl Iterator for ListEntries {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.ordered.get(self.pos)?;
        self.pos += 1;
        Some((entry.id.clone(), entry.label.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.entries.len() - self.pos;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for ListEntries {}
