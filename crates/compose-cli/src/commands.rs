use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use compose_core::{
    AggregateResponse, Capability, Registry, Router, RouterConfig, Snapshot, load_snapshot,
    persist, restore, save_snapshot,
};

use crate::error::CliError;
use crate::source::{TextSource, discover};

/// Load every source directory under `docs` as a capability.
fn load_sources(docs: &Path) -> Result<Vec<(String, String, Arc<dyn Capability>)>, CliError> {
    discover(docs)?
        .into_iter()
        .map(|dir| -> Result<_, CliError> {
            let source = TextSource::load(&dir.path)?;
            tracing::debug!(id = %dir.id, documents = source.len(), "loaded source");
            Ok((dir.id, dir.label, Arc::new(source) as Arc<dyn Capability>))
        })
        .collect()
}

/// Register every source under `docs` and write the snapshot to `snapshot_path`.
pub fn build(docs: &Path, snapshot_path: &Path) -> Result<Snapshot, CliError> {
    let registry = Registry::new();
    for (id, label, capability) in load_sources(docs)? {
        registry.register(id, capability, label)?;
    }
    if registry.is_empty() {
        return Err(CliError::NoSources(docs.to_path_buf()));
    }
    let snapshot = persist(&registry)?;
    save_snapshot(snapshot_path, &snapshot)?;
    tracing::info!(
        sources = snapshot.entries.len(),
        path = %snapshot_path.display(),
        "saved snapshot"
    );
    Ok(snapshot)
}

pub fn show(snapshot_path: &Path) -> Result<Snapshot, CliError> {
    Ok(load_snapshot(snapshot_path)?)
}

pub struct QueryOptions {
    pub limit: usize,
    pub top_k: Option<usize>,
    pub continue_on_error: bool,
    pub timeout: Option<Duration>,
}

/// Restore the index recorded at `snapshot_path`, backing each id with the
/// matching directory under `docs`, and run `text` against it.
///
/// Only directories the snapshot names are read.
pub async fn query(
    text: &str,
    docs: &Path,
    snapshot_path: &Path,
    opts: &QueryOptions,
) -> Result<AggregateResponse, CliError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let mut dirs: HashMap<String, PathBuf> = discover(docs)?
        .into_iter()
        .map(|dir| (dir.id, dir.path))
        .collect();
    let mut available: HashMap<String, Arc<dyn Capability>> = HashMap::new();
    for id in snapshot.ids() {
        if let Some(path) = dirs.remove(id) {
            let source = TextSource::load(&path)?;
            tracing::debug!(%id, documents = source.len(), "loaded source");
            available.insert(id.to_string(), Arc::new(source));
        }
    }
    if !dirs.is_empty() {
        tracing::debug!(
            ignored = ?dirs.keys().collect::<Vec<_>>(),
            "directories not in snapshot"
        );
    }
    let registry = restore(&snapshot, |id| available.remove(id))?;

    let config = RouterConfig::builder()
        .continue_on_source_error(opts.continue_on_error)
        .maybe_source_timeout(opts.timeout)
        .maybe_top_k(opts.top_k)
        .build();
    let router = Router::with_config(Arc::new(registry), config);
    Ok(router.query(text, opts.limit).await?)
}

// ── Output ─────────────────────────────────────────────────────────────────

pub fn format_snapshot(snapshot: &Snapshot) -> String {
    if snapshot.entries.is_empty() {
        return "(no sources)\n".to_string();
    }
    let mut out = String::new();
    for (i, entry) in snapshot.entries.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}  {}\n", i + 1, entry.id, entry.label));
    }
    out
}

pub fn format_response(response: &AggregateResponse) -> String {
    let mut out = String::new();
    if response.results.is_empty() {
        out.push_str("(no results)\n");
    }
    for (i, r) in response.results.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. [{:.3}] {}  {}\n",
            i + 1,
            r.score,
            r.path.join("/"),
            r.payload
        ));
    }
    for f in &response.failures {
        out.push_str(&format!("skipped {}: {}\n", f.path.join("/"), f.error));
    }
    out
}

pub fn response_json(response: &AggregateResponse) -> Result<String, CliError> {
    let failures: Vec<serde_json::Value> = response
        .failures
        .iter()
        .map(|f| serde_json::json!({ "path": f.path, "error": f.error.to_string() }))
        .collect();
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "results": response.results,
        "failures": failures,
    }))?)
}
