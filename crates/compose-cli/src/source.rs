use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use compose_core::{Capability, Hit, Retrieved, SourceError};

use crate::error::CliError;

const PREVIEW_CHARS: usize = 160;
const LABEL_FILE: &str = "LABEL";

// ── Discovery ──────────────────────────────────────────────────────────────

/// A subdirectory of the docs root that backs one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDir {
    pub id: String,
    pub label: String,
    pub path: PathBuf,
}

/// List the source directories under `root`, sorted by name.
///
/// The label is the first non-blank line of the directory's `LABEL` file,
/// falling back to the directory name.
pub fn discover(root: &Path) -> Result<Vec<SourceDir>, CliError> {
    if !root.is_dir() {
        return Err(CliError::NotADirectory(root.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        if id.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let label = read_label(&path)?.unwrap_or_else(|| id.clone());
        dirs.push(SourceDir { id, label, path });
    }
    dirs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(dirs)
}

fn read_label(dir: &Path) -> Result<Option<String>, CliError> {
    let path = dir.join(LABEL_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string))
}

// ── TextSource ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Document {
    name: String,
    text: String,
    terms: HashSet<String>,
}

/// Leaf source over the `.txt` / `.md` files of one directory.
///
/// Scores a document by the fraction of distinct query terms it contains.
/// Documents sharing no term with the query are not returned.
#[derive(Debug, Clone)]
pub struct TextSource {
    docs: Vec<Document>,
}

impl TextSource {
    pub fn load(dir: &Path) -> Result<Self, CliError> {
        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_text = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md")
            );
            if path.is_file() && is_text {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                files.insert(name, std::fs::read_to_string(&path)?);
            }
        }
        tracing::debug!(dir = %dir.display(), documents = files.len(), "loaded text source");
        Ok(Self::from_documents(files))
    }

    pub fn from_documents<I, N, T>(docs: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let docs = docs
            .into_iter()
            .map(|(name, text)| {
                let text: String = text.into();
                Document {
                    name: name.into(),
                    terms: terms(&text),
                    text,
                }
            })
            .collect();
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    fn rank(&self, query: &str, limit: usize) -> Vec<Hit> {
        let wanted = terms(query);
        if wanted.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f32, &Document)> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let matched = wanted.iter().filter(|t| doc.terms.contains(*t)).count();
                (matched > 0).then(|| (matched as f32 / wanted.len() as f32, doc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(score, doc)| Hit::new(score, preview(doc)))
            .collect()
    }
}

#[async_trait]
impl Capability for TextSource {
    async fn query(&self, query: &str, limit: usize) -> Result<Retrieved, SourceError> {
        Ok(self.rank(query, limit).into())
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn preview(doc: &Document) -> String {
    let flat = doc.text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flat.chars().take(PREVIEW_CHARS).collect();
    if flat.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    format!("{}: {out}", doc.name)
}
