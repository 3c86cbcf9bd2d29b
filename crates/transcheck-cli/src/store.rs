//! File-backed analysis store.
//!
//! One JSON file per stored analysis under a root directory, named
//! `{seq:04}-{slug}-{hash8}.json`. The zero-padded sequence prefix makes
//! lexical order insertion order; the slug and URL hash keep the id
//! stable and human-scannable. Identifier generation is deliberately a
//! concern of this caller, not of the pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use transcheck_core::AnalysisResult;

/// What gets persisted per analysis: enough to re-render later without
/// refetching anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: String,
    pub url: String,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

fn slug_of(url: &str) -> String {
    let tail = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|s| s.filter(|p| !p.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| "analysis".to_string());
    let tail = tail.trim_end_matches(".html");
    let mut out = String::new();
    for ch in tail.chars() {
        if out.len() >= 40 {
            break;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch.to_ascii_lowercase());
        }
    }
    if out.is_empty() {
        out.push_str("analysis");
    }
    out
}

fn hash8(url: &str) -> String {
    let mut h = Sha256::new();
    h.update(url.as_bytes());
    hex::encode(&h.finalize()[..4])
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let rd = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e).context("reading store directory"),
        };
        for e in rd {
            let p = e.context("reading store directory entry")?.path();
            if p.extension().and_then(|s| s.to_str()) == Some("json") {
                out.push(p);
            }
        }
        // Seq prefix makes lexical order insertion order.
        out.sort();
        Ok(out)
    }

    /// Next identifier for an analysis of `url`: unique via the sequence
    /// number, stable via the slug and URL hash.
    pub fn next_id(&self, url: &str) -> Result<String> {
        let seq = self.entry_files()?.len() + 1;
        Ok(format!("{seq:04}-{}-{}", slug_of(url), hash8(url)))
    }

    pub fn append(&self, entry: &StoredAnalysis) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).context("creating store directory")?;
        let path = self.root.join(format!("{}.json", entry.id));
        if path.exists() {
            anyhow::bail!("duplicate analysis id: {}", entry.id);
        }
        let json = serde_json::to_vec_pretty(entry)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self
            .entry_files()?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    pub fn load(path: &Path) -> Result<StoredAnalysis> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        // Accept a bare AnalysisResult too, for hand-assembled inputs.
        if let Ok(entry) = serde_json::from_slice::<StoredAnalysis>(&bytes) {
            return Ok(entry);
        }
        let result: AnalysisResult = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(StoredAnalysis {
            id: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("analysis")
                .to_string(),
            url: String::new(),
            result,
        })
    }
}
