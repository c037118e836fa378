use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::MergeKey;
use crate::error::StoreError;
use crate::Edge;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub existing: usize,
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Edge>, StoreError> {
        let data = fs::read(&self.path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::Missing {
                path: self.path.clone(),
            },
            _ => StoreError::Io {
                path: self.path.clone(),
                source,
            },
        })?;
        serde_json::from_slice(&data).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Read for merging: a missing or unreadable store counts as empty, but
    /// one that exists and fails to parse is an error so it is never
    /// overwritten.
    pub fn load_or_empty(&self) -> Result<Vec<Edge>, StoreError> {
        match self.load() {
            Ok(edges) => Ok(edges),
            Err(StoreError::Missing { .. }) => Ok(Vec::new()),
            Err(err @ StoreError::Io { .. }) => {
                log::warn!("{err}; treating existing results as empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Rewrites the whole store. The new content is written to a sibling
    /// temporary file first and renamed over the old one.
    pub fn save(&self, edges: &[Edge]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.tmp_path();
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, edges).map_err(|e| io_err(io::Error::other(e)))?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    /// Appends `new_edges` to the stored collection, skipping any whose merge
    /// key is already present, and persists the result.
    pub fn merge(&self, new_edges: Vec<Edge>, key: MergeKey) -> Result<MergeReport, StoreError> {
        let existing = self.load_or_empty()?;
        let (merged, report) = merge_edges(existing, new_edges, key);
        if report.added > 0 {
            self.save(&merged)?;
        }
        Ok(report)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

type Key = (Option<String>, String, String);

fn edge_key(edge: &Edge, key: MergeKey) -> Key {
    let run_id = match key {
        MergeKey::Pair => None,
        MergeKey::RunPair => edge.run_id.clone(),
    };
    (run_id, edge.origin.clone(), edge.destination.clone())
}

/// Old records first, in their stored order, then each accepted new edge in
/// arrival order.
pub fn merge_edges(existing: Vec<Edge>, new_edges: Vec<Edge>, key: MergeKey) -> (Vec<Edge>, MergeReport) {
    let mut seen: HashSet<Key> = existing.iter().map(|e| edge_key(e, key)).collect();
    let mut report = MergeReport {
        existing: existing.len(),
        ..MergeReport::default()
    };
    let mut merged = existing;
    for edge in new_edges {
        if seen.insert(edge_key(&edge, key)) {
            merged.push(edge);
            report.added += 1;
        } else {
            report.skipped += 1;
        }
    }
    (merged, report)
}
