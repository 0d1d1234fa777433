//! The content index: fingerprints a directory tree and supports lookup by
//! path and by digest.
//!
//! `Index` is arena-backed: records live in one `Vec`, and `by_path`/
//! `by_digest` hold indices into it rather than copies. This sidesteps any
//! shared-ownership concern and keeps records contiguous for cache-friendly
//! iteration.

use crate::cache::CacheEntry;
use crate::cloud;
use crate::filter::{Decision, FilterConfig};
use crate::hash::{hash_file, Digest};
use ahash::{HashMap, HashMapExt};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A single fingerprinted file. Immutable once built; discarded with its
/// enclosing `Index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub relative_path: String,
    pub digest: Digest,
    pub mtime: f64,
    pub size: u64,
}

/// A file or I/O-level skip recorded by the indexer, distinct from the
/// `by_path`/`by_digest` maps — these never made it into the index at all.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size_mb: f64,
    pub reason: String,
}

/// Dual-keyed collection of `FileRecord`s for one tree.
#[derive(Debug, Clone, Default)]
pub struct Index {
    records: Vec<FileRecord>,
    by_path: HashMap<String, usize>,
    by_digest: HashMap<Digest, Vec<usize>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, wiring it into both lookup maps.
    pub fn add(&mut self, record: FileRecord) -> usize {
        let idx = self.records.len();
        self.by_path.insert(record.relative_path.clone(), idx);
        self.by_digest.entry(record.digest.clone()).or_default().push(idx);
        self.records.push(record);
        idx
    }

    pub fn get_by_path(&self, relative_path: &str) -> Option<&FileRecord> {
        self.by_path.get(relative_path).map(|&i| &self.records[i])
    }

    /// All records sharing a digest, in insertion order.
    pub fn get_by_digest(&self, digest: &Digest) -> Vec<&FileRecord> {
        self.by_digest
            .get(digest)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    pub fn all_files(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Walk `root`, apply `filter`, hash what's left (skipping unchanged files
/// `cache` already knows about), and return the resulting index plus a
/// report of everything that was skipped.
///
/// Directory pruning happens during the walk itself (`filter_entry`), so an
/// excluded directory's contents are never even stat'd — this is why the
/// walk uses `standard_filters(false)`: gitignore-style semantics would
/// fight with the three ordered rules in [`FilterConfig::evaluate`].
pub fn build_index(
    root: &Path,
    filter: &FilterConfig,
    cache: Option<&HashMap<String, CacheEntry>>,
) -> (Index, Vec<SkippedFile>) {
    let excluded_dirs = filter.excluded_dir_names.clone();
    let mut builder = ignore::WalkBuilder::new(root);
    builder.standard_filters(false).hidden(false).follow_links(false);
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        if !is_dir {
            return true;
        }
        match entry.file_name().to_str() {
            Some(name) => !excluded_dirs.iter().any(|d| d == name),
            None => true,
        }
    });

    let mut skipped = Vec::new();
    let mut candidates: Vec<(PathBuf, String)> = Vec::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("walk error under {}: {e}", root.display());
                continue;
            },
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = entry.path();
        let rel_path = normalize_relative_path(abs_path, root);

        let meta = match std::fs::symlink_metadata(abs_path) {
            Ok(m) => m,
            Err(e) => {
                skipped.push(skip_for_stat_error(abs_path, &e));
                continue;
            },
        };

        match filter.evaluate(Path::new(&rel_path), true, meta.len()) {
            Decision::Reject(reason) => {
                log::debug!("excluding {rel_path}: {reason}");
                skipped.push(SkippedFile {
                    path: abs_path.to_path_buf(),
                    filename: filename_of(abs_path),
                    size_mb: meta.len() as f64 / (1024.0 * 1024.0),
                    reason,
                });
            },
            Decision::Accept => candidates.push((abs_path.to_path_buf(), rel_path)),
        }
    }

    // Best-effort progress count; exact value is not a correctness input.
    log::debug!("{} candidate files under {}", candidates.len(), root.display());

    let results: Vec<Result<FileRecord, SkippedFile>> =
        candidates.par_iter().map(|(abs_path, rel_path)| fingerprint(abs_path, rel_path, cache)).collect();

    let mut index = Index::new();
    for result in results {
        match result {
            Ok(record) => {
                index.add(record);
            },
            Err(skip) => skipped.push(skip),
        }
    }

    (index, skipped)
}

/// Stat + cache-aware hash of one candidate file. Independent across files,
/// so `build_index` dispatches this across a rayon pool; the `by_digest`
/// insertion order downstream is the order these complete in the parallel
/// map, which is the order of the `candidates` vector (rayon preserves
/// input order in `collect`).
fn fingerprint(
    abs_path: &Path,
    rel_path: &str,
    cache: Option<&HashMap<String, CacheEntry>>,
) -> Result<FileRecord, SkippedFile> {
    let meta = std::fs::metadata(abs_path).map_err(|e| skip_for_stat_error(abs_path, &e))?;
    let size = meta.len();
    let mtime = mtime_secs(&meta);

    if cloud::is_cloud_placeholder(abs_path) {
        log::warn!("{} looks cloud-hosted; hashing without forcing hydration", abs_path.display());
    }

    let cached_hit = cache.and_then(|c| c.get(rel_path)).filter(|entry| entry.size == size && entry.mtime == mtime);

    let digest = match cached_hit.and_then(|entry| Digest::from_hex(&entry.digest)) {
        Some(digest) => digest,
        None => {
            log::debug!("cache miss, hashing {rel_path}");
            hash_file(abs_path).map_err(|e| skip_for_stat_error(abs_path, &e))?
        },
    };

    Ok(FileRecord { relative_path: rel_path.to_string(), digest, mtime, size })
}

fn skip_for_stat_error(path: &Path, err: &std::io::Error) -> SkippedFile {
    SkippedFile {
        path: path.to_path_buf(),
        filename: filename_of(path),
        size_mb: 0.0,
        reason: format!("Error reading file: {err}"),
    }
}

fn filename_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Path relative to `root` with separators rewritten to `/`. Falls back to
/// the basename if `strip_prefix` fails (e.g. cross-volume paths on
/// Windows).
fn normalize_relative_path(path: &Path, root: &Path) -> String {
    let rel: PathBuf = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => PathBuf::from(path.file_name().unwrap_or_default()),
    };
    rel.to_string_lossy().replace('\\', "/")
}

fn mtime_secs(meta: &std::fs::Metadata) -> f64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
