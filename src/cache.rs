//! Persisted destination index: the `.backup_index.json` that lets a run
//! skip rehashing files the previous run already fingerprinted.
//!
//! Treated as advisory everywhere it's consumed: any structural problem —
//! missing file, malformed JSON, wrong version — degrades to "no cache"
//! rather than a hard error.

use crate::index::Index;
use ahash::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CACHE_FILENAME: &str = ".backup_index.json";

/// Bumped from the MD5-based reference's `1` because this implementation
/// substitutes BLAKE3 — a digest change must invalidate any cache written
/// by the older algorithm.
pub const CACHE_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub digest: String,
    pub mtime: f64,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    created: String,
    files: BTreeMap<String, CacheEntry>,
}

pub fn cache_path(destination_root: &Path) -> PathBuf {
    destination_root.join(CACHE_FILENAME)
}

/// Load the cache's file map, or `None` if it's absent, unreadable,
/// malformed, or carries a version other than [`CACHE_VERSION`].
pub fn load(destination_root: &Path) -> Option<HashMap<String, CacheEntry>> {
    let path = cache_path(destination_root);
    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("no usable index cache at {}: {e}", path.display());
            return None;
        },
    };

    let doc: CacheDocument = match serde_json::from_str(&data) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("index cache at {} is malformed, ignoring: {e}", path.display());
            return None;
        },
    };

    if doc.version != CACHE_VERSION {
        log::debug!("index cache version {} != {CACHE_VERSION}, ignoring", doc.version);
        return None;
    }

    let mut files = HashMap::with_capacity(doc.files.len());
    files.extend(doc.files);
    Some(files)
}

/// Write `index` to `<destination_root>/.backup_index.json`, atomically
/// (write to `.tmp`, then rename).
pub fn save(destination_root: &Path, index: &Index) -> io::Result<()> {
    let mut files = BTreeMap::new();
    for record in index.all_files() {
        files.insert(
            record.relative_path.clone(),
            CacheEntry { digest: record.digest.to_string(), mtime: record.mtime, size: record.size },
        );
    }

    let doc = CacheDocument { version: CACHE_VERSION, created: chrono::Utc::now().to_rfc3339(), files };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("failed to serialize index cache: {e}")))?;

    let final_path = cache_path(destination_root);
    let temp_path = final_path.with_extension("json.tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, &final_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileRecord;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut index = Index::new();
        let digest = crate::hash::hash_bytes(b"contents");
        index.add(FileRecord { relative_path: "a.txt".into(), digest, mtime: 123.5, size: 8 });

        save(dir.path(), &index).unwrap();
        let loaded = load(dir.path()).expect("cache should load");

        let entry = loaded.get("a.txt").unwrap();
        assert_eq!(entry.size, 8);
        assert_eq!(entry.mtime, 123.5);
    }

    #[test]
    fn test_load_missing_cache_returns_none() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn test_load_malformed_cache_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(cache_path(dir.path()), b"not json at all").unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn test_load_wrong_version_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(cache_path(dir.path()), r#"{"version":1,"created":"x","files":{}}"#).unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn test_save_is_atomic_no_leftover_tmp() {
        let dir = tempdir().unwrap();
        let index = Index::new();
        save(dir.path(), &index).unwrap();

        let tmp_path = cache_path(dir.path()).with_extension("json.tmp");
        assert!(!tmp_path.exists());
        assert!(cache_path(dir.path()).exists());
    }
}
