//! Post-copy verification: the safety gate the orchestrator checks before
//! running any destination delete — verify before delete.
//!
//! Every source file is independently rechecked against the destination by
//! full content digest, not by trusting the copy/move that supposedly just
//! placed it there.

use crate::hash::hash_file;
use crate::index::Index;
use rayon::prelude::*;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub relative_path: String,
    pub reason: String,
}

/// Recheck every file the source index expects to exist in `dst_root`.
/// Returns `(true, [])` only if every one of them is present with matching
/// size and digest.
pub fn verify(src_index: &Index, dst_root: &Path) -> (bool, Vec<Mismatch>) {
    let mismatches: Vec<Mismatch> =
        src_index.all_files().par_iter().filter_map(|record| verify_one(record, dst_root)).collect();

    (mismatches.is_empty(), mismatches)
}

fn verify_one(record: &crate::index::FileRecord, dst_root: &Path) -> Option<Mismatch> {
    let dst_path = dst_root.join(&record.relative_path);

    let meta = match std::fs::metadata(&dst_path) {
        Ok(meta) => meta,
        Err(e) => {
            return Some(Mismatch {
                relative_path: record.relative_path.clone(),
                reason: format!("missing from destination: {e}"),
            })
        },
    };

    if meta.len() != record.size {
        return Some(Mismatch {
            relative_path: record.relative_path.clone(),
            reason: format!("size mismatch: expected {}, found {}", record.size, meta.len()),
        });
    }

    match hash_file(&dst_path) {
        Ok(digest) if digest == record.digest => None,
        Ok(digest) => Some(Mismatch {
            relative_path: record.relative_path.clone(),
            reason: format!("digest mismatch: expected {}, found {digest}", record.digest),
        }),
        Err(e) => {
            Some(Mismatch { relative_path: record.relative_path.clone(), reason: format!("failed to hash: {e}") })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileRecord;
    use tempfile::tempdir;

    #[test]
    fn test_verify_passes_when_destination_matches() {
        let dst = tempdir().unwrap();
        std::fs::write(dst.path().join("a.txt"), b"hello").unwrap();

        let mut src_index = Index::new();
        src_index.add(FileRecord {
            relative_path: "a.txt".into(),
            digest: crate::hash::hash_bytes(b"hello"),
            mtime: 0.0,
            size: 5,
        });

        let (ok, mismatches) = verify(&src_index, dst.path());
        assert!(ok);
        assert!(mismatches.is_empty());
    }

    #[test]
    fn test_verify_flags_missing_file() {
        let dst = tempdir().unwrap();

        let mut src_index = Index::new();
        src_index.add(FileRecord {
            relative_path: "missing.txt".into(),
            digest: crate::hash::hash_bytes(b"anything"),
            mtime: 0.0,
            size: 8,
        });

        let (ok, mismatches) = verify(&src_index, dst.path());
        assert!(!ok);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].reason.contains("missing"));
    }

    #[test]
    fn test_verify_flags_content_mismatch() {
        let dst = tempdir().unwrap();
        std::fs::write(dst.path().join("a.txt"), b"wrong content").unwrap();

        let mut src_index = Index::new();
        src_index.add(FileRecord {
            relative_path: "a.txt".into(),
            digest: crate::hash::hash_bytes(b"correct content"),
            mtime: 0.0,
            size: 15,
        });

        let (ok, mismatches) = verify(&src_index, dst.path());
        assert!(!ok);
        assert_eq!(mismatches.len(), 1);
    }
}
