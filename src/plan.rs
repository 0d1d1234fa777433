//! The planner: diffs a source index against a destination index and emits
//! an ordered [`SyncPlan`] of [`SyncAction`]s. Pure function of its inputs —
//! no filesystem access happens here.

use crate::index::{FileRecord, Index};
use crate::project::{is_cross_project_boilerplate, ProjectMap};
use std::collections::HashSet;
use std::path::PathBuf;

/// One planned step. `dst_relative_path` is always where the file ends up;
/// `Move`/`Copy` additionally carry where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Skip { dst_relative_path: String },
    Copy { dst_relative_path: String, src_relative_path: String, reason: String },
    Move { dst_relative_path: String, move_from: String, reason: String },
    Delete { dst_relative_path: String, reason: String },
}

#[derive(Debug)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
    pub src_root: PathBuf,
    pub dst_root: PathBuf,
}

impl SyncPlan {
    pub fn skips(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| matches!(a, SyncAction::Skip { .. }))
    }

    pub fn copies(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| matches!(a, SyncAction::Copy { .. }))
    }

    pub fn moves(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| matches!(a, SyncAction::Move { .. }))
    }

    pub fn deletes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| matches!(a, SyncAction::Delete { .. }))
    }
}

/// Directory-depth deviation from the longest shared path prefix. Used only
/// to break ties among several same-digest move candidates.
fn path_distance(a: &str, b: &str) -> usize {
    let pa: Vec<&str> = a.split('/').collect();
    let pb: Vec<&str> = b.split('/').collect();
    let common = pa.iter().zip(pb.iter()).take_while(|(x, y)| x == y).count();
    (pa.len() - common) + (pb.len() - common)
}

/// Among several destination files with the same content, pick the one most
/// likely to be "the same file, moved": same basename wins outright; beyond
/// that, the shallowest path-distance from the source's new location.
fn find_best_move_candidate<'a>(src_relative_path: &str, candidates: &[&'a FileRecord]) -> Option<&'a FileRecord> {
    if candidates.is_empty() {
        return None;
    }

    let src_basename = src_relative_path.rsplit('/').next().unwrap_or(src_relative_path);
    let same_basename: Vec<&&FileRecord> = candidates
        .iter()
        .filter(|c| c.relative_path.rsplit('/').next().unwrap_or(&c.relative_path) == src_basename)
        .collect();

    let pool: Vec<&&FileRecord> = if !same_basename.is_empty() { same_basename } else { candidates.iter().collect() };

    pool.into_iter().min_by_key(|c| path_distance(src_relative_path, &c.relative_path)).copied().copied()
}

/// Build the plan to make `dst_root` mirror `src_root`.
///
/// Source files are processed in path-sorted order so that, when several
/// source files could claim the same move candidate, the outcome doesn't
/// depend on index insertion order (which itself depends on rayon's
/// completion order during hashing).
pub fn generate_plan(
    src_index: &Index,
    dst_index: &Index,
    project_map: &ProjectMap,
    always_copy_paths: &HashSet<String>,
    src_root: PathBuf,
    dst_root: PathBuf,
) -> SyncPlan {
    let mut src_records: Vec<&FileRecord> = src_index.all_files().iter().collect();
    src_records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let mut consumed: HashSet<String> = HashSet::new();
    let mut actions = Vec::with_capacity(src_records.len());

    for src in src_records {
        if let Some(dst_rec) = dst_index.get_by_path(&src.relative_path) {
            consumed.insert(src.relative_path.clone());
            if dst_rec.digest == src.digest {
                actions.push(SyncAction::Skip { dst_relative_path: src.relative_path.clone() });
            } else {
                actions.push(SyncAction::Copy {
                    dst_relative_path: src.relative_path.clone(),
                    src_relative_path: src.relative_path.clone(),
                    reason: "content changed".to_string(),
                });
            }
            continue;
        }

        let digest_matches = dst_index.get_by_digest(&src.digest);
        let available: Vec<&FileRecord> =
            digest_matches.into_iter().filter(|r| !consumed.contains(&r.relative_path)).collect();

        match find_best_move_candidate(&src.relative_path, &available) {
            Some(candidate)
                if is_cross_project_boilerplate(&src.relative_path, &candidate.relative_path, project_map, always_copy_paths) =>
            {
                actions.push(SyncAction::Copy {
                    dst_relative_path: src.relative_path.clone(),
                    src_relative_path: src.relative_path.clone(),
                    reason: "shared boilerplate, kept per-project rather than moved".to_string(),
                });
            },
            Some(candidate) => {
                consumed.insert(candidate.relative_path.clone());
                actions.push(SyncAction::Move {
                    dst_relative_path: src.relative_path.clone(),
                    move_from: candidate.relative_path.clone(),
                    reason: "content matches an existing destination file".to_string(),
                });
            },
            None => {
                actions.push(SyncAction::Copy {
                    dst_relative_path: src.relative_path.clone(),
                    src_relative_path: src.relative_path.clone(),
                    reason: "new file".to_string(),
                });
            },
        }
    }

    for dst in dst_index.all_files() {
        if !consumed.contains(&dst.relative_path) {
            actions.push(SyncAction::Delete {
                dst_relative_path: dst.relative_path.clone(),
                reason: "not present in source".to_string(),
            });
        }
    }

    SyncPlan { actions, src_root, dst_root }
}
