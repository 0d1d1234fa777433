//! Executes a [`SyncPlan`] against the filesystem.
//!
//! Phase order matters: directories first, then moves, then copies. Deletes
//! are a separate entry point so the orchestrator can gate them on
//! [`crate::verify::verify`] succeeding first.

use crate::io::{self, SyncJournal};
use crate::plan::{SyncAction, SyncPlan};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to create directory {path}: {source}")]
    Mkdir { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to move {from} to {to}: {source}")]
    Move { from: PathBuf, to: PathBuf, #[source] source: std::io::Error },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy { from: PathBuf, to: PathBuf, #[source] source: std::io::Error },

    #[error("failed to delete {path}: {source}")]
    Delete { path: PathBuf, #[source] source: std::io::Error },
}

#[derive(Debug, Default)]
pub struct SyncResult {
    pub moved: usize,
    pub copied: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub errors: Vec<ExecError>,
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Create target directories, apply moves, then apply copies. Does not
/// touch deletes — call [`execute_deletes`] separately once the caller has
/// decided it's safe to.
pub fn apply(plan: &SyncPlan, dry_run: bool) -> SyncResult {
    let mut result = SyncResult { skipped: plan.skips().count(), ..Default::default() };

    if dry_run {
        result.moved = plan.moves().count();
        result.copied = plan.copies().count();
        return result;
    }

    let temp_dir = plan.dst_root.join(io::MKEEP_TEMP_DIR);
    let journal_path = plan.dst_root.join(io::MKEEP_JOURNAL_FILE);
    if let Err(e) = SyncJournal::recover(&journal_path, &temp_dir) {
        log::warn!("journal recovery at {} failed, continuing: {e}", journal_path.display());
    }

    if let Err(source) = io::ensure_directory(&temp_dir) {
        result.errors.push(ExecError::Mkdir { path: temp_dir, source });
        return result;
    }

    let journal = match SyncJournal::create(journal_path.clone()) {
        Ok(j) => j,
        Err(source) => {
            result.errors.push(ExecError::Mkdir { path: journal_path, source });
            return result;
        },
    };

    for action in plan.moves().chain(plan.copies()) {
        let dst_relative_path = match action {
            SyncAction::Move { dst_relative_path, .. } | SyncAction::Copy { dst_relative_path, .. } => dst_relative_path,
            _ => continue,
        };
        let dst_path = plan.dst_root.join(dst_relative_path);
        if let Some(parent) = dst_path.parent() {
            if let Err(source) = io::ensure_directory(parent) {
                result.errors.push(ExecError::Mkdir { path: parent.to_path_buf(), source });
            }
        }
    }

    for action in plan.moves() {
        let SyncAction::Move { dst_relative_path, move_from, .. } = action else { continue };
        let from = plan.dst_root.join(move_from);
        let to = plan.dst_root.join(dst_relative_path);

        match fs::rename(&from, &to) {
            Ok(()) => {
                let _ = journal.record_committed("MOVE", &from, &to);
                result.moved += 1;
            },
            Err(_cross_device_or_other) => match io::copy_file_with_metadata(&from, &to, true) {
                Ok(()) => match io::remove_file_safe(&from) {
                    Ok(()) => result.moved += 1,
                    Err(source) => result.errors.push(ExecError::Move { from, to, source }),
                },
                Err(source) => result.errors.push(ExecError::Move { from, to, source }),
            },
        }
    }

    for action in plan.copies() {
        let SyncAction::Copy { dst_relative_path, src_relative_path, .. } = action else { continue };
        let src_path = plan.src_root.join(src_relative_path);
        let dst_path = plan.dst_root.join(dst_relative_path);
        let temp_path = io::generate_temp_path(&temp_dir);

        let _ = journal.record_pending("COPY", &temp_path, &dst_path);
        let expected_hash = crate::hash::hash_file(&src_path).ok();

        match io::atomic_copy_file_with_metadata(
            &src_path,
            &dst_path,
            &temp_path,
            true,
            expected_hash.is_some(),
            expected_hash.as_ref(),
        ) {
            Ok(()) => {
                let _ = journal.record_committed("COPY", &temp_path, &dst_path);
                result.copied += 1;
            },
            Err(source) => result.errors.push(ExecError::Copy { from: src_path, to: dst_path, source }),
        }
    }

    let _ = journal.remove();
    let _ = io::remove_dir_recursive(&temp_dir);

    result
}

/// Apply the plan's deletes. Kept separate from [`apply`] so the
/// orchestrator can run [`crate::verify::verify`] between the two and skip
/// this call entirely if verification fails.
pub fn execute_deletes(plan: &SyncPlan, dry_run: bool) -> SyncResult {
    let mut result = SyncResult::default();

    for action in plan.deletes() {
        let SyncAction::Delete { dst_relative_path, .. } = action else { continue };
        result.deleted += 1;
        if dry_run {
            continue;
        }
        let path = plan.dst_root.join(dst_relative_path);
        if let Err(source) = io::remove_file_safe(&path) {
            result.errors.push(ExecError::Delete { path, source });
        }
    }

    result
}

/// Remove now-empty directories left behind by deletes/moves, bottom-up.
/// Returns the number of directories removed. Never removes `root` itself.
pub fn sweep_empty_dirs(root: &std::path::Path) -> std::io::Result<u64> {
    if !root.is_dir() {
        return Ok(0);
    }
    sweep_inner(root, root)
}

fn sweep_inner(dir: &std::path::Path, root: &std::path::Path) -> std::io::Result<u64> {
    let mut removed = 0u64;
    let mut subdirs = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    for subdir in subdirs {
        removed += sweep_inner(&subdir, root)?;
    }

    if dir != root && fs::read_dir(dir)?.next().is_none() {
        fs::remove_dir(dir)?;
        removed += 1;
    }

    Ok(removed)
}
