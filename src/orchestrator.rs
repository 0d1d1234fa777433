//! Top-level sequencing: wires index, cache, project, plan, exec, and
//! verify together into the single `backup` flow.

use crate::cache::{self, CacheEntry};
use crate::exec::{self, SyncResult};
use crate::filter::FilterConfig;
use crate::index::{self, SkippedFile};
use crate::plan::{self, SyncPlan};
use crate::project;
use crate::verify::{self, Mismatch};
use ahash::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("source directory does not exist or is not a directory: {0}")]
    InvalidSource(PathBuf),

    #[error("failed to prepare destination directory {path}: {source}")]
    DestinationSetup { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to configure {threads}-thread pool: {source}")]
    ThreadPool { threads: usize, #[source] source: rayon::ThreadPoolBuildError },
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub max_file_size_mb: Option<u64>,
    pub dry_run: bool,
    pub verify_only: bool,
    pub threads: Option<usize>,
    pub exclude: Vec<String>,
}

/// Everything the CLI needs to render a summary, regardless of which steps
/// actually ran.
#[derive(Debug, Default)]
pub struct BackupReport {
    pub source_files_indexed: usize,
    pub source_files_skipped: Vec<SkippedFile>,
    pub destination_files_indexed: usize,
    pub plan: Option<PlanSummary>,
    pub exec_result: Option<SyncResult>,
    pub verify_ok: Option<bool>,
    pub verify_mismatches: Vec<Mismatch>,
    pub delete_result: Option<SyncResult>,
    pub empty_dirs_removed: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlanSummary {
    pub skips: usize,
    pub copies: usize,
    pub moves: usize,
    pub deletes: usize,
}

impl PlanSummary {
    fn from_plan(plan: &SyncPlan) -> Self {
        Self {
            skips: plan.skips().count(),
            copies: plan.copies().count(),
            moves: plan.moves().count(),
            deletes: plan.deletes().count(),
        }
    }
}

pub fn run(config: &BackupConfig) -> Result<BackupReport, OrchestratorError> {
    if !config.source.is_dir() {
        return Err(OrchestratorError::InvalidSource(config.source.clone()));
    }

    if let Some(threads) = config.threads {
        if let Err(source) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            log::debug!("global thread pool already configured, ignoring --threads: {source}");
        }
    }

    crate::io::ensure_directory(&config.destination)
        .map_err(|source| OrchestratorError::DestinationSetup { path: config.destination.clone(), source })?;

    let mut source_filter = FilterConfig::default();
    if let Some(mb) = config.max_file_size_mb {
        source_filter.max_size_bytes = mb * 1024 * 1024;
    }
    source_filter.excluded_dir_names.extend(config.exclude.iter().cloned());

    let (src_index, source_files_skipped) = index::build_index(&config.source, &source_filter, None);
    log::info!("indexed {} source files under {}", src_index.len(), config.source.display());

    let mut report =
        BackupReport { source_files_indexed: src_index.len(), source_files_skipped, ..Default::default() };

    if config.verify_only {
        let (ok, mismatches) = verify::verify(&src_index, &config.destination);
        report.verify_ok = Some(ok);
        report.verify_mismatches = mismatches;
        return Ok(report);
    }

    let mut dest_filter = source_filter.clone().unbounded_size();
    dest_filter.excluded_dir_names.retain(|d| d != crate::io::MKEEP_TEMP_DIR);

    let cache: Option<HashMap<String, CacheEntry>> = cache::load(&config.destination);
    let (dst_index, _dest_skipped) = index::build_index(&config.destination, &dest_filter, cache.as_ref());
    report.destination_files_indexed = dst_index.len();
    log::info!("indexed {} destination files under {}", dst_index.len(), config.destination.display());

    let project_map = project::detect_project_roots(&src_index);
    let always_copy = project::always_copy_paths(&project_map);

    let sync_plan = plan::generate_plan(
        &src_index,
        &dst_index,
        &project_map,
        &always_copy,
        config.source.clone(),
        config.destination.clone(),
    );
    report.plan = Some(PlanSummary::from_plan(&sync_plan));

    if config.dry_run {
        return Ok(report);
    }

    let exec_result = exec::apply(&sync_plan, false);
    let exec_succeeded = exec_result.is_success();
    report.exec_result = Some(exec_result);

    if !exec_succeeded {
        log::warn!("copy/move phase had errors; skipping verify-gated deletes");
        return Ok(report);
    }

    let (verify_ok, mismatches) = verify::verify(&src_index, &config.destination);
    report.verify_ok = Some(verify_ok);
    report.verify_mismatches = mismatches;

    if verify_ok {
        let delete_result = exec::execute_deletes(&sync_plan, false);
        report.delete_result = Some(delete_result);
        report.empty_dirs_removed = exec::sweep_empty_dirs(&config.destination).unwrap_or(0);
    } else {
        log::warn!("verification found mismatches; refusing to delete from destination");
    }

    let (final_index, _) = index::build_index(&config.destination, &dest_filter, None);
    if let Err(e) = cache::save(&config.destination, &final_index) {
        log::warn!("failed to persist index cache: {e}");
    }

    Ok(report)
}
