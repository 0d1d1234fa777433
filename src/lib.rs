//! A content-addressed one-way directory mirror with move detection.

pub mod cache;
pub mod cloud;
pub mod exec;
pub mod filter;
pub mod hash;
pub mod index;
pub mod io;
pub mod orchestrator;
pub mod plan;
pub mod project;
pub mod verify;
pub mod volumes;

pub use exec::{apply, execute_deletes, sweep_empty_dirs, ExecError, SyncResult};
pub use hash::{hash_bytes, hash_file, Digest, Hasher};
pub use index::{build_index, FileRecord, Index, SkippedFile};
pub use orchestrator::{run, BackupConfig, BackupReport, OrchestratorError, PlanSummary};
pub use plan::{generate_plan, SyncAction, SyncPlan};
pub use verify::{verify, Mismatch};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
