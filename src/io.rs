//! File I/O with streaming copy and metadata preservation

use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;
use thiserror::Error;

// 256KB: optimal for modern SSD throughput
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Temp directory name (inside destination root)
pub const MKEEP_TEMP_DIR: &str = ".mkeep-tmp";

/// Journal file name (inside destination root)
pub const MKEEP_JOURNAL_FILE: &str = ".mkeep-journal";

/// Monotonic counter for unique temp file names within a process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Failed to copy file: {0}")]
    CopyFailed(String),

    #[error("Failed to set metadata: {0}")]
    MetadataFailed(String),

    #[error("Failed to remove file: {0}")]
    RemoveFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Copy a file with streaming I/O and optional metadata preservation
///
/// This function copies a file from source to destination using buffered
/// streaming I/O to minimize memory usage. It can optionally preserve
/// file timestamps and permissions.
///
/// # Performance
///
/// - Uses 256KB buffer for efficient streaming
/// - Single allocation for buffer (reused throughout copy)
/// - Optimized for both small and large files
/// - Typical throughput: limited by I/O subsystem (500MB/s - 3GB/s on modern SSDs)
///
/// # Arguments
///
/// * `source` - Source file path
/// * `dest` - Destination file path
/// * `preserve_timestamps` - Whether to preserve modification time
///
/// # Example
///
/// ```no_run
/// use mirrorkeep::io::copy_file_with_metadata;
/// use std::path::Path;
///
/// # fn main() -> std::io::Result<()> {
/// copy_file_with_metadata(
///     Path::new("source.txt"),
///     Path::new("dest.txt"),
///     true
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn copy_file_with_metadata(
    source: &Path,
    dest: &Path,
    preserve_timestamps: bool,
) -> io::Result<()> {
    // Get metadata before copying
    let metadata = fs::metadata(source)?;

    // Perform the streaming copy
    copy_file_streaming(source, dest)?;

    // Preserve metadata if requested
    if preserve_timestamps {
        set_file_mtime(dest, metadata.modified()?)?;
    }

    // Preserve permissions on Unix systems
    #[cfg(unix)]
    {
        set_file_permissions(dest, &metadata)?;
    }

    Ok(())
}

fn copy_file_streaming(source: &Path, dest: &Path) -> io::Result<()> {
    let source_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, source_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    io::copy(&mut reader, &mut writer)?;

    writer.flush()?;
    writer.into_inner()?.sync_all()?;

    Ok(())
}

pub fn set_file_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
    let file = File::open(path)?;
    file.set_modified(mtime)?;
    Ok(())
}

#[cfg(unix)]
pub fn set_file_permissions(path: &Path, metadata: &Metadata) -> io::Result<()> {
    let permissions = metadata.permissions();
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Remove file, ignoring "not found" errors
///
/// ```no_run
/// use mirrorkeep::io::remove_file_safe;
/// use std::path::Path;
///
/// # fn main() -> std::io::Result<()> {
/// remove_file_safe(Path::new("old_file.txt"))?;
/// # Ok(())
/// # }
/// ```
pub fn remove_file_safe(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // File doesn't exist - this is fine, treat as success
            Ok(())
        },
        Err(e) => Err(e),
    }
}

/// Remove a directory and all its contents recursively
///
/// This function is similar to `fs::remove_dir_all` but with enhanced
/// error handling and safety checks.
pub fn remove_dir_recursive(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    fs::remove_dir_all(path)
}

/// Verify that two files have identical content
///
/// This function compares two files byte-by-byte using streaming I/O.
/// Useful for verifying that a copy operation succeeded.
///
/// # Performance
///
/// - Buffered streaming comparison (constant memory)
/// - Early exit on first difference
/// - Optimized for both matching and non-matching files
/// - Uses 256KB buffers for optimal I/O performance
pub fn verify_files_identical(path1: &Path, path2: &Path) -> io::Result<bool> {
    // Quick metadata check first
    let meta1 = fs::metadata(path1)?;
    let meta2 = fs::metadata(path2)?;

    // If sizes differ, files can't be identical
    if meta1.len() != meta2.len() {
        return Ok(false);
    }

    // Compare contents with buffered I/O
    let file1 = File::open(path1)?;
    let file2 = File::open(path2)?;

    let mut reader1 = BufReader::with_capacity(COPY_BUFFER_SIZE, file1);
    let mut reader2 = BufReader::with_capacity(COPY_BUFFER_SIZE, file2);

    let mut buffer1 = vec![0u8; COPY_BUFFER_SIZE];
    let mut buffer2 = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let bytes_read1 = reader1.read(&mut buffer1)?;
        let bytes_read2 = reader2.read(&mut buffer2)?;

        // If read sizes differ, files are different
        if bytes_read1 != bytes_read2 {
            return Ok(false);
        }

        // End of both files
        if bytes_read1 == 0 {
            break;
        }

        // Compare the buffers
        if buffer1[..bytes_read1] != buffer2[..bytes_read2] {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Compute the total size of a directory recursively
///
/// This function walks a directory tree and sums the sizes of all files.
/// Useful for progress reporting and capacity planning.
pub fn directory_size(path: &Path) -> io::Result<u64> {
    let mut total = 0u64;

    if path.is_file() {
        return Ok(fs::metadata(path)?.len());
    }

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;

        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += directory_size(&entry.path())?;
        }
    }

    Ok(total)
}

/// Ensure a directory exists, creating it and all parent directories if necessary
///
/// This is a convenience wrapper around `fs::create_dir_all` with better
/// error messages.
pub fn ensure_directory(path: &Path) -> io::Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Path exists but is not a directory: {}", path.display()),
            ));
        }
        return Ok(());
    }

    fs::create_dir_all(path)
}

/// Generate a unique temp file path within the given directory.
///
/// Format: `{PID}-{counter}.tmp`, unique per process, monotonic counter.
pub fn generate_temp_path(temp_dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    temp_dir.join(format!("{pid}-{counter}.tmp"))
}

/// Crash-safe atomic file writer.
///
/// Writes data to a temporary file, then atomically renames to the final
/// destination on commit. If dropped without commit, the temp file is
/// cleaned up automatically.
///
/// # Safety guarantees
///
/// - Destination file is never in a partial/corrupt state
/// - On crash: either the old file or the complete new file exists
/// - Temp file is always on the same filesystem as destination
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    writer: BufWriter<File>,
    hasher: Option<crate::hash::Hasher>,
    committed: bool,
}

impl AtomicWriter {
    /// Create a new atomic writer.
    ///
    /// * `temp_path` - Pre-generated temp file path (same filesystem as final_path)
    /// * `final_path` - Final destination path after atomic rename
    /// * `verify` - If true, compute BLAKE3 hash during write for verification
    pub fn new(temp_path: PathBuf, final_path: PathBuf, verify: bool) -> io::Result<Self> {
        let file = File::create(&temp_path)?;
        let writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);
        let hasher = if verify {
            Some(crate::hash::Hasher::new())
        } else {
            None
        };

        Ok(Self {
            temp_path,
            final_path,
            writer,
            hasher,
            committed: false,
        })
    }

    /// Write data to the temp file, updating the hash if verification is enabled.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)?;
        if let Some(ref mut hasher) = self.hasher {
            hasher.update(buf);
        }
        Ok(())
    }

    /// Commit the atomic write: flush, fsync, verify hash, rename.
    ///
    /// If `expected_hash` is provided and verification is enabled, the computed
    /// hash is compared against it. Returns an error on mismatch (temp cleaned
    /// up by Drop).
    pub fn commit(mut self, expected_hash: Option<&crate::hash::Digest>) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        if let (Some(hasher), Some(expected)) = (self.hasher.take(), expected_hash) {
            let computed = hasher.finalize();
            if computed != *expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Hash verification failed for {}: expected {expected}, got {computed}",
                        self.final_path.display(),
                    ),
                ));
            }
        }

        fs::rename(&self.temp_path, &self.final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Copy a file atomically with streaming I/O and optional verification.
///
/// Writes to a temp file, fsyncs, then atomically renames to `dest`.
/// The destination is never in a partial state.
pub fn atomic_copy_file_with_metadata(
    source: &Path,
    dest: &Path,
    temp_path: &Path,
    preserve_timestamps: bool,
    verify: bool,
    expected_hash: Option<&crate::hash::Digest>,
) -> io::Result<()> {
    let metadata = fs::metadata(source)?;

    let mut writer = AtomicWriter::new(temp_path.to_path_buf(), dest.to_path_buf(), verify)?;

    let source_file = File::open(source)?;
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, source_file);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write(&buffer[..bytes_read])?;
    }

    writer.commit(expected_hash)?;

    if preserve_timestamps {
        set_file_mtime(dest, metadata.modified()?)?;
    }

    #[cfg(unix)]
    {
        set_file_permissions(dest, &metadata)?;
    }

    Ok(())
}

/// Flush directory metadata to disk (ensures renames are persisted).
///
/// No-op on Windows where directory fsync is not supported.
pub fn fsync_directory(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    File::open(path)?.sync_all()?;
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Append-only journal for crash recovery.
///
/// Records pending/committed state for each file operation. On recovery,
/// entries with P but no matching C indicate incomplete operations whose
/// temp files should be cleaned up.
pub struct SyncJournal {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SyncJournal {
    /// Create a new journal file at the given path.
    pub fn create(path: PathBuf) -> io::Result<Self> {
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        Ok(Self { file: Mutex::new(writer), path })
    }

    /// Record that an operation is about to begin.
    pub fn record_pending(&self, op: &str, temp_path: &Path, final_path: &Path) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "P\t{op}\t{}\t{}", temp_path.display(), final_path.display())?;
        file.flush()?;
        Ok(())
    }

    /// Record that an operation completed successfully.
    pub fn record_committed(
        &self,
        op: &str,
        temp_path: &Path,
        final_path: &Path,
    ) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "C\t{op}\t{}\t{}", temp_path.display(), final_path.display())?;
        file.flush()?;
        Ok(())
    }

    /// Clean up the journal file.
    pub fn remove(self) -> io::Result<()> {
        drop(self.file);
        remove_file_safe(&self.path)
    }

    /// Recover from a previous interrupted sync.
    ///
    /// Reads the journal, finds P entries without matching C entries,
    /// and cleans up their temp files. Then removes the journal and
    /// sweeps the temp directory.
    pub fn recover(journal_path: &Path, temp_dir: &Path) -> io::Result<()> {
        if !journal_path.exists() {
            // No journal means clean state; still sweep orphaned temps
            if temp_dir.exists() {
                cleanup_temp_dir(temp_dir)?;
            }
            return Ok(());
        }

        let file = File::open(journal_path)?;
        let reader = BufReader::new(file);

        let mut pending: Vec<(String, PathBuf, PathBuf)> = Vec::new();
        let mut committed: Vec<(String, PathBuf, PathBuf)> = Vec::new();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 4 {
                continue;
            }

            let entry = (parts[1].to_string(), PathBuf::from(parts[2]), PathBuf::from(parts[3]));

            match parts[0] {
                "P" => pending.push(entry),
                "C" => committed.push(entry),
                _ => continue,
            }
        }

        for (op, temp, final_path) in &pending {
            let is_committed = committed
                .iter()
                .any(|(cop, ctemp, cfinal)| cop == op && ctemp == temp && cfinal == final_path);

            if !is_committed {
                let _ = fs::remove_file(temp);
            }
        }

        remove_file_safe(journal_path)?;

        if temp_dir.exists() {
            cleanup_temp_dir(temp_dir)?;
        }

        Ok(())
    }
}

/// Remove all files in the temp directory (orphan cleanup).
fn cleanup_temp_dir(temp_dir: &Path) -> io::Result<()> {
    if let Ok(entries) = fs::read_dir(temp_dir) {
        for entry in entries.flatten() {
            let _ = fs::remove_file(entry.path());
        }
    }
    Ok(())
}
