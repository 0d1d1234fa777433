//! Cloud-placeholder detection: OneDrive (and similar) can leave a file's
//! directory entry present while its content has been evicted to the cloud,
//! which would otherwise get silently hashed as all-zero or truncated data.
//!
//! Forcing hydration is out of scope here — this is a detect-and-warn hook
//! only, so `index::fingerprint` can log a warning rather than fail outright.

use std::path::Path;

/// Best-effort check for whether `path` is a cloud-hosted placeholder rather
/// than a fully materialized local file.
#[cfg(target_os = "windows")]
pub fn is_cloud_placeholder(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;
    const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;

    std::fs::symlink_metadata(path)
        .map(|meta| {
            let attrs = meta.file_attributes();
            attrs & (FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS | FILE_ATTRIBUTE_OFFLINE) != 0
        })
        .unwrap_or(false)
}

#[cfg(not(target_os = "windows"))]
pub fn is_cloud_placeholder(_path: &Path) -> bool {
    false
}
