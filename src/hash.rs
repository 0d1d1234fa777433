//! Content hashing with BLAKE3 (default) or SHA-256
//!
//! BLAKE3: ~10 GB/s single-threaded, highly parallelizable
//! SHA-256: ~500 MB/s single-threaded
//!
//! Streaming I/O ensures constant memory usage regardless of file size.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

// 256KB: optimal for SSD read-ahead and BLAKE3 chunk processing
const HASH_BUFFER_SIZE: usize = 256 * 1024;

/// A fixed-width content fingerprint, used as the key that ties a source
/// file to a destination file regardless of where either one lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Digest {
    #[cfg(feature = "blake3")]
    Blake3([u8; 32]),

    #[cfg(feature = "sha256")]
    Sha256([u8; 32]),
}

impl Digest {
    /// Get digest bytes as a slice
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            #[cfg(feature = "blake3")]
            Digest::Blake3(bytes) => bytes,
            #[cfg(feature = "sha256")]
            Digest::Sha256(bytes) => bytes,
        }
    }

    /// Get digest algorithm name
    pub fn algorithm(&self) -> &'static str {
        match self {
            #[cfg(feature = "blake3")]
            Digest::Blake3(_) => "BLAKE3",
            #[cfg(feature = "sha256")]
            Digest::Sha256(_) => "SHA-256",
        }
    }

    /// Parse a digest back from its hex `Display` form. Used by the index
    /// cache loader; a length or charset mismatch just means the cache entry
    /// is stale or came from a different algorithm, so the caller should
    /// treat it as a cache miss rather than a hard error.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        #[cfg(feature = "blake3")]
        {
            return Some(Digest::Blake3(bytes));
        }
        #[cfg(all(feature = "sha256", not(feature = "blake3")))]
        {
            return Some(Digest::Sha256(bytes));
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A hasher that can compute content digests using streaming I/O
///
/// The hasher uses the default algorithm based on feature flags:
/// - BLAKE3 if `blake3` feature is enabled (default)
/// - SHA-256 if `sha256` feature is enabled
///
/// ## Example
///
/// ```no_run
/// use mirrorkeep::hash::Hasher;
/// use std::path::Path;
///
/// # fn main() -> std::io::Result<()> {
/// let mut hasher = Hasher::new();
/// hasher.hash_file(Path::new("file.txt"))?;
/// let digest = hasher.finalize();
/// println!("Digest: {}", digest);
/// # Ok(())
/// # }
/// ```
pub struct Hasher {
    inner: HasherImpl,
}

/// Internal hasher implementation
#[allow(dead_code)]
enum HasherImpl {
    #[cfg(feature = "blake3")]
    Blake3(Box<blake3::Hasher>),

    #[cfg(feature = "sha256")]
    Sha256(sha2::Sha256),
}

impl Hasher {
    /// Create a new hasher with the default algorithm
    pub fn new() -> Self {
        #[cfg(feature = "blake3")]
        {
            Self { inner: HasherImpl::Blake3(Box::new(blake3::Hasher::new())) }
        }

        #[cfg(all(feature = "sha256", not(feature = "blake3")))]
        {
            use sha2::Digest as _;
            Self { inner: HasherImpl::Sha256(sha2::Sha256::new()) }
        }

        #[cfg(not(any(feature = "blake3", feature = "sha256")))]
        {
            compile_error!("At least one hash algorithm must be enabled");
        }
    }

    /// Update hasher with data from a byte slice
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            #[cfg(feature = "blake3")]
            HasherImpl::Blake3(hasher) => {
                hasher.update(data);
            },
            #[cfg(feature = "sha256")]
            HasherImpl::Sha256(hasher) => {
                use sha2::Digest as _;
                hasher.update(data);
            },
        }
    }

    /// Hash the contents of a file using streaming I/O
    ///
    /// This method reads the file in chunks of HASH_BUFFER_SIZE bytes,
    /// ensuring constant memory usage regardless of file size.
    pub fn hash_file(&mut self, path: &Path) -> io::Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            self.update(&buffer[..bytes_read]);
        }

        Ok(())
    }

    /// Finalize the digest and return the result
    ///
    /// This consumes the hasher and returns the computed digest.
    pub fn finalize(self) -> Digest {
        match self.inner {
            #[cfg(feature = "blake3")]
            HasherImpl::Blake3(hasher) => {
                let hash = hasher.finalize();
                Digest::Blake3(*hash.as_bytes())
            },
            #[cfg(feature = "sha256")]
            HasherImpl::Sha256(hasher) => {
                use sha2::Digest as _;
                let hash = hasher.finalize();
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&hash);
                Digest::Sha256(bytes)
            },
        }
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a file and return its digest
///
/// Convenience function that creates a hasher, hashes the file, and returns the result.
pub fn hash_file(path: &Path) -> io::Result<Digest> {
    let mut hasher = Hasher::new();
    hasher.hash_file(path)?;
    Ok(hasher.finalize())
}

/// Hash bytes and return the digest
///
/// Convenience function for hashing in-memory data.
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_empty() {
        let hash = hash_bytes(b"");
        assert!(!hash.as_bytes().is_empty());
    }

    #[test]
    fn test_hash_consistency() {
        let data = b"Hello, mirrorkeep!";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_data() {
        let hash1 = hash_bytes(b"foo");
        let hash2 = hash_bytes(b"bar");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_file_streaming() -> io::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        let data = b"This is test data for streaming hash";
        temp_file.write_all(data)?;
        temp_file.flush()?;

        let file_hash = hash_file(temp_file.path())?;
        let memory_hash = hash_bytes(data);

        assert_eq!(file_hash, memory_hash);

        Ok(())
    }

    #[test]
    fn test_hash_display_and_parse_roundtrip() {
        let hash = hash_bytes(b"test");
        let hash_str = format!("{}", hash);
        assert_eq!(hash_str.len(), 64); // 32 bytes = 64 hex chars
        assert!(hash_str.chars().all(|c| c.is_ascii_hexdigit()));

        let parsed = Digest::from_hex(&hash_str).expect("valid hex round-trips");
        assert_eq!(parsed, hash);
    }

    #[test]
    fn test_from_hex_rejects_malformed_input() {
        assert!(Digest::from_hex("not-hex-at-all").is_none());
        assert!(Digest::from_hex("abcd").is_none());
    }

    #[test]
    fn test_incremental_hashing() {
        let mut hasher1 = Hasher::new();
        hasher1.update(b"Hello, ");
        hasher1.update(b"World!");
        let hash1 = hasher1.finalize();

        let hash2 = hash_bytes(b"Hello, World!");

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_large_file_streaming() -> io::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        let chunk = vec![0x42u8; HASH_BUFFER_SIZE];

        for _ in 0..10 {
            temp_file.write_all(&chunk)?;
        }
        temp_file.flush()?;

        let hash = hash_file(temp_file.path())?;
        assert!(!hash.as_bytes().is_empty());

        Ok(())
    }

    #[test]
    fn test_algorithm_name() {
        let hash = hash_bytes(b"test");
        let algo = hash.algorithm();
        assert!(algo == "BLAKE3" || algo == "SHA-256");
    }
}
