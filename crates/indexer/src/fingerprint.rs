//! Document/path fingerprinting (spec.md §3): `doc_id` is a deterministic
//! hash of the resolved absolute path, so two syncs agree on whether a file
//! is "the same document" without a side table.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Resolves `path` to an absolute, symlink-free form when possible. Falls
/// back to a plain absolute join against the current directory when the
/// file no longer exists (e.g. a `to_delete` candidate discovered missing).
pub fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// `doc_id(path)`: sha256 hex of the resolved path, truncated to 32 chars.
pub fn doc_id(path: &Path) -> String {
    let resolved = resolve_path(path);
    hex_prefix(&Sha256::digest(resolved.to_string_lossy().as_bytes()), 32)
}

fn hex_prefix(bytes: &[u8], hex_len: usize) -> String {
    let mut s = String::with_capacity(hex_len);
    for byte in bytes {
        if s.len() >= hex_len {
            break;
        }
        s.push_str(&format!("{byte:02x}"));
    }
    s.truncate(hex_len);
    s
}

/// Reads a file's last-modified time as an ISO-8601 string, the form used
/// for change detection by the directory synchronizer (spec.md §3/§4.4).
pub fn modified_at_iso(path: &Path) -> std::io::Result<String> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?;
    let datetime: DateTime<Utc> = modified.into();
    Ok(datetime.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_deterministic_and_32_hex_chars() {
        let a = doc_id(Path::new("/tmp/a.rs"));
        let b = doc_id(Path::new("/tmp/a.rs"));
        let c = doc_id(Path::new("/tmp/b.rs"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn modified_at_iso_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let iso = modified_at_iso(&path).unwrap();
        assert!(iso.contains('T'));
    }
}
