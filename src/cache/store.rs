use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::humanize::ByteSize;

use super::error::{CacheError, Result};
use super::keys::validate_key;

/// Summary returned by [`CacheStore::inspect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub path: PathBuf,
    #[serde(rename = "size")]
    pub total_bytes: ByteSize,
    pub exists: bool,
}

/// One top-level cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub size: ByteSize,
    pub modified: SystemTime,
}

/// Name and modification time of a top-level entry, without its size
///
/// `key` is the lossy UTF-8 form of the directory name and is meant for
/// display; `path` is the exact path to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStamp {
    pub key: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Directory-backed cache shared with the worker process
///
/// The worker writes into the root while these operations run, so every
/// walk tolerates files appearing or vanishing underneath it.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Total size of every file under the root
    pub fn inspect(&self) -> CacheInfo {
        let exists = self.root.is_dir();
        let total_bytes = if exists {
            dir_size(&self.root)
        } else {
            ByteSize(0)
        };

        CacheInfo {
            path: self.root.clone(),
            total_bytes,
            exists,
        }
    }

    /// Top-level entry directories, sorted by key
    ///
    /// A missing root yields an empty list. Loose files at the top level
    /// are not entries and are skipped.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self
            .stamps()?
            .into_iter()
            .map(|stamp| CacheEntry {
                size: dir_size(&stamp.path),
                key: stamp.key,
                path: stamp.path,
                modified: stamp.modified,
            })
            .collect())
    }

    /// Like [`CacheStore::entries`] but reads only each entry's own metadata
    pub fn stamps(&self) -> Result<Vec<EntryStamp>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut stamps = Vec::new();
        for item in read_dir {
            let Ok(item) = item else { continue };
            let Ok(metadata) = item.metadata() else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            stamps.push(EntryStamp {
                key: item.file_name().to_string_lossy().into_owned(),
                path: item.path(),
                modified,
            });
        }

        stamps.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(stamps)
    }

    /// Remove the whole root and recreate it empty
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Clear {
                    path: self.root.clone(),
                    source,
                });
            }
        }

        fs::create_dir_all(&self.root).map_err(|source| CacheError::Clear {
            path: self.root.clone(),
            source,
        })?;

        info!(path = %self.root.display(), "Cache cleared");
        Ok(())
    }

    /// Remove one entry; `Ok(false)` if it was not there
    pub fn delete_entry(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        self.remove_path(key, &path)
    }

    /// Remove a listed entry by its exact path
    ///
    /// Works for directory names that are not valid UTF-8, which cannot be
    /// addressed through a key.
    pub fn remove(&self, stamp: &EntryStamp) -> Result<bool> {
        if stamp.path.parent() != Some(self.root.as_path()) {
            return Err(CacheError::InvalidKey(stamp.key.clone()));
        }
        self.remove_path(&stamp.key, &stamp.path)
    }

    fn remove_path(&self, key: &str, path: &Path) -> Result<bool> {
        let removed = match fs::symlink_metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => Err(source),
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
        };

        match removed {
            Ok(()) => {
                debug!(key, "Cache entry deleted");
                Ok(true)
            }
            // Removed concurrently by someone else
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Delete {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Recursive byte count; unreadable or vanished paths count as zero
fn dir_size(path: &Path) -> ByteSize {
    let mut total = ByteSize(0);
    let mut stack = vec![path.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %dir.display(), error = %e, "Skipping unreadable cache directory");
                }
                continue;
            }
        };

        for item in read_dir.flatten() {
            // Do not follow symlinks out of the cache
            let Ok(metadata) = fs::symlink_metadata(item.path()) else {
                continue;
            };
            if metadata.is_dir() {
                stack.push(item.path());
            } else if metadata.is_file() {
                total += ByteSize(metadata.len());
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, len: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[test]
    fn test_inspect_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new(temp_dir.path().join("cache"));

        let info = store.inspect();
        assert!(!info.exists);
        assert_eq!(info.total_bytes, ByteSize(0));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_inspect_sums_recursively() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        write_file(&root.join("ep01/raw.srt"), 100);
        write_file(&root.join("ep01/audio/vocals.wav"), 400);
        write_file(&root.join("ep02/context.json"), 24);
        write_file(&root.join("stray.txt"), 1);

        let store = CacheStore::new(&root);
        let info = store.inspect();
        assert!(info.exists);
        assert_eq!(info.total_bytes, ByteSize(525));

        let entries = store.entries().unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["ep01", "ep02"]);
        assert_eq!(entries[0].size, ByteSize(500));
    }

    #[test]
    fn test_info_wire_shape() {
        let info = CacheInfo {
            path: PathBuf::from("/tmp/cache"),
            total_bytes: ByteSize(10),
            exists: true,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["size"], 10);
        assert_eq!(value["exists"], true);
    }

    #[test]
    fn test_clear_recreates_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        write_file(&root.join("ep01/raw.srt"), 10);

        let store = CacheStore::new(&root);
        store.clear().unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);

        // Idempotent, including when the root is missing
        fs::remove_dir(&root).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_delete_entry() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        write_file(&root.join("ep01/raw.srt"), 10);
        write_file(&root.join("ep02/raw.srt"), 10);

        let store = CacheStore::new(&root);
        assert!(store.delete_entry("ep01").unwrap());
        assert!(!store.delete_entry("ep01").unwrap());
        assert!(!root.join("ep01").exists());
        assert!(root.join("ep02").exists());
    }

    #[test]
    fn test_delete_entry_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new(temp_dir.path().join("cache"));
        assert!(matches!(
            store.delete_entry(".."),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(temp_dir.path().exists());
    }

    #[test]
    fn test_stamps_list_entries_without_sizing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        write_file(&root.join("ep02/raw.srt"), 10);
        write_file(&root.join("ep01/audio/vocals.wav"), 10);
        write_file(&root.join("stray.txt"), 1);

        let store = CacheStore::new(&root);
        let stamps = store.stamps().unwrap();
        let keys: Vec<_> = stamps.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["ep01", "ep02"]);
        assert_eq!(stamps[0].path, root.join("ep01"));

        let entries = store.entries().unwrap();
        assert_eq!(entries[0].modified, stamps[0].modified);
    }

    #[test]
    fn test_remove_rejects_paths_outside_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        write_file(&root.join("ep01/raw.srt"), 10);
        write_file(&temp_dir.path().join("keep/raw.srt"), 10);

        let store = CacheStore::new(&root);
        let outside = EntryStamp {
            key: "keep".to_string(),
            path: temp_dir.path().join("keep"),
            modified: SystemTime::now(),
        };
        assert!(matches!(store.remove(&outside), Err(CacheError::InvalidKey(_))));
        assert!(temp_dir.path().join("keep").exists());

        let stamp = store.stamps().unwrap().remove(0);
        assert!(store.remove(&stamp).unwrap());
        assert!(!root.join("ep01").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_remove_non_utf8_entry() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        let odd = root.join(OsStr::from_bytes(b"ep\xff01"));
        write_file(&odd.join("raw.srt"), 10);

        let store = CacheStore::new(&root);
        let stamps = store.stamps().unwrap();
        assert_eq!(stamps.len(), 1);
        assert_eq!(stamps[0].key, "ep\u{FFFD}01");
        // The lossy key names a different directory
        assert!(!store.delete_entry(&stamps[0].key).unwrap());

        assert!(store.remove(&stamps[0]).unwrap());
        assert!(!odd.exists());
    }
}
