//! File-based substrate for native platforms.

use super::{KeyValueStore, KvError, KvResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Bytes kept as-is in file names; everything else, `%` included, is escaped.
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'@');

/// Stores each key as a file in a directory.
#[derive(Debug, Clone)]
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> KvResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                KvError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Store in the platform data directory.
    ///
    /// On Unix: `~/.local/share/chartink/store/`
    /// On Windows: `%LOCALAPPDATA%\chartink\store\`
    pub fn default_location() -> KvResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| KvError::Unavailable("Could not determine home directory".to_string()))?;
        Self::new(base.join("chartink").join("store"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", utf8_percent_encode(key, KEY_ESCAPE)))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Io(format!("Failed to read {}: {}", path.display(), e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let path = self.key_path(key);
        fs::write(&path, value)
            .map_err(|e| KvError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::Io(format!("Failed to delete {}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_kv_set_get() {
        let dir = tempdir().unwrap();
        let kv = FileKv::new(dir.path().to_path_buf()).unwrap();

        kv.set("chartink.project.main", "{\"a\":1}").unwrap();
        assert_eq!(
            kv.get("chartink.project.main").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("chartink.project.main.json").exists());
    }

    #[test]
    fn test_file_kv_missing_and_remove() {
        let dir = tempdir().unwrap();
        let kv = FileKv::new(dir.path().to_path_buf()).unwrap();

        assert_eq!(kv.get("nonexistent").unwrap(), None);
        kv.remove("nonexistent").unwrap();

        kv.set("chartink-drawings@current", "[]").unwrap();
        kv.remove("chartink-drawings@current").unwrap();
        assert_eq!(kv.get("chartink-drawings@current").unwrap(), None);
    }

    #[test]
    fn test_file_kv_escapes_key() {
        let dir = tempdir().unwrap();
        let kv = FileKv::new(dir.path().to_path_buf()).unwrap();

        kv.set("slot/with:odd*chars", "x").unwrap();
        assert_eq!(kv.get("slot/with:odd*chars").unwrap().as_deref(), Some("x"));
        assert!(dir.path().join("slot%2Fwith%3Aodd%2Achars.json").exists());
    }

    #[test]
    fn test_file_kv_distinct_keys_do_not_collide() {
        let dir = tempdir().unwrap();
        let kv = FileKv::new(dir.path().to_path_buf()).unwrap();

        kv.set("chartink.project.a/b", "slash").unwrap();
        kv.set("chartink.project.a_b", "underscore").unwrap();
        kv.set("chartink.project.a%2Fb", "escaped").unwrap();
        assert_eq!(kv.get("chartink.project.a/b").unwrap().as_deref(), Some("slash"));
        assert_eq!(kv.get("chartink.project.a_b").unwrap().as_deref(), Some("underscore"));
        assert_eq!(kv.get("chartink.project.a%2Fb").unwrap().as_deref(), Some("escaped"));
    }

    #[test]
    fn test_file_kv_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let kv = FileKv::new(nested.clone()).unwrap();
        assert_eq!(kv.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }
}
