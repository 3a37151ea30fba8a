//! Rotating-secret cache
//!
//! Persists the rotating session cookie across restarts. Entries are keyed by
//! the SHA-256 of the long-lived cookie so the raw secret never lands in a
//! file name.

use crate::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage for one rotating secret per long-lived secret
pub trait CredentialCache: Send + Sync + std::fmt::Debug {
    /// Read the cached value; `None` when nothing usable is stored
    fn load(&self, long_lived: &str) -> Result<Option<String>>;

    /// Overwrite the cached value
    fn save(&self, long_lived: &str, rotating: &str) -> Result<()>;

    /// Remove the cached value; removing nothing is not an error
    fn clear(&self, long_lived: &str) -> Result<()>;
}

/// Stable cache key: lowercase hex SHA-256 of the long-lived secret
pub fn cache_key(long_lived: &str) -> String {
    let digest = Sha256::digest(long_lived.as_bytes());
    format!("{:x}", digest)
}

/// File-backed cache holding one `<key>.txt` file per long-lived secret
#[derive(Debug, Clone)]
pub struct FileCredentialCache {
    dir: PathBuf,
}

impl FileCredentialCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for a long-lived secret
    pub fn path_for(&self, long_lived: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", cache_key(long_lived)))
    }
}

impl CredentialCache for FileCredentialCache {
    fn load(&self, long_lived: &str) -> Result<Option<String>> {
        let path = self.path_for(long_lived);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let value = contents.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    debug!("Loaded cached rotating cookie from {}", path.display());
                    Ok(Some(value.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::Error::cache(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, long_lived: &str, rotating: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            crate::Error::cache(format!("create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path_for(long_lived);
        let tmp = path.with_extension("txt.tmp");
        std::fs::write(&tmp, rotating)
            .map_err(|e| crate::Error::cache(format!("write {}: {}", tmp.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| crate::Error::cache(format!("chmod {}: {}", tmp.display(), e)),
            )?;
        }

        std::fs::rename(&tmp, &path)
            .map_err(|e| crate::Error::cache(format!("rename {}: {}", path.display(), e)))?;
        debug!("Saved rotating cookie to {}", path.display());
        Ok(())
    }

    fn clear(&self, long_lived: &str) -> Result<()> {
        let path = self.path_for(long_lived);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Cleared cached rotating cookie at {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(crate::Error::cache(format!(
                "remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_is_sha256_hex() {
        assert_eq!(
            cache_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_name_never_contains_secret() {
        let cache = FileCredentialCache::new("/tmp/cookies");
        let path = cache.path_for("my-long-lived-secret");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains("my-long-lived-secret"));
        assert_eq!(name, format!("{}.txt", cache_key("my-long-lived-secret")));
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let cache = FileCredentialCache::new(dir.path().join("nested"));

        assert_eq!(cache.load("psid").unwrap(), None);
        cache.save("psid", "rotating-1").unwrap();
        assert_eq!(cache.load("psid").unwrap().as_deref(), Some("rotating-1"));

        cache.save("psid", "rotating-2").unwrap();
        assert_eq!(cache.load("psid").unwrap().as_deref(), Some("rotating-2"));
        assert!(!cache.path_for("psid").with_extension("txt.tmp").exists());

        cache.clear("psid").unwrap();
        assert_eq!(cache.load("psid").unwrap(), None);
        cache.clear("psid").unwrap();
    }

    #[test]
    fn test_blank_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let cache = FileCredentialCache::new(dir.path());
        std::fs::write(cache.path_for("psid"), "  \n").unwrap();
        assert_eq!(cache.load("psid").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache = FileCredentialCache::new(dir.path());
        cache.save("psid", "value").unwrap();
        let mode = std::fs::metadata(cache.path_for("psid"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
