use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Error, MimeMap, Result, VersionMap};

/// File holding the registry snapshot
pub const REGISTRY_FILE: &str = "mimetypes.json";
/// File holding the version-token snapshot
pub const VERSIONS_FILE: &str = "versions.json";

/// Persistence for registry and version snapshots.
///
/// `Ok(None)` from a load means nothing has been saved yet.
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted registry.
    fn load_registry(&self) -> Result<Option<MimeMap>>;
    /// Persist the registry.
    fn save_registry(&self, registry: &MimeMap) -> Result<()>;
    /// Load the persisted version tokens.
    fn load_versions(&self) -> Result<Option<VersionMap>>;
    /// Persist the version tokens.
    fn save_versions(&self, versions: &VersionMap) -> Result<()>;

    /// Persist both snapshots as one unit.
    ///
    /// The default writes them one after the other; implementations that can
    /// commit both together should override it.
    fn save_snapshot(&self, registry: &MimeMap, versions: &VersionMap) -> Result<()> {
        self.save_registry(registry)?;
        self.save_versions(versions)
    }
}

/// Local filesystem storage for registry snapshots
pub struct Storage {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Storage {
    /// Creates a storage rooted at `root_dir`, creating it if needed
    pub fn with_root(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir)
            .map_err(|e| Error::Storage(format!("Failed to create root directory: {e}")))?;

        Ok(Self {
            root_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root data directory path
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Returns the path to the registry snapshot
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root_dir.join(REGISTRY_FILE)
    }

    /// Returns the path to the version snapshot
    #[must_use]
    pub fn versions_path(&self) -> PathBuf {
        self.root_dir.join(VERSIONS_FILE)
    }

    fn stage<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| Error::Storage(format!("Failed to serialize {what}: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| Error::Storage(format!("Failed to write temp {what}: {e}")))?;
        Ok(tmp_path)
    }

    fn commit(tmp_path: &Path, path: &Path, what: &str) -> Result<()> {
        // Atomically rename temp file to final path (handle Windows overwrite)
        #[cfg(target_os = "windows")]
        if path.exists() {
            fs::remove_file(path)
                .map_err(|e| Error::Storage(format!("Failed to remove existing {what}: {e}")))?;
        }
        fs::rename(tmp_path, path)
            .map_err(|e| Error::Storage(format!("Failed to persist {what}: {e}")))
    }

    fn load<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read {what}: {e}")))?;
        let value = serde_json::from_str(&json)
            .map_err(|e| Error::Storage(format!("Failed to parse {what}: {e}")))?;
        Ok(Some(value))
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T, what: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let tmp_path = Self::stage(path, value, what)?;
        Self::commit(&tmp_path, path, what)?;
        debug!("Saved {} to {}", what, path.display());
        Ok(())
    }
}

impl SnapshotStore for Storage {
    fn load_registry(&self) -> Result<Option<MimeMap>> {
        Self::load(&self.registry_path(), "registry")
    }

    fn save_registry(&self, registry: &MimeMap) -> Result<()> {
        self.save(&self.registry_path(), registry, "registry")
    }

    fn load_versions(&self) -> Result<Option<VersionMap>> {
        Self::load(&self.versions_path(), "versions")
    }

    fn save_versions(&self, versions: &VersionMap) -> Result<()> {
        self.save(&self.versions_path(), versions, "versions")
    }

    /// Stage both files, then rename both; nothing is committed unless both
    /// temp files were written.
    fn save_snapshot(&self, registry: &MimeMap, versions: &VersionMap) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let registry_path = self.registry_path();
        let versions_path = self.versions_path();

        let registry_tmp = Self::stage(&registry_path, registry, "registry")?;
        let versions_tmp = match Self::stage(&versions_path, versions, "versions") {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&registry_tmp);
                return Err(e);
            },
        };

        Self::commit(&registry_tmp, &registry_path, "registry")?;
        Self::commit(&versions_tmp, &versions_path, "versions")?;

        debug!("Saved registry and versions to {}", self.root_dir.display());
        Ok(())
    }
}
