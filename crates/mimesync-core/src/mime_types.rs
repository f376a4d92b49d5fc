//! Public entry point tying the registry, refresh and persistence together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::fetcher::{HttpTransport, Transport};
use crate::refresh::{RefreshCoordinator, RefreshReport};
use crate::registry::{normalize_extension, normalize_mime, validate_extension, validate_mime};
use crate::scheduler::RefreshScheduler;
use crate::sources::{FeedSource, sources_with_overrides};
use crate::storage::{SnapshotStore, Storage};
use crate::{
    Config, Error, MimeMap, RefreshInterval, Registry, Result, VersionMap, VersionStore,
};

/// Values accepted as the extension argument of [`MimeTypes::append`]: a
/// single extension or any list of them.
pub trait IntoExtensions {
    /// Collect into owned strings, unvalidated.
    fn into_extensions(self) -> Vec<String>;
}

impl IntoExtensions for &str {
    fn into_extensions(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoExtensions for String {
    fn into_extensions(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: AsRef<str>> IntoExtensions for Vec<S> {
    fn into_extensions(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoExtensions for &[S] {
    fn into_extensions(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoExtensions for [S; N] {
    fn into_extensions(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

/// Self-refreshing MIME type registry.
///
/// Construction loads the persisted snapshots but does no network work;
/// call [`MimeTypes::start`] to run the first refresh and arm the timer.
///
/// ```rust,no_run
/// use mimesync_core::{Config, MimeTypes};
///
/// # #[tokio::main]
/// # async fn main() -> mimesync_core::Result<()> {
/// let mime_types = MimeTypes::open(&Config::load()?)?;
/// mime_types.start();
///
/// mime_types.append("text/x-notes", ["note", "notes"])?;
/// assert_eq!(mime_types.get("todo.note"), vec!["text/x-notes"]);
/// # Ok(())
/// # }
/// ```
pub struct MimeTypes {
    registry: Arc<Registry>,
    versions: Arc<VersionStore>,
    coordinator: Arc<RefreshCoordinator>,
    scheduler: RefreshScheduler,
}

impl MimeTypes {
    /// Open the registry described by `config` with the HTTP transport and
    /// filesystem storage.
    pub fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(Storage::with_root(config.paths.root.clone())?);
        let transport = Arc::new(HttpTransport::with_timeout(config.timeout())?);
        let sources = sources_with_overrides(&config.source_overrides()?);

        Ok(Self::build(
            store,
            transport,
            sources,
            config.refresh_interval(),
            &config.fetch.user_agent,
        ))
    }

    /// Assemble from explicit collaborators.
    pub fn with_parts(
        store: Arc<dyn SnapshotStore>,
        transport: Arc<dyn Transport>,
        sources: Vec<FeedSource>,
        interval: RefreshInterval,
    ) -> Self {
        Self::build(
            store,
            transport,
            sources,
            interval,
            crate::sources::DEFAULT_USER_AGENT,
        )
    }

    fn build(
        store: Arc<dyn SnapshotStore>,
        transport: Arc<dyn Transport>,
        sources: Vec<FeedSource>,
        interval: RefreshInterval,
        user_agent: &str,
    ) -> Self {
        let registry = Arc::new(match store.load_registry() {
            Ok(Some(snapshot)) => Registry::from_snapshot(&snapshot),
            Ok(None) => Registry::new(),
            Err(err) => {
                warn!("Starting with an empty registry: {}", err);
                Registry::new()
            },
        });

        let versions = Arc::new(match store.load_versions() {
            Ok(Some(snapshot)) => VersionStore::from_snapshot(&snapshot),
            Ok(None) => VersionStore::new(),
            Err(err) => {
                warn!("Starting with no recorded feed versions: {}", err);
                VersionStore::new()
            },
        });

        info!("Loaded {} mime types", registry.len());

        let coordinator = Arc::new(
            RefreshCoordinator::new(
                Arc::clone(&registry),
                Arc::clone(&versions),
                transport,
                store,
                sources,
            )
            .with_user_agent(user_agent),
        );
        let scheduler = RefreshScheduler::new(Arc::clone(&coordinator), interval);

        Self {
            registry,
            versions,
            coordinator,
            scheduler,
        }
    }

    /// Run a refresh now and keep refreshing on the configured interval.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop background refreshing. An in-flight cycle still completes.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Whether background refreshing is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run one refresh cycle and wait for it.
    pub async fn refresh_now(&self) -> RefreshReport {
        self.coordinator.run_cycle().await
    }

    /// MIME types registered for the extension of `path`.
    pub fn get(&self, path: &str) -> Vec<String> {
        self.registry.lookup(path)
    }

    /// Register extensions for a MIME type.
    ///
    /// Fails with [`Error::InvalidMimeType`] or [`Error::InvalidExtension`]
    /// without touching the registry when the input is malformed; an empty
    /// extension list counts as an invalid extension. Returns whether anything
    /// new was added; only then are the snapshots saved.
    pub fn append(&self, mime: &str, extensions: impl IntoExtensions) -> Result<bool> {
        validate_mime(mime)?;
        let extensions = extensions.into_extensions();
        if extensions.is_empty() {
            return Err(Error::InvalidExtension(String::new()));
        }
        for ext in &extensions {
            validate_extension(ext)?;
        }

        let mut content = MimeMap::new();
        content.insert(
            normalize_mime(mime),
            extensions.iter().map(|ext| normalize_extension(ext)).collect(),
        );

        let changed = self.registry.merge_in(&content);
        if changed {
            if let Err(err) = self.coordinator.persist_now() {
                warn!("Failed to save registry after append: {}", err);
                self.coordinator.mark_dirty();
            }
        }
        Ok(changed)
    }

    /// Snapshot of the whole registry.
    pub fn list(&self) -> MimeMap {
        self.registry.snapshot()
    }

    /// Recorded feed versions.
    pub fn versions(&self) -> VersionMap {
        self.versions.snapshot()
    }

    /// Current refresh interval.
    pub fn update_interval(&self) -> RefreshInterval {
        self.scheduler.interval()
    }

    /// Change the refresh interval, re-arming the timer if it is running.
    pub fn set_update_interval(&self, interval: RefreshInterval) {
        self.scheduler.set_interval(interval);
    }
}
