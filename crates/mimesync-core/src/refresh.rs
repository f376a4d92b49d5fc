//! One refresh cycle over every configured feed.
//!
//! Each source runs through the same pipeline: HEAD check, version
//! comparison, GET, parse, merge, record version. The pipelines run
//! concurrently and a failure in one never affects the others. Once all of
//! them finish, both snapshots are persisted together if anything changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::fetcher::{Transport, TransportResponse};
use crate::parser::parse_feed;
use crate::sources::{DEFAULT_USER_AGENT, FeedSource};
use crate::storage::SnapshotStore;
use crate::{Error, Registry, Result, SourceId, VersionStore};

/// What happened to one source during a cycle.
#[derive(Debug)]
pub enum FeedOutcome {
    /// The feed was downloaded, parsed and merged.
    Merged {
        /// Whether the merge added anything to the registry.
        changed: bool,
        /// Token recorded for the feed.
        version: Option<String>,
    },
    /// The remote version matches the recorded one; nothing was downloaded.
    UpToDate,
    /// The check, download or parse failed; registry and version untouched.
    Failed(Error),
}

/// Outcome for one source.
#[derive(Debug)]
pub struct SourceReport {
    /// Which feed
    pub source: SourceId,
    /// What happened
    pub outcome: FeedOutcome,
}

/// Summary of one refresh cycle.
#[derive(Debug)]
pub struct RefreshReport {
    /// When the cycle began
    pub started_at: DateTime<Utc>,
    /// One entry per configured source, in source order
    pub outcomes: Vec<SourceReport>,
    /// Whether snapshots were written at the end of the cycle
    pub persisted: bool,
}

impl RefreshReport {
    /// Whether any merge added to the registry.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|r| matches!(r.outcome, FeedOutcome::Merged { changed: true, .. }))
    }

    /// Sources that failed, with their errors.
    #[must_use]
    pub fn failures(&self) -> Vec<(SourceId, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|r| match &r.outcome {
                FeedOutcome::Failed(err) => Some((r.source, err)),
                _ => None,
            })
            .collect()
    }

    /// Sources skipped because their version was unchanged.
    #[must_use]
    pub fn up_to_date(&self) -> Vec<SourceId> {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, FeedOutcome::UpToDate))
            .map(|r| r.source)
            .collect()
    }

    /// Outcome for a given source, if it was part of the cycle.
    #[must_use]
    pub fn outcome(&self, source: SourceId) -> Option<&FeedOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.source == source)
            .map(|r| &r.outcome)
    }
}

/// Result of one source's pipeline before the cycle aggregates it.
struct PipelineResult {
    outcome: FeedOutcome,
    version_moved: bool,
}

impl PipelineResult {
    fn failed(err: Error) -> Self {
        Self {
            outcome: FeedOutcome::Failed(err),
            version_moved: false,
        }
    }
}

/// Drives refresh cycles against a shared registry and version store.
pub struct RefreshCoordinator {
    registry: Arc<Registry>,
    versions: Arc<VersionStore>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SnapshotStore>,
    sources: Vec<FeedSource>,
    user_agent: String,
    cycle_lock: Mutex<()>,
    save_lock: StdMutex<()>,
    pending_save: AtomicBool,
}

impl RefreshCoordinator {
    /// Create a coordinator over `sources`.
    pub fn new(
        registry: Arc<Registry>,
        versions: Arc<VersionStore>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn SnapshotStore>,
        sources: Vec<FeedSource>,
    ) -> Self {
        Self {
            registry,
            versions,
            transport,
            store,
            sources,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cycle_lock: Mutex::new(()),
            save_lock: StdMutex::new(()),
            pending_save: AtomicBool::new(false),
        }
    }

    /// Client identifier sent with IANA requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Configured sources.
    #[must_use]
    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Ask the next cycle to persist even if it changes nothing.
    ///
    /// Used when a save outside a cycle failed.
    pub fn mark_dirty(&self) {
        self.pending_save.store(true, Ordering::SeqCst);
    }

    /// Whether a save is still owed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.pending_save.load(Ordering::SeqCst)
    }

    /// Run one cycle over every source.
    ///
    /// Never fails: per-source errors are recorded in the report and logged.
    /// Concurrent calls are serialized.
    pub async fn run_cycle(&self) -> RefreshReport {
        let _cycle = self.cycle_lock.lock().await;
        let started_at = Utc::now();
        debug!("Starting refresh cycle over {} sources", self.sources.len());

        let results = join_all(self.sources.iter().map(|source| self.refresh_source(source))).await;

        let mut dirty = false;
        let mut outcomes = Vec::with_capacity(results.len());
        for (source, result) in self.sources.iter().zip(results) {
            if let FeedOutcome::Failed(err) = &result.outcome {
                warn!(
                    source = %source.id,
                    category = err.category(),
                    "Skipping source this cycle: {}",
                    err
                );
            }
            dirty |= result.version_moved
                || matches!(result.outcome, FeedOutcome::Merged { changed: true, .. });
            outcomes.push(SourceReport {
                source: source.id,
                outcome: result.outcome,
            });
        }

        if dirty {
            self.mark_dirty();
        }

        let persisted = self.persist_if_dirty();
        let report = RefreshReport {
            started_at,
            outcomes,
            persisted,
        };

        info!(
            changed = report.changed(),
            failed = report.failures().len(),
            up_to_date = report.up_to_date().len(),
            persisted,
            "Refresh cycle finished"
        );
        report
    }

    /// Save both snapshots if a save is owed; returns whether one was written.
    fn persist_if_dirty(&self) -> bool {
        if !self.pending_save.swap(false, Ordering::SeqCst) {
            return false;
        }

        match self.persist_now() {
            Ok(saved) => {
                info!("Saved {} mime types", saved);
                true
            },
            Err(err) => {
                warn!("Failed to save snapshots, will retry next cycle: {}", err);
                self.mark_dirty();
                false
            },
        }
    }

    /// Write the current registry and versions as one unit.
    ///
    /// The copy is taken under the save lock, so a later save always writes
    /// state at least as new as any earlier one. Returns the number of MIME
    /// types written.
    pub fn persist_now(&self) -> Result<usize> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let registry = self.registry.snapshot();
        let versions = self.versions.snapshot();
        self.store.save_snapshot(&registry, &versions)?;
        Ok(registry.len())
    }

    async fn refresh_source(&self, source: &FeedSource) -> PipelineResult {
        let headers = source.request_headers(&self.user_agent);
        let version_header = source.format().version_header();

        let head = match self.transport.head(&source.url, &headers).await {
            Ok(response) => response,
            Err(err) => return PipelineResult::failed(err),
        };
        if let Err(err) = ensure_success(&source.url, &head) {
            return PipelineResult::failed(err);
        }

        let remote = head.header(&version_header);
        let recorded = self.versions.get(source.id);
        if remote.is_some() && remote == recorded {
            debug!(source = %source.id, "Up to date");
            return PipelineResult {
                outcome: FeedOutcome::UpToDate,
                version_moved: false,
            };
        }

        let response = match self.transport.get(&source.url, &headers).await {
            Ok(response) => response,
            Err(err) => return PipelineResult::failed(err),
        };
        if let Err(err) = ensure_success(&source.url, &response) {
            return PipelineResult::failed(err);
        }

        let version = response.header(&version_header);
        let feed = match parse_feed(source.format(), &response.body, version) {
            Ok(feed) => feed,
            Err(err) => return PipelineResult::failed(err),
        };

        let changed = self.registry.merge_in(&feed.content);
        let version_moved = self.versions.set(source.id, feed.version.clone());

        if changed {
            info!(source = %source.id, "Merged {} mime types", feed.content.len());
        } else {
            debug!(source = %source.id, "Feed added nothing new");
        }

        PipelineResult {
            outcome: FeedOutcome::Merged {
                changed,
                version: feed.version,
            },
            version_moved,
        }
    }
}

fn ensure_success(url: &str, response: &TransportResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status: response.status,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::{MimeMap, VersionMap};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    /// Scripted transport: one canned HEAD and GET response per URL.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        routes: StdMutex<HashMap<String, Route>>,
        pub(crate) gets: AtomicUsize,
    }

    #[derive(Clone)]
    struct Route {
        token_header: &'static str,
        token: Option<String>,
        status: u16,
        body: String,
    }

    impl FakeTransport {
        pub(crate) fn serve(
            &self,
            url: &str,
            token_header: &'static str,
            token: Option<&str>,
            body: &str,
        ) {
            self.routes.lock().unwrap().insert(
                url.to_string(),
                Route {
                    token_header,
                    token: token.map(str::to_string),
                    status: 200,
                    body: body.to_string(),
                },
            );
        }

        pub(crate) fn fail(&self, url: &str, status: u16) {
            self.routes.lock().unwrap().insert(
                url.to_string(),
                Route {
                    token_header: "etag",
                    token: None,
                    status,
                    body: String::new(),
                },
            );
        }

        fn respond(&self, url: &str, with_body: bool) -> Result<TransportResponse> {
            let route = self
                .routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Other(format!("connection refused: {url}")))?;

            let mut headers = HeaderMap::new();
            if let Some(token) = &route.token {
                headers.insert(route.token_header, HeaderValue::from_str(token).unwrap());
            }
            Ok(TransportResponse {
                status: route.status,
                headers,
                body: if with_body { route.body } else { String::new() },
            })
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn head(&self, url: &str, _headers: &HeaderMap) -> Result<TransportResponse> {
            self.respond(url, false)
        }

        async fn get(&self, url: &str, _headers: &HeaderMap) -> Result<TransportResponse> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.respond(url, true)
        }
    }

    /// In-memory snapshot store counting saves.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) registry: StdMutex<Option<MimeMap>>,
        pub(crate) versions: StdMutex<Option<VersionMap>>,
        pub(crate) saves: AtomicUsize,
        pub(crate) fail_saves: AtomicBool,
    }

    impl SnapshotStore for MemoryStore {
        fn load_registry(&self) -> Result<Option<MimeMap>> {
            Ok(self.registry.lock().unwrap().clone())
        }

        fn save_registry(&self, registry: &MimeMap) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".into()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.registry.lock().unwrap() = Some(registry.clone());
            Ok(())
        }

        fn load_versions(&self) -> Result<Option<VersionMap>> {
            Ok(self.versions.lock().unwrap().clone())
        }

        fn save_versions(&self, versions: &VersionMap) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".into()));
            }
            *self.versions.lock().unwrap() = Some(versions.clone());
            Ok(())
        }
    }

    fn fixture(
        sources: Vec<FeedSource>,
    ) -> (
        RefreshCoordinator,
        Arc<FakeTransport>,
        Arc<MemoryStore>,
        Arc<Registry>,
    ) {
        let registry = Arc::new(Registry::new());
        let transport = Arc::new(FakeTransport::default());
        let store = Arc::new(MemoryStore::default());
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&registry),
            Arc::new(VersionStore::new()),
            transport.clone(),
            store.clone(),
            sources,
        );
        (coordinator, transport, store, registry)
    }

    fn apache_source() -> FeedSource {
        FeedSource::new(SourceId::Apache, "mem://apache")
    }

    #[tokio::test]
    async fn test_first_cycle_merges_and_persists() {
        let (coordinator, transport, store, registry) = fixture(vec![apache_source()]);
        transport.serve("mem://apache", "etag", Some("\"v1\""), "text/plain\ttxt\n");

        let report = coordinator.run_cycle().await;

        assert!(report.changed());
        assert!(report.persisted);
        assert_eq!(registry.lookup("a.txt"), vec!["text/plain"]);
        let versions = store.versions.lock().unwrap().clone().unwrap();
        assert_eq!(versions[&SourceId::Apache].as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_matching_version_skips_download() {
        let (coordinator, transport, store, _registry) = fixture(vec![apache_source()]);
        transport.serve("mem://apache", "etag", Some("\"v1\""), "text/plain\ttxt\n");

        coordinator.run_cycle().await;
        let report = coordinator.run_cycle().await;

        assert_eq!(report.up_to_date(), vec![SourceId::Apache]);
        assert!(!report.persisted);
        assert_eq!(transport.gets.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_validator_always_downloads() {
        let (coordinator, transport, _store, _registry) = fixture(vec![apache_source()]);
        transport.serve("mem://apache", "etag", None, "text/plain\ttxt\n");

        coordinator.run_cycle().await;
        let report = coordinator.run_cycle().await;

        assert!(matches!(
            report.outcome(SourceId::Apache),
            Some(FeedOutcome::Merged { changed: false, .. })
        ));
        assert_eq!(transport.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_version_untouched() {
        let (coordinator, transport, _store, registry) = fixture(vec![apache_source()]);
        transport.serve("mem://apache", "etag", Some("\"broken\""), "<html></html>");

        let report = coordinator.run_cycle().await;

        assert!(matches!(
            report.outcome(SourceId::Apache),
            Some(FeedOutcome::Failed(Error::Parse(_)))
        ));
        assert!(registry.is_empty());
        assert!(coordinator.versions.get(SourceId::Apache).is_none());
        assert!(!report.persisted);
    }

    #[tokio::test]
    async fn test_failed_save_is_retried_next_cycle() {
        let (coordinator, transport, store, _registry) = fixture(vec![apache_source()]);
        transport.serve("mem://apache", "etag", Some("\"v1\""), "text/plain\ttxt\n");
        store.fail_saves.store(true, Ordering::SeqCst);

        let report = coordinator.run_cycle().await;
        assert!(!report.persisted);
        assert!(coordinator.is_dirty());

        store.fail_saves.store(false, Ordering::SeqCst);
        let report = coordinator.run_cycle().await;
        assert_eq!(report.up_to_date(), vec![SourceId::Apache]);
        assert!(report.persisted);
        assert!(!coordinator.is_dirty());
        assert!(store.registry.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_rest() {
        let sources: Vec<FeedSource> = SourceId::ALL
            .into_iter()
            .map(|id| FeedSource::new(id, format!("mem://{id}")))
            .collect();
        let (coordinator, transport, store, registry) = fixture(sources);

        transport.fail("mem://apache", 503);
        transport.serve("mem://debian", "etag", Some("\"d\""), "text/x-debian\tdeb\n");
        transport.serve(
            "mem://nginx",
            "etag",
            Some("\"n\""),
            "types {\n    text/x-nginx  ngx;\n}\n",
        );
        for id in SourceId::ALL.into_iter().filter(|id| id.is_iana()) {
            transport.serve(
                &format!("mem://{id}"),
                "last-modified",
                Some("Mon, 01 Jan 2024 00:00:00 GMT"),
                &format!("Name,Template,Reference\n{id}-ext,{id}/x-sample,[RFC]\n"),
            );
        }

        let report = coordinator.run_cycle().await;

        assert_eq!(report.outcomes.len(), 12);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SourceId::Apache);
        assert!(matches!(
            failures[0].1,
            Error::HttpStatus { status: 503, .. }
        ));
        assert!(report.persisted);
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.lookup("x.ngx"), vec!["text/x-nginx"]);
        assert_eq!(registry.lookup("x.font-ext"), vec!["font/x-sample"]);

        let versions = store.versions.lock().unwrap().clone().unwrap();
        assert_eq!(versions[&SourceId::Apache], None);
        assert_eq!(versions[&SourceId::Debian].as_deref(), Some("\"d\""));
    }
}
