//! # mimesync-core
//!
//! A MIME type registry that keeps itself current from the Apache, Debian and
//! nginx `mime.types` files plus the IANA media-type registries.
//!
//! ## Architecture
//!
//! - **Parsing**: pure parsers for the three feed formats
//! - **Registry**: grow-only extension index behind a read/write lock
//! - **Refresh**: version-gated fetch, parse and merge of every feed
//! - **Scheduling**: recurring refresh on a cancellable Tokio task
//! - **Storage**: JSON snapshots written through temp files and renames
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mimesync_core::{Config, MimeTypes};
//!
//! # #[tokio::main]
//! # async fn main() -> mimesync_core::Result<()> {
//! let mime_types = MimeTypes::open(&Config::load()?)?;
//!
//! let report = mime_types.refresh_now().await;
//! for (source, err) in report.failures() {
//!     eprintln!("{source}: {err}");
//! }
//!
//! println!("{:?}", mime_types.get("archive.tar.gz"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Validation failures from [`MimeTypes::append`] are reported to the caller.
//! Feed failures never are: a cycle logs them, records them in its
//! [`RefreshReport`] and carries on with the remaining feeds.
//!
//! ```rust
//! use mimesync_core::registry::validate_mime;
//! use mimesync_core::Error;
//!
//! match validate_mime("not-a-mimetype") {
//!     Err(Error::InvalidMimeType(value)) => assert_eq!(value, "not-a-mimetype"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

/// Configuration loading and environment overrides
pub mod config;
/// Error types and result aliases
pub mod error;
/// HTTP transport used to probe and download feeds
pub mod fetcher;
/// The public registry facade
pub mod mime_types;
/// Parsers for the supported feed formats
pub mod parser;
/// One refresh cycle across every feed
pub mod refresh;
/// In-memory MIME type index
pub mod registry;
/// Recurring refresh task
pub mod scheduler;
/// Feed catalogue and request headers
pub mod sources;
/// Snapshot persistence
pub mod storage;
/// Core data types
pub mod types;
/// Recorded feed versions
pub mod versions;

// Re-export commonly used types
pub use config::{Config, FetchConfig, PathsConfig, RefreshConfig};
pub use error::{Error, Result};
pub use fetcher::{HttpTransport, Transport, TransportResponse};
pub use mime_types::{IntoExtensions, MimeTypes};
pub use refresh::{FeedOutcome, RefreshCoordinator, RefreshReport, SourceReport};
pub use registry::Registry;
pub use scheduler::RefreshScheduler;
pub use sources::FeedSource;
pub use storage::{SnapshotStore, Storage};
pub use types::*;
pub use versions::VersionStore;
