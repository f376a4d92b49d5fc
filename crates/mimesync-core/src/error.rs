//! Error types and handling for mimesync-core operations.
//!
//! This module provides a single error type covering every failure in the
//! registry: caller input validation, feed transport, feed parsing, snapshot
//! persistence and configuration. Errors are categorized for logging and carry
//! a recoverability hint for retry logic.
//!
//! ## Error Categories
//!
//! - **Validation Errors**: malformed MIME type or extension passed to `append`
//! - **Network Errors**: HEAD/GET failures and non-success statuses
//! - **Parse Errors**: a fetched feed does not have the expected shape
//! - **Storage Errors**: snapshot load/save failures
//! - **Configuration Errors**: invalid settings or config files
//!
//! ## Propagation Policy
//!
//! Only validation errors are surfaced synchronously to API callers. Network,
//! parse and storage failures raised during a background refresh are logged
//! and isolated to the source that produced them.
//!
//! ```rust
//! use mimesync_core::Error;
//!
//! let err = Error::InvalidMimeType("not-a-mimetype".to_string());
//! assert!(err.is_validation());
//! assert!(!err.is_recoverable());
//! assert_eq!(err.category(), "validation");
//! ```

use thiserror::Error;

/// The main error type for mimesync-core operations.
///
/// All fallible public functions return `Result<T, Error>`. The error chain is
/// preserved through `source()` for wrapped I/O and HTTP errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Raw I/O failure converted with `?`. The snapshot store and the
    /// configuration loader report their own failures as
    /// [`Error::Storage`] and [`Error::Config`] instead.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Covers connection failures, timeouts and body decoding errors raised by
    /// the HTTP client while checking or fetching a feed.
    ///
    /// ## Recoverability
    ///
    /// Connection and timeout errors are typically recoverable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A feed endpoint answered with a non-success status.
    #[error("HTTP {status} from '{url}'")]
    HttpStatus {
        /// URL that was requested.
        url: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// A fetched document did not match the expected feed format.
    ///
    /// ## Common Causes
    ///
    /// - An HTML error page served with a success status
    /// - An nginx file without a `types { ... }` block
    /// - An empty IANA export
    #[error("Parse error: {0}")]
    Parse(String),

    /// MIME type passed to `append` is not of the form `type/subtype`.
    #[error("Invalid MIME type '{0}': expected 'type/subtype'")]
    InvalidMimeType(String),

    /// Extension passed to `append` is empty or contains forbidden characters.
    #[error("Invalid extension '{0}': allowed characters are [a-z0-9-_+.~%]")]
    InvalidExtension(String),

    /// Snapshot storage operation failed.
    ///
    /// ## Common Causes
    ///
    /// - Data directory not writable
    /// - Corrupt snapshot JSON
    /// - Disk space exhaustion
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Returns `true` for errors that are typically temporary: network
    /// timeouts, connection failures, server-side statuses and interrupted
    /// I/O. The refresh scheduler does not retry on its own; the next cycle is
    /// the retry.
    ///
    /// ```rust
    /// use mimesync_core::Error;
    ///
    /// let transient = Error::HttpStatus { url: "https://example.com".into(), status: 503 };
    /// assert!(transient.is_recoverable());
    ///
    /// let permanent = Error::HttpStatus { url: "https://example.com".into(), status: 404 };
    /// assert!(!permanent.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the error was caused by caller-supplied input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidMimeType(_) | Self::InvalidExtension(_))
    }

    /// Get the error category as a string identifier.
    ///
    /// Used as a structured field when logging isolated refresh failures.
    ///
    /// - `"io"` - File system and I/O operations
    /// - `"network"` - HTTP transport and non-success statuses
    /// - `"parse"` - Feed format mismatches
    /// - `"validation"` - Malformed caller input
    /// - `"storage"` - Snapshot persistence
    /// - `"config"` - Configuration and settings
    /// - `"serialization"` - Data format conversion
    /// - `"other"` - Uncategorized errors
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) | Self::HttpStatus { .. } => "network",
            Self::Parse(_) => "parse",
            Self::InvalidMimeType(_) | Self::InvalidExtension(_) => "validation",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
