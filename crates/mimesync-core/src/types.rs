use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;

/// MIME type -> extensions, keyed in lexicographic order.
pub type MimeMap = BTreeMap<String, Vec<String>>;

/// Last-seen version token per feed source.
pub type VersionMap = BTreeMap<SourceId, Option<String>>;

/// Identifier of one upstream feed.
///
/// The IANA registry is split into one CSV export per top-level type, and each
/// export is tracked as its own source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Apache httpd `mime.types`.
    Apache,
    /// Debian media-types `mime.types`.
    Debian,
    /// nginx `mime.types`.
    Nginx,
    /// IANA `application` category.
    Application,
    /// IANA `audio` category.
    Audio,
    /// IANA `font` category.
    Font,
    /// IANA `image` category.
    Image,
    /// IANA `message` category.
    Message,
    /// IANA `model` category.
    Model,
    /// IANA `multipart` category.
    Multipart,
    /// IANA `text` category.
    Text,
    /// IANA `video` category.
    Video,
}

impl SourceId {
    /// Every known source, web-server feeds first.
    pub const ALL: [Self; 12] = [
        Self::Apache,
        Self::Debian,
        Self::Nginx,
        Self::Application,
        Self::Audio,
        Self::Font,
        Self::Image,
        Self::Message,
        Self::Model,
        Self::Multipart,
        Self::Text,
        Self::Video,
    ];

    /// Stable lowercase name, also used as the persisted key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apache => "apache",
            Self::Debian => "debian",
            Self::Nginx => "nginx",
            Self::Application => "application",
            Self::Audio => "audio",
            Self::Font => "font",
            Self::Image => "image",
            Self::Message => "message",
            Self::Model => "model",
            Self::Multipart => "multipart",
            Self::Text => "text",
            Self::Video => "video",
        }
    }

    /// Whether this source is one of the IANA category exports.
    #[must_use]
    pub const fn is_iana(self) -> bool {
        !matches!(self, Self::Apache | Self::Debian | Self::Nginx)
    }

    /// Document format served by this source.
    #[must_use]
    pub const fn format(self) -> FeedFormat {
        match self {
            Self::Apache | Self::Debian => FeedFormat::Apache,
            Self::Nginx => FeedFormat::Nginx,
            _ => FeedFormat::IanaCsv,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::Config(format!("Unknown source '{s}'")))
    }
}

/// Wire format of a feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// Tab-delimited `mime<TAB>ext ext` lines (Apache and Debian).
    Apache,
    /// A `types { mime ext ext; }` block.
    Nginx,
    /// IANA `Name,Template,Reference` CSV export.
    IanaCsv,
}

impl FeedFormat {
    /// Response header carrying the version token for this format.
    #[must_use]
    pub fn version_header(self) -> reqwest::header::HeaderName {
        match self {
            Self::Apache | Self::Nginx => reqwest::header::ETAG,
            Self::IanaCsv => reqwest::header::LAST_MODIFIED,
        }
    }
}

/// One parsed feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// `ETag` or `Last-Modified` value of the response, if any.
    pub version: Option<String>,
    /// Mappings found in the document.
    pub content: MimeMap,
}

/// How often the background refresh runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshInterval {
    /// Run a cycle every period.
    Every(Duration),
    /// No background loop.
    Disabled,
}

impl RefreshInterval {
    /// 24 hours.
    pub const DEFAULT_MILLIS: i64 = 86_400_000;

    /// Negative values disable the loop.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        u64::try_from(millis).map_or(Self::Disabled, |ms| Self::Every(Duration::from_millis(ms)))
    }

    /// Signed millisecond form; `-1` when disabled.
    #[must_use]
    pub fn as_millis(self) -> i64 {
        match self {
            Self::Every(period) => i64::try_from(period.as_millis()).unwrap_or(i64::MAX),
            Self::Disabled => -1,
        }
    }

    /// Timer period, never shorter than one millisecond.
    #[must_use]
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Every(period) => Some(period.max(Duration::from_millis(1))),
            Self::Disabled => None,
        }
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::from_millis(Self::DEFAULT_MILLIS)
    }
}
