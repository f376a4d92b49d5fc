//! The upstream feeds pulled on every refresh cycle.

use std::collections::BTreeMap;

use reqwest::header::{ACCEPT_ENCODING, CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};

use crate::{FeedFormat, SourceId};

/// Apache httpd's canonical `mime.types`.
pub const APACHE_URL: &str =
    "https://svn.apache.org/repos/asf/httpd/httpd/trunk/docs/conf/mime.types";

/// Debian media-types package (Apache-compatible format).
pub const DEBIAN_URL: &str = "https://salsa.debian.org/debian/media-types/-/raw/master/mime.types";

/// nginx's bundled `mime.types`.
pub const NGINX_URL: &str = "https://raw.githubusercontent.com/nginx/nginx/master/conf/mime.types";

/// Base of the IANA per-category CSV exports.
pub const IANA_BASE_URL: &str = "https://www.iana.org/assignments/media-types";

/// Default client identifier; some IANA endpoints reject anonymous requests.
pub const DEFAULT_USER_AGENT: &str = concat!("mimesync/", env!("CARGO_PKG_VERSION"));

/// One feed to check and merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Which feed this is
    pub id: SourceId,
    /// Where to fetch it from
    pub url: String,
}

impl FeedSource {
    /// Create a source for `id` served at `url`.
    pub fn new(id: SourceId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }

    /// Document format of this feed.
    #[must_use]
    pub const fn format(&self) -> FeedFormat {
        self.id.format()
    }

    /// Headers sent with both the HEAD check and the GET.
    ///
    /// Content encoding is pinned to `identity` so the validator always refers
    /// to the same representation.
    #[must_use]
    pub fn request_headers(&self, user_agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if self.id.is_iana() {
            let agent = HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
            headers.insert(USER_AGENT, agent);
        }

        headers
    }
}

/// Default URL for a source.
#[must_use]
pub fn default_url(id: SourceId) -> String {
    match id {
        SourceId::Apache => APACHE_URL.to_string(),
        SourceId::Debian => DEBIAN_URL.to_string(),
        SourceId::Nginx => NGINX_URL.to_string(),
        category => format!("{IANA_BASE_URL}/{category}.csv"),
    }
}

/// All twelve feeds at their upstream locations.
#[must_use]
pub fn default_sources() -> Vec<FeedSource> {
    SourceId::ALL
        .into_iter()
        .map(|id| FeedSource::new(id, default_url(id)))
        .collect()
}

/// All twelve feeds, with `overrides` replacing individual URLs.
#[must_use]
pub fn sources_with_overrides(overrides: &BTreeMap<SourceId, String>) -> Vec<FeedSource> {
    SourceId::ALL
        .into_iter()
        .map(|id| {
            let url = overrides.get(&id).cloned().unwrap_or_else(|| default_url(id));
            FeedSource::new(id, url)
        })
        .collect()
}
