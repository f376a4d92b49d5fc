//! Parsers for the upstream feed formats.
//!
//! Each parser turns one response body into a [`ParsedFeed`]. They are pure:
//! the version token is passed in by the caller from the response headers.
//!
//! Duplicate handling differs between formats. The Apache/Debian and nginx
//! parsers let a later line for the same MIME type replace the earlier one,
//! while the IANA parser keeps the first extension list and only adds tokens
//! it has not seen for that type yet.

use std::collections::btree_map::Entry;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, FeedFormat, MimeMap, ParsedFeed, Result};

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TAB_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TYPES_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*types\s*\{").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TYPES_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\}\s*$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NGINX_STATEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\S+)\s+(.+)$").unwrap());

/// Row markers the IANA registry uses for retired entries.
const RETIRED_MARKERS: [&str; 2] = ["obsolete", "deprecated"];

/// Parse a body in the given format.
pub fn parse_feed(format: FeedFormat, body: &str, version: Option<String>) -> Result<ParsedFeed> {
    match format {
        FeedFormat::Apache => parse_apache(body, version),
        FeedFormat::Nginx => parse_nginx(body, version),
        FeedFormat::IanaCsv => parse_iana_csv(body, version),
    }
}

/// Parse an Apache httpd (or Debian) `mime.types` file.
///
/// ```rust
/// use mimesync_core::parser::parse_apache;
///
/// let feed = parse_apache("text/html\thtm html\n# comment\n", None)?;
/// assert_eq!(feed.content["text/html"], vec!["htm", "html"]);
/// # Ok::<(), mimesync_core::Error>(())
/// ```
pub fn parse_apache(body: &str, version: Option<String>) -> Result<ParsedFeed> {
    let mut content = MimeMap::new();

    for line in body.lines() {
        if is_blank_or_comment(line) {
            continue;
        }

        let fields: Vec<&str> = TAB_RUN_RE.split(line).collect();
        if fields.len() < 2 {
            continue;
        }

        let mime = fields[0].trim().to_lowercase();
        let extensions = split_extensions(fields[1]);
        if mime.is_empty() || extensions.is_empty() {
            continue;
        }

        content.insert(mime, extensions);
    }

    if content.is_empty() {
        return Err(Error::Parse(
            "no tab-delimited mime type mappings found".into(),
        ));
    }

    Ok(ParsedFeed { version, content })
}

/// Parse an nginx `mime.types` file (a single `types { ... }` block).
pub fn parse_nginx(body: &str, version: Option<String>) -> Result<ParsedFeed> {
    let stripped: Vec<&str> = body
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect();
    let text = stripped.join("\n");

    if !TYPES_OPEN_RE.is_match(&text) {
        return Err(Error::Parse("missing 'types {' block".into()));
    }
    let text = TYPES_OPEN_RE.replace(&text, "");
    let text = TYPES_CLOSE_RE.replace(&text, "");

    let mut content = MimeMap::new();
    for statement in text.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        let Some(caps) = NGINX_STATEMENT_RE.captures(statement) else {
            continue;
        };

        let mime = caps[1].trim().to_lowercase();
        let extensions = split_extensions(&caps[2]);
        if mime.is_empty() || extensions.is_empty() {
            continue;
        }

        content.insert(mime, extensions);
    }

    if content.is_empty() {
        return Err(Error::Parse("'types' block contains no mappings".into()));
    }

    Ok(ParsedFeed { version, content })
}

/// Parse one IANA media-types category CSV export.
///
/// Rows mentioning `obsolete` or `deprecated` anywhere are registry
/// placeholders and are ignored.
pub fn parse_iana_csv(body: &str, version: Option<String>) -> Result<ParsedFeed> {
    let mut lines = body.lines();
    if lines.next().is_none_or(|header| header.trim().is_empty()) {
        return Err(Error::Parse("CSV export has no header row".into()));
    }

    let mut content = MimeMap::new();
    for line in lines {
        if is_blank_or_comment(line) {
            continue;
        }

        let lowered = line.to_lowercase();
        if RETIRED_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            continue;
        }

        let fields: Vec<&str> = lowered.split(',').collect();
        if fields.len() < 2 {
            continue;
        }

        let extension = fields[0].trim();
        let mime = fields[1].trim();
        if extension.is_empty() || mime.is_empty() {
            continue;
        }

        match content.entry(mime.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(vec![extension.to_string()]);
            },
            Entry::Occupied(mut slot) => {
                let known = slot.get_mut();
                if !known.iter().any(|ext| ext == extension) {
                    known.push(extension.to_string());
                }
            },
        }
    }

    Ok(ParsedFeed { version, content })
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn split_extensions(field: &str) -> Vec<String> {
    field
        .split_whitespace()
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
