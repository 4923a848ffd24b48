// Pulse Downloader - resumable media downloads with extraction-tool fallback
// Copyright (C) 2025 Pulse Downloader contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! URL and filesystem-path sanitization
//!
//! Everything user-supplied passes through here before it reaches the HTTP
//! client, the filesystem, or the extraction tool's command line.
//!
//! Sanitization is a character-class allowlist, not a full security
//! boundary: characters outside the allowlist are stripped, everything else
//! is left byte-for-byte where it was. Stripping (rather than rejecting)
//! keeps unusual but legitimate URLs and paths working.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::{PulseError, Result};

/// Extensions treated as directly streamable media files.
const MEDIA_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".webm", ".mov", ".flv", ".avi", ".ts", ".m4v",
];

/// Fallback name when a URL path has no usable final segment.
const DEFAULT_FILENAME: &str = "downloaded_video";

lazy_static! {
    static ref UNSAFE_PATH: Regex = Regex::new(r"[^\w\-./]").unwrap();
    static ref UNSAFE_QUERY: Regex = Regex::new(r"[^\w\-=&]").unwrap();
    static ref UNSAFE_COMPONENT: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
}

/// Validate and clean a user-supplied URL.
///
/// Fails with [`PulseError::InvalidInput`] when the URL has no scheme or no
/// host. Otherwise strips path characters outside `[\w\-./]` and query
/// characters outside `[\w\-=&]`, drops any fragment, and reassembles
/// `scheme://host[:port]path[?query]`.
pub fn sanitize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|err| PulseError::invalid_input(format!("could not parse URL: {err}")))?;
    let Some(host) = parsed.host_str() else {
        return Err(PulseError::invalid_input("URL has no host"));
    };

    // Clean the path and query as they were typed. The parsed URL is only
    // used for validation: its accessors percent-encode the very characters
    // the allowlist is supposed to drop.
    let (raw_path, raw_query) = split_path_query(trimmed);
    let path = UNSAFE_PATH.replace_all(raw_path, "");
    let query = UNSAFE_QUERY.replace_all(raw_query, "");

    let mut cleaned = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        cleaned.push(':');
        cleaned.push_str(&port.to_string());
    }
    cleaned.push_str(&path);
    if !query.is_empty() {
        cleaned.push('?');
        cleaned.push_str(&query);
    }
    Ok(cleaned)
}

/// Strip characters that are illegal in filesystem path components
/// (`<>:"/\|?*`) and trim surrounding whitespace.
pub fn sanitize_path(raw: &str) -> String {
    UNSAFE_COMPONENT.replace_all(raw, "").trim().to_string()
}

/// True when the URL path ends in a recognized media file extension
/// (case-insensitive), making it eligible for direct streaming.
pub fn is_direct_media_url(url: &str) -> bool {
    let (path, _) = split_path_query(url.trim());
    let path = path.to_ascii_lowercase();
    MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Filename for a transfer destination: the last path segment of the URL,
/// sanitized, or a default name when nothing usable remains.
pub fn derive_filename(url: &str) -> String {
    let (path, _) = split_path_query(url.trim());
    let name = path.rsplit('/').next().unwrap_or("");
    let cleaned = sanitize_path(name);
    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Path and query exactly as present in the input string, fragment excluded.
fn split_path_query(url: &str) -> (&str, &str) {
    let after_scheme = match url.find("://") {
        Some(index) => &url[index + 3..],
        None => return ("", ""),
    };
    let rest = match after_scheme.find(['/', '?', '#']) {
        Some(index) => &after_scheme[index..],
        None => return ("", ""),
    };
    let rest = rest.split('#').next().unwrap_or("");
    match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    }
}
