use std::fmt::Write;

use sha2::{Digest, Sha256};
use url::Url;

/// Upper bound on the length of a derived base name.
pub const MAX_BASE_NAME_LEN: usize = 120;

const ROOT_SEGMENT: &str = "index";
const EMPTY_NAME: &str = "document";

/// Deterministic, filesystem-safe base name: `slug("{host}-{last_segment}")`.
///
/// The host loses a leading `www.`, an empty or root path contributes
/// `index`, and the slug is lowercase ASCII alphanumerics joined by single
/// hyphens, cut at [`MAX_BASE_NAME_LEN`] characters.
pub fn derive_base_name(url: &str) -> String {
    let (host, segment) = match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let host = match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let segment = parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .unwrap_or(ROOT_SEGMENT)
                .to_string();
            (host, segment)
        }
        Err(_) => (String::new(), url.to_string()),
    };

    let base = slugify(&format!("{host}-{segment}"));
    if !base.is_empty() {
        return base;
    }
    let host_only = slugify(&host);
    if host_only.is_empty() {
        EMPTY_NAME.to_string()
    } else {
        host_only
    }
}

/// Lowercase, ASCII-only slug with runs of other characters collapsed to one hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    // Only ASCII is pushed, so byte truncation is on a char boundary.
    if slug.len() > MAX_BASE_NAME_LEN {
        slug.truncate(MAX_BASE_NAME_LEN);
    }
    slug.trim_end_matches('-').to_string()
}

/// Human readable fallback title: the base name with hyphens as spaces.
pub fn title_from_base_name(base: &str) -> String {
    base.replace('-', " ")
}

/// Lowercase hex SHA-256 of the given bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
