//! Domain utilities for the entry-domain walk
//!
//! Tracker entries are keyed by a canonical domain, while sub-rules, CNAME
//! targets, exclusions and surrogate keys may name a more specific host. The
//! helpers here walk a host upward through its parent domains to find the
//! entry that governs it.
//!
//! # Examples
//!
//! ```
//! use indexmap::IndexMap;
//! use dnr_core::domain::entry_domain_for;
//!
//! let mut trackers = IndexMap::new();
//! trackers.insert("tracker.com".to_string(), ());
//!
//! assert_eq!(entry_domain_for(&trackers, "a.b.tracker.com", None), Some("tracker.com"));
//! assert_eq!(entry_domain_for(&trackers, "a.b.tracker.com", Some(1)), None);
//! ```

use indexmap::IndexMap;

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and its ancestors, most specific first.
///
/// Parents that are bare top-level labels (`com`) are never yielded.
pub struct AncestorIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result).filter(|parent| parent.contains('.'));
        Some(result)
    }
}

/// Walk `host` and then each of its parents.
pub fn walk_ancestors(host: &str) -> AncestorIter<'_> {
    let host = host.trim_end_matches('.');
    AncestorIter {
        current: (!host.is_empty()).then_some(host),
    }
}

/// Walk only the strict ancestors of `host`.
pub fn walk_strict_ancestors(host: &str) -> AncestorIter<'_> {
    let mut iter = walk_ancestors(host);
    iter.next();
    iter
}

/// Find the nearest key of `entries` among `domain` and its ancestors.
///
/// `max_steps` bounds how many parent steps are taken: `Some(0)` only checks
/// `domain` itself. Returns the matching key as stored in the map.
pub fn entry_domain_for<'m, V>(
    entries: &'m IndexMap<String, V>,
    domain: &str,
    max_steps: Option<usize>,
) -> Option<&'m str> {
    let limit = max_steps.map_or(usize::MAX, |steps| steps.saturating_add(1));
    walk_ancestors(domain)
        .take(limit)
        .find_map(|candidate| entries.get_key_value(candidate))
        .map(|(key, _)| key.as_str())
}

/// True if `host` is `parent` or one of its subdomains.
pub fn is_same_or_subdomain(host: &str, parent: &str) -> bool {
    host == parent || is_strict_subdomain(host, parent)
}

/// True if `host` is a subdomain of `parent` (and not `parent` itself).
pub fn is_strict_subdomain(host: &str, parent: &str) -> bool {
    host.len() > parent.len() + 1
        && host.ends_with(parent)
        && host.as_bytes()[host.len() - parent.len() - 1] == b'.'
}

/// Lowercase and validate a hostname.
///
/// Only ASCII letters, digits, `-` and `.` are accepted; leading and
/// trailing dots are stripped.
pub fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return None;
    }

    if trimmed.contains("..") {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}
