//! Route-prefix matching shared by the feature table, the role table and the
//! path classifier.
//!
//! Matching is segment aware: `/map` covers `/map` and `/map/live` but not
//! `/mapping`.

/// Whether `path` lies at or below `prefix`.
pub fn has_route_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix == "/" || prefix.ends_with('/') {
        return path.starts_with(prefix);
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether `path` lies at or below any of `prefixes`.
pub fn is_under_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| has_route_prefix(path, prefix))
}

/// Find the table entry with the longest prefix covering `path`.
///
/// Ties keep the earliest entry.
pub fn longest_matching_prefix<'a, T>(
    path: &str,
    table: &'a [(&'static str, T)],
) -> Option<&'a (&'static str, T)> {
    let mut best: Option<&'a (&'static str, T)> = None;
    for entry in table {
        if !has_route_prefix(path, entry.0) {
            continue;
        }
        match best {
            Some(current) if current.0.len() >= entry.0.len() => {}
            _ => best = Some(entry),
        }
    }
    best
}
