//! Common helpers for listing and filtering

/// Default number of rows returned by global listings
pub const DEFAULT_LIST_LIMIT: usize = 200;

/// Hard ceiling for caller-supplied limits
pub const MAX_LIST_LIMIT: usize = 1000;

/// Trim and lowercase a search term; blank terms mean "no filter"
pub fn normalize_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring match of an already-normalized needle
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Resolve an optional caller limit against the defaults
pub fn effective_limit(limit: Option<u32>) -> usize {
    match limit {
        Some(0) | None => DEFAULT_LIST_LIMIT,
        Some(n) => (n as usize).min(MAX_LIST_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_is_no_filter() {
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some(" ProTein ")), Some("protein".to_string()));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(effective_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(effective_limit(Some(10)), 10);
        assert_eq!(effective_limit(Some(50_000)), MAX_LIST_LIMIT);
    }
}
