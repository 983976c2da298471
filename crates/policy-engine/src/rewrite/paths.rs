//! Path matching and substitution for url mappings.

use crate::patterns::PatternCache;

pub const REGEX_PREFIX: &str = "regex:";
const MULTI: &str = "/**";
const SINGLE: &str = "/*";

/// Whether `path` falls under the mapping's external path pattern.
///
/// Supported forms are exact text, `/**` (any suffix after the prefix), `/*` (at most one more
/// segment after the prefix) and `regex:`-prefixed full-match expressions.
pub fn matches_external(pattern: &str, path: &str, patterns: &PatternCache) -> bool {
    if path == pattern {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(MULTI) {
        return path.starts_with(prefix);
    }
    if let Some(prefix) = pattern.strip_suffix(SINGLE) {
        return match path.strip_prefix(prefix) {
            Some("") => true,
            Some(rest) => rest
                .strip_prefix('/')
                .is_some_and(|segment| !segment.contains('/')),
            None => false,
        };
    }
    if let Some(expr) = pattern.strip_prefix(REGEX_PREFIX) {
        return match patterns.regex(expr) {
            Ok(re) => re.is_match(path),
            Err(err) => {
                tracing::warn!(pattern = expr, %err, "invalid mapping regex");
                false
            }
        };
    }
    false
}

/// Substitutes the matched external part of `path` with the internal path.
pub fn substitute(path: &str, external: &str, internal: &str) -> String {
    if let Some(prefix) = external.strip_suffix(MULTI) {
        if let Some(suffix) = path.strip_prefix(prefix) {
            let target = internal.strip_suffix(MULTI).unwrap_or(internal);
            return format!("{target}{suffix}");
        }
    }
    if path == external {
        return internal.to_string();
    }
    if let Some(rest) = path.strip_prefix(external) {
        return format!("{internal}{rest}");
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_segment_wildcard() {
        let cache = PatternCache::new();
        assert!(matches_external("/old/**", "/old/1/2", &cache));
        assert!(matches_external("/old/**", "/old", &cache));
        assert!(!matches_external("/old/**", "/ol", &cache));
        assert_eq!(substitute("/old/123", "/old/**", "/new/**"), "/new/123");
        assert_eq!(substitute("/old", "/old/**", "/new/**"), "/new");
        assert_eq!(substitute("/old/a/b", "/old/**", "/svc"), "/svc/a/b");
    }

    #[test]
    fn single_segment_wildcard() {
        let cache = PatternCache::new();
        assert!(matches_external("/api/*", "/api/users", &cache));
        assert!(matches_external("/api/*", "/api", &cache));
        assert!(!matches_external("/api/*", "/api/users/42", &cache));
        assert!(!matches_external("/api/*", "/apix", &cache));
    }

    #[test]
    fn regex_and_exact() {
        let cache = PatternCache::new();
        assert!(matches_external("regex:/v[0-9]+/.*", "/v2/orders", &cache));
        assert!(!matches_external("regex:/v[0-9]+", "/v2/orders", &cache));
        assert!(!matches_external("regex:(", "/(", &cache));
        assert!(matches_external("/health", "/health", &cache));
        assert!(!matches_external("/health", "/health/live", &cache));
    }

    #[test]
    fn prefix_fallback_and_pass_through() {
        assert_eq!(substitute("/api/v1/users", "/api/v1", "/v1"), "/v1/users");
        assert_eq!(substitute("/api/v1", "/api/v1", "/v1"), "/v1");
        assert_eq!(substitute("/other", "/api/v1", "/v1"), "/other");
    }
}
