//! Segment naming strategies.
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Patterns support `*` (any run) and `?` (any single character)
//! - Without a namer the middleware names segments `<METHOD>:<PATH>`

use std::fmt;

/// Picks the segment name for a request from its host.
pub trait SegmentNamer: Send + Sync + fmt::Debug {
    fn name(&self, host: &str) -> String;
}

/// Always returns the same name.
#[derive(Debug, Clone)]
pub struct FixedSegmentNamer {
    name: String,
}

impl FixedSegmentNamer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SegmentNamer for FixedSegmentNamer {
    fn name(&self, _host: &str) -> String {
        self.name.clone()
    }
}

/// Uses the host as the name when it matches a pattern, otherwise the
/// fallback name.
#[derive(Debug, Clone)]
pub struct DynamicSegmentNamer {
    fallback: String,
    host_pattern: String,
}

impl DynamicSegmentNamer {
    /// The pattern is normalized to lowercase for case-insensitive matching.
    pub fn new(fallback: impl Into<String>, host_pattern: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            host_pattern: host_pattern.into().to_lowercase(),
        }
    }
}

impl SegmentNamer for DynamicSegmentNamer {
    fn name(&self, host: &str) -> String {
        if !host.is_empty() && wildcard_match(&self.host_pattern, &host.to_lowercase()) {
            host.to_string()
        } else {
            self.fallback.clone()
        }
    }
}

/// Default name when no namer is configured.
pub fn method_path_name(method: &str, path: &str) -> String {
    format!("{}:{}", method, path)
}

/// Glob match supporting `*` and `?`, linear backtracking on the last `*`.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("*", "example.com"));
        assert!(wildcard_match("*.example.com", "api.example.com"));
        assert!(!wildcard_match("*.example.com", "example.com"));
        assert!(wildcard_match("api-?.example.com", "api-1.example.com"));
        assert!(!wildcard_match("api-?.example.com", "api-12.example.com"));
        assert!(wildcard_match("a*b*c", "axxbyyc"));
        assert!(!wildcard_match("a*b*c", "axxbyy"));
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("", "a"));
    }

    #[test]
    fn test_fixed_namer() {
        let namer = FixedSegmentNamer::new("checkout");
        assert_eq!(namer.name("api.example.com"), "checkout");
        assert_eq!(namer.name(""), "checkout");
    }

    #[test]
    fn test_dynamic_namer() {
        let namer = DynamicSegmentNamer::new("checkout", "*.EXAMPLE.com");
        assert_eq!(namer.name("API.example.com"), "API.example.com");
        assert_eq!(namer.name("other.org"), "checkout");
        assert_eq!(namer.name(""), "checkout");
    }

    #[test]
    fn test_method_path_name() {
        assert_eq!(method_path_name("POST", "/429"), "POST:/429");
    }
}
