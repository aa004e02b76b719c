//! URL path validation for pages.
//!
//! Valid page paths:
//! - Must start with `/`
//! - Must not contain whitespace or control characters
//! - Must not contain `.` or `..` segments, or empty segments (`//`)
//! - Must not fall under a reserved prefix (see [`RESERVED_PREFIXES`])

use crate::error::TypeError;

/// Path prefixes owned by the service itself, never by pages.
pub const RESERVED_PREFIXES: &[&str] = &["/api"];

/// Returns `true` if `path` is, or lies under, a reserved prefix.
pub fn is_reserved_path(path: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Validate a page path, returning `Ok(())` if it may be bound in a version.
///
/// # Examples
///
/// ```
/// use quire_types::validate_page_path;
///
/// assert!(validate_page_path("/").is_ok());
/// assert!(validate_page_path("/blog/hello").is_ok());
/// assert!(validate_page_path("about").is_err());
/// assert!(validate_page_path("/api/site").is_err());
/// ```
pub fn validate_page_path(path: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("must not contain whitespace or control characters"));
    }
    if path == "/" {
        return Ok(());
    }

    let body = path.strip_suffix('/').unwrap_or(path);
    for segment in body[1..].split('/') {
        match segment {
            "" => return Err(invalid("must not contain empty segments")),
            "." | ".." => return Err(invalid("must not contain '.' or '..' segments")),
            _ => {}
        }
    }

    if is_reserved_path(path) {
        return Err(TypeError::ReservedPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_paths() {
        for path in ["/", "/about", "/blog/2024/hello-world", "/docs/", "/apiary"] {
            assert!(validate_page_path(path).is_ok(), "{path} should be valid");
        }
    }

    #[test]
    fn rejects_relative_paths() {
        assert!(matches!(
            validate_page_path("about"),
            Err(TypeError::InvalidPath { .. })
        ));
        assert!(validate_page_path("").is_err());
    }

    #[test]
    fn rejects_traversal_and_empty_segments() {
        assert!(validate_page_path("/a/../b").is_err());
        assert!(validate_page_path("/a/./b").is_err());
        assert!(validate_page_path("/a//b").is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(validate_page_path("/hello world").is_err());
        assert!(validate_page_path("/tab\there").is_err());
    }

    #[test]
    fn reserved_prefix_is_rejected() {
        assert_eq!(
            validate_page_path("/api"),
            Err(TypeError::ReservedPath("/api".into()))
        );
        assert_eq!(
            validate_page_path("/api/pages"),
            Err(TypeError::ReservedPath("/api/pages".into()))
        );
    }

    proptest::proptest! {
        #[test]
        fn alphanumeric_segments_are_valid(segments in proptest::collection::vec("[a-z0-9-]{1,12}", 1..6)) {
            let path = format!("/{}", segments.join("/"));
            proptest::prop_assume!(!is_reserved_path(&path));
            proptest::prop_assert!(validate_page_path(&path).is_ok());
        }
    }

    #[test]
    fn reserved_check_is_segment_aware() {
        assert!(is_reserved_path("/api/site"));
        assert!(!is_reserved_path("/apiary"));
    }
}
