//! Storage keys from wildcard routes.
//!
//! A route such as `/api/files/{*key}` has a fixed prefix of two segments;
//! everything after them, verbatim, is the object key. The bare prefix
//! (`/api/files/`) is routed separately and resolves to the root key `""`.

use axum::{
    extract::{FromRequestParts, MatchedPath},
    http::request::Parts,
};
use std::convert::Infallible;

/// The portion of `path` after its first `prefix_segments` segments.
///
/// Never fails: a path that ends inside the prefix resolves to the root key
/// `""`. No percent-decoding or validation happens here, so identical
/// resolved strings always address the identical object.
pub fn resolve_key(path: &str, prefix_segments: usize) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.splitn(prefix_segments + 1, '/')
        .nth(prefix_segments)
        .unwrap_or_default()
        .to_string()
}

/// Number of fixed segments before the trailing `{*wildcard}` of a route
/// pattern. A pattern without a wildcard counts all of its segments.
pub fn prefix_segment_count(pattern: &str) -> usize {
    pattern
        .trim_start_matches('/')
        .split('/')
        .take_while(|segment| !segment.starts_with("{*"))
        .filter(|segment| !segment.is_empty())
        .count()
}

/// Extractor yielding the storage key addressed by the request, based on the
/// route pattern that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey(pub String);

impl<S> FromRequestParts<S> for ObjectKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let prefix = parts
            .extensions
            .get::<MatchedPath>()
            .map(|matched| prefix_segment_count(matched.as_str()))
            .unwrap_or(0);
        Ok(ObjectKey(resolve_key(parts.uri.path(), prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fixed_prefix() {
        assert_eq!(resolve_key("/api/files/a.txt", 2), "a.txt");
        assert_eq!(resolve_key("/api/files/photos/2025/img.jpg", 2), "photos/2025/img.jpg");
        assert_eq!(resolve_key("/api/details/x", 2), "x");
    }

    #[test]
    fn short_paths_resolve_to_root() {
        assert_eq!(resolve_key("/api/files", 2), "");
        assert_eq!(resolve_key("/api/files/", 2), "");
        assert_eq!(resolve_key("/", 2), "");
    }

    #[test]
    fn keeps_remainder_verbatim() {
        assert_eq!(resolve_key("/api/files/a//b/", 2), "a//b/");
        assert_eq!(resolve_key("/api/files/my%20file.txt", 2), "my%20file.txt");
        assert_eq!(resolve_key("/whole/path", 0), "whole/path");
    }

    #[test]
    fn counts_segments_before_wildcard() {
        assert_eq!(prefix_segment_count("/api/files/{*key}"), 2);
        assert_eq!(prefix_segment_count("/api/move/{*key}"), 2);
        assert_eq!(prefix_segment_count("/{*key}"), 0);
        assert_eq!(prefix_segment_count("/api/files"), 2);
        assert_eq!(prefix_segment_count("/api/files/"), 2);
    }
}
