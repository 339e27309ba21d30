//! Route path type with percent-decoded URL segments.

use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors related to route path parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A path segment could not be decoded or is not allowed.
    #[error("invalid path segment '{segment}' at position {position}: {message}")]
    InvalidSegment {
        segment: String,
        position: usize,
        message: String,
    },
    /// The path string as a whole is invalid.
    #[error("invalid path: {message}")]
    InvalidPath { message: String },
}

/// A normalized, percent-decoded request path.
///
/// Segments are separated by `/`; empty segments are dropped, so `/a//b/`
/// normalizes to the same path as `/a/b`. Each segment is percent-decoded
/// during parsing. The empty path (zero segments) is the root.
///
/// # Examples
///
/// ```rust
/// use hangar_core::RoutePath;
///
/// let path = RoutePath::parse("/flights/LZ%20127").unwrap();
/// assert_eq!(path.len(), 2);
/// assert_eq!(&path[1], "LZ 127");
///
/// // Trailing and doubled slashes are normalized
/// assert_eq!(RoutePath::parse("/flights/").unwrap(), RoutePath::parse("flights").unwrap());
/// ```
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoutePath {
    pub segments: Vec<String>,
}

impl RoutePath {
    /// Parse a path string, percent-decoding and validating each segment.
    ///
    /// Fails when a segment decodes to invalid UTF-8 or is a relative
    /// traversal segment (`.` or `..`).
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for (i, raw) in s.split('/').filter(|seg| !seg.is_empty()).enumerate() {
            let decoded = percent_decode_str(raw).decode_utf8().map_err(|_| {
                PathError::InvalidSegment {
                    segment: raw.to_string(),
                    position: i,
                    message: "not valid UTF-8 after percent-decoding".to_string(),
                }
            })?;
            let segment = decoded.into_owned();
            if segment == "." || segment == ".." {
                return Err(PathError::InvalidSegment {
                    segment,
                    position: i,
                    message: "relative traversal segments are not allowed".to_string(),
                });
            }
            segments.push(segment);
        }
        Ok(RoutePath { segments })
    }

    /// Create a path from already-decoded segments.
    pub fn from_segments(segments: Vec<String>) -> Self {
        RoutePath { segments }
    }

    /// The root path (zero segments).
    pub fn root() -> Self {
        RoutePath {
            segments: Vec::new(),
        }
    }

    /// Check if this path is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over segments.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.segments.iter()
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &RoutePath) -> RoutePath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        RoutePath { segments }
    }

    /// Check if this path starts with the given prefix.
    pub fn has_prefix(&self, prefix: &RoutePath) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix.segments == self.segments[..prefix.segments.len()]
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &RoutePath) -> Option<RoutePath> {
        if self.has_prefix(prefix) {
            Some(RoutePath {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl std::ops::Index<usize> for RoutePath {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.segments[i]
    }
}

/// Macro for creating route paths from literals.
///
/// # Example
///
/// ```rust
/// use hangar_core::route_path;
///
/// let p = route_path!("/flights/departures");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! route_path {
    ($s:expr) => {
        $crate::RoutePath::parse($s).expect("invalid route path literal")
    };
}
