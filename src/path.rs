//! Route path normalization.
//!
//! A raw route path such as `" /users/:id/edit/ "` is reduced to an ordered list of
//! [`PathSegment`]s. Segments led by `:` capture a single path element, segments led by `*`
//! capture the remainder; everything else is a literal.
//!
//! Only the literal prefix of a path (its *grouping path*) decides where a route lands in the
//! route tree. The parameter/wildcard tail is carried along untouched so it can be rendered
//! into the registration pattern.
//!
//! ```
//! use routeforge::path::{normalize, grouping_split, SegmentKind};
//!
//! let segments = normalize("/users/:id/edit");
//! assert_eq!(segments.len(), 3);
//! assert!(matches!(segments[1].kind, SegmentKind::Parameter(_)));
//!
//! let (grouping, tail) = grouping_split(&segments);
//! assert_eq!(grouping.len(), 1);
//! assert_eq!(tail.len(), 2);
//! ```

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Lead character of a parameter segment (`:id`).
pub const PARAM_MARKER: char = ':';

/// Lead character of a wildcard segment (`*rest`).
pub const WILDCARD_MARKER: char = '*';

/// Classification of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Matched verbatim
    Literal,
    /// Captures one path element; carries the parameter name
    Parameter(String),
    /// Captures the rest of the path; carries the wildcard name
    Wildcard(String),
}

/// One slash-delimited token of a normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Segment text exactly as written, including any marker
    pub text: String,
    /// Literal, parameter or wildcard
    pub kind: SegmentKind,
}

impl PathSegment {
    /// Classify a single segment by its lead character.
    pub fn classify(text: &str) -> Self {
        let kind = if let Some(name) = text.strip_prefix(PARAM_MARKER) {
            SegmentKind::Parameter(name.to_string())
        } else if let Some(name) = text.strip_prefix(WILDCARD_MARKER) {
            SegmentKind::Wildcard(name.to_string())
        } else {
            SegmentKind::Literal
        };
        Self {
            text: text.to_string(),
            kind,
        }
    }

    /// The empty literal segment that stands for the root slot.
    pub fn root() -> Self {
        Self {
            text: String::new(),
            kind: SegmentKind::Literal,
        }
    }

    /// Whether this segment is matched verbatim.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.kind == SegmentKind::Literal
    }
}

/// Strip whitespace and surrounding separators from a raw path.
pub fn trim_path(raw: &str) -> &str {
    raw.trim().trim_matches(SEPARATOR)
}

/// Normalize a raw path into its ordered segments.
///
/// Empty segments produced by adjacent separators are dropped. A path that is empty after
/// trimming normalizes to a single empty literal segment (the root slot).
pub fn normalize(raw: &str) -> Vec<PathSegment> {
    let segments: Vec<PathSegment> = trim_path(raw)
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(PathSegment::classify)
        .collect();
    if segments.is_empty() {
        vec![PathSegment::root()]
    } else {
        segments
    }
}

/// Split normalized segments into the grouping path and the parameter/wildcard tail.
///
/// The grouping path stops before the first non-literal segment. A path that starts with a
/// parameter or wildcard has no literal prefix; it is grouped on the root slot and the whole
/// path becomes the tail.
pub fn grouping_split(segments: &[PathSegment]) -> (Vec<PathSegment>, &[PathSegment]) {
    let boundary = segments
        .iter()
        .position(|s| !s.is_literal())
        .unwrap_or(segments.len());
    let (grouping, tail) = segments.split_at(boundary);
    if grouping.is_empty() {
        (vec![PathSegment::root()], tail)
    } else {
        (grouping.to_vec(), tail)
    }
}

/// Grouping path and registration pattern of a raw route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    /// Literal keys from the root down to the final grouping segment
    pub grouping: Vec<String>,
    /// Final grouping segment followed by the retained parameter/wildcard tail,
    /// without a leading separator (`users/:id/edit`)
    pub pattern: String,
}

impl RoutePath {
    /// Normalize `raw` and derive its grouping keys and pattern.
    pub fn parse(raw: &str) -> Self {
        let segments = normalize(raw);
        let (grouping, tail) = grouping_split(&segments);
        let last = grouping.last().map(|s| s.text.as_str()).unwrap_or_default();
        let pattern = std::iter::once(last)
            .chain(tail.iter().map(|s| s.text.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            grouping: grouping.into_iter().map(|s| s.text).collect(),
            pattern,
        }
    }
}
