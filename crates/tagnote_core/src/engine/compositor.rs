//! Text + spans -> ordered segment sequence for rendering.

use crate::engine::resolver::OverlapPolicyViolation;
use crate::model::category::Category;
use crate::model::span::{char_len, InvalidRangeError, LocalKey, Span, SpanRange};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One run of the composed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text outside every span.
    Plain { range: SpanRange, text: String },
    /// Text covered by exactly one span.
    Annotated {
        range: SpanRange,
        text: String,
        category: Category,
        local_key: LocalKey,
    },
}

impl Segment {
    pub fn range(&self) -> SpanRange {
        match self {
            Self::Plain { range, .. } | Self::Annotated { range, .. } => *range,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Annotated { text, .. } => text,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Plain { .. } => None,
            Self::Annotated { category, .. } => Some(*category),
        }
    }

    pub fn local_key(&self) -> Option<LocalKey> {
        match self {
            Self::Plain { .. } => None,
            Self::Annotated { local_key, .. } => Some(*local_key),
        }
    }
}

/// Composition failure. Both variants mean the working set bypassed the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    OutOfBounds(InvalidRangeError),
    Overlap(OverlapPolicyViolation),
}

impl Display for ComposeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds(err) => write!(f, "{err}"),
            Self::Overlap(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ComposeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::OutOfBounds(err) => Some(err),
            Self::Overlap(err) => Some(err),
        }
    }
}

/// Splits `text` into plain and annotated segments.
///
/// `spans` may come in any order. Ties on `start` keep insertion order.
/// The output covers `text` exactly once, in order.
///
/// # Errors
/// - `ComposeError::OutOfBounds` when a span ends past the text.
/// - `ComposeError::Overlap` when two spans intersect.
pub fn compose(text: &str, spans: &[Span]) -> Result<Vec<Segment>, ComposeError> {
    let boundaries = char_boundaries(text);
    let text_len = boundaries.len() - 1;
    let slice = |start: usize, end: usize| text[boundaries[start]..boundaries[end]].to_string();

    let mut ordered: Vec<&Span> = spans.iter().collect();
    ordered.sort_by_key(|span| span.start());

    let mut segments = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut cursor = 0usize;
    let mut previous: Option<SpanRange> = None;
    for span in ordered {
        if span.end() > text_len {
            return Err(ComposeError::OutOfBounds(InvalidRangeError {
                start: span.start(),
                end: span.end(),
                text_len,
            }));
        }
        if span.start() < cursor {
            return Err(ComposeError::Overlap(OverlapPolicyViolation {
                first: previous.unwrap_or(span.range),
                second: span.range,
            }));
        }
        if span.start() > cursor {
            segments.push(Segment::Plain {
                range: SpanRange::between(cursor, span.start()),
                text: slice(cursor, span.start()),
            });
        }
        segments.push(Segment::Annotated {
            range: span.range,
            text: slice(span.start(), span.end()),
            category: span.category,
            local_key: span.local_key,
        });
        cursor = span.end();
        previous = Some(span.range);
    }

    if cursor < text_len {
        segments.push(Segment::Plain {
            range: SpanRange::between(cursor, text_len),
            text: slice(cursor, text_len),
        });
    }

    Ok(segments)
}

/// Concatenates segment texts.
pub fn flatten(segments: &[Segment]) -> String {
    segments.iter().map(Segment::text).collect()
}

// Byte index of every char plus the end of `text`.
fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    boundaries.push(text.len());
    debug_assert_eq!(boundaries.len(), char_len(text) + 1);
    boundaries
}
