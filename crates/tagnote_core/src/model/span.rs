//! Annotated spans over a plain-text document.
//!
//! # Responsibility
//! - Validate `[start, end)` offsets against a document length.
//! - Carry the category, cached text and optional remote id of a span.
//!
//! # Invariants
//! - `0 <= start < end <= text_len` for every constructed `SpanRange`.
//! - `Span::text` equals the document slice at creation time.
//! - `local_key` is stable for the lifetime of the in-memory span and is
//!   never sent to the persistence tier.

use crate::model::category::Category;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier assigned by the persistence tier.
pub type SpanId = i64;

/// Client-side identity of a span, used to match save results back to the
/// span that produced them.
pub type LocalKey = Uuid;

/// Malformed span bounds. Always a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRangeError {
    pub start: usize,
    pub end: usize,
    pub text_len: usize,
}

impl Display for InvalidRangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid span range [{}, {}) for text of length {}",
            self.start, self.end, self.text_len
        )
    }
}

impl Error for InvalidRangeError {}

/// Half-open, non-empty character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSpanRange")]
pub struct SpanRange {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct RawSpanRange {
    start: usize,
    end: usize,
}

// Deserialized ranges have no document to check against; only emptiness
// and order are enforced here.
impl TryFrom<RawSpanRange> for SpanRange {
    type Error = InvalidRangeError;

    fn try_from(raw: RawSpanRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end, raw.start.max(raw.end))
    }
}

impl SpanRange {
    /// Validates `0 <= start < end <= text_len`.
    ///
    /// # Errors
    /// - Returns `InvalidRangeError` for empty, reversed or out-of-bounds ranges.
    pub fn new(start: usize, end: usize, text_len: usize) -> Result<Self, InvalidRangeError> {
        if start >= end || end > text_len {
            return Err(InvalidRangeError {
                start,
                end,
                text_len,
            });
        }
        Ok(Self { start, end })
    }

    /// Builds a range the caller has already bounded.
    pub(crate) fn between(start: usize, end: usize) -> Self {
        debug_assert!(start < end);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns whether the two ranges share at least one character.
    pub fn intersects(&self, other: &SpanRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Slices `text` by character offsets.
    ///
    /// Offsets past the end of `text` are clamped.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        slice_chars(text, self.start, self.end)
    }
}

impl Display for SpanRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One annotated interval of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Client-side identity; regenerated every time a span is loaded.
    pub local_key: LocalKey,
    /// `None` while the span is local-only.
    pub id: Option<SpanId>,
    pub category: Category,
    pub range: SpanRange,
    /// Cached `document.text[start..end]` at creation time.
    pub text: String,
}

impl Span {
    /// Creates a local-only span over `document_text`.
    ///
    /// # Errors
    /// - Returns `InvalidRangeError` when the bounds do not fit the text.
    pub fn local(
        category: Category,
        start: usize,
        end: usize,
        document_text: &str,
    ) -> Result<Self, InvalidRangeError> {
        let range = SpanRange::new(start, end, char_len(document_text))?;
        Ok(Self {
            local_key: Uuid::new_v4(),
            id: None,
            category,
            range,
            text: range.slice(document_text).to_string(),
        })
    }

    /// Rebuilds a span for a record that already exists remotely.
    ///
    /// The range is expected to be validated against the owning document.
    pub fn persisted(
        id: SpanId,
        category: Category,
        range: SpanRange,
        text: impl Into<String>,
    ) -> Self {
        Self {
            local_key: Uuid::new_v4(),
            id: Some(id),
            category,
            range,
            text: text.into(),
        }
    }

    pub fn start(&self) -> usize {
        self.range.start()
    }

    pub fn end(&self) -> usize {
        self.range.end()
    }

    pub fn is_local_only(&self) -> bool {
        self.id.is_none()
    }

    /// Binds the id returned by the persistence tier.
    pub(crate) fn bind_id(&mut self, id: SpanId) {
        self.id = Some(id);
    }
}

/// Length of `text` in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `char_offset`, or `text.len()` past the end.
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Slices `text` between two character offsets.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end.max(start));
    &text[from..to]
}
