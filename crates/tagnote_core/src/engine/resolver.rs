//! Overlap resolution for newly drawn spans.
//!
//! Policy is "last write wins, whole-span eviction": every existing span
//! that shares at least one character with the candidate is removed in its
//! entirety, then the candidate is appended.

use crate::model::category::Category;
use crate::model::span::{char_len, InvalidRangeError, Span, SpanRange};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Two spans of one working set intersect.
///
/// Unreachable while the resolver is the only mutation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapPolicyViolation {
    pub first: SpanRange,
    pub second: SpanRange,
}

impl Display for OverlapPolicyViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "spans {} and {} overlap in one working set",
            self.first, self.second
        )
    }
}

impl Error for OverlapPolicyViolation {}

/// Raw selection reported by the input layer, in character offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Selection with `start <= end`, whatever the drag direction was.
    pub fn normalized(&self) -> Self {
        Self {
            start: self.start.min(self.end),
            end: self.start.max(self.end),
        }
    }
}

/// Working set after one accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Survivors in their input order, followed by the candidate.
    pub spans: Vec<Span>,
    /// Spans removed because they intersect the candidate.
    pub evicted: Vec<Span>,
    /// The inserted candidate.
    pub inserted: Span,
}

/// Why a proposal did not change the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Plain click; `start == end`.
    EmptySelection,
    /// No category is armed.
    NoActiveCategory,
}

/// Result of a caller-facing span proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposal {
    Applied(Resolution),
    Skipped(SkipReason),
}

impl Proposal {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Inserts `candidate`, evicting every span it intersects.
pub fn resolve(spans: &[Span], candidate: Span) -> Resolution {
    let (evicted, survivors): (Vec<Span>, Vec<Span>) = spans
        .iter()
        .cloned()
        .partition(|span| span.range.intersects(&candidate.range));

    if !evicted.is_empty() {
        debug!(
            "event=span_resolve module=resolver status=ok evicted={} candidate={}",
            evicted.len(),
            candidate.range
        );
    }

    let mut next = survivors;
    next.push(candidate.clone());
    Resolution {
        spans: next,
        evicted,
        inserted: candidate,
    }
}

/// Turns a selection plus the armed category into a working-set update.
///
/// The active category is an explicit argument; nothing ambient is read.
///
/// # Errors
/// - Returns `InvalidRangeError` when the selection exceeds `text`.
pub fn propose_span(
    spans: &[Span],
    text: &str,
    selection: Selection,
    active_category: Option<Category>,
) -> Result<Proposal, InvalidRangeError> {
    let selection = selection.normalized();
    if selection.is_collapsed() {
        return Ok(Proposal::Skipped(SkipReason::EmptySelection));
    }
    let Some(category) = active_category else {
        return Ok(Proposal::Skipped(SkipReason::NoActiveCategory));
    };

    let candidate = Span::local(category, selection.start, selection.end, text)?;
    Ok(Proposal::Applied(resolve(spans, candidate)))
}

/// Verifies that no two spans intersect.
///
/// # Errors
/// - Returns the first intersecting pair in start order.
pub fn check_non_overlap(spans: &[Span]) -> Result<(), OverlapPolicyViolation> {
    let mut ranges: Vec<SpanRange> = spans.iter().map(|span| span.range).collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        if pair[0].intersects(&pair[1]) {
            return Err(OverlapPolicyViolation {
                first: pair[0],
                second: pair[1],
            });
        }
    }
    Ok(())
}

/// Verifies that every span fits a text of `text`'s length.
///
/// # Errors
/// - Returns the first out-of-bounds span as `InvalidRangeError`.
pub fn check_bounds(spans: &[Span], text: &str) -> Result<(), InvalidRangeError> {
    let text_len = char_len(text);
    for span in spans {
        SpanRange::new(span.start(), span.end(), text_len)?;
    }
    Ok(())
}
