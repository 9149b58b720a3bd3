//! Annotation domain model.
//!
//! # Responsibility
//! - Define categories, offset ranges and annotated spans over plain text.
//! - Define the document shape handed over by the surrounding application.
//!
//! # Invariants
//! - Offsets count Unicode scalar values, never bytes.
//! - A constructed `SpanRange` always satisfies `start < end <= text_len`.
//! - Non-overlap is not enforced here; see `engine::resolver`.

pub mod category;
pub mod document;
pub mod span;
