//! Daily note document handed over by the surrounding application.

use crate::model::span::{char_len, Span};
use serde::{Deserialize, Serialize};

/// Identifier of a daily note ("memo") in the persistence tier.
pub type DocumentId = i64;

/// Identifier of the project that owns a document.
pub type ProjectId = i64;

/// One daily note plus its spans.
///
/// Owned by the editing session that opened it and discarded on close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    /// Calendar day in `YYYY-MM-DD` form.
    pub date: String,
    pub text: String,
    pub spans: Vec<Span>,
}

impl Document {
    /// Text length in characters.
    pub fn text_len(&self) -> usize {
        char_len(&self.text)
    }
}
