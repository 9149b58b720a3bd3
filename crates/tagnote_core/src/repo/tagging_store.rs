//! Store contract for documents and their taggings.

use crate::db::DbError;
use crate::model::category::Category;
use crate::model::document::{Document, DocumentId, ProjectId};
use crate::model::span::{char_len, InvalidRangeError, Span, SpanId, SpanRange};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error shared by every `TaggingStore` implementation.
#[derive(Debug)]
pub enum StoreError {
    NotFound(DocumentId),
    InvalidData(String),
    Db(DbError),
    /// Failure reported by a remote collaborator.
    Remote(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored tagging data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Remote(message) => write!(f, "remote store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<InvalidRangeError> for StoreError {
    fn from(value: InvalidRangeError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Payload of one create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSpan {
    pub category: Category,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl From<&Span> for NewSpan {
    fn from(span: &Span) -> Self {
        Self {
            category: span.category,
            start: span.start(),
            end: span.end(),
            text: span.text.clone(),
        }
    }
}

/// Opaque progress signal returned by some creates ("log acquired").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub success: bool,
    pub message: String,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSpan {
    pub id: SpanId,
    pub milestone: Option<Milestone>,
}

/// A tagging row as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSpan {
    pub id: SpanId,
    pub category: Category,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A document plus its persisted taggings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub date: String,
    pub text: String,
    pub spans: Vec<StoredSpan>,
}

impl LoadedDocument {
    /// Validates stored offsets against the text and builds a `Document`.
    ///
    /// # Errors
    /// - `StoreError::InvalidData` when a stored range does not fit the text.
    pub fn into_document(self) -> StoreResult<Document> {
        let text_len = char_len(&self.text);
        let spans = self
            .spans
            .into_iter()
            .map(|stored| -> StoreResult<Span> {
                let range = SpanRange::new(stored.start, stored.end, text_len)?;
                Ok(Span::persisted(stored.id, stored.category, range, stored.text))
            })
            .collect::<StoreResult<Vec<Span>>>()?;
        Ok(Document {
            id: self.id,
            project_id: self.project_id,
            date: self.date,
            text: self.text,
            spans,
        })
    }
}

/// Async persistence collaborator of an editing session.
///
/// Futures returned here are polled on one thread; implementations may
/// borrow non-`Sync` resources.
#[async_trait(?Send)]
pub trait TaggingStore {
    /// Loads a document and the current author's taggings on it.
    async fn load_document(&self, id: DocumentId) -> StoreResult<LoadedDocument>;
    /// Replaces the document text.
    async fn update_document_text(&self, id: DocumentId, text: &str) -> StoreResult<()>;
    /// Creates one tagging and returns its server id.
    async fn create_span(&self, document_id: DocumentId, span: &NewSpan)
        -> StoreResult<CreatedSpan>;
    /// Deletes one tagging; a missing id is a success.
    async fn delete_span(&self, id: SpanId) -> StoreResult<()>;
}

/// One tagging in a project-wide listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTagging {
    pub id: SpanId,
    pub memo_id: DocumentId,
    pub memo_date: String,
    pub user_name: String,
    pub category: Category,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Project header used by progress views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    /// Logs the team must collect to complete the project.
    pub required_taggings: u32,
    pub members: Vec<String>,
}

/// Read-only project queries for review screens.
#[async_trait(?Send)]
pub trait ProjectReviewStore {
    async fn load_project(&self, id: ProjectId) -> StoreResult<ProjectSummary>;
    /// Every member's taggings in the project, ordered by memo date.
    async fn list_project_taggings(&self, id: ProjectId) -> StoreResult<Vec<ProjectTagging>>;
}
