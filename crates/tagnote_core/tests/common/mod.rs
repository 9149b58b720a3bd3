#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use std::cell::RefCell;
use tagnote_core::repo::tagging_store::{
    CreatedSpan, LoadedDocument, NewSpan, StoreError, StoreResult, TaggingStore,
};
use tagnote_core::{CategoryCodec, DocumentId, ProjectId, SpanId, SqliteTaggingStore};

pub const AUTHOR: &str = "ana";

pub fn store(conn: &Connection) -> SqliteTaggingStore<'_> {
    SqliteTaggingStore::try_new(conn, CategoryCodec::default(), AUTHOR).unwrap()
}

/// Creates a project with one memo and returns their ids.
pub fn seed_memo(conn: &Connection, text: &str) -> (ProjectId, DocumentId) {
    let store = store(conn);
    let project_id = store.create_project("retro", 10).unwrap();
    store.add_member(project_id, AUTHOR).unwrap();
    let memo_id = store.create_memo(project_id, "2024-05-01", text).unwrap();
    (project_id, memo_id)
}

/// Store wrapper that fails selected operations and records call order.
pub struct FlakyStore<S> {
    pub inner: S,
    pub failing_create_starts: Vec<usize>,
    pub failing_deletes: Vec<SpanId>,
    pub fail_text: bool,
    pub calls: RefCell<Vec<String>>,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_create_starts: Vec::new(),
            failing_deletes: Vec::new(),
            fail_text: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl<S: TaggingStore> TaggingStore for FlakyStore<S> {
    async fn load_document(&self, id: DocumentId) -> StoreResult<LoadedDocument> {
        self.inner.load_document(id).await
    }

    async fn update_document_text(&self, id: DocumentId, text: &str) -> StoreResult<()> {
        self.calls.borrow_mut().push("text".to_string());
        if self.fail_text {
            return Err(StoreError::Remote("text rejected".to_string()));
        }
        self.inner.update_document_text(id, text).await
    }

    async fn create_span(
        &self,
        document_id: DocumentId,
        span: &NewSpan,
    ) -> StoreResult<CreatedSpan> {
        self.calls
            .borrow_mut()
            .push(format!("create {}", span.start));
        if self.failing_create_starts.contains(&span.start) {
            return Err(StoreError::Remote("create rejected".to_string()));
        }
        self.inner.create_span(document_id, span).await
    }

    async fn delete_span(&self, id: SpanId) -> StoreResult<()> {
        self.calls.borrow_mut().push(format!("delete {id}"));
        if self.failing_deletes.contains(&id) {
            return Err(StoreError::Remote("delete rejected".to_string()));
        }
        self.inner.delete_span(id).await
    }
}
