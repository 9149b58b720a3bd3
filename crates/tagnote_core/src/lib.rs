//! Offset-based text annotation engine for daily notes.
//! Spans tag character ranges of a note as problem, idea or solution.

pub mod codec;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod surface;
pub mod sync;

pub use codec::{CategoryCodec, CodecError, CodecTable, UnknownCategoryCode};
pub use config::{AnnotationConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::compositor::{compose, flatten, ComposeError, Segment};
pub use engine::resolver::{
    check_non_overlap, propose_span, resolve, OverlapPolicyViolation, Proposal, Resolution,
    Selection, SkipReason,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, Rgba};
pub use model::document::{Document, DocumentId, ProjectId};
pub use model::span::{InvalidRangeError, LocalKey, Span, SpanId, SpanRange};
pub use repo::sqlite_store::SqliteTaggingStore;
pub use repo::tagging_store::{
    CreatedSpan, LoadedDocument, Milestone, NewSpan, ProjectReviewStore, StoreError, StoreResult,
    TaggingStore,
};
pub use service::session::{
    execute_save, EditingSession, SavePlan, SaveReport, SaveSummary, SessionError,
    SessionRegistry,
};
pub use surface::{EditorSurface, ModeSwitch, SurfaceMode};
pub use sync::differ::{diff, ReconcilePlan};
pub use sync::executor::{
    execute, FailedOperation, PersistenceOperationFailed, ReconcileReport, SaveOutcome,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
