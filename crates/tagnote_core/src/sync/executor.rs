//! Concurrent execution of a `ReconcilePlan`.
//!
//! All deletes and creates of one save are issued together and awaited as
//! one batch. There is no retry; failed operations are reported and left for
//! the next save to pick up.

use crate::model::document::DocumentId;
use crate::model::span::{LocalKey, Span, SpanId};
use crate::repo::tagging_store::{Milestone, NewSpan, StoreError, TaggingStore};
use crate::sync::differ::ReconcilePlan;
use futures_util::future::{join, join_all};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Shown to the user whenever any operation of a save failed.
pub const PARTIAL_SAVE_MESSAGE: &str = "save partially failed, some tags may not have been saved";

/// Which remote operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedOperation {
    /// Document text update; the tagging batch was not sent.
    UpdateText,
    Create(Span),
    Delete(SpanId),
}

/// One failed remote operation of a save batch.
#[derive(Debug)]
pub struct PersistenceOperationFailed {
    pub operation: FailedOperation,
    pub error: StoreError,
}

impl Display for PersistenceOperationFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.operation {
            FailedOperation::Create(span) => write!(
                f,
                "create of {} span {} failed: {}",
                span.category, span.range, self.error
            ),
            FailedOperation::Delete(id) => write!(f, "delete of span {id} failed: {}", self.error),
            FailedOperation::UpdateText => write!(f, "text update failed: {}", self.error),
        }
    }
}

impl Error for PersistenceOperationFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Per-operation outcome of one executed plan.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Created spans with their server ids bound.
    pub created: Vec<Span>,
    pub deleted: Vec<SpanId>,
    pub failures: Vec<PersistenceOperationFailed>,
    pub milestones: Vec<Milestone>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Baseline after this report: successful deletes leave, creates join.
    ///
    /// Failed deletes stay because the record still exists remotely.
    pub fn next_baseline(&self, baseline: &[Span]) -> Vec<Span> {
        let mut next: Vec<Span> = baseline
            .iter()
            .filter(|span| span.id.map_or(true, |id| !self.deleted.contains(&id)))
            .cloned()
            .collect();
        next.extend(self.created.iter().cloned());
        next
    }

    /// Server ids to bind onto working spans, keyed by local identity.
    pub fn id_bindings(&self) -> impl Iterator<Item = (LocalKey, SpanId)> + '_ {
        self.created
            .iter()
            .filter_map(|span| span.id.map(|id| (span.local_key, id)))
    }

    /// Returns the next baseline and binds created ids into `working`.
    ///
    /// Working spans that vanished meanwhile are skipped; the next diff
    /// deletes their remote records.
    pub fn apply_to(&self, baseline: &[Span], working: &mut [Span]) -> Vec<Span> {
        for (local_key, id) in self.id_bindings() {
            if let Some(span) = working.iter_mut().find(|s| s.local_key == local_key) {
                span.bind_id(id);
            }
        }
        self.next_baseline(baseline)
    }

    /// Collapses the report into what the caller shows.
    pub fn outcome(self) -> SaveOutcome {
        if self.failures.is_empty() {
            SaveOutcome::Complete
        } else {
            SaveOutcome::Partial {
                failures: self.failures,
            }
        }
    }
}

/// User-facing result of a save.
#[derive(Debug)]
pub enum SaveOutcome {
    Complete,
    Partial {
        failures: Vec<PersistenceOperationFailed>,
    },
}

impl SaveOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Message for the user; `None` when everything was saved.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Complete => None,
            Self::Partial { .. } => Some(PARTIAL_SAVE_MESSAGE),
        }
    }
}

/// Issues every operation of `plan` concurrently and awaits the batch.
pub async fn execute<S: TaggingStore>(
    store: &S,
    document_id: DocumentId,
    plan: &ReconcilePlan,
) -> ReconcileReport {
    info!(
        "event=reconcile module=sync status=start memo_id={document_id} deletes={} creates={}",
        plan.to_delete.len(),
        plan.to_create.len()
    );

    let deletes = join_all(
        plan.to_delete
            .iter()
            .map(|&id| async move { (id, store.delete_span(id).await) }),
    );
    let creates = join_all(plan.to_create.iter().map(|span| async move {
        let payload = NewSpan::from(span);
        (span, store.create_span(document_id, &payload).await)
    }));
    let (delete_results, create_results) = join(deletes, creates).await;

    let mut report = ReconcileReport::default();
    for (id, result) in delete_results {
        match result {
            Ok(()) => report.deleted.push(id),
            Err(error) => report.failures.push(PersistenceOperationFailed {
                operation: FailedOperation::Delete(id),
                error,
            }),
        }
    }
    for (span, result) in create_results {
        match result {
            Ok(created) => {
                let mut saved = span.clone();
                saved.bind_id(created.id);
                report.created.push(saved);
                report.milestones.extend(created.milestone);
            }
            Err(error) => report.failures.push(PersistenceOperationFailed {
                operation: FailedOperation::Create(span.clone()),
                error,
            }),
        }
    }

    if report.is_complete() {
        info!(
            "event=reconcile module=sync status=ok memo_id={document_id} deleted={} created={}",
            report.deleted.len(),
            report.created.len()
        );
    } else {
        warn!(
            "event=reconcile module=sync status=partial memo_id={document_id} deleted={} created={} failed={}",
            report.deleted.len(),
            report.created.len(),
            report.failures.len()
        );
    }
    report
}
