//! Editing session for one open daily note.
//!
//! # Responsibility
//! - Load a document, own its surface and baseline, and drive saves.
//! - Split a save into a synchronous plan, an async batch and a
//!   synchronous apply step so a closed session can ignore late results.
//!
//! # Invariants
//! - At most one save is in flight per session.
//! - Text is persisted before the tagging batch; a failed text update
//!   skips the batch.
//! - The working set is never reverted by a save result.

use crate::config::AnnotationConfig;
use crate::engine::resolver::{check_non_overlap, OverlapPolicyViolation, Selection};
use crate::model::category::Category;
use crate::model::document::{DocumentId, ProjectId};
use crate::model::span::{LocalKey, Span};
use crate::repo::tagging_store::{Milestone, StoreError, TaggingStore};
use crate::surface::layout::BoxMetrics;
use crate::surface::{
    EditorSurface, ModeSwitch, SelectionOutcome, SurfaceError, SurfaceMode, SurfaceSignal,
};
use crate::sync::differ::{diff, ReconcilePlan};
use crate::sync::executor::{
    execute, FailedOperation, PersistenceOperationFailed, ReconcileReport, SaveOutcome,
};
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Identity of one open session.
pub type SessionId = Uuid;

#[derive(Debug)]
pub enum SessionError {
    Store(StoreError),
    Surface(SurfaceError),
    /// Persisted spans of the loaded document overlap.
    Overlap(OverlapPolicyViolation),
    SaveInFlight,
    /// Report does not belong to the save this session is waiting for.
    StaleReport,
    /// Spans were drawn on a previous text; discard them before saving.
    StaleSpans { spans_at_risk: usize },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Surface(err) => write!(f, "{err}"),
            Self::Overlap(err) => write!(f, "stored taggings are invalid: {err}"),
            Self::SaveInFlight => write!(f, "a save is already in flight"),
            Self::StaleReport => write!(f, "save report does not match the pending save"),
            Self::StaleSpans { spans_at_risk } => write!(
                f,
                "{spans_at_risk} spans were drawn on a previous text and must be discarded first"
            ),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Surface(err) => Some(err),
            Self::Overlap(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SurfaceError> for SessionError {
    fn from(value: SurfaceError) -> Self {
        Self::Surface(value)
    }
}

/// Proof that the issuing session was still open.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    session_id: SessionId,
    save_seq: u64,
    liveness: Weak<()>,
}

impl SaveTicket {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether the issuing session has not been dropped.
    pub fn is_live(&self) -> bool {
        self.liveness.strong_count() > 0
    }
}

/// Everything one save sends, captured synchronously.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub ticket: SaveTicket,
    pub document_id: DocumentId,
    /// New text, when it differs from the last saved text.
    pub text_update: Option<String>,
    pub reconcile: ReconcilePlan,
}

/// Raw results of one executed `SavePlan`.
#[derive(Debug)]
pub struct SaveReport {
    pub ticket: SaveTicket,
    /// Text that was persisted, if any.
    pub saved_text: Option<String>,
    pub reconcile: ReconcileReport,
}

/// What a finished save means for the caller.
#[derive(Debug)]
pub struct SaveSummary {
    pub outcome: SaveOutcome,
    pub created: usize,
    pub deleted: usize,
    pub milestones: Vec<Milestone>,
}

/// Runs a save plan against `store`.
///
/// Always runs to completion; whether the results are used is decided by
/// `EditingSession::finish_save` or `SessionRegistry::deliver`.
pub async fn execute_save<S: TaggingStore>(store: &S, plan: SavePlan) -> SaveReport {
    let SavePlan {
        ticket,
        document_id,
        text_update,
        reconcile,
    } = plan;

    let mut saved_text = None;
    if let Some(text) = text_update {
        if let Err(error) = store.update_document_text(document_id, &text).await {
            warn!(
                "event=save_text module=session status=error memo_id={document_id} error={error}"
            );
            let mut reconcile = ReconcileReport::default();
            reconcile.failures.push(PersistenceOperationFailed {
                operation: FailedOperation::UpdateText,
                error,
            });
            return SaveReport {
                ticket,
                saved_text: None,
                reconcile,
            };
        }
        saved_text = Some(text);
    }

    let reconcile = execute(store, document_id, &reconcile).await;
    SaveReport {
        ticket,
        saved_text,
        reconcile,
    }
}

/// One open document: surface, baseline and save bookkeeping.
#[derive(Debug)]
pub struct EditingSession {
    id: SessionId,
    document_id: DocumentId,
    project_id: ProjectId,
    date: String,
    surface: EditorSurface,
    baseline: Vec<Span>,
    saved_text: String,
    liveness: Rc<()>,
    save_seq: u64,
    save_in_flight: bool,
}

impl EditingSession {
    /// Loads `document_id` and opens it in `EditTags` mode.
    ///
    /// # Errors
    /// - `Store` when loading fails or stored offsets do not fit the text.
    /// - `Overlap` when stored spans intersect.
    pub async fn open<S: TaggingStore>(
        store: &S,
        document_id: DocumentId,
        config: &AnnotationConfig,
    ) -> Result<Self, SessionError> {
        let document = store.load_document(document_id).await?.into_document()?;
        check_non_overlap(&document.spans).map_err(SessionError::Overlap)?;

        let surface = EditorSurface::new(
            document.text.clone(),
            document.spans.clone(),
            config.surface,
            config.confirm_destructive_mode_switch,
        )?;
        let session = Self {
            id: Uuid::new_v4(),
            document_id: document.id,
            project_id: document.project_id,
            date: document.date,
            surface,
            baseline: document.spans,
            saved_text: document.text,
            liveness: Rc::new(()),
            save_seq: 0,
            save_in_flight: false,
        };
        info!(
            "event=session_open module=session status=ok memo_id={} spans={}",
            session.document_id,
            session.baseline.len()
        );
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn surface(&self) -> &EditorSurface {
        &self.surface
    }

    pub fn text(&self) -> &str {
        self.surface.text()
    }

    pub fn spans(&self) -> &[Span] {
        self.surface.spans()
    }

    pub fn baseline(&self) -> &[Span] {
        &self.baseline
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    /// Whether a save would send anything.
    pub fn is_dirty(&self) -> bool {
        self.surface.text() != self.saved_text
            || !diff(&self.baseline, self.surface.spans()).is_empty()
    }

    /// Selection gesture; draws a span in `EditTags` mode.
    ///
    /// The caller disarms its active category afterwards if it wants
    /// one-shot tagging.
    pub fn select(
        &mut self,
        start: usize,
        end: usize,
        active_category: Option<Category>,
    ) -> Result<SelectionOutcome, SessionError> {
        Ok(self
            .surface
            .select(Selection::new(start, end), active_category)?)
    }

    pub fn remove_span(&mut self, local_key: LocalKey) -> Result<Option<Span>, SessionError> {
        Ok(self.surface.remove_span(local_key)?)
    }

    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<SurfaceSignal, SessionError> {
        Ok(self.surface.input_text(text)?)
    }

    pub fn scroll(&mut self, scroll_top: u32) -> SurfaceSignal {
        self.surface.scroll(scroll_top)
    }

    pub fn resize(&mut self, metrics: BoxMetrics) -> Result<(), SessionError> {
        Ok(self.surface.resize(metrics)?)
    }

    /// Click on the backdrop; removes the span under the point, if any.
    pub fn click_backdrop(&mut self, x_px: i32, y_px: i32) -> Result<Option<Span>, SessionError> {
        match self.surface.click_backdrop(x_px, y_px) {
            Some(SurfaceSignal::RemoveSpanRequested(local_key)) => self.remove_span(local_key),
            _ => Ok(None),
        }
    }

    pub fn request_mode(&mut self, mode: SurfaceMode) -> Result<ModeSwitch, SessionError> {
        Ok(self.surface.request_mode(mode)?)
    }

    pub fn confirm_discard_spans(&mut self) -> Result<ModeSwitch, SessionError> {
        Ok(self.surface.confirm_discard_spans()?)
    }

    pub fn cancel_mode_switch(&mut self) {
        self.surface.cancel_mode_switch();
    }

    /// Drops spans drawn on a previous text; call after user confirmation.
    pub fn discard_stale_spans(&mut self) -> Result<usize, SessionError> {
        Ok(self.surface.discard_stale_spans()?)
    }

    /// Captures the next save.
    ///
    /// # Errors
    /// - `SaveInFlight` while a previous save is unfinished.
    /// - `StaleSpans` when the text changed under existing spans and the
    ///   surface asks for confirmation before dropping them.
    pub fn begin_save(&mut self) -> Result<SavePlan, SessionError> {
        if self.save_in_flight {
            return Err(SessionError::SaveInFlight);
        }
        if self.surface.text_changed_since_tagging() && !self.surface.spans().is_empty() {
            if self.surface.confirms_destructive() {
                return Err(SessionError::StaleSpans {
                    spans_at_risk: self.surface.spans().len(),
                });
            }
            self.surface.discard_stale_spans()?;
        }

        let text_update =
            (self.surface.text() != self.saved_text).then(|| self.surface.text().to_string());
        let reconcile = diff(&self.baseline, self.surface.spans());
        self.save_seq += 1;
        self.save_in_flight = true;
        info!(
            "event=save module=session status=start memo_id={} text_changed={} operations={}",
            self.document_id,
            text_update.is_some(),
            reconcile.operation_count()
        );
        Ok(SavePlan {
            ticket: SaveTicket {
                session_id: self.id,
                save_seq: self.save_seq,
                liveness: Rc::downgrade(&self.liveness),
            },
            document_id: self.document_id,
            text_update,
            reconcile,
        })
    }

    /// Applies a finished save to the baseline and working set.
    ///
    /// # Errors
    /// - `StaleReport` when `report` was not issued by the pending save.
    pub fn finish_save(&mut self, report: SaveReport) -> Result<SaveSummary, SessionError> {
        if !self.save_in_flight
            || report.ticket.session_id != self.id
            || report.ticket.save_seq != self.save_seq
        {
            return Err(SessionError::StaleReport);
        }
        self.save_in_flight = false;

        let SaveReport {
            saved_text,
            reconcile,
            ..
        } = report;
        if let Some(text) = saved_text {
            self.saved_text = text;
        }
        self.baseline = reconcile.next_baseline(&self.baseline);
        for (local_key, id) in reconcile.id_bindings() {
            self.surface.bind_span_id(local_key, id);
        }

        let created = reconcile.created.len();
        let deleted = reconcile.deleted.len();
        let milestones = reconcile.milestones.clone();
        let outcome = reconcile.outcome();
        match &outcome {
            SaveOutcome::Complete => info!(
                "event=save module=session status=ok memo_id={} created={created} deleted={deleted}",
                self.document_id
            ),
            SaveOutcome::Partial { failures } => warn!(
                "event=save module=session status=partial memo_id={} created={created} deleted={deleted} failed={}",
                self.document_id,
                failures.len()
            ),
        }
        Ok(SaveSummary {
            outcome,
            created,
            deleted,
            milestones,
        })
    }
}

/// Open sessions keyed by id.
///
/// Closing a session drops it, which invalidates every ticket it issued.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, EditingSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: EditingSession) -> SessionId {
        let id = session.id();
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&EditingSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut EditingSession> {
        self.sessions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Closes a session; returns whether it was open.
    pub fn close(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(session) => {
                if session.is_save_in_flight() {
                    info!(
                        "event=session_close module=session status=ok memo_id={} pending_save=true",
                        session.document_id()
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Routes a report to its session.
    ///
    /// Returns `Ok(None)` when the session was closed meanwhile; the
    /// report is discarded.
    pub fn deliver(&mut self, report: SaveReport) -> Result<Option<SaveSummary>, SessionError> {
        let session_id = report.ticket.session_id();
        let session = match self.sessions.get_mut(&session_id) {
            Some(session) if report.ticket.is_live() => session,
            _ => {
                info!(
                    "event=save_discarded module=session status=ok session_id={session_id} created={} deleted={}",
                    report.reconcile.created.len(),
                    report.reconcile.deleted.len()
                );
                return Ok(None);
            }
        };
        session.finish_save(report).map(Some)
    }
}
