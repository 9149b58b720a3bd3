//! Dual-layer editor surface.
//!
//! # Responsibility
//! - Keep a transparent editable input layer and a colored backdrop layer
//!   geometrically identical (metrics, wrapping, scroll offset).
//! - Gate typing and span drawing behind two exclusive modes.
//! - Own the working span set and clear it when the text has changed
//!   under it.
//!
//! # Invariants
//! - Every input scroll is mirrored to the backdrop; see `layers_aligned`.
//! - In `EditTags` mode the text never changes.
//! - Annotations are painted only while the text still equals the text
//!   the spans were drawn on.

pub mod layers;
pub mod layout;

use crate::engine::compositor::{compose, ComposeError};
use crate::engine::resolver::{propose_span, Proposal, Selection};
use crate::model::category::Category;
use crate::model::span::{char_len, InvalidRangeError, LocalKey, Span, SpanId};
use layers::{BackdropLayer, InputLayer};
use layout::BoxMetrics;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Exclusive interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Typing accepted; backdrop passive.
    EditText,
    /// Typing suppressed; selections draw spans.
    EditTags,
}

/// Result of a mode change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    /// Already in the requested mode.
    Unchanged,
    /// Mode changed; `cleared` spans were dropped on the way.
    Switched { cleared: usize },
    /// Entering `EditTags` would drop spans; call `confirm_discard_spans`.
    ConfirmationRequired { spans_at_risk: usize },
}

/// Notifications forwarded to the owner of the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSignal {
    TextChanged { len: usize },
    SelectionChanged(Selection),
    ScrollChanged { scroll_top: u32 },
    /// Click on an annotated backdrop run.
    RemoveSpanRequested(LocalKey),
}

/// Outcome of a selection gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub signal: SurfaceSignal,
    /// `None` outside `EditTags` mode.
    pub proposal: Option<Proposal>,
}

/// Surface errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Text input arrived while in `EditTags` mode.
    TypingSuppressed,
    /// `confirm_discard_spans` without a pending switch.
    NoPendingSwitch,
    InvalidMetrics(String),
    InvalidRange(InvalidRangeError),
    Compose(ComposeError),
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypingSuppressed => write!(f, "text input is suppressed in tag mode"),
            Self::NoPendingSwitch => write!(f, "no mode switch awaits confirmation"),
            Self::InvalidMetrics(reason) => write!(f, "invalid surface metrics: {reason}"),
            Self::InvalidRange(err) => write!(f, "{err}"),
            Self::Compose(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SurfaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRange(err) => Some(err),
            Self::Compose(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidRangeError> for SurfaceError {
    fn from(value: InvalidRangeError) -> Self {
        Self::InvalidRange(value)
    }
}

impl From<ComposeError> for SurfaceError {
    fn from(value: ComposeError) -> Self {
        Self::Compose(value)
    }
}

/// Input layer stacked over the backdrop, plus the working span set.
#[derive(Debug, Clone)]
pub struct EditorSurface {
    mode: SurfaceMode,
    input: InputLayer,
    backdrop: BackdropLayer,
    spans: Vec<Span>,
    /// Text the current spans were drawn on.
    tagged_text: String,
    pending_tag_mode: bool,
    confirm_destructive: bool,
}

impl EditorSurface {
    /// Opens a surface in `EditTags` mode over `text` and its spans.
    ///
    /// # Errors
    /// - `InvalidMetrics` when `metrics` has no usable content box.
    /// - `Compose` when `spans` do not fit `text` or overlap.
    pub fn new(
        text: impl Into<String>,
        spans: Vec<Span>,
        metrics: BoxMetrics,
        confirm_destructive: bool,
    ) -> Result<Self, SurfaceError> {
        metrics.validate().map_err(SurfaceError::InvalidMetrics)?;
        let text = text.into();
        let mut input = InputLayer::new(text.clone(), metrics);
        input.set_read_only(true);
        let mut surface = Self {
            mode: SurfaceMode::EditTags,
            input,
            backdrop: BackdropLayer::new(metrics),
            spans,
            tagged_text: text,
            pending_tag_mode: false,
            confirm_destructive,
        };
        surface.repaint()?;
        Ok(surface)
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn text(&self) -> &str {
        self.input.text()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn input(&self) -> &InputLayer {
        &self.input
    }

    pub fn backdrop(&self) -> &BackdropLayer {
        &self.backdrop
    }

    /// Whether the text differs from the text the spans were drawn on.
    pub fn text_changed_since_tagging(&self) -> bool {
        self.input.text() != self.tagged_text
    }

    pub fn is_switch_pending(&self) -> bool {
        self.pending_tag_mode
    }

    /// Replaces the text. Only accepted in `EditText` mode.
    ///
    /// # Errors
    /// - `TypingSuppressed` in `EditTags` mode.
    pub fn input_text(&mut self, text: impl Into<String>) -> Result<SurfaceSignal, SurfaceError> {
        if self.mode == SurfaceMode::EditTags {
            return Err(SurfaceError::TypingSuppressed);
        }
        self.input.set_text(text.into());
        self.repaint()?;
        Ok(SurfaceSignal::TextChanged {
            len: char_len(self.input.text()),
        })
    }

    /// Records a selection; in `EditTags` mode it also proposes a span.
    ///
    /// A collapsed selection never proposes anything.
    ///
    /// # Errors
    /// - `InvalidRange` when the selection exceeds the text.
    pub fn select(
        &mut self,
        selection: Selection,
        active_category: Option<Category>,
    ) -> Result<SelectionOutcome, SurfaceError> {
        let proposal = if self.mode == SurfaceMode::EditTags {
            let proposal = propose_span(&self.spans, self.input.text(), selection, active_category)?;
            if let Proposal::Applied(resolution) = &proposal {
                self.spans = resolution.spans.clone();
                self.repaint()?;
            }
            Some(proposal)
        } else {
            None
        };
        let stored = self.input.set_selection(selection);
        Ok(SelectionOutcome {
            signal: SurfaceSignal::SelectionChanged(stored),
            proposal,
        })
    }

    /// Scrolls the input layer and mirrors the offset onto the backdrop.
    pub fn scroll(&mut self, scroll_top: u32) -> SurfaceSignal {
        let effective = self.input.scroll_to(scroll_top);
        self.backdrop.mirror_scroll(effective);
        SurfaceSignal::ScrollChanged {
            scroll_top: effective,
        }
    }

    /// Applies new metrics to both layers.
    ///
    /// # Errors
    /// - `InvalidMetrics` when `metrics` has no usable content box.
    pub fn resize(&mut self, metrics: BoxMetrics) -> Result<(), SurfaceError> {
        metrics.validate().map_err(SurfaceError::InvalidMetrics)?;
        self.input.resize(metrics);
        self.backdrop.set_metrics(metrics);
        self.repaint()?;
        self.backdrop.mirror_scroll(self.input.scroll_top());
        Ok(())
    }

    /// Click on the backdrop; annotated runs request their removal.
    pub fn click_backdrop(&self, x_px: i32, y_px: i32) -> Option<SurfaceSignal> {
        if self.mode != SurfaceMode::EditTags {
            return None;
        }
        let run = self.backdrop.run_at(x_px, y_px)?;
        run.local_key.map(SurfaceSignal::RemoveSpanRequested)
    }

    /// Removes one span from the working set.
    pub fn remove_span(&mut self, local_key: LocalKey) -> Result<Option<Span>, SurfaceError> {
        let Some(idx) = self.spans.iter().position(|s| s.local_key == local_key) else {
            return Ok(None);
        };
        let removed = self.spans.remove(idx);
        self.repaint()?;
        Ok(Some(removed))
    }

    /// Requests a mode change.
    ///
    /// Leaving `EditTags` is always allowed. Entering it after a text
    /// change drops every span, after confirmation when configured.
    pub fn request_mode(&mut self, mode: SurfaceMode) -> Result<ModeSwitch, SurfaceError> {
        if mode == self.mode {
            return Ok(ModeSwitch::Unchanged);
        }
        match mode {
            SurfaceMode::EditText => {
                self.mode = SurfaceMode::EditText;
                self.input.set_read_only(false);
                debug!("event=surface_mode module=surface status=ok mode=edit_text");
                Ok(ModeSwitch::Switched { cleared: 0 })
            }
            SurfaceMode::EditTags => {
                if self.confirm_destructive
                    && self.text_changed_since_tagging()
                    && !self.spans.is_empty()
                {
                    self.pending_tag_mode = true;
                    return Ok(ModeSwitch::ConfirmationRequired {
                        spans_at_risk: self.spans.len(),
                    });
                }
                self.enter_tag_mode()
            }
        }
    }

    /// Completes a pending switch into `EditTags`, dropping all spans.
    ///
    /// # Errors
    /// - `NoPendingSwitch` when nothing awaits confirmation.
    pub fn confirm_discard_spans(&mut self) -> Result<ModeSwitch, SurfaceError> {
        if !self.pending_tag_mode {
            return Err(SurfaceError::NoPendingSwitch);
        }
        self.enter_tag_mode()
    }

    /// Abandons a pending switch; the surface stays in `EditText`.
    pub fn cancel_mode_switch(&mut self) {
        self.pending_tag_mode = false;
    }

    pub fn confirms_destructive(&self) -> bool {
        self.confirm_destructive
    }

    /// Drops spans drawn on a previous text without leaving the mode.
    ///
    /// Returns how many spans were dropped.
    pub fn discard_stale_spans(&mut self) -> Result<usize, SurfaceError> {
        if !self.text_changed_since_tagging() {
            return Ok(0);
        }
        let cleared = self.spans.len();
        self.spans.clear();
        self.tagged_text = self.input.text().to_string();
        self.pending_tag_mode = false;
        self.repaint()?;
        if cleared > 0 {
            info!("event=spans_cleared module=surface status=ok cleared={cleared}");
        }
        Ok(cleared)
    }

    /// Binds a server id to a working span; returns whether it was found.
    pub(crate) fn bind_span_id(&mut self, local_key: LocalKey, id: SpanId) -> bool {
        match self.spans.iter_mut().find(|s| s.local_key == local_key) {
            Some(span) => {
                span.bind_id(id);
                true
            }
            None => false,
        }
    }

    /// Verifies the layers share metrics, line breaks and scroll offset.
    pub fn layers_aligned(&self) -> bool {
        let input_grid = self.input.grid();
        let backdrop_grid = self.backdrop.grid();
        input_grid.metrics() == backdrop_grid.metrics()
            && input_grid.lines() == backdrop_grid.lines()
            && self.input.scroll_top() == self.backdrop.scroll_top()
    }

    fn enter_tag_mode(&mut self) -> Result<ModeSwitch, SurfaceError> {
        let cleared = self.discard_stale_spans()?;
        self.mode = SurfaceMode::EditTags;
        self.input.set_read_only(true);
        self.repaint()?;
        Ok(ModeSwitch::Switched { cleared })
    }

    fn repaint(&mut self) -> Result<(), SurfaceError> {
        let text = self.input.text();
        let visible = !self.text_changed_since_tagging();
        let segments = if visible {
            compose(text, &self.spans)?
        } else {
            compose(text, &[])?
        };
        self.backdrop.render(text, &segments, visible);
        self.backdrop.mirror_scroll(self.input.scroll_top());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EditorSurface, ModeSwitch, SurfaceError, SurfaceMode, SurfaceSignal};
    use crate::engine::resolver::{Proposal, Selection};
    use crate::model::category::Category;
    use crate::model::span::Span;
    use crate::surface::layout::BoxMetrics;

    fn narrow_box() -> BoxMetrics {
        BoxMetrics {
            width_px: 64,
            height_px: 44,
            padding_px: 2,
            cell_width_px: 10,
            line_height_px: 20,
            ..BoxMetrics::default()
        }
    }

    fn surface(text: &str, confirm: bool) -> EditorSurface {
        EditorSurface::new(text, Vec::new(), narrow_box(), confirm).unwrap()
    }

    #[test]
    fn typing_is_suppressed_in_tag_mode() {
        let mut surface = surface("abc", true);
        assert_eq!(surface.input_text("abcd"), Err(SurfaceError::TypingSuppressed));
        assert!(surface.input().is_read_only());
    }

    #[test]
    fn selection_in_tag_mode_draws_span() {
        let mut surface = surface("found a bug", true);
        let outcome = surface
            .select(Selection::new(8, 11), Some(Category::Problem))
            .unwrap();
        assert!(matches!(outcome.proposal, Some(Proposal::Applied(_))));
        assert_eq!(surface.spans().len(), 1);
        assert_eq!(surface.spans()[0].text, "bug");
    }

    #[test]
    fn plain_click_never_creates_span() {
        let mut surface = surface("found a bug", true);
        let outcome = surface
            .select(Selection::new(4, 4), Some(Category::Idea))
            .unwrap();
        assert!(matches!(outcome.proposal, Some(Proposal::Skipped(_))));
        assert!(surface.spans().is_empty());
    }

    #[test]
    fn selection_in_text_mode_only_forwards() {
        let mut surface = surface("found a bug", true);
        surface.request_mode(SurfaceMode::EditText).unwrap();
        let outcome = surface
            .select(Selection::new(0, 5), Some(Category::Idea))
            .unwrap();
        assert_eq!(outcome.proposal, None);
        assert_eq!(
            outcome.signal,
            SurfaceSignal::SelectionChanged(Selection::new(0, 5))
        );
        assert!(surface.spans().is_empty());
    }

    #[test]
    fn scroll_is_mirrored_on_every_event() {
        let text = "line one\nline two\nline three\nline four\nline five";
        let mut surface = surface(text, true);
        for offset in [7, 13, 0, 29, 1000] {
            let signal = surface.scroll(offset);
            let SurfaceSignal::ScrollChanged { scroll_top } = signal else {
                panic!("expected scroll signal");
            };
            assert_eq!(surface.backdrop().scroll_top(), scroll_top);
            assert!(surface.layers_aligned());
        }
        assert_eq!(
            surface.input().scroll_top(),
            surface.input().grid().max_scroll_top()
        );
    }

    #[test]
    fn resize_rewraps_both_layers_identically() {
        let mut surface = surface("the quick brown fox jumps", true);
        let before = surface.input().grid().lines().len();
        surface
            .resize(BoxMetrics {
                width_px: 204,
                ..narrow_box()
            })
            .unwrap();
        assert!(surface.input().grid().lines().len() < before);
        assert!(surface.layers_aligned());
    }

    #[test]
    fn returning_to_tags_after_edit_requires_confirmation() {
        let text = "found a bug";
        let spans = vec![Span::local(Category::Problem, 8, 11, text).unwrap()];
        let mut surface = EditorSurface::new(text, spans, narrow_box(), true).unwrap();

        assert_eq!(
            surface.request_mode(SurfaceMode::EditText).unwrap(),
            ModeSwitch::Switched { cleared: 0 }
        );
        surface.input_text("found two bugs").unwrap();
        assert!(!surface.backdrop().annotations_visible());

        assert_eq!(
            surface.request_mode(SurfaceMode::EditTags).unwrap(),
            ModeSwitch::ConfirmationRequired { spans_at_risk: 1 }
        );
        assert_eq!(surface.mode(), SurfaceMode::EditText);
        assert_eq!(surface.spans().len(), 1);

        assert_eq!(
            surface.confirm_discard_spans().unwrap(),
            ModeSwitch::Switched { cleared: 1 }
        );
        assert_eq!(surface.mode(), SurfaceMode::EditTags);
        assert!(surface.spans().is_empty());
        assert!(surface.backdrop().annotations_visible());
    }

    #[test]
    fn cancelled_switch_keeps_spans() {
        let text = "found a bug";
        let spans = vec![Span::local(Category::Problem, 8, 11, text).unwrap()];
        let mut surface = EditorSurface::new(text, spans, narrow_box(), true).unwrap();
        surface.request_mode(SurfaceMode::EditText).unwrap();
        surface.input_text("found a bug!").unwrap();
        surface.request_mode(SurfaceMode::EditTags).unwrap();
        surface.cancel_mode_switch();
        assert_eq!(
            surface.confirm_discard_spans(),
            Err(SurfaceError::NoPendingSwitch)
        );
        assert_eq!(surface.spans().len(), 1);
    }

    #[test]
    fn unchanged_text_keeps_spans_across_modes() {
        let text = "found a bug";
        let spans = vec![Span::local(Category::Problem, 8, 11, text).unwrap()];
        let mut surface = EditorSurface::new(text, spans, narrow_box(), true).unwrap();
        surface.request_mode(SurfaceMode::EditText).unwrap();
        surface.input_text("found a bugX").unwrap();
        surface.input_text("found a bug").unwrap();
        assert_eq!(
            surface.request_mode(SurfaceMode::EditTags).unwrap(),
            ModeSwitch::Switched { cleared: 0 }
        );
        assert_eq!(surface.spans().len(), 1);
    }

    #[test]
    fn unconfirmed_policy_clears_immediately() {
        let text = "found a bug";
        let spans = vec![Span::local(Category::Idea, 0, 5, text).unwrap()];
        let mut surface = EditorSurface::new(text, spans, narrow_box(), false).unwrap();
        surface.request_mode(SurfaceMode::EditText).unwrap();
        surface.input_text("lost a bug").unwrap();
        assert_eq!(
            surface.request_mode(SurfaceMode::EditTags).unwrap(),
            ModeSwitch::Switched { cleared: 1 }
        );
    }

    #[test]
    fn backdrop_click_requests_span_removal() {
        let text = "abcdefghij";
        let span = Span::local(Category::Solution, 6, 9, text).unwrap();
        let key = span.local_key;
        let mut surface = EditorSurface::new(text, vec![span], narrow_box(), true).unwrap();
        assert_eq!(
            surface.click_backdrop(13, 25),
            Some(SurfaceSignal::RemoveSpanRequested(key))
        );
        assert_eq!(surface.click_backdrop(3, 3), None);
        let removed = surface.remove_span(key).unwrap().unwrap();
        assert_eq!(removed.local_key, key);
        assert!(surface.spans().is_empty());
    }

    #[test]
    fn caret_and_backdrop_cells_share_geometry() {
        let text = "abcdefghij";
        let span = Span::local(Category::Idea, 7, 9, text).unwrap();
        let mut surface = EditorSurface::new(text, vec![span], narrow_box(), true).unwrap();
        surface.select(Selection::new(7, 7), None).unwrap();
        let (caret_x, caret_y) = surface.input().caret_px();
        let line = &surface.backdrop().lines()[1];
        let run = line.runs.iter().find(|r| r.start == 7).unwrap();
        assert_eq!(caret_x, run.x_px);
        assert_eq!(caret_y, line.y_px);
    }
}
