//! The two stacked layers of the editor surface.
//!
//! # Responsibility
//! - `InputLayer`: real editable text, selection and scroll position,
//!   painted with transparent glyphs and background so only its caret shows.
//! - `BackdropLayer`: off-screen rendering of composed segments as wrapped
//!   lines of colored runs.
//!
//! # Invariants
//! - Both layers build their `LayoutGrid` from the same text and metrics.
//! - The backdrop never scrolls on its own; it only mirrors the input layer.

use crate::engine::compositor::Segment;
use crate::engine::resolver::Selection;
use crate::model::category::Rgba;
use crate::model::span::{char_len, slice_chars, LocalKey};
use crate::surface::layout::{BoxMetrics, LayoutGrid};

/// Paint rules of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerStyle {
    pub glyph_color: Rgba,
    pub background: Rgba,
    /// `None` hides the caret.
    pub caret_color: Option<Rgba>,
    /// Whether the layer receives pointer input.
    pub interactive: bool,
}

impl LayerStyle {
    /// Input layer: invisible text, visible caret.
    pub const INPUT: LayerStyle = LayerStyle {
        glyph_color: Rgba::TRANSPARENT,
        background: Rgba::TRANSPARENT,
        caret_color: Some(Rgba::BLACK),
        interactive: true,
    };

    /// Backdrop layer: visible text, no caret, no pointer input.
    pub const BACKDROP: LayerStyle = LayerStyle {
        glyph_color: Rgba::BLACK,
        background: Rgba::new(0xFF, 0xFF, 0xFF, 0xFF),
        caret_color: None,
        interactive: false,
    };
}

/// Editable top layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayer {
    text: String,
    selection: Selection,
    scroll_top: u32,
    grid: LayoutGrid,
    read_only: bool,
}

impl InputLayer {
    pub fn new(text: impl Into<String>, metrics: BoxMetrics) -> Self {
        let text = text.into();
        Self {
            grid: LayoutGrid::new(&text, metrics),
            text,
            selection: Selection::default(),
            scroll_top: 0,
            read_only: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    pub fn grid(&self) -> &LayoutGrid {
        &self.grid
    }

    pub fn style(&self) -> LayerStyle {
        LayerStyle::INPUT
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Caret top-left in screen pixels.
    pub fn caret_px(&self) -> (i32, i32) {
        let (row, col) = self.grid.position_of(self.selection.end);
        let (x, y) = self.grid.cell_origin_px(row, col);
        let m = self.grid.metrics();
        let scroll = i32::try_from(self.scroll_top).unwrap_or(i32::MAX);
        (
            m.origin_x_px.saturating_add(x),
            m.origin_y_px.saturating_add(y).saturating_sub(scroll),
        )
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.grid = LayoutGrid::new(&text, self.grid.metrics());
        self.text = text;
        self.clamp_state();
    }

    /// Stores a selection clamped to the text; returns the stored value.
    pub(crate) fn set_selection(&mut self, selection: Selection) -> Selection {
        let len = char_len(&self.text);
        self.selection = Selection::new(selection.start.min(len), selection.end.min(len));
        self.selection
    }

    /// Scrolls within content bounds; returns the effective offset.
    pub(crate) fn scroll_to(&mut self, scroll_top: u32) -> u32 {
        self.scroll_top = scroll_top.min(self.grid.max_scroll_top());
        self.scroll_top
    }

    pub(crate) fn resize(&mut self, metrics: BoxMetrics) {
        self.grid = LayoutGrid::new(&self.text, metrics);
        self.clamp_state();
    }

    fn clamp_state(&mut self) {
        self.set_selection(self.selection);
        self.scroll_to(self.scroll_top);
    }
}

/// One colored run on a rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Highlight fill; transparent for plain text.
    pub fill: Rgba,
    /// Span owning this run, if annotated.
    pub local_key: Option<LocalKey>,
    /// Left edge in content coordinates.
    pub x_px: i32,
    pub width_px: u32,
}

/// One wrapped line of the backdrop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub start: usize,
    pub end: usize,
    /// Top edge in content coordinates.
    pub y_px: i32,
    pub runs: Vec<StyledRun>,
}

/// Read-only layer under the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackdropLayer {
    grid: LayoutGrid,
    lines: Vec<RenderedLine>,
    scroll_top: u32,
    annotations_visible: bool,
}

impl BackdropLayer {
    pub fn new(metrics: BoxMetrics) -> Self {
        Self {
            grid: LayoutGrid::new("", metrics),
            lines: Vec::new(),
            scroll_top: 0,
            annotations_visible: true,
        }
    }

    pub fn grid(&self) -> &LayoutGrid {
        &self.grid
    }

    pub fn lines(&self) -> &[RenderedLine] {
        &self.lines
    }

    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    pub fn style(&self) -> LayerStyle {
        LayerStyle::BACKDROP
    }

    pub fn annotations_visible(&self) -> bool {
        self.annotations_visible
    }

    /// Lines intersecting the viewport at the current scroll offset.
    pub fn visible_lines(&self) -> &[RenderedLine] {
        let m = self.grid.metrics();
        let top = i32::try_from(self.scroll_top).unwrap_or(i32::MAX);
        let bottom = top.saturating_add(i32::try_from(m.height_px).unwrap_or(i32::MAX));
        let line_height = i32::try_from(m.line_height_px).unwrap_or(i32::MAX);
        let first = self
            .lines
            .iter()
            .position(|line| line.y_px.saturating_add(line_height) > top)
            .unwrap_or(self.lines.len());
        let last = self
            .lines
            .iter()
            .rposition(|line| line.y_px < bottom)
            .map_or(first, |idx| idx + 1);
        &self.lines[first..last.max(first)]
    }

    /// Annotated run under a screen point.
    pub fn run_at(&self, x_px: i32, y_px: i32) -> Option<&StyledRun> {
        let offset = self.grid.offset_at(x_px, y_px, self.scroll_top)?;
        self.lines
            .iter()
            .flat_map(|line| line.runs.iter())
            .find(|run| run.start <= offset && offset < run.end)
    }

    /// Paints `segments` over the wrapped `text`.
    pub(crate) fn render(&mut self, text: &str, segments: &[Segment], annotations_visible: bool) {
        self.grid = LayoutGrid::new(text, self.grid.metrics());
        self.annotations_visible = annotations_visible;
        let cell_width = self.grid.metrics().cell_width_px;

        let mut lines = Vec::with_capacity(self.grid.lines().len());
        let mut seg_idx = 0;
        for (row, line) in self.grid.lines().iter().enumerate() {
            let (_, y_px) = self.grid.cell_origin_px(row, 0);
            let mut runs = Vec::new();
            while seg_idx < segments.len() && segments[seg_idx].range().end() <= line.start {
                seg_idx += 1;
            }
            let mut idx = seg_idx;
            while idx < segments.len() && segments[idx].range().start() < line.end {
                let segment = &segments[idx];
                let range = segment.range();
                let start = range.start().max(line.start);
                let end = range.end().min(line.end);
                let (x_px, _) = self.grid.cell_origin_px(row, start - line.start);
                let (fill, local_key) = match segment.category() {
                    Some(category) if annotations_visible => {
                        (category.display_color(), segment.local_key())
                    }
                    _ => (Rgba::TRANSPARENT, None),
                };
                runs.push(StyledRun {
                    start,
                    end,
                    text: slice_chars(segment.text(), start - range.start(), end - range.start())
                        .to_string(),
                    fill,
                    local_key,
                    x_px,
                    width_px: u32::try_from(end - start)
                        .unwrap_or(u32::MAX)
                        .saturating_mul(cell_width),
                });
                idx += 1;
            }
            lines.push(RenderedLine {
                start: line.start,
                end: line.end,
                y_px,
                runs,
            });
        }
        self.lines = lines;
        self.scroll_top = self.scroll_top.min(self.grid.max_scroll_top());
    }

    pub(crate) fn mirror_scroll(&mut self, scroll_top: u32) {
        self.scroll_top = scroll_top;
    }

    pub(crate) fn set_metrics(&mut self, metrics: BoxMetrics) {
        self.grid = LayoutGrid::new("", metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::{BackdropLayer, InputLayer, LayerStyle};
    use crate::engine::compositor::compose;
    use crate::engine::resolver::Selection;
    use crate::model::category::Category;
    use crate::model::span::Span;
    use crate::surface::layout::BoxMetrics;

    fn small_box() -> BoxMetrics {
        BoxMetrics {
            width_px: 64,
            height_px: 44,
            padding_px: 2,
            cell_width_px: 10,
            line_height_px: 20,
            ..BoxMetrics::default()
        }
    }

    #[test]
    fn input_layer_paints_only_the_caret() {
        let style = LayerStyle::INPUT;
        assert!(style.glyph_color.is_transparent());
        assert!(style.background.is_transparent());
        assert!(style.caret_color.is_some());
        assert!(!LayerStyle::BACKDROP.interactive);
    }

    #[test]
    fn input_layer_clamps_selection_and_scroll() {
        let mut input = InputLayer::new("abcdefghij", small_box());
        let stored = input.set_selection(Selection::new(3, 40));
        assert_eq!(stored, Selection::new(3, 10));
        // two lines of 20px + 4px padding fit in 44px; nothing to scroll
        assert_eq!(input.scroll_to(500), 0);
    }

    #[test]
    fn runs_split_across_wrapped_lines() {
        let text = "abcdefghij";
        let spans = vec![Span::local(Category::Idea, 4, 8, text).unwrap()];
        let segments = compose(text, &spans).unwrap();
        let mut backdrop = BackdropLayer::new(small_box());
        backdrop.render(text, &segments, true);

        let lines = backdrop.lines();
        assert_eq!(lines.len(), 2);
        let first: Vec<(usize, usize, bool)> = lines[0]
            .runs
            .iter()
            .map(|r| (r.start, r.end, r.local_key.is_some()))
            .collect();
        assert_eq!(first, vec![(0, 4, false), (4, 6, true)]);
        assert_eq!(lines[1].runs[0].text, "gh");
        assert_eq!(lines[1].runs[0].x_px, 2);
        assert_eq!(lines[1].runs[1].text, "ij");
        assert_eq!(lines[1].y_px, 22);
    }

    #[test]
    fn hidden_annotations_render_plain() {
        let text = "abcdef";
        let spans = vec![Span::local(Category::Problem, 0, 3, text).unwrap()];
        let segments = compose(text, &spans).unwrap();
        let mut backdrop = BackdropLayer::new(small_box());
        backdrop.render(text, &segments, false);
        assert!(backdrop
            .lines()
            .iter()
            .flat_map(|l| l.runs.iter())
            .all(|r| r.fill.is_transparent() && r.local_key.is_none()));
    }

    #[test]
    fn run_at_finds_annotated_run() {
        let text = "abcdefghij";
        let span = Span::local(Category::Solution, 6, 9, text).unwrap();
        let key = span.local_key;
        let segments = compose(text, &[span]).unwrap();
        let mut backdrop = BackdropLayer::new(small_box());
        backdrop.render(text, &segments, true);
        let run = backdrop.run_at(13, 25).unwrap();
        assert_eq!(run.local_key, Some(key));
        assert!(backdrop.run_at(3, 3).unwrap().local_key.is_none());
    }
}
