//! Shared box geometry and line wrapping for both editor layers.
//!
//! # Invariants
//! - Both layers wrap through `wrap_lines` with the same `BoxMetrics`, so
//!   a character lands on the same row and column in each layer.
//! - Geometry is integral pixels; there is no sub-pixel positioning.

use serde::{Deserialize, Serialize};

/// Box shared by the input and backdrop layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxMetrics {
    pub origin_x_px: i32,
    pub origin_y_px: i32,
    pub width_px: u32,
    pub height_px: u32,
    pub padding_px: u32,
    /// Advance width of one character cell.
    pub cell_width_px: u32,
    pub line_height_px: u32,
}

/// Upper bound for every pixel dimension; keeps hit-testing inside `i32`.
pub const MAX_DIMENSION_PX: u32 = 1 << 20;

impl Default for BoxMetrics {
    fn default() -> Self {
        // 335x200 box, 12px padding, 18px font at 1.5 line height.
        Self {
            origin_x_px: 0,
            origin_y_px: 0,
            width_px: 335,
            height_px: 200,
            padding_px: 12,
            cell_width_px: 10,
            line_height_px: 27,
        }
    }
}

impl BoxMetrics {
    /// Checks that the content box is non-empty.
    ///
    /// # Errors
    /// - Returns a human-readable reason when a dimension is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.cell_width_px == 0 {
            return Err("cell_width_px must be positive".to_string());
        }
        if self.line_height_px == 0 {
            return Err("line_height_px must be positive".to_string());
        }
        for (name, value) in [
            ("width_px", self.width_px),
            ("height_px", self.height_px),
            ("padding_px", self.padding_px),
            ("cell_width_px", self.cell_width_px),
            ("line_height_px", self.line_height_px),
        ] {
            if value > MAX_DIMENSION_PX {
                return Err(format!("{name} {value} exceeds {MAX_DIMENSION_PX}"));
            }
        }
        if self.inner_width() == 0 {
            return Err(format!(
                "width_px {} leaves no room inside padding {}",
                self.width_px, self.padding_px
            ));
        }
        if self.inner_height() == 0 {
            return Err(format!(
                "height_px {} leaves no room inside padding {}",
                self.height_px, self.padding_px
            ));
        }
        Ok(())
    }

    /// Characters per wrapped line.
    pub fn columns(&self) -> usize {
        (self.inner_width() / self.cell_width_px.max(1)).max(1) as usize
    }

    /// Rows fully visible without scrolling.
    pub fn visible_rows(&self) -> usize {
        (self.inner_height() / self.line_height_px.max(1)).max(1) as usize
    }

    fn inner_width(&self) -> u32 {
        self.width_px
            .saturating_sub(self.padding_px.saturating_mul(2))
    }

    fn inner_height(&self) -> u32 {
        self.height_px
            .saturating_sub(self.padding_px.saturating_mul(2))
    }
}

/// One wrapped line as a character range; newlines are not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Wraps `text` the way a `pre-wrap` text box does.
///
/// Hard newlines always break. Long lines break after the last whitespace
/// that fits, or mid-word when there is none. Empty text yields one empty line.
pub fn wrap_lines(text: &str, columns: usize) -> Vec<LineSpan> {
    let columns = columns.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    let mut paragraph_start = 0;
    for idx in 0..=chars.len() {
        if idx == chars.len() || chars[idx] == '\n' {
            wrap_paragraph(&chars, paragraph_start, idx, columns, &mut lines);
            paragraph_start = idx + 1;
        }
    }
    lines
}

fn wrap_paragraph(
    chars: &[char],
    start: usize,
    end: usize,
    columns: usize,
    lines: &mut Vec<LineSpan>,
) {
    let mut line_start = start;
    loop {
        if end - line_start <= columns {
            lines.push(LineSpan {
                start: line_start,
                end,
            });
            return;
        }
        let limit = line_start + columns;
        let break_at = (line_start + 1..=limit)
            .rev()
            .find(|&idx| chars[idx - 1].is_whitespace())
            .unwrap_or(limit);
        lines.push(LineSpan {
            start: line_start,
            end: break_at,
        });
        line_start = break_at;
    }
}

/// Wrapped text positioned inside a `BoxMetrics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutGrid {
    metrics: BoxMetrics,
    lines: Vec<LineSpan>,
}

impl LayoutGrid {
    pub fn new(text: &str, metrics: BoxMetrics) -> Self {
        Self {
            lines: wrap_lines(text, metrics.columns()),
            metrics,
        }
    }

    pub fn metrics(&self) -> BoxMetrics {
        self.metrics
    }

    pub fn lines(&self) -> &[LineSpan] {
        &self.lines
    }

    /// Full content height including padding.
    pub fn content_height_px(&self) -> u32 {
        let rows = u32::try_from(self.lines.len()).unwrap_or(u32::MAX);
        rows.saturating_mul(self.metrics.line_height_px)
            .saturating_add(self.metrics.padding_px.saturating_mul(2))
    }

    pub fn max_scroll_top(&self) -> u32 {
        self.content_height_px()
            .saturating_sub(self.metrics.height_px)
    }

    /// Row and column of a character offset. Offsets on a soft wrap
    /// boundary belong to the following line.
    pub fn position_of(&self, offset: usize) -> (usize, usize) {
        let row = self
            .lines
            .iter()
            .rposition(|line| line.start <= offset)
            .unwrap_or(0);
        let line = self.lines[row];
        (row, offset.saturating_sub(line.start).min(line.len()))
    }

    /// Top-left pixel of the cell at `(row, col)` in content coordinates.
    pub fn cell_origin_px(&self, row: usize, col: usize) -> (i32, i32) {
        let m = self.metrics;
        let along = |cells: usize, step: u32| {
            let cells = i64::try_from(cells).unwrap_or(i64::MAX);
            let px = i64::from(m.padding_px).saturating_add(cells.saturating_mul(i64::from(step)));
            i32::try_from(px).unwrap_or(i32::MAX)
        };
        (along(col, m.cell_width_px), along(row, m.line_height_px))
    }

    /// Character offset under a screen point, or `None` outside any glyph.
    pub fn offset_at(&self, x_px: i32, y_px: i32, scroll_top: u32) -> Option<usize> {
        let m = self.metrics;
        let local_x = i64::from(x_px) - i64::from(m.origin_x_px) - i64::from(m.padding_px);
        let local_y = i64::from(y_px) - i64::from(m.origin_y_px) + i64::from(scroll_top)
            - i64::from(m.padding_px);
        if local_x < 0 || local_y < 0 {
            return None;
        }
        let row = usize::try_from(local_y / i64::from(m.line_height_px.max(1))).ok()?;
        let col = usize::try_from(local_x / i64::from(m.cell_width_px.max(1))).ok()?;
        let line = self.lines.get(row)?;
        if col >= line.len() {
            return None;
        }
        Some(line.start + col)
    }
}
