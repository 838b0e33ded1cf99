//! Character grid that a frame is composed into before it reaches the
//! terminal.
//!
//! Cells are stored row-major (`index = y * width + x`). Every write is
//! clipped to the canvas and, for the `*_in` helpers, to a target [`Rect`],
//! so panel renderers can never draw outside their own rectangle.

#![allow(missing_docs)]

use crate::tui::layout::Rect;
use crate::tui::theme::Tone;

/// One terminal cell: a single-width glyph and its color slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub tone: Tone,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            tone: Tone::Normal,
            bold: false,
        }
    }
}

/// A run of text drawn with one tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub tone: Tone,
    pub bold: bool,
}

impl Span {
    #[must_use]
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            bold: false,
        }
    }

    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Normal)
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// One visual line made of spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    #[must_use]
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Span::plain(text)])
    }

    #[must_use]
    pub fn styled(text: impl Into<String>, tone: Tone) -> Self {
        Self::new(vec![Span::new(text, tone)])
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// Concatenated text without styling.
    #[must_use]
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Width in cells (every glyph we draw is single width).
    #[must_use]
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }
}

/// Fixed-size grid of [`Cell`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }

    #[must_use]
    pub fn row(&self, y: u16) -> &[Cell] {
        self.index(0, y).map_or(&[], |start| {
            &self.cells[start..start + usize::from(self.width)]
        })
    }

    /// Write `span` starting at (x, y), clipped to `clip`. Returns the next x.
    pub fn put_span_in(&mut self, clip: Rect, x: u16, y: u16, span: &Span) -> u16 {
        let mut cx = x;
        if y < clip.y || u32::from(y) >= clip.bottom() {
            return cx;
        }
        for ch in span.text.chars() {
            if u32::from(cx) >= clip.right() {
                break;
            }
            if cx >= clip.x {
                self.set(
                    cx,
                    y,
                    Cell {
                        ch,
                        tone: span.tone,
                        bold: span.bold,
                    },
                );
            }
            cx = cx.saturating_add(1);
        }
        cx
    }

    pub fn put_line_in(&mut self, clip: Rect, x: u16, y: u16, line: &Line) {
        let mut cx = x;
        for span in &line.spans {
            cx = self.put_span_in(clip, cx, y, span);
        }
    }

    /// Draw `lines` top-down inside `area`, skipping the first `scroll`.
    pub fn put_lines_in(&mut self, area: Rect, lines: &[Line], scroll: usize) {
        for (row, line) in lines.iter().skip(scroll).take(usize::from(area.height)).enumerate() {
            let y = area.y + u16::try_from(row).unwrap_or(u16::MAX);
            self.put_line_in(area, area.x, y, line);
        }
    }

    pub fn put_str(&mut self, x: u16, y: u16, text: &str, tone: Tone) {
        self.put_span_in(self.bounds(), x, y, &Span::new(text, tone));
    }

    /// Blank every cell in `area`.
    pub fn clear_rect(&mut self, area: Rect) {
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                self.set(x, y, Cell::default());
            }
        }
    }

    /// Rounded one-cell border around `area`, with an optional title.
    pub fn draw_box(&mut self, area: Rect, tone: Tone, title: Option<&str>) {
        if area.width < 2 || area.height < 2 {
            return;
        }
        let right = area.x + area.width - 1;
        let bottom = area.y + area.height - 1;
        let edge = |ch| Cell {
            ch,
            tone,
            bold: false,
        };

        for x in area.x + 1..right {
            self.set(x, area.y, edge('─'));
            self.set(x, bottom, edge('─'));
        }
        for y in area.y + 1..bottom {
            self.set(area.x, y, edge('│'));
            self.set(right, y, edge('│'));
        }
        self.set(area.x, area.y, edge('╭'));
        self.set(right, area.y, edge('╮'));
        self.set(area.x, bottom, edge('╰'));
        self.set(right, bottom, edge('╯'));

        if let Some(title) = title {
            let clip = Rect::new(area.x + 1, area.y, area.width - 2, 1);
            let span = Span::new(format!(" {title} "), tone).bold();
            self.put_span_in(clip, area.x + 2, area.y, &span);
        }
    }

    /// Plain text, one line per row, trailing spaces trimmed.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + usize::from(self.height));
        for y in 0..self.height {
            let row: String = self.row(y).iter().map(|c| c.ch).collect();
            out.push_str(row.trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_clipped_to_the_target_rect() {
        let mut canvas = Canvas::new(10, 3);
        let clip = Rect::new(2, 1, 4, 1);
        canvas.put_span_in(clip, 0, 1, &Span::plain("abcdefgh"));
        canvas.put_span_in(clip, 2, 0, &Span::plain("zzz"));
        assert_eq!(canvas.to_text(), "\n  cdef\n\n");
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut canvas = Canvas::new(3, 1);
        canvas.set(5, 5, Cell::default());
        canvas.put_str(1, 0, "xyz", Tone::Primary);
        assert_eq!(canvas.to_text(), " xy\n");
        assert_eq!(canvas.get(1, 0).map(|c| c.tone), Some(Tone::Primary));
    }

    #[test]
    fn box_has_corners_and_title() {
        let mut canvas = Canvas::new(8, 3);
        canvas.draw_box(canvas.bounds(), Tone::Border, Some("Hi"));
        let text = canvas.to_text();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], "╭─ Hi ─╮");
        assert_eq!(rows[1], "│      │");
        assert_eq!(rows[2], "╰──────╯");
    }

    #[test]
    fn lines_scroll_and_stop_at_area_height() {
        let mut canvas = Canvas::new(4, 2);
        let lines: Vec<Line> = ["a", "b", "c", "d"].iter().map(|s| Line::plain(*s)).collect();
        canvas.put_lines_in(canvas.bounds(), &lines, 1);
        assert_eq!(canvas.to_text(), "b\nc\n");
    }

    #[test]
    fn line_width_counts_chars() {
        let line = Line::new(vec![Span::plain("✓ ok"), Span::new(" ●", Tone::P50)]);
        assert_eq!(line.width(), 6);
        assert_eq!(line.text(), "✓ ok ●");
    }
}
