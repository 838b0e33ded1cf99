//! Panel geometry for the three-panel dashboard.
//!
//! [`compute_layout`] maps terminal size and the two collapse flags to the
//! sidebar, main and bottom rectangles. It is pure and total: any input
//! produces rectangles that stay inside the terminal and never overlap.

#![allow(missing_docs)]

/// Minimum terminal width below which the dashboard shows a "too small" message.
pub const MIN_USABLE_COLS: u16 = 80;
/// Minimum terminal height below which the dashboard shows a "too small" message.
pub const MIN_USABLE_ROWS: u16 = 24;

pub const SIDEBAR_MIN_COLS: u16 = 20;
pub const SIDEBAR_MAX_COLS: u16 = 40;
pub const BOTTOM_MIN_ROWS: u16 = 5;
pub const BOTTOM_MAX_ROWS: u16 = 15;

/// Returns `true` if the terminal is too small to draw the panels.
#[must_use]
pub const fn is_terminal_too_small(cols: u16, rows: u16) -> bool {
    cols < MIN_USABLE_COLS || rows < MIN_USABLE_ROWS
}

/// Axis-aligned cell rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.y as u32 + self.height as u32
    }

    /// Empty rectangles intersect nothing.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u32) < other.right()
            && (other.x as u32) < self.right()
            && (self.y as u32) < other.bottom()
            && (other.y as u32) < self.bottom()
    }

    #[must_use]
    pub const fn fits_within(self, cols: u16, rows: u16) -> bool {
        self.is_empty() || (self.right() <= cols as u32 && self.bottom() <= rows as u32)
    }

    /// Area inside a one-cell box border.
    #[must_use]
    pub const fn inner(self) -> Self {
        if self.width < 2 || self.height < 2 {
            return Self::new(self.x, self.y, 0, 0);
        }
        Self::new(self.x + 1, self.y + 1, self.width - 2, self.height - 2)
    }
}

/// Resolved rectangles for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelLayout {
    pub sidebar: Rect,
    pub main: Rect,
    pub bottom: Rect,
}

impl PanelLayout {
    #[must_use]
    pub const fn rects(&self) -> [Rect; 3] {
        [self.sidebar, self.main, self.bottom]
    }
}

/// Collapse flags toggled with `[` and `]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutState {
    pub sidebar_collapsed: bool,
    pub bottom_collapsed: bool,
}

impl LayoutState {
    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn toggle_bottom(&mut self) {
        self.bottom_collapsed = !self.bottom_collapsed;
    }

    #[must_use]
    pub fn compute(self, cols: u16, rows: u16) -> PanelLayout {
        compute_layout(cols, rows, self.sidebar_collapsed, self.bottom_collapsed)
    }
}

/// Sidebar: `clamp(cols / 4, 20, 40)`; bottom: `clamp(rows / 5, 5, 15)`.
///
/// A one-cell border separates a visible sidebar or bottom panel from main.
/// A panel that cannot fit together with its border is dropped to zero
/// rather than shrunk below its minimum.
#[must_use]
pub fn compute_layout(
    cols: u16,
    rows: u16,
    sidebar_collapsed: bool,
    bottom_collapsed: bool,
) -> PanelLayout {
    let mut sidebar_w = if sidebar_collapsed {
        0
    } else {
        (cols / 4).clamp(SIDEBAR_MIN_COLS, SIDEBAR_MAX_COLS)
    };
    if u32::from(sidebar_w) + 1 > u32::from(cols) {
        sidebar_w = 0;
    }

    let mut bottom_h = if bottom_collapsed {
        0
    } else {
        (rows / 5).clamp(BOTTOM_MIN_ROWS, BOTTOM_MAX_ROWS)
    };
    if u32::from(bottom_h) + 1 > u32::from(rows) {
        bottom_h = 0;
    }

    let border_w = u16::from(sidebar_w > 0);
    let border_h = u16::from(bottom_h > 0);
    let main_w = cols.saturating_sub(sidebar_w + border_w);
    let main_h = rows.saturating_sub(bottom_h + border_h);
    let main_x = sidebar_w + border_w;

    PanelLayout {
        sidebar: Rect::new(0, 0, sidebar_w, rows),
        main: Rect::new(main_x, 0, main_w, main_h),
        bottom: Rect::new(main_x, main_h + border_h, main_w, bottom_h),
    }
}
