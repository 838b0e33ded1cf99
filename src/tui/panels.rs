//! Subordinate panel state: the workload sidebar, the main-panel tab bar with
//! its per-tab viewports, and the bottom log/metrics panel.
//!
//! Each panel owns a narrow slice of state and reacts to the keys routed to
//! it while it holds focus. None of them performs I/O.

#![allow(missing_docs)]

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::client::types::WorkloadInfo;

/// Entries kept in the bottom-panel log ring.
pub const LOG_CAPACITY: usize = 1_000;
/// Log lines shown in the Logs views.
pub const LOG_VIEW_LINES: usize = 50;
/// Entries kept in the bottom-panel event list.
pub const EVENT_CAPACITY: usize = 100;

/// What a panel did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    /// Not a key this panel understands.
    Ignored,
    /// State changed locally; nothing else to do.
    Handled,
    /// The active viewport scrolled and needs clamping against its content.
    Scrolled,
    /// Enter on a sidebar row.
    WorkloadSelected(String),
}

/// Uniform key contract for the three focusable panels.
pub trait Panel {
    fn handle_key(&mut self, key: &KeyEvent) -> PanelOutcome;
}

// ──────────────────── sidebar ────────────────────

#[derive(Debug, Clone, Default)]
pub struct Sidebar {
    workloads: Vec<WorkloadInfo>,
    selected: usize,
}

impl Sidebar {
    #[must_use]
    pub fn workloads(&self) -> &[WorkloadInfo] {
        &self.workloads
    }

    #[must_use]
    pub const fn selected_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected(&self) -> Option<&WorkloadInfo> {
        self.workloads.get(self.selected)
    }

    /// Replace the list, keeping the cursor on `current` when it is listed.
    pub fn set_workloads(&mut self, workloads: Vec<WorkloadInfo>, current: &str) {
        self.selected = workloads
            .iter()
            .position(|w| w.name == current)
            .unwrap_or(0);
        self.workloads = workloads;
    }

    fn move_by(&mut self, down: bool) {
        if self.workloads.is_empty() {
            return;
        }
        self.selected = if down {
            (self.selected + 1).min(self.workloads.len() - 1)
        } else {
            self.selected.saturating_sub(1)
        };
    }
}

impl Panel for Sidebar {
    fn handle_key(&mut self, key: &KeyEvent) -> PanelOutcome {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_by(true);
                PanelOutcome::Handled
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_by(false);
                PanelOutcome::Handled
            }
            KeyCode::Enter => self
                .selected()
                .map_or(PanelOutcome::Handled, |w| {
                    PanelOutcome::WorkloadSelected(w.name.clone())
                }),
            _ => PanelOutcome::Ignored,
        }
    }
}

// ──────────────────── tabs ────────────────────

/// Main-panel tabs, in tab-bar order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TabId {
    #[default]
    Charts,
    Tables,
    Config,
    Logs,
}

impl TabId {
    pub const ALL: [Self; 4] = [Self::Charts, Self::Tables, Self::Config, Self::Logs];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Charts => 0,
            Self::Tables => 1,
            Self::Config => 2,
            Self::Logs => 3,
        }
    }

    /// 1-based number key to tab.
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Charts),
            2 => Some(Self::Tables),
            3 => Some(Self::Config),
            4 => Some(Self::Logs),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Charts => "Charts",
            Self::Tables => "Tables",
            Self::Config => "Config",
            Self::Logs => "Logs",
        }
    }

    #[must_use]
    pub const fn icon(self) -> char {
        match self {
            Self::Charts => '■',
            Self::Tables => '▤',
            Self::Config => '⚙',
            Self::Logs => '≡',
        }
    }

    /// Next tab; stops at the last one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Charts => Self::Tables,
            Self::Tables => Self::Config,
            Self::Config | Self::Logs => Self::Logs,
        }
    }

    /// Previous tab; stops at the first one.
    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Charts | Self::Tables => Self::Charts,
            Self::Config => Self::Tables,
            Self::Logs => Self::Config,
        }
    }
}

/// Scrollable window over a tab's content lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
    pub offset: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 80,
            height: 20,
            offset: 0,
        }
    }
}

impl Viewport {
    /// Keep the offset inside `[0, content_len - height]`.
    pub fn clamp(&mut self, content_len: usize) {
        let max = content_len.saturating_sub(usize::from(self.height));
        self.offset = self.offset.min(max);
    }

    fn scroll(&mut self, lines: isize) {
        self.offset = self.offset.saturating_add_signed(lines);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabBar {
    active: TabId,
    viewports: [Viewport; 4],
}

impl TabBar {
    #[must_use]
    pub const fn active(&self) -> TabId {
        self.active
    }

    pub fn select(&mut self, tab: TabId) {
        self.active = tab;
    }

    #[must_use]
    pub const fn viewport(&self, tab: TabId) -> Viewport {
        self.viewports[tab.index()]
    }

    pub fn viewport_mut(&mut self, tab: TabId) -> &mut Viewport {
        &mut self.viewports[tab.index()]
    }

    /// Resize every tab's viewport, not only the active one.
    pub fn resize_all(&mut self, width: u16, height: u16) {
        for vp in &mut self.viewports {
            vp.width = width;
            vp.height = height;
        }
    }

    fn scroll_active(&mut self, lines: isize) -> PanelOutcome {
        self.viewports[self.active.index()].scroll(lines);
        PanelOutcome::Scrolled
    }
}

impl Panel for TabBar {
    fn handle_key(&mut self, key: &KeyEvent) -> PanelOutcome {
        let page = isize::try_from(self.viewport(self.active).height.max(1)).unwrap_or(isize::MAX);
        match key.code {
            KeyCode::Char(c @ '1'..='4') => {
                if let Some(tab) = TabId::from_number(c as u8 - b'0') {
                    self.active = tab;
                }
                PanelOutcome::Handled
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.active = self.active.next();
                PanelOutcome::Handled
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.active = self.active.prev();
                PanelOutcome::Handled
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll_active(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_active(-1),
            KeyCode::PageDown => self.scroll_active(page),
            KeyCode::PageUp => self.scroll_active(-page),
            KeyCode::Home | KeyCode::Char('g') => {
                self.viewports[self.active.index()].offset = 0;
                PanelOutcome::Handled
            }
            KeyCode::End | KeyCode::Char('G') => self.scroll_active(isize::MAX),
            _ => PanelOutcome::Ignored,
        }
    }
}

// ──────────────────── bottom panel ────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BottomMode {
    #[default]
    Logs,
    Metrics,
    Events,
    Info,
}

impl BottomMode {
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Logs => Self::Metrics,
            Self::Metrics => Self::Events,
            Self::Events => Self::Info,
            Self::Info => Self::Logs,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Logs => "Logs",
            Self::Metrics => "Metrics",
            Self::Events => "Events",
            Self::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    /// `[HH:MM:SS] message`
    #[must_use]
    pub fn format(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BottomPanel {
    mode: BottomMode,
    logs: VecDeque<LogLine>,
    events: VecDeque<LogLine>,
    /// Lines scrolled back from the newest entry.
    scroll: usize,
}

impl BottomPanel {
    #[must_use]
    pub const fn mode(&self) -> BottomMode {
        self.mode
    }

    #[must_use]
    pub const fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>, at: DateTime<Local>) {
        push_bounded(
            &mut self.logs,
            LogLine {
                at,
                level,
                message: message.into(),
            },
            LOG_CAPACITY,
        );
    }

    pub fn push_event(&mut self, level: LogLevel, message: impl Into<String>, at: DateTime<Local>) {
        push_bounded(
            &mut self.events,
            LogLine {
                at,
                level,
                message: message.into(),
            },
            EVENT_CAPACITY,
        );
    }

    #[must_use]
    pub fn logs(&self) -> &VecDeque<LogLine> {
        &self.logs
    }

    #[must_use]
    pub fn events(&self) -> &VecDeque<LogLine> {
        &self.events
    }

    /// The newest `LOG_VIEW_LINES` log lines, oldest first.
    pub fn recent_logs(&self) -> impl Iterator<Item = &LogLine> {
        self.logs.iter().skip(self.logs.len().saturating_sub(LOG_VIEW_LINES))
    }

    fn content_len(&self) -> usize {
        match self.mode {
            BottomMode::Logs => self.logs.len().min(LOG_VIEW_LINES),
            BottomMode::Events => self.events.len(),
            BottomMode::Metrics | BottomMode::Info => 0,
        }
    }
}

fn push_bounded(ring: &mut VecDeque<LogLine>, line: LogLine, capacity: usize) {
    ring.push_back(line);
    while ring.len() > capacity {
        ring.pop_front();
    }
}

impl Panel for BottomPanel {
    fn handle_key(&mut self, key: &KeyEvent) -> PanelOutcome {
        match key.code {
            KeyCode::Char('b') => {
                self.mode = self.mode.cycle();
                self.scroll = 0;
                PanelOutcome::Handled
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll = (self.scroll + 1).min(self.content_len().saturating_sub(1));
                PanelOutcome::Handled
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll = self.scroll.saturating_sub(1);
                PanelOutcome::Handled
            }
            _ => PanelOutcome::Ignored,
        }
    }
}
