//! Elm-style state model for the kedastral dashboard.
//!
//! All display state lives in [`DashboardModel`]. Input and fetch results
//! arrive as [`DashboardMsg`] values; side-effects are represented as
//! [`DashboardCmd`] values returned from the update function.
//!
//! The model is deterministic and testable: no I/O happens here.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::KeyEvent;

use crate::client::types::{EnrichedSnapshot, ScalerMetrics, WorkloadInfo};
use crate::client::{ENDPOINT_FORECAST, ENDPOINT_HEALTH, ENDPOINT_METRICS, ENDPOINT_WORKLOADS};
use crate::core::config::Config;
use crate::core::errors::{ErrorClass, KedastralError};
use crate::tui::layout::{LayoutState, PanelLayout};
use crate::tui::panels::{BottomPanel, LogLevel, Sidebar, TabBar, TabId};
use crate::tui::theme::ThemeName;

/// Toasts kept at once; the oldest is evicted first.
pub const MAX_TOASTS: usize = 5;

// ──────────────────── mode & focus ────────────────────

/// Whether the periodic refresh timer is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Live,
    Paused,
}

impl Mode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Paused => "PAUSED",
        }
    }
}

/// The panel that receives non-global keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PanelId {
    Sidebar,
    #[default]
    Main,
    Bottom,
}

impl PanelId {
    /// Forward through the ring Sidebar → Main → Bottom → Sidebar.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Sidebar => Self::Main,
            Self::Main => Self::Bottom,
            Self::Bottom => Self::Sidebar,
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Sidebar => Self::Bottom,
            Self::Main => Self::Sidebar,
            Self::Bottom => Self::Main,
        }
    }
}

// ──────────────────── endpoints & failures ────────────────────

/// Upstream operation class; errors are cleared per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    Workloads,
    Forecast,
    Metrics,
    Health,
}

impl Endpoint {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workloads => ENDPOINT_WORKLOADS,
            Self::Forecast => ENDPOINT_FORECAST,
            Self::Metrics => ENDPOINT_METRICS,
            Self::Health => ENDPOINT_HEALTH,
        }
    }
}

/// Cloneable summary of a [`KedastralError`] carried by result messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub code: &'static str,
    pub class: ErrorClass,
    pub message: String,
}

impl From<&KedastralError> for FetchFailure {
    fn from(err: &KedastralError) -> Self {
        Self {
            code: err.code(),
            class: err.class(),
            message: err.to_string(),
        }
    }
}

impl From<KedastralError> for FetchFailure {
    fn from(err: KedastralError) -> Self {
        Self::from(&err)
    }
}

/// The error currently shown in the status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// `None` for errors raised by user actions rather than a fetch.
    pub endpoint: Option<Endpoint>,
    pub message: String,
}

// ──────────────────── toasts ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient notification drawn top-right until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub message: String,
    pub expires_at: Instant,
}

impl Toast {
    #[must_use]
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

// ──────────────────── model ────────────────────

/// Complete dashboard state.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    /// Resolved configuration; workload, theme and refresh interval change at
    /// runtime.
    pub config: Config,
    pub mode: Mode,
    pub focus: PanelId,
    pub layout_state: LayoutState,
    pub terminal_size: (u16, u16),
    pub show_help: bool,

    pub snapshot: Option<EnrichedSnapshot>,
    pub metrics: Option<ScalerMetrics>,
    pub forecaster_healthy: bool,
    pub scaler_healthy: bool,
    pub last_update: Option<Instant>,
    pub last_error: Option<LastError>,
    pub loading: bool,
    pub loading_since: Option<Instant>,

    pub sidebar: Sidebar,
    pub tabs: TabBar,
    pub bottom: BottomPanel,
    pub toasts: Vec<Toast>,

    /// Id of the newest refresh cycle; results tagged otherwise are dropped.
    pub cycle: u64,
    /// Endpoints of the current cycle that have not reported yet.
    pub pending: BTreeSet<Endpoint>,
    /// Bumped on pause and on interval change so superseded ticks are ignored.
    pub timer_generation: u64,
    next_toast_id: u64,
    pub quit: bool,
}

impl DashboardModel {
    #[must_use]
    pub fn new(config: Config, terminal_size: (u16, u16)) -> Self {
        let mut model = Self {
            config,
            mode: Mode::Live,
            focus: PanelId::Main,
            layout_state: LayoutState::default(),
            terminal_size,
            show_help: false,
            snapshot: None,
            metrics: None,
            forecaster_healthy: false,
            scaler_healthy: false,
            last_update: None,
            last_error: None,
            loading: false,
            loading_since: None,
            sidebar: Sidebar::default(),
            tabs: TabBar::default(),
            bottom: BottomPanel::default(),
            toasts: Vec::new(),
            cycle: 0,
            pending: BTreeSet::new(),
            timer_generation: 0,
            next_toast_id: 0,
            quit: false,
        };
        model.resize_viewports();
        model
    }

    #[must_use]
    pub fn workload(&self) -> &str {
        &self.config.workload
    }

    #[must_use]
    pub const fn theme(&self) -> ThemeName {
        self.config.theme
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval()
    }

    #[must_use]
    pub const fn active_tab(&self) -> TabId {
        self.tabs.active()
    }

    #[must_use]
    pub fn layout(&self) -> PanelLayout {
        let (cols, rows) = self.terminal_size;
        self.layout_state.compute(cols, rows)
    }

    /// Size every tab viewport from the main panel:
    /// `max(main.w - 4, 10)` × `max(main.h - 10, 5)`.
    pub fn resize_viewports(&mut self) {
        let main = self.layout().main;
        let width = main.width.saturating_sub(4).max(10);
        let height = main.height.saturating_sub(10).max(5);
        self.tabs.resize_all(width, height);
    }

    /// Push a toast, evicting the oldest at capacity. Returns its id.
    pub fn push_toast(
        &mut self,
        level: ToastLevel,
        message: impl Into<String>,
        ttl: Duration,
        now: Instant,
    ) -> u64 {
        let id = self.next_toast_id;
        self.next_toast_id += 1;
        self.toasts.push(Toast {
            id,
            level,
            message: message.into(),
            expires_at: now + ttl,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.remove(0);
        }
        id
    }

    /// Toasts that have not expired at `now`, oldest first.
    pub fn live_toasts(&self, now: Instant) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().filter(move |t| t.is_live(now))
    }

    /// Drop expired toasts. Called by the runtime right before drawing.
    pub fn prune_toasts(&mut self, now: Instant) {
        self.toasts.retain(|t| t.is_live(now));
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.bottom.push_log(level, message, Local::now());
    }

    pub fn event(&mut self, level: LogLevel, message: impl Into<String>) {
        self.bottom.push_event(level, message, Local::now());
    }

    /// Record a fetch failure everywhere it must be visible.
    pub fn record_failure(&mut self, endpoint: Endpoint, failure: &FetchFailure, now: Instant) {
        let message = format!("{}: {}", endpoint.as_str(), failure.message);
        self.log(LogLevel::Error, message.clone());
        self.event(LogLevel::Error, message.clone());
        self.push_toast(ToastLevel::Error, message.clone(), Duration::from_secs(5), now);
        self.last_error = Some(LastError {
            endpoint: Some(endpoint),
            message,
        });
    }

    /// Clear the last error only when `endpoint` produced it.
    pub fn clear_error_from(&mut self, endpoint: Endpoint) {
        if self
            .last_error
            .as_ref()
            .is_some_and(|e| e.endpoint == Some(endpoint))
        {
            self.last_error = None;
        }
    }

    /// Mark one endpoint of the current cycle done and recompute `loading`.
    pub fn settle(&mut self, endpoint: Endpoint) {
        self.pending.remove(&endpoint);
        if self.pending.is_empty() {
            self.loading = false;
            self.loading_since = None;
        }
    }
}

// ──────────────────── messages ────────────────────

/// Events that drive state transitions in the dashboard model.
#[derive(Debug, Clone)]
pub enum DashboardMsg {
    /// Periodic timer tick from timer generation `generation`.
    Tick { generation: u64 },
    /// Terminal key press.
    Key(KeyEvent),
    /// Terminal was resized.
    Resize { cols: u16, rows: u16 },
    /// Quantile snapshot fetch finished for `cycle`.
    ForecastFetched {
        cycle: u64,
        result: Result<Box<EnrichedSnapshot>, FetchFailure>,
    },
    /// Scaler metrics fetch finished for `cycle`.
    MetricsFetched {
        cycle: u64,
        result: Result<ScalerMetrics, FetchFailure>,
    },
    /// Both health checks finished for `cycle`.
    HealthChecked {
        cycle: u64,
        forecaster: bool,
        scaler: bool,
    },
    /// Workload listing finished.
    WorkloadsListed(Result<Vec<WorkloadInfo>, FetchFailure>),
    /// A workload was chosen in the sidebar.
    WorkloadSelected(String),
    /// Export finished; `Ok` carries the written file.
    ExportFinished(Result<PathBuf, String>),
    /// Clipboard write finished; `Ok` carries the payload size.
    CopyFinished(Result<usize, String>),
    /// Config persistence finished.
    ConfigSaved(Result<PathBuf, String>),
    /// Termination requested from outside (signal).
    Shutdown,
}

// ──────────────────── commands ────────────────────

/// Runtime-side settings that follow a theme or interval change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub theme: ThemeName,
    pub refresh_interval: Duration,
}

/// A rendered export ready to be written by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub file_name: String,
    pub contents: String,
}

/// Side-effects returned by the update function for the runtime to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCmd {
    /// No side-effect.
    None,
    /// Start refresh cycle `cycle` for `workload`, cancelling any older one.
    StartCycle {
        cycle: u64,
        workload: String,
        lead_time: Duration,
    },
    /// Fetch the workload list for the sidebar.
    ListWorkloads,
    /// Deliver `Tick { generation }` after `after`.
    ScheduleTick { generation: u64, after: Duration },
    /// Terminate the dashboard event loop.
    Quit,
    /// Execute multiple commands in order.
    Batch(Vec<Self>),
    /// Re-read theme and interval into the runtime.
    ApplySettings(Settings),
    /// Save the configuration record to its file.
    PersistConfig(Box<Config>),
    /// Write an export file into the export directory.
    Export(ExportJob),
    /// Put text on the terminal clipboard.
    Copy(String),
}

impl DashboardCmd {
    /// Flatten nested batches into a list, dropping `None`.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

// ──────────────────── tests ────────────────────
