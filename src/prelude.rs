//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use kedastral_tui::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{ErrorClass, KedastralError, Result};

// Upstream
pub use crate::client::{
    Deadline, EnrichedSnapshot, QuantileSnapshot, ScalerMetrics, Snapshot, UpstreamClient,
    WorkloadInfo,
};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::logger::jsonl::{JsonlConfig, Severity};

// Dashboard
pub use crate::tui::layout::{PanelLayout, Rect, compute_layout};
pub use crate::tui::model::{DashboardCmd, DashboardModel, DashboardMsg};
pub use crate::tui::refresh::RefreshOrchestrator;
pub use crate::tui::update::{init, update};
pub use crate::tui::{DashboardRuntimeConfig, run_dashboard};
