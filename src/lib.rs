#![forbid(unsafe_code)]

//! kedastral-tui: live terminal dashboard for the kedastral predictive
//! autoscaler.
//!
//! The dashboard polls two upstream services over HTTP:
//! 1. **Forecaster**: quantile forecasts and desired replica counts per workload
//! 2. **Scaler**: Prometheus metrics and health
//!
//! and renders them as charts, a replica decision table, configuration, and
//! logs inside a resizable three-panel layout.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use kedastral_tui::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use kedastral_tui::core::config::Config;
//! use kedastral_tui::client::{Deadline, UpstreamClient};
//! ```

pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod core;
pub mod logger;
pub mod tui;
