//! Live dashboard: Elm-style model/update/render over a crossterm terminal.
//!
//! [`update`] is the only place state changes; it performs no I/O and returns
//! [`model::DashboardCmd`]s that [`runtime`] executes. [`render`] is a pure
//! function of the model onto a [`canvas::Canvas`].

#![allow(missing_docs)]

pub mod canvas;
pub mod chart;
pub mod export;
pub mod input;
pub mod layout;
pub mod model;
pub mod panels;
pub mod refresh;
pub mod render;
pub mod runtime;
pub mod terminal_guard;
pub mod theme;
pub mod update;
pub mod widgets;

#[cfg(test)]
mod test_properties;

pub use runtime::{DashboardRuntimeConfig, run_dashboard};
