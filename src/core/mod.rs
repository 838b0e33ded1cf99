//! Core types: errors, configuration, well-known paths.

pub mod config;
pub mod errors;
pub mod paths;
