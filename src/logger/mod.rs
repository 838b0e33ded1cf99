//! Activity logging: JSONL append-only file fed by a background logger thread.

pub mod activity;
pub mod jsonl;
