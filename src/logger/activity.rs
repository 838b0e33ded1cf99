//! Activity logger: a dedicated thread owns the [`JsonlWriter`]; the dashboard
//! loop and refresh workers send [`ActivityEvent`]s over a bounded crossbeam
//! channel. `try_send()` keeps the UI loop from ever blocking on logging.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{KedastralError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 512;

// ──────────────────── public event type ────────────────────

/// Events recorded in the activity log.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    Started {
        version: String,
        workload: String,
        config_path: String,
    },
    Stopped {
        reason: String,
        uptime_secs: u64,
    },
    ConfigSaved {
        path: String,
        error: Option<String>,
    },
    CycleStarted {
        cycle: u64,
        workload: String,
    },
    FetchSucceeded {
        cycle: u64,
        endpoint: &'static str,
        duration_ms: u64,
        details: Option<String>,
    },
    FetchFailed {
        cycle: u64,
        endpoint: &'static str,
        code: String,
        message: String,
        duration_ms: u64,
    },
    CycleDeadline {
        cycle: u64,
        pending: Vec<&'static str>,
    },
    WorkloadSelected {
        workload: String,
    },
    Exported {
        path: Option<String>,
        error: Option<String>,
    },
    Copied {
        bytes: usize,
        error: Option<String>,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Thread-safe, cheaply-cloneable handle for sending log events.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle whose events go nowhere.
    pub fn noop() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Send an event to the logger thread. Non-blocking.
    ///
    /// If the channel is full the event is dropped and the dropped-events
    /// counter is incremented.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the logger thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread and return a handle plus its join handle.
pub fn spawn_logger(
    config: JsonlConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("ktui-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped_clone))
        .map_err(|e| KedastralError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warn);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

pub(crate) fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::Started {
            version,
            workload,
            config_path,
        } => {
            let mut e = LogEntry::new(EventType::Startup, Severity::Info);
            e.workload = Some(workload.clone());
            e.details = Some(format!("version={version} config={config_path}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::Stopped {
            reason,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::Shutdown, Severity::Info);
            e.details = Some(format!("reason={reason} uptime={uptime_secs}s"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::ConfigSaved { path, error } => {
            let severity = if error.is_some() {
                Severity::Error
            } else {
                Severity::Info
            };
            let mut e = LogEntry::new(EventType::ConfigSaved, severity);
            e.details = Some(path.clone());
            e.ok = Some(error.is_none());
            e.error_message.clone_from(error);
            e
        }
        ActivityEvent::CycleStarted { cycle, workload } => {
            let mut e = LogEntry::new(EventType::CycleStarted, Severity::Debug);
            e.cycle = Some(*cycle);
            e.workload = Some(workload.clone());
            e
        }
        ActivityEvent::FetchSucceeded {
            cycle,
            endpoint,
            duration_ms,
            details,
        } => {
            let mut e = LogEntry::new(EventType::FetchSucceeded, Severity::Debug);
            e.cycle = Some(*cycle);
            e.endpoint = Some((*endpoint).to_string());
            e.duration_ms = Some(*duration_ms);
            e.details.clone_from(details);
            e.ok = Some(true);
            e
        }
        ActivityEvent::FetchFailed {
            cycle,
            endpoint,
            code,
            message,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::FetchFailed, Severity::Warn);
            e.cycle = Some(*cycle);
            e.endpoint = Some((*endpoint).to_string());
            e.duration_ms = Some(*duration_ms);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::CycleDeadline { cycle, pending } => {
            let mut e = LogEntry::new(EventType::CycleDeadline, Severity::Warn);
            e.cycle = Some(*cycle);
            e.details = Some(format!("pending={}", pending.join(",")));
            e.ok = Some(false);
            e
        }
        ActivityEvent::WorkloadSelected { workload } => {
            let mut e = LogEntry::new(EventType::WorkloadSelected, Severity::Info);
            e.workload = Some(workload.clone());
            e
        }
        ActivityEvent::Exported { path, error } => {
            let mut e = LogEntry::new(
                EventType::Export,
                if error.is_some() {
                    Severity::Error
                } else {
                    Severity::Info
                },
            );
            e.details.clone_from(path);
            e.error_message.clone_from(error);
            e.ok = Some(error.is_none());
            e
        }
        ActivityEvent::Copied { bytes, error } => {
            let mut e = LogEntry::new(
                EventType::Clipboard,
                if error.is_some() {
                    Severity::Warn
                } else {
                    Severity::Info
                },
            );
            e.details = Some(format!("bytes={bytes}"));
            e.error_message.clone_from(error);
            e.ok = Some(error.is_none());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::Shutdown, Severity::Debug),
    }
}
