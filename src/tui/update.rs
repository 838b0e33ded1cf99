//! Pure update function for the Elm-style dashboard.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//! This module performs zero I/O. All effects are described as
//! [`DashboardCmd`] values.

#![allow(clippy::too_many_lines)]

use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::KeyEvent;

use super::export;
use super::input::{InputAction, InputContext};
use super::model::{
    DashboardCmd, DashboardModel, DashboardMsg, Endpoint, LastError, Mode, PanelId, Settings,
    ToastLevel,
};
use super::panels::{LogLevel, Panel, PanelOutcome};
use super::refresh::{CYCLE_WINDOW, HEALTH_CHECK_TIMEOUT};
use super::render;
use crate::core::config::{MAX_REFRESH_INTERVAL_MS, MIN_REFRESH_INTERVAL_MS};

/// Step used by the `+`/`-` interval keys.
const INTERVAL_STEP_MS: u64 = 1_000;

const RETRY_TOAST: Duration = Duration::from_secs(1);
const SETTINGS_TOAST: Duration = Duration::from_secs(2);
const EXPORT_TOAST: Duration = Duration::from_secs(3);
const COPY_TOAST: Duration = Duration::from_secs(2);

/// Past this age a pending cycle is treated as lost and the next tick
/// replaces it: the fetch window, both health checks, and a second of slack.
const CYCLE_STALL: Duration = Duration::from_secs(
    CYCLE_WINDOW.as_secs() + 2 * HEALTH_CHECK_TIMEOUT.as_secs() + 1,
);

/// Commands for the first frame: list workloads, start a cycle, arm the timer.
pub fn init(model: &mut DashboardModel) -> DashboardCmd {
    model.log(
        LogLevel::Info,
        format!("Monitoring workload {}", model.config.workload),
    );
    DashboardCmd::Batch(vec![
        DashboardCmd::ListWorkloads,
        start_cycle(model, Instant::now()),
        schedule_tick(model),
    ])
}

/// Apply a message to the model and return the next command for the runtime.
///
/// Every state transition goes through this function, making the dashboard
/// deterministic and testable.
pub fn update(model: &mut DashboardModel, msg: DashboardMsg) -> DashboardCmd {
    let now = Instant::now();
    match msg {
        DashboardMsg::Tick { generation } => {
            if generation != model.timer_generation || model.mode == Mode::Paused {
                return DashboardCmd::None;
            }
            if cycle_in_flight(model, now) {
                return schedule_tick(model);
            }
            DashboardCmd::Batch(vec![start_cycle(model, now), schedule_tick(model)])
        }

        DashboardMsg::Key(key) => handle_key(model, &key, now),

        DashboardMsg::Resize { cols, rows } => {
            model.terminal_size = (cols, rows);
            model.resize_viewports();
            clamp_active_viewport(model);
            DashboardCmd::None
        }

        DashboardMsg::ForecastFetched { cycle, result } => {
            if cycle != model.cycle {
                return DashboardCmd::None;
            }
            model.settle(Endpoint::Forecast);
            match result {
                Ok(snapshot) => {
                    model.log(
                        LogLevel::Info,
                        format!(
                            "Forecast received, age: {:.1}s",
                            snapshot.forecast_age.as_secs_f64()
                        ),
                    );
                    model.snapshot = Some(*snapshot);
                    model.last_update = Some(now);
                    model.clear_error_from(Endpoint::Forecast);
                    clamp_active_viewport(model);
                }
                Err(failure) => model.record_failure(Endpoint::Forecast, &failure, now),
            }
            DashboardCmd::None
        }

        DashboardMsg::MetricsFetched { cycle, result } => {
            if cycle != model.cycle {
                return DashboardCmd::None;
            }
            model.settle(Endpoint::Metrics);
            match result {
                Ok(metrics) => {
                    model.metrics = Some(metrics);
                    model.last_update = Some(now);
                    model.clear_error_from(Endpoint::Metrics);
                }
                Err(failure) => model.record_failure(Endpoint::Metrics, &failure, now),
            }
            DashboardCmd::None
        }

        DashboardMsg::HealthChecked {
            cycle,
            forecaster,
            scaler,
        } => {
            if cycle != model.cycle {
                return DashboardCmd::None;
            }
            model.settle(Endpoint::Health);
            model.forecaster_healthy = forecaster;
            model.scaler_healthy = scaler;
            DashboardCmd::None
        }

        DashboardMsg::WorkloadsListed(result) => {
            match result {
                Ok(workloads) => {
                    let current = model.config.workload.clone();
                    model.sidebar.set_workloads(workloads, &current);
                    model.clear_error_from(Endpoint::Workloads);
                }
                Err(failure) => model.record_failure(Endpoint::Workloads, &failure, now),
            }
            DashboardCmd::None
        }

        DashboardMsg::WorkloadSelected(name) => select_workload(model, name, now),

        DashboardMsg::ExportFinished(result) => {
            match result {
                Ok(path) => {
                    let file = path
                        .file_name()
                        .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().into_owned());
                    model.log(LogLevel::Info, format!("Exported to {}", path.display()));
                    model.push_toast(
                        ToastLevel::Success,
                        format!("✓ Exported to {file}"),
                        EXPORT_TOAST,
                        now,
                    );
                }
                Err(err) => export_failed(model, &err, now),
            }
            DashboardCmd::None
        }

        DashboardMsg::CopyFinished(result) => {
            match result {
                Ok(_) => {
                    model.push_toast(ToastLevel::Success, "✓ Copied to clipboard", COPY_TOAST, now);
                }
                Err(err) => {
                    model.log(LogLevel::Error, format!("Copy failed: {err}"));
                    model.push_toast(
                        ToastLevel::Error,
                        format!("Copy failed: {err}"),
                        COPY_TOAST,
                        now,
                    );
                }
            }
            DashboardCmd::None
        }

        DashboardMsg::ConfigSaved(result) => {
            if let Err(err) = result {
                model.log(LogLevel::Warn, format!("Could not save config: {err}"));
                model.push_toast(
                    ToastLevel::Warning,
                    format!("Config not saved: {err}"),
                    EXPORT_TOAST,
                    now,
                );
            }
            DashboardCmd::None
        }

        DashboardMsg::Shutdown => {
            model.quit = true;
            DashboardCmd::Quit
        }
    }
}

fn handle_key(model: &mut DashboardModel, key: &KeyEvent, now: Instant) -> DashboardCmd {
    let context = InputContext {
        focus: model.focus,
        help_open: model.show_help,
    };
    let resolution = super::input::resolve_key_event(key, context);
    if let Some(action) = resolution.action {
        apply_input_action(model, action, now)
    } else if resolution.consumed {
        DashboardCmd::None
    } else {
        handle_panel_key(model, key, now)
    }
}

fn apply_input_action(model: &mut DashboardModel, action: InputAction, now: Instant) -> DashboardCmd {
    match action {
        InputAction::Quit => {
            model.quit = true;
            DashboardCmd::Quit
        }
        InputAction::ToggleHelp => {
            model.show_help = !model.show_help;
            DashboardCmd::None
        }
        InputAction::CloseHelp => {
            model.show_help = false;
            DashboardCmd::None
        }
        InputAction::Dismiss => {
            if model.show_help {
                model.show_help = false;
            } else {
                model.last_error = None;
            }
            DashboardCmd::None
        }
        InputAction::TogglePause => toggle_pause(model, now),
        InputAction::Refresh => {
            model.log(LogLevel::Info, "Manual refresh");
            DashboardCmd::Batch(vec![DashboardCmd::ListWorkloads, start_cycle(model, now)])
        }
        InputAction::Retry => {
            model.last_error = None;
            model.push_toast(ToastLevel::Info, "Retrying...", RETRY_TOAST, now);
            model.log(LogLevel::Info, "Retrying");
            start_cycle(model, now)
        }
        InputAction::Export => match export::build_export(model, &export::timestamp(Local::now())) {
            Ok(job) => DashboardCmd::Export(job),
            Err(err) => {
                export_failed(model, &err, now);
                DashboardCmd::None
            }
        },
        InputAction::Copy => DashboardCmd::Copy(export::clipboard_text(model)),
        InputAction::ToggleTheme => {
            model.config.theme = model.config.theme.toggled();
            model.push_toast(
                ToastLevel::Info,
                format!("Theme: {}", model.config.theme),
                SETTINGS_TOAST,
                now,
            );
            settings_changed(model, false)
        }
        InputAction::IncreaseInterval => adjust_interval(model, true, now),
        InputAction::DecreaseInterval => adjust_interval(model, false, now),
        InputAction::FocusNext => {
            model.focus = model.focus.next();
            DashboardCmd::None
        }
        InputAction::FocusPrev => {
            model.focus = model.focus.prev();
            DashboardCmd::None
        }
        InputAction::Focus(panel) => {
            model.focus = panel;
            DashboardCmd::None
        }
        InputAction::ToggleSidebar => {
            model.layout_state.toggle_sidebar();
            model.resize_viewports();
            clamp_active_viewport(model);
            DashboardCmd::None
        }
        InputAction::ToggleBottom => {
            model.layout_state.toggle_bottom();
            model.resize_viewports();
            clamp_active_viewport(model);
            DashboardCmd::None
        }
    }
}

fn handle_panel_key(model: &mut DashboardModel, key: &KeyEvent, now: Instant) -> DashboardCmd {
    let outcome = match model.focus {
        PanelId::Sidebar => model.sidebar.handle_key(key),
        PanelId::Main => model.tabs.handle_key(key),
        PanelId::Bottom => model.bottom.handle_key(key),
    };
    match outcome {
        PanelOutcome::Ignored | PanelOutcome::Handled => DashboardCmd::None,
        PanelOutcome::Scrolled => {
            clamp_active_viewport(model);
            DashboardCmd::None
        }
        PanelOutcome::WorkloadSelected(name) => select_workload(model, name, now),
    }
}

fn toggle_pause(model: &mut DashboardModel, now: Instant) -> DashboardCmd {
    model.timer_generation += 1;
    match model.mode {
        Mode::Live => {
            model.mode = Mode::Paused;
            model.log(LogLevel::Info, "Paused");
            DashboardCmd::None
        }
        Mode::Paused => {
            model.mode = Mode::Live;
            model.log(LogLevel::Info, "Resumed");
            DashboardCmd::Batch(vec![start_cycle(model, now), schedule_tick(model)])
        }
    }
}

fn select_workload(model: &mut DashboardModel, name: String, now: Instant) -> DashboardCmd {
    if name != model.config.workload {
        model.snapshot = None;
    }
    model.log(LogLevel::Info, format!("Selected workload: {name}"));
    model.event(LogLevel::Info, format!("Selected workload: {name}"));
    model.config.workload = name;
    if model
        .last_error
        .as_ref()
        .is_some_and(|e| e.endpoint == Some(Endpoint::Forecast))
    {
        model.last_error = None;
    }
    model.focus = PanelId::Main;
    start_cycle(model, now)
}

fn adjust_interval(model: &mut DashboardModel, increase: bool, now: Instant) -> DashboardCmd {
    let current = model.config.refresh_interval_ms;
    let next = if increase {
        current.saturating_add(INTERVAL_STEP_MS)
    } else {
        current.saturating_sub(INTERVAL_STEP_MS)
    }
    .clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS);
    model.config.refresh_interval_ms = next;
    model.push_toast(
        ToastLevel::Info,
        format!("Refresh interval: {}s", next / 1_000),
        SETTINGS_TOAST,
        now,
    );
    settings_changed(model, next != current)
}

/// Apply + persist, and re-arm the timer when the interval moved while live.
fn settings_changed(model: &mut DashboardModel, rearm: bool) -> DashboardCmd {
    let mut cmds = vec![
        DashboardCmd::ApplySettings(Settings {
            theme: model.config.theme,
            refresh_interval: model.refresh_interval(),
        }),
        DashboardCmd::PersistConfig(Box::new(model.config.clone())),
    ];
    if rearm && model.mode == Mode::Live {
        model.timer_generation += 1;
        cmds.push(schedule_tick(model));
    }
    DashboardCmd::Batch(cmds)
}

fn start_cycle(model: &mut DashboardModel, now: Instant) -> DashboardCmd {
    model.cycle += 1;
    model.loading = true;
    model.loading_since = Some(now);
    model.pending = [Endpoint::Forecast, Endpoint::Metrics, Endpoint::Health]
        .into_iter()
        .collect();
    DashboardCmd::StartCycle {
        cycle: model.cycle,
        workload: model.config.workload.clone(),
        lead_time: model.config.lead_time(),
    }
}

/// The current cycle still owes results and has not outlived its deadlines.
/// Ticks leave such a cycle alone; only user actions supersede it.
fn cycle_in_flight(model: &DashboardModel, now: Instant) -> bool {
    !model.pending.is_empty()
        && model
            .loading_since
            .is_some_and(|since| now.saturating_duration_since(since) < CYCLE_STALL)
}

fn schedule_tick(model: &DashboardModel) -> DashboardCmd {
    DashboardCmd::ScheduleTick {
        generation: model.timer_generation,
        after: model.refresh_interval(),
    }
}

fn export_failed(model: &mut DashboardModel, err: &str, now: Instant) {
    model.log(LogLevel::Error, format!("Export failed: {err}"));
    model.push_toast(
        ToastLevel::Error,
        format!("Export failed: {err}"),
        EXPORT_TOAST,
        now,
    );
    model.last_error = Some(LastError {
        endpoint: None,
        message: format!("Export failed: {err}"),
    });
}

fn clamp_active_viewport(model: &mut DashboardModel) {
    let tab = model.active_tab();
    let vp = model.tabs.viewport(tab);
    let len = render::tab_lines(model, tab, vp.width, vp.height).len();
    model.tabs.viewport_mut(tab).clamp(len);
}
