//! Frame composition for the dashboard.
//!
//! Two entrypoints:
//! - [`render_frame()`] builds a [`Canvas`] for the painter.
//! - [`render_to_string()`] returns the same frame as plain text, for tests
//!   and the headless `--dump-frame` path.
//!
//! Tab content is produced by [`tab_lines()`], which is also what export and
//! copy reuse, so the clipboard always matches what is on screen.

#![allow(missing_docs)]
#![allow(clippy::too_many_lines)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};

use super::canvas::{Canvas, Line, Span};
use super::chart;
use super::input::help_sections;
use super::layout::{MIN_USABLE_COLS, MIN_USABLE_ROWS, Rect, is_terminal_too_small};
use super::model::{DashboardModel, Mode, PanelId, ToastLevel};
use super::panels::{BottomMode, LogLevel, LogLine, TabId};
use super::theme::Tone;
use super::widgets::{fit, health_mark, human_age, spinner, step_offset, truncate};
use crate::client::types::ScalerMetrics;
use crate::core::config::format_duration;

/// Rows of the replica table shown before the "... and N more" line.
const MAX_TABLE_ROWS: usize = 10;
/// Rows above the viewport inside the main panel.
const MAIN_HEADER_ROWS: u16 = 6;
/// Rows below the viewport inside the main panel.
const MAIN_FOOTER_ROWS: u16 = 2;

const FOOTER_HINTS: &str =
    "[Tab] focus  [1-4] tabs  [h/l] navigate  [SPACE] pause  [?] help  [q] quit";

/// Clock readings for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameTime {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl FrameTime {
    #[must_use]
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Plain-text render of a full frame.
#[must_use]
pub fn render_to_string(model: &DashboardModel, time: FrameTime) -> String {
    render_frame(model, time).to_text()
}

/// Compose the whole screen for `model` at `time`.
#[must_use]
pub fn render_frame(model: &DashboardModel, time: FrameTime) -> Canvas {
    let (cols, rows) = model.terminal_size;
    let mut canvas = Canvas::new(cols, rows);

    if is_terminal_too_small(cols, rows) {
        draw_too_small(&mut canvas, cols, rows);
        return canvas;
    }

    let layout = model.layout();
    draw_sidebar(&mut canvas, model, layout.sidebar, time);
    draw_main(&mut canvas, model, layout.main, time);
    draw_bottom(&mut canvas, model, layout.bottom);

    if model.show_help {
        draw_help(&mut canvas);
    }
    draw_toasts(&mut canvas, model, time.instant);
    canvas
}

fn border_tone(model: &DashboardModel, panel: PanelId) -> Tone {
    if model.focus == panel {
        Tone::BorderFocused
    } else {
        Tone::Border
    }
}

// ──────────────────── too small ────────────────────

fn draw_too_small(canvas: &mut Canvas, cols: u16, rows: u16) {
    let lines = [
        Line::styled("Terminal too small.", Tone::Warning),
        Line::plain(format!("Current: {cols}x{rows}")),
        Line::plain(format!("Minimum: {MIN_USABLE_COLS}x{MIN_USABLE_ROWS}")),
        Line::styled("Resize the terminal or press q to quit.", Tone::Muted),
    ];
    let top = (rows / 2).saturating_sub(2);
    for (i, line) in lines.iter().enumerate() {
        let width = u16::try_from(line.width()).unwrap_or(u16::MAX);
        let x = cols.saturating_sub(width) / 2;
        let y = top + u16::try_from(i).unwrap_or(0);
        canvas.put_line_in(canvas.bounds(), x, y, line);
    }
}

// ──────────────────── sidebar ────────────────────

fn draw_sidebar(canvas: &mut Canvas, model: &DashboardModel, area: Rect, time: FrameTime) {
    if area.is_empty() {
        return;
    }
    canvas.draw_box(area, border_tone(model, PanelId::Sidebar), Some("Workloads"));
    let inner = area.inner();
    let lines = sidebar_lines(model, usize::from(inner.width), time.wall);
    let selected = model.sidebar.selected_index();
    let visible = usize::from(inner.height);
    let scroll = (selected + 1).saturating_sub(visible);
    canvas.put_lines_in(inner, &lines, scroll);
}

/// One row per workload: marker, name, age, health.
#[must_use]
pub fn sidebar_lines(model: &DashboardModel, width: usize, wall: DateTime<Utc>) -> Vec<Line> {
    let workloads = model.sidebar.workloads();
    if workloads.is_empty() {
        return vec![Line::styled("No workloads", Tone::Muted)];
    }
    let name_width = width.saturating_sub(2 + 1 + 4 + 1 + 3);
    workloads
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let selected = i == model.sidebar.selected_index();
            let marker = if selected { "> " } else { "  " };
            let age = w.last_forecast.map_or_else(
                || "---".to_string(),
                |at| human_age((wall - at).to_std().unwrap_or(Duration::ZERO)),
            );
            let name_tone = if w.name == model.workload() {
                Tone::Primary
            } else {
                Tone::Normal
            };
            let mut name = Span::new(fit(&w.name, name_width), name_tone);
            if selected {
                name = name.bold();
            }
            let (badge, badge_tone) = if w.healthy {
                ("[✓]", Tone::Success)
            } else {
                ("[!]", Tone::Warning)
            };
            Line::new(vec![
                Span::new(marker, Tone::Primary),
                name,
                Span::new(format!(" {age:>4} "), Tone::Muted),
                Span::new(badge, badge_tone),
            ])
        })
        .collect()
}

// ──────────────────── main panel ────────────────────

fn draw_main(canvas: &mut Canvas, model: &DashboardModel, area: Rect, time: FrameTime) {
    if area.is_empty() {
        return;
    }
    canvas.draw_box(area, border_tone(model, PanelId::Main), None);
    let inner = area.inner();
    if inner.is_empty() {
        return;
    }
    let row = |n: u16| Rect::new(inner.x, inner.y + n, inner.width, 1);
    let width = usize::from(inner.width);

    canvas.put_line_in(row(0), inner.x, inner.y, &status_line(model, time.instant));
    canvas.put_line_in(row(1), inner.x, inner.y + 1, &health_line(model));
    if let Some(err) = &model.last_error {
        let line = Line::styled(truncate(&format!("Error: {}", err.message), width), Tone::Error);
        canvas.put_line_in(row(2), inner.x, inner.y + 2, &line);
    }
    let separator = Line::styled("─".repeat(width), Tone::Border);
    canvas.put_line_in(row(3), inner.x, inner.y + 3, &separator);
    canvas.put_line_in(row(4), inner.x, inner.y + 4, &tab_bar_line(model.active_tab()));
    canvas.put_line_in(row(5), inner.x, inner.y + 5, &separator);

    let tab = model.active_tab();
    let vp = model.tabs.viewport(tab);
    let body_height = inner
        .height
        .saturating_sub(MAIN_HEADER_ROWS + MAIN_FOOTER_ROWS)
        .min(vp.height);
    let body = Rect::new(
        inner.x + 1,
        inner.y + MAIN_HEADER_ROWS,
        inner.width.saturating_sub(2).min(vp.width),
        body_height,
    );
    let lines = tab_lines(model, tab, vp.width, vp.height);
    canvas.put_lines_in(body, &lines, vp.offset);

    if inner.height > MAIN_HEADER_ROWS {
        let y = inner.y + inner.height - 1;
        let footer = Line::styled(truncate(FOOTER_HINTS, width), Tone::Muted);
        canvas.put_line_in(row(inner.height - 1), inner.x, y, &footer);
    }
}

/// `Kedastral Monitor - workload: X  [LIVE]  ⠋ Fetching...  Last: Ns ago`
#[must_use]
pub fn status_line(model: &DashboardModel, now: Instant) -> Line {
    let mode_tone = match model.mode {
        Mode::Live => Tone::Success,
        Mode::Paused => Tone::Warning,
    };
    let mut line = Line::new(vec![
        Span::new("Kedastral Monitor", Tone::Primary).bold(),
        Span::plain(format!(" - workload: {}  ", model.workload())),
        Span::new(format!("[{}]", model.mode.label()), mode_tone).bold(),
        Span::new(
            format!("  every {}", format_duration(model.refresh_interval())),
            Tone::Muted,
        ),
    ]);
    if model.loading {
        let elapsed = model
            .loading_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        line.push(Span::new(
            format!("  {} Fetching...", spinner(elapsed)),
            Tone::Secondary,
        ));
    }
    let last = model.last_update.map_or_else(
        || "  Last: never".to_string(),
        |at| format!("  Last: {}s ago", now.saturating_duration_since(at).as_secs()),
    );
    line.push(Span::new(last, Tone::Muted));
    line
}

/// `Status: Forecaster ✓  Scaler ✗  Forecast age: Ns  [STALE]`
#[must_use]
pub fn health_line(model: &DashboardModel) -> Line {
    let mark = |healthy: bool| {
        Span::new(
            health_mark(healthy).to_string(),
            if healthy { Tone::Success } else { Tone::Error },
        )
    };
    let mut line = Line::new(vec![
        Span::plain("Status: Forecaster "),
        mark(model.forecaster_healthy),
        Span::plain("  Scaler "),
        mark(model.scaler_healthy),
    ]);
    if let Some(snapshot) = &model.snapshot {
        line.push(Span::plain(format!(
            "  Forecast age: {}s",
            snapshot.forecast_age.as_secs()
        )));
        if snapshot.stale {
            line.push(Span::new("  [STALE]", Tone::Warning).bold());
        }
    }
    line
}

/// `■ Charts  ▤ Tables  ⚙ Config  ≡ Logs` with the active tab highlighted.
#[must_use]
pub fn tab_bar_line(active: TabId) -> Line {
    let mut line = Line::empty();
    for (i, tab) in TabId::ALL.into_iter().enumerate() {
        if i > 0 {
            line.push(Span::plain("  "));
        }
        let text = format!("{} {}", tab.icon(), tab.label());
        if tab == active {
            line.push(Span::new(text, Tone::Primary).bold());
        } else {
            line.push(Span::new(text, Tone::Muted));
        }
    }
    line
}

/// Content of one main-panel tab at the given viewport size.
#[must_use]
pub fn tab_lines(model: &DashboardModel, tab: TabId, width: u16, height: u16) -> Vec<Line> {
    match tab {
        TabId::Charts => chart::chart_lines(model.snapshot.as_ref().map(|s| &s.snapshot), width, height),
        TabId::Tables => replica_table_lines(model),
        TabId::Config => config_lines(model),
        TabId::Logs => {
            let lines: Vec<Line> = model.bottom.recent_logs().map(log_line).collect();
            if lines.is_empty() {
                vec![Line::styled("No log entries", Tone::Muted)]
            } else {
                lines
            }
        }
    }
}

fn log_line(entry: &LogLine) -> Line {
    let tone = match entry.level {
        LogLevel::Info => Tone::Normal,
        LogLevel::Warn => Tone::Warning,
        LogLevel::Error => Tone::Error,
    };
    Line::styled(entry.format(), tone)
}

/// Replica decisions per step, lead-time row marked.
#[must_use]
pub fn replica_table_lines(model: &DashboardModel) -> Vec<Line> {
    let Some(enriched) = &model.snapshot else {
        return vec![Line::styled("No forecast data available", Tone::Muted)];
    };
    let snap = &enriched.snapshot;
    let values = snap.median();
    let mut lines = vec![
        Line::new(vec![Span::new("REPLICA SCALING DECISIONS", Tone::Primary).bold()]),
        Line::empty(),
        Line::new(vec![
            Span::new(format!("{:<10}  {:<12}  {:<8}", "Time", "Forecast", "Desired"), Tone::Secondary)
                .bold(),
        ]),
        Line::styled(format!("{}  {}  {}", "─".repeat(10), "─".repeat(12), "─".repeat(8)), Tone::Border),
    ];

    for (i, replicas) in snap.desired_replicas.iter().take(MAX_TABLE_ROWS).enumerate() {
        let offset = step_offset(snap.step_offset_secs(i));
        let forecast = values
            .get(i)
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        let row = format!("{offset:<10}  {forecast:<12}  {replicas:<8}");
        if i == enriched.lead_time_index {
            lines.push(Line::new(vec![
                Span::new(row, Tone::Primary).bold(),
                Span::new(" ← SELECTED", Tone::Success).bold(),
            ]));
        } else {
            lines.push(Line::plain(row));
        }
    }
    let total = snap.desired_replicas.len();
    if total > MAX_TABLE_ROWS {
        lines.push(Line::styled(
            format!("... and {} more steps", total - MAX_TABLE_ROWS),
            Tone::Muted,
        ));
    }
    lines.push(Line::empty());
    lines.push(Line::styled(
        format!(
            "Lead time: {} (step {})",
            format_duration(model.config.lead_time()),
            enriched.lead_time_index
        ),
        Tone::Muted,
    ));
    lines
}

fn section(title: &str) -> Line {
    Line::new(vec![Span::new(title, Tone::Primary).bold()])
}

fn field(label: &str, value: impl Into<String>) -> Line {
    Line::new(vec![
        Span::new(format!("  {label:<18}"), Tone::Muted),
        Span::plain(value),
    ])
}

/// Workload, scaler and dashboard settings.
#[must_use]
pub fn config_lines(model: &DashboardModel) -> Vec<Line> {
    let mut lines = vec![section("Workload Configuration")];
    lines.push(field("Workload:", model.workload()));
    match &model.snapshot {
        Some(enriched) => {
            let snap = &enriched.snapshot;
            lines.push(field("Metric:", snap.metric.clone()));
            lines.push(field("Step:", format_duration(snap.step())));
            lines.push(field("Horizon:", format_duration(snap.horizon())));
            lines.push(field(
                "Generated:",
                snap.generated_at.map_or_else(
                    || "unknown".to_string(),
                    |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
                ),
            ));
            lines.push(field("API version:", format!("v{}", snap.api_version)));
        }
        None => lines.push(field("Forecast:", "not yet received")),
    }

    lines.push(Line::empty());
    lines.push(section("Scaler Configuration"));
    lines.push(field("URL:", model.config.scaler_url.clone()));
    lines.push(field(
        "Status:",
        if model.scaler_healthy { "Healthy" } else { "Unreachable" },
    ));
    if let Some(metrics) = &model.metrics {
        lines.push(field("Active:", if metrics.active { "yes" } else { "no" }));
        lines.push(field("Desired replicas:", metrics.desired_replicas.to_string()));
    }

    lines.push(Line::empty());
    lines.push(section("TUI Configuration"));
    lines.push(field("Forecaster URL:", model.config.forecaster_url.clone()));
    lines.push(field("Refresh interval:", format_duration(model.refresh_interval())));
    lines.push(field("Lead time:", format_duration(model.config.lead_time())));
    lines.push(field("Theme:", model.theme().as_str()));
    lines.push(field("Mode:", model.mode.label()));
    lines.push(field("Config file:", model.config.config_file.display().to_string()));
    lines
}

// ──────────────────── bottom panel ────────────────────

fn draw_bottom(canvas: &mut Canvas, model: &DashboardModel, area: Rect) {
    if area.is_empty() {
        return;
    }
    let mode = model.bottom.mode();
    let title = format!("{} [b]", mode.label());
    canvas.draw_box(area, border_tone(model, PanelId::Bottom), Some(&title));
    let inner = area.inner();
    let visible = usize::from(inner.height);
    let lines = bottom_lines(model);
    let scroll = match mode {
        BottomMode::Logs | BottomMode::Events => lines
            .len()
            .saturating_sub(visible)
            .saturating_sub(model.bottom.scroll()),
        BottomMode::Metrics | BottomMode::Info => 0,
    };
    canvas.put_lines_in(inner, &lines, scroll);
}

/// Lines for the bottom panel's current mode.
#[must_use]
pub fn bottom_lines(model: &DashboardModel) -> Vec<Line> {
    match model.bottom.mode() {
        BottomMode::Logs => {
            let lines: Vec<Line> = model.bottom.recent_logs().map(log_line).collect();
            if lines.is_empty() {
                vec![Line::styled("No log entries", Tone::Muted)]
            } else {
                lines
            }
        }
        BottomMode::Metrics => metrics_lines(model.metrics.as_ref()),
        BottomMode::Events => {
            if model.bottom.events().is_empty() {
                vec![Line::styled("No events", Tone::Muted)]
            } else {
                model.bottom.events().iter().map(log_line).collect()
            }
        }
        BottomMode::Info => info_lines(model),
    }
}

fn metrics_lines(metrics: Option<&ScalerMetrics>) -> Vec<Line> {
    let Some(m) = metrics else {
        return vec![Line::styled("No scaler metrics yet", Tone::Muted)];
    };
    vec![
        field("Active:", if m.active { "yes" } else { "no" }),
        field("Desired replicas:", m.desired_replicas.to_string()),
        field("Forecast age seen:", format!("{:.1}s", m.forecast_age_seen_secs)),
        field(
            "Connection:",
            if m.connection_healthy { "healthy" } else { "unhealthy" },
        ),
    ]
}

fn info_lines(model: &DashboardModel) -> Vec<Line> {
    let api = model
        .snapshot
        .as_ref()
        .map_or_else(|| "-".to_string(), |s| format!("v{}", s.snapshot.api_version));
    let quantiles = model
        .snapshot
        .as_ref()
        .is_some_and(|s| s.snapshot.api_version >= 2);
    vec![
        field("Forecaster:", model.config.forecaster_url.clone()),
        field("Scaler:", model.config.scaler_url.clone()),
        field("API version:", api),
        field("Refresh:", format_duration(model.refresh_interval())),
        field("Lead time:", format_duration(model.config.lead_time())),
        field(
            "Features:",
            if quantiles {
                "quantile bands, stale detection, export, clipboard"
            } else {
                "single-point forecast, stale detection, export, clipboard"
            },
        ),
    ]
}

// ──────────────────── overlays ────────────────────

fn draw_help(canvas: &mut Canvas) {
    let mut lines = vec![
        Line::new(vec![Span::new("Key Bindings", Tone::Primary).bold()]),
        Line::empty(),
    ];
    for section in help_sections() {
        lines.push(Line::new(vec![Span::new(section.title, Tone::Secondary).bold()]));
        for b in section.bindings {
            lines.push(Line::new(vec![
                Span::new(format!("  {:<16}", b.keys), Tone::Primary),
                Span::plain(b.description),
            ]));
        }
        lines.push(Line::empty());
    }
    lines.push(Line::styled("Press any key to close", Tone::Muted));

    let width = canvas.width().saturating_sub(4).min(60);
    let height = u16::try_from(lines.len() + 2)
        .unwrap_or(u16::MAX)
        .min(canvas.height().saturating_sub(2));
    let area = Rect::new(
        (canvas.width() - width) / 2,
        (canvas.height() - height) / 2,
        width,
        height,
    );
    canvas.clear_rect(area);
    canvas.draw_box(area, Tone::BorderFocused, Some("Help"));
    let inner = area.inner();
    canvas.put_lines_in(
        Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(2), inner.height),
        &lines,
        0,
    );
}

fn draw_toasts(canvas: &mut Canvas, model: &DashboardModel, now: Instant) {
    for (i, toast) in model.live_toasts(now).enumerate() {
        let tone = match toast.level {
            ToastLevel::Info => Tone::Primary,
            ToastLevel::Success => Tone::Success,
            ToastLevel::Warning => Tone::Warning,
            ToastLevel::Error => Tone::Error,
        };
        let max = usize::from(canvas.width() / 2);
        let text = format!(" {} ", truncate(&toast.message, max));
        let width = u16::try_from(text.chars().count()).unwrap_or(u16::MAX);
        let x = canvas.width().saturating_sub(width + 1);
        let y = 1 + u16::try_from(i).unwrap_or(u16::MAX);
        canvas.put_span_in(canvas.bounds(), x, y, &Span::new(text, tone).bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{EnrichedSnapshot, QuantileSnapshot, WorkloadInfo};
    use crate::core::config::Config;
    use crate::tui::model::{Endpoint, FetchFailure};
    use crate::core::errors::ErrorClass;
    use std::collections::BTreeMap;

    fn test_model(size: (u16, u16)) -> DashboardModel {
        DashboardModel::new(
            Config {
                forecaster_url: "http://forecaster:8081".to_string(),
                workload: "api".to_string(),
                ..Config::default()
            },
            size,
        )
    }

    fn time() -> FrameTime {
        FrameTime::now()
    }

    fn enriched(replicas: usize, stale: bool) -> EnrichedSnapshot {
        let snapshot = QuantileSnapshot {
            workload: "api".to_string(),
            metric: "rps".to_string(),
            generated_at: Some(Utc::now()),
            step_seconds: 30,
            horizon_seconds: 30 * i64::try_from(replicas).unwrap(),
            quantiles: BTreeMap::from([
                ("p10".to_string(), (0..replicas).map(|i| i as f64).collect()),
                ("p50".to_string(), (0..replicas).map(|i| i as f64 + 1.0).collect()),
                ("p90".to_string(), (0..replicas).map(|i| i as f64 + 2.0).collect()),
            ]),
            values: Vec::new(),
            desired_replicas: (1..=replicas as i64).collect(),
            api_version: 2,
        };
        EnrichedSnapshot::new(snapshot, stale, Utc::now(), Duration::from_secs(60))
    }

    #[test]
    fn too_small_terminal_shows_sizes() {
        let model = test_model((60, 20));
        let text = render_to_string(&model, time());
        assert!(text.contains("Terminal too small."));
        assert!(text.contains("Current: 60x20"));
        assert!(text.contains("Minimum: 80x24"));
        assert!(!text.contains("Workloads"));
    }

    #[test]
    fn full_frame_has_all_panels() {
        let mut model = test_model((120, 40));
        model.snapshot = Some(enriched(5, true));
        let text = render_to_string(&model, time());
        assert!(text.contains("Kedastral Monitor - workload: api"));
        assert!(text.contains("[LIVE]"));
        assert!(text.contains("Status: Forecaster ✗  Scaler ✗"));
        assert!(text.contains("[STALE]"));
        assert!(text.contains("■ Charts  ▤ Tables  ⚙ Config  ≡ Logs"));
        assert!(text.contains("Forecast Timeline (P10/P50/P90)"));
        assert!(text.contains("Workloads"));
        assert!(text.contains("No workloads"));
        assert!(text.contains("Logs [b]"));
        assert!(text.contains("[q] quit"));
    }

    #[test]
    fn error_line_appears_when_set() {
        let mut model = test_model((120, 40));
        model.record_failure(
            Endpoint::Forecast,
            &FetchFailure {
                code: "KTUI-2002",
                class: ErrorClass::Protocol,
                message: "HTTP 503".to_string(),
            },
            Instant::now(),
        );
        let text = render_to_string(&model, time());
        assert!(text.contains("Error: forecast: HTTP 503"));
    }

    #[test]
    fn loading_shows_spinner() {
        let mut model = test_model((120, 40));
        model.loading = true;
        model.loading_since = Some(Instant::now());
        let line = status_line(&model, Instant::now()).text();
        assert!(line.contains("Fetching..."), "{line}");
        assert!(line.contains("Last: never"), "{line}");
    }

    #[test]
    fn replica_table_survives_extreme_steps() {
        let mut model = test_model((120, 40));
        let mut huge = enriched(4, false);
        huge.snapshot.step_seconds = i64::MAX;
        model.snapshot = Some(huge);
        assert!(!replica_table_lines(&model).is_empty());

        let mut negative = enriched(4, false);
        negative.snapshot.step_seconds = -30;
        negative.snapshot.generated_at = None;
        model.snapshot = Some(negative);
        let table: Vec<String> = replica_table_lines(&model).iter().map(Line::text).collect();
        assert!(table.iter().any(|row| row.starts_with("Now")));
        let config: Vec<String> = config_lines(&model).iter().map(Line::text).collect();
        assert!(config.iter().any(|row| row.contains("unknown")));
    }

    #[test]
    fn replica_table_marks_lead_time_and_truncates() {
        let mut model = test_model((120, 40));
        model.snapshot = Some(enriched(14, false));
        let text: Vec<String> = replica_table_lines(&model).iter().map(Line::text).collect();
        assert_eq!(text[0], "REPLICA SCALING DECISIONS");
        assert!(text[4].starts_with("Now "));
        // step 30s, lead 60s → index 2 → "+1m".
        assert!(text[6].starts_with("+1m"), "{}", text[6]);
        assert!(text[6].ends_with("← SELECTED"));
        assert!(text[5].starts_with("+30s"));
        assert_eq!(text.iter().filter(|l| l.contains("SELECTED")).count(), 1);
        assert!(text.contains(&"... and 4 more steps".to_string()));
    }

    #[test]
    fn sidebar_rows_show_age_and_health() {
        let mut model = test_model((120, 40));
        let wall = Utc::now();
        model.sidebar.set_workloads(
            vec![
                WorkloadInfo {
                    name: "api".to_string(),
                    namespace: None,
                    last_forecast: Some(wall - chrono::Duration::seconds(125)),
                    healthy: true,
                    current_replicas: Some(3),
                },
                WorkloadInfo {
                    name: "batch".to_string(),
                    namespace: None,
                    last_forecast: None,
                    healthy: false,
                    current_replicas: None,
                },
            ],
            "api",
        );
        let rows: Vec<String> = sidebar_lines(&model, 28, wall).iter().map(Line::text).collect();
        assert!(rows[0].starts_with("> api"));
        assert!(rows[0].ends_with("2m [✓]"), "{}", rows[0]);
        assert!(rows[1].starts_with("  batch"));
        assert!(rows[1].ends_with("--- [!]"), "{}", rows[1]);
        assert_eq!(rows[0].chars().count(), 28);
    }

    #[test]
    fn config_tab_has_three_sections() {
        let model = test_model((120, 40));
        let text: Vec<String> = config_lines(&model).iter().map(Line::text).collect();
        for title in ["Workload Configuration", "Scaler Configuration", "TUI Configuration"] {
            assert!(text.iter().any(|l| l == title), "missing {title}");
        }
    }

    #[test]
    fn help_overlay_lists_bindings() {
        let mut model = test_model((120, 40));
        model.show_help = true;
        let text = render_to_string(&model, time());
        assert!(text.contains("Key Bindings"));
        assert!(text.contains("Press any key to close"));
        assert!(text.contains("Ctrl+R"));
    }

    #[test]
    fn toasts_render_until_expiry() {
        let mut model = test_model((120, 40));
        let t = time();
        model.push_toast(ToastLevel::Success, "✓ Saved", Duration::from_secs(2), t.instant);
        assert!(render_to_string(&model, t).contains("✓ Saved"));
        let later = FrameTime {
            instant: t.instant + Duration::from_secs(3),
            wall: t.wall,
        };
        assert!(!render_to_string(&model, later).contains("✓ Saved"));
    }

    #[test]
    fn bottom_modes_render_their_content() {
        let mut model = test_model((120, 40));
        model.log(LogLevel::Info, "hello log");
        assert!(bottom_lines(&model)[0].text().ends_with("hello log"));
        let key = crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char('b'),
            crossterm::event::KeyModifiers::NONE,
        );
        use crate::tui::panels::Panel;
        model.bottom.handle_key(&key);
        assert_eq!(bottom_lines(&model)[0].text(), "No scaler metrics yet");
        model.bottom.handle_key(&key);
        assert_eq!(bottom_lines(&model)[0].text(), "No events");
        model.bottom.handle_key(&key);
        assert!(bottom_lines(&model)[0].text().contains("Forecaster:"));
    }

    #[test]
    fn collapsed_panels_are_not_drawn() {
        let mut model = test_model((120, 40));
        model.layout_state.toggle_sidebar();
        model.layout_state.toggle_bottom();
        let text = render_to_string(&model, time());
        assert!(!text.contains("Workloads"));
        assert!(!text.contains("Logs [b]"));
        assert!(text.contains("Kedastral Monitor"));
    }
}
