//! Property-based tests for dashboard reducer and layout invariants.
//!
//! Uses `proptest` to verify that arbitrary sequences of dashboard messages
//! keep the model consistent: bounded collections, valid focus and tabs,
//! clamped settings, loading bookkeeping, and panic-free rendering.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use proptest::prelude::*;

use super::chart;
use super::layout::{MIN_USABLE_COLS, MIN_USABLE_ROWS, compute_layout};
use super::model::{DashboardModel, DashboardMsg, FetchFailure, MAX_TOASTS};
use super::panels::{EVENT_CAPACITY, LOG_CAPACITY, TabId};
use super::render::{self, FrameTime};
use super::update;
use crate::client::types::{EnrichedSnapshot, QuantileSnapshot, ScalerMetrics, WorkloadInfo};
use crate::core::config::{Config, MAX_REFRESH_INTERVAL_MS, MIN_REFRESH_INTERVAL_MS};
use crate::core::errors::ErrorClass;

// ──────────────────── strategies ────────────────────

fn arb_key_code() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Char('1')),
        Just(KeyCode::Char('2')),
        Just(KeyCode::Char('3')),
        Just(KeyCode::Char('4')),
        Just(KeyCode::Char('h')),
        Just(KeyCode::Char('l')),
        Just(KeyCode::Char('j')),
        Just(KeyCode::Char('k')),
        Just(KeyCode::Char('g')),
        Just(KeyCode::Char('G')),
        Just(KeyCode::Char('b')),
        Just(KeyCode::Char('r')),
        Just(KeyCode::Char('t')),
        Just(KeyCode::Char('w')),
        Just(KeyCode::Char('m')),
        Just(KeyCode::Char('?')),
        Just(KeyCode::Char('+')),
        Just(KeyCode::Char('-')),
        Just(KeyCode::Char(' ')),
        Just(KeyCode::Char('[')),
        Just(KeyCode::Char(']')),
        Just(KeyCode::Char('e')),
        Just(KeyCode::Char('c')),
        Just(KeyCode::Tab),
        Just(KeyCode::BackTab),
        Just(KeyCode::Esc),
        Just(KeyCode::Enter),
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::PageUp),
        Just(KeyCode::PageDown),
    ]
}

fn arb_key_event() -> impl Strategy<Value = KeyEvent> {
    (arb_key_code(), any::<bool>()).prop_map(|(code, ctrl_r)| {
        // Occasionally swap in Ctrl+R (retry); never Ctrl+C, which quits.
        let (code, modifiers) = if ctrl_r {
            (KeyCode::Char('r'), KeyModifiers::CONTROL)
        } else {
            (code, KeyModifiers::NONE)
        };
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    })
}

fn arb_series(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0f64..1_000.0, len)
}

fn arb_snapshot() -> impl Strategy<Value = EnrichedSnapshot> {
    (1usize..40, any::<bool>()).prop_flat_map(|(len, quantiles)| {
        (arb_series(len), arb_series(len), Just(quantiles), any::<bool>()).prop_map(
            move |(values, spread, quantiles, stale)| {
                let q = if quantiles {
                    BTreeMap::from([
                        ("p10".to_string(), values.iter().map(|v| v - 10.0).collect()),
                        ("p50".to_string(), values.clone()),
                        ("p90".to_string(), spread.iter().map(|s| s.abs() + 1_000.0).collect()),
                    ])
                } else {
                    BTreeMap::new()
                };
                let snapshot = QuantileSnapshot {
                    workload: "api".to_string(),
                    metric: "rps".to_string(),
                    generated_at: Some(Utc::now()),
                    step_seconds: 30,
                    horizon_seconds: 30 * i64::try_from(len).unwrap_or(0),
                    quantiles: q,
                    values: if quantiles { Vec::new() } else { values.clone() },
                    desired_replicas: (0..len as i64).collect(),
                    api_version: 1,
                }
                .with_detected_version();
                EnrichedSnapshot::new(snapshot, stale, Utc::now(), Duration::from_secs(300))
            },
        )
    })
}

fn arb_workloads() -> impl Strategy<Value = Vec<WorkloadInfo>> {
    prop::collection::vec(("[a-z]{1,12}", any::<bool>()), 0..8).prop_map(|items| {
        items
            .into_iter()
            .map(|(name, healthy)| WorkloadInfo {
                name,
                namespace: None,
                last_forecast: None,
                healthy,
                current_replicas: None,
            })
            .collect()
    })
}

fn arb_failure() -> impl Strategy<Value = FetchFailure> {
    "[a-z ]{0,40}".prop_map(|message| FetchFailure {
        code: "KTUI-2001",
        class: ErrorClass::Transport,
        message,
    })
}

fn arb_msg() -> impl Strategy<Value = DashboardMsg> {
    prop_oneof![
        6 => arb_key_event().prop_map(DashboardMsg::Key),
        1 => (0u16..300, 0u16..100).prop_map(|(cols, rows)| DashboardMsg::Resize { cols, rows }),
        1 => (0u64..4).prop_map(|generation| DashboardMsg::Tick { generation }),
        1 => (0u64..4, arb_snapshot()).prop_map(|(cycle, s)| DashboardMsg::ForecastFetched {
            cycle,
            result: Ok(Box::new(s)),
        }),
        1 => (0u64..4, arb_failure()).prop_map(|(cycle, f)| DashboardMsg::ForecastFetched {
            cycle,
            result: Err(f),
        }),
        1 => (0u64..4, any::<bool>()).prop_map(|(cycle, ok)| DashboardMsg::MetricsFetched {
            cycle,
            result: Ok(ScalerMetrics {
                active: ok,
                desired_replicas: 3,
                forecast_age_seen_secs: 12.0,
                connection_healthy: true,
            }),
        }),
        1 => (0u64..4, any::<bool>(), any::<bool>()).prop_map(|(cycle, forecaster, scaler)| {
            DashboardMsg::HealthChecked { cycle, forecaster, scaler }
        }),
        1 => arb_workloads().prop_map(|w| DashboardMsg::WorkloadsListed(Ok(w))),
        1 => "[a-z]{1,8}".prop_map(DashboardMsg::WorkloadSelected),
    ]
}

fn fresh_model() -> DashboardModel {
    let mut model = DashboardModel::new(
        Config {
            forecaster_url: "http://forecaster:8081".to_string(),
            workload: "api".to_string(),
            ..Config::default()
        },
        (120, 40),
    );
    let _ = update::init(&mut model);
    model
}

fn assert_model_invariants(model: &DashboardModel) {
    assert!(model.toasts.len() <= MAX_TOASTS, "toast stack exceeded capacity");
    assert!(model.bottom.logs().len() <= LOG_CAPACITY, "log ring exceeded capacity");
    assert!(model.bottom.events().len() <= EVENT_CAPACITY, "event ring exceeded capacity");

    let ms = model.config.refresh_interval_ms;
    assert!(
        (MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&ms),
        "refresh interval {ms}ms escaped its bounds"
    );

    let workloads = model.sidebar.workloads();
    if workloads.is_empty() {
        assert_eq!(model.sidebar.selected_index(), 0, "cursor non-zero with no workloads");
    } else {
        assert!(model.sidebar.selected_index() < workloads.len(), "sidebar cursor out of range");
    }

    assert_eq!(
        model.loading,
        !model.pending.is_empty(),
        "loading flag disagrees with pending endpoints"
    );

    assert!(TabId::ALL.contains(&model.active_tab()));
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of 1-60 messages preserves all model invariants.
    #[test]
    fn reducer_preserves_invariants(
        msgs in prop::collection::vec(arb_msg(), 1..60)
    ) {
        let mut model = fresh_model();
        for msg in msgs {
            let _ = update::update(&mut model, msg);
            assert_model_invariants(&model);
        }
    }

    /// Rendering never panics and always fills exactly the terminal.
    #[test]
    fn render_fills_the_terminal(
        msgs in prop::collection::vec(arb_msg(), 0..30),
        cols in 0u16..260,
        rows in 0u16..90,
    ) {
        let mut model = fresh_model();
        for msg in msgs {
            let _ = update::update(&mut model, msg);
        }
        let _ = update::update(&mut model, DashboardMsg::Resize { cols, rows });
        let canvas = render::render_frame(&model, FrameTime::now());
        prop_assert_eq!(canvas.width(), cols);
        prop_assert_eq!(canvas.height(), rows);
    }

    /// Results tagged with another cycle id never touch the snapshot.
    #[test]
    fn stale_cycle_results_are_ignored(snapshot in arb_snapshot(), offset in 1u64..5) {
        let mut model = fresh_model();
        let before = model.snapshot.clone();
        let stale = model.cycle.wrapping_add(offset);
        let _ = update::update(
            &mut model,
            DashboardMsg::ForecastFetched { cycle: stale, result: Ok(Box::new(snapshot)) },
        );
        prop_assert_eq!(model.snapshot, before);
    }

    /// The quit flag only transitions from false to true, never back.
    #[test]
    fn quit_is_monotonic(msgs in prop::collection::vec(arb_msg(), 1..30)) {
        let mut model = fresh_model();
        let _ = update::update(&mut model, DashboardMsg::Shutdown);
        prop_assert!(model.quit);
        for msg in msgs {
            let _ = update::update(&mut model, msg);
            prop_assert!(model.quit, "quit flag reverted to false after being set");
        }
    }

    /// Panels never overlap and never leave the terminal.
    #[test]
    fn layout_panels_are_disjoint_and_in_bounds(
        cols in MIN_USABLE_COLS..400,
        rows in MIN_USABLE_ROWS..200,
        sidebar_collapsed in any::<bool>(),
        bottom_collapsed in any::<bool>(),
    ) {
        let layout = compute_layout(cols, rows, sidebar_collapsed, bottom_collapsed);
        let rects = layout.rects();
        for (i, a) in rects.iter().enumerate() {
            prop_assert!(a.fits_within(cols, rows), "{a:?} leaves {cols}x{rows}");
            for b in &rects[i + 1..] {
                prop_assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
            }
        }
        prop_assert!(!layout.main.is_empty());
        prop_assert_eq!(layout.sidebar.is_empty(), sidebar_collapsed);
        prop_assert_eq!(layout.bottom.is_empty(), bottom_collapsed);
    }

    /// Layout is a pure function of its inputs.
    #[test]
    fn layout_is_deterministic(cols in 0u16..400, rows in 0u16..200, s in any::<bool>(), b in any::<bool>()) {
        prop_assert_eq!(compute_layout(cols, rows, s, b), compute_layout(cols, rows, s, b));
    }

    /// Plots are exactly the requested size whenever they are drawn at all.
    #[test]
    fn plots_match_the_requested_size(
        values in prop::collection::vec(-1e6f64..1e6, 0..100),
        width in 0u16..200,
        height in 0u16..50,
    ) {
        if let Some(plot) = chart::plot_single(&values, width, height) {
            prop_assert_eq!(plot.rows.len(), usize::from(height));
            prop_assert!(plot.rows.iter().all(|row| row.len() == usize::from(width)));
            prop_assert!(plot.min <= plot.max);
        }
    }
}
