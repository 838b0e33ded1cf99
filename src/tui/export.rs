//! File export and OSC 52 clipboard copy of the active tab.
//!
//! Building an export is pure ([`build_export`]); writing it is the
//! runtime's job ([`write_export`]).

#![allow(missing_docs)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::client::types::QuantileSnapshot;
use crate::core::errors::{KedastralError, Result};
use crate::tui::canvas::Line;
use crate::tui::model::{DashboardModel, ExportJob};
use crate::tui::panels::TabId;
use crate::tui::render;

/// Largest base64 payload written in one OSC 52 sequence.
pub const MAX_OSC52_PAYLOAD: usize = 74_994;

pub const CSV_HEADER: &str = "Time Offset (seconds),Forecast Value,Desired Replicas";

/// `YYYYmmdd-HHMMSS` used in export file names.
#[must_use]
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastExport<'a> {
    #[serde(flatten)]
    snapshot: &'a QuantileSnapshot,
    api_version: u8,
    stale: bool,
    forecast_age_seconds: f64,
    lead_time_index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigExport<'a> {
    workload: &'a str,
    forecaster_url: &'a str,
    scaler_url: &'a str,
    refresh_interval_seconds: f64,
    lead_time_seconds: u64,
    theme: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    horizon_seconds: Option<i64>,
}

/// Render the active tab's export. `Err` carries the toast text.
pub fn build_export(model: &DashboardModel, stamp: &str) -> std::result::Result<ExportJob, String> {
    match model.active_tab() {
        TabId::Charts => {
            let enriched = model.snapshot.as_ref().ok_or("no forecast data to export")?;
            let body = ForecastExport {
                snapshot: &enriched.snapshot,
                api_version: enriched.snapshot.api_version,
                stale: enriched.stale,
                forecast_age_seconds: enriched.forecast_age.as_secs_f64(),
                lead_time_index: enriched.lead_time_index,
            };
            let contents = serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?;
            Ok(ExportJob {
                file_name: format!("kedastral-forecast-{stamp}.json"),
                contents,
            })
        }
        TabId::Tables => {
            let enriched = model.snapshot.as_ref().ok_or("no replica data to export")?;
            Ok(ExportJob {
                file_name: format!("kedastral-replicas-{stamp}.csv"),
                contents: replicas_csv(&enriched.snapshot),
            })
        }
        TabId::Config => {
            let snap = model.snapshot.as_ref().map(|s| &s.snapshot);
            let body = ConfigExport {
                workload: model.workload(),
                forecaster_url: &model.config.forecaster_url,
                scaler_url: &model.config.scaler_url,
                refresh_interval_seconds: model.refresh_interval().as_secs_f64(),
                lead_time_seconds: model.config.lead_time_secs,
                theme: model.theme().as_str(),
                metric: snap.map(|s| s.metric.as_str()),
                step_seconds: snap.map(|s| s.step_seconds),
                horizon_seconds: snap.map(|s| s.horizon_seconds),
            };
            let contents = serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?;
            Ok(ExportJob {
                file_name: format!("kedastral-config-{stamp}.json"),
                contents,
            })
        }
        TabId::Logs => {
            let mut contents = String::new();
            for line in model.bottom.logs() {
                contents.push_str(&line.format());
                contents.push('\n');
            }
            Ok(ExportJob {
                file_name: format!("kedastral-logs-{stamp}.txt"),
                contents,
            })
        }
    }
}

/// One CSV row per step: offset in seconds, median forecast, replicas.
#[must_use]
pub fn replicas_csv(snapshot: &QuantileSnapshot) -> String {
    let values = snapshot.median();
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (i, replicas) in snapshot.desired_replicas.iter().enumerate() {
        let offset = snapshot.step_offset_secs(i);
        let value = values.get(i).map_or_else(String::new, |v| format!("{v:.2}"));
        out.push_str(&format!("{offset},{value},{replicas}\n"));
    }
    out
}

/// Write `job` into `dir`, creating it when missing.
pub fn write_export(dir: &Path, job: &ExportJob) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| KedastralError::io(dir, source))?;
    let path = dir.join(&job.file_name);
    fs::write(&path, job.contents.as_bytes()).map_err(|source| KedastralError::io(&path, source))?;
    Ok(path)
}

/// Plain text of the active tab as it is laid out on screen.
#[must_use]
pub fn clipboard_text(model: &DashboardModel) -> String {
    let tab = model.active_tab();
    let vp = model.tabs.viewport(tab);
    lines_to_text(&render::tab_lines(model, tab, vp.width, vp.height))
}

fn lines_to_text(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.text().trim_end());
        out.push('\n');
    }
    out
}

/// `ESC ] 52 ; c ; <base64> BEL`, or an error when the payload is too large.
pub fn osc52_sequence(text: &str) -> Result<String> {
    let encoded = STANDARD.encode(text.as_bytes());
    if encoded.len() > MAX_OSC52_PAYLOAD {
        return Err(KedastralError::Runtime {
            details: format!(
                "OSC 52 payload too large ({} > {MAX_OSC52_PAYLOAD})",
                encoded.len()
            ),
        });
    }
    Ok(format!("\x1b]52;c;{encoded}\x07"))
}

/// Send `text` to the terminal clipboard. Returns the text size in bytes.
pub fn copy_to_clipboard<W: Write>(out: &mut W, text: &str) -> Result<usize> {
    let seq = osc52_sequence(text)?;
    out.write_all(seq.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| KedastralError::Terminal {
            details: format!("clipboard write: {e}"),
        })?;
    Ok(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::EnrichedSnapshot;
    use crate::core::config::Config;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn model_with_data() -> DashboardModel {
        let mut model = DashboardModel::new(
            Config {
                forecaster_url: "http://forecaster:8081".to_string(),
                workload: "api".to_string(),
                ..Config::default()
            },
            (120, 40),
        );
        let snapshot = QuantileSnapshot {
            workload: "api".to_string(),
            metric: "rps".to_string(),
            generated_at: Some(chrono::Utc::now()),
            step_seconds: 60,
            horizon_seconds: 180,
            quantiles: BTreeMap::from([("p50".to_string(), vec![10.0, 12.5, 15.25])]),
            values: Vec::new(),
            desired_replicas: vec![2, 3, 4],
            api_version: 2,
        };
        model.snapshot = Some(EnrichedSnapshot::new(
            snapshot,
            true,
            chrono::Utc::now(),
            Duration::from_secs(60),
        ));
        model
    }

    #[test]
    fn csv_has_header_and_one_row_per_step() {
        let model = model_with_data();
        let csv = replicas_csv(&model.snapshot.as_ref().unwrap().snapshot);
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows[0], CSV_HEADER);
        assert_eq!(rows[1], "0,10.00,2");
        assert_eq!(rows[3], "120,15.25,4");
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn csv_offsets_saturate_instead_of_overflowing() {
        let model = model_with_data();
        let mut snapshot = model.snapshot.unwrap().snapshot;
        snapshot.step_seconds = i64::MAX;
        let csv = replicas_csv(&snapshot);
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows[1], "0,10.00,2");
        assert_eq!(rows[3], format!("{},15.25,4", u64::MAX));
    }

    #[test]
    fn export_names_follow_the_active_tab() {
        let mut model = model_with_data();
        let expected = [
            (TabId::Charts, "kedastral-forecast-20240501-120000.json"),
            (TabId::Tables, "kedastral-replicas-20240501-120000.csv"),
            (TabId::Config, "kedastral-config-20240501-120000.json"),
            (TabId::Logs, "kedastral-logs-20240501-120000.txt"),
        ];
        for (tab, name) in expected {
            model.tabs.select(tab);
            let job = build_export(&model, "20240501-120000").unwrap();
            assert_eq!(job.file_name, name);
        }
    }

    #[test]
    fn forecast_export_carries_enrichment() {
        let model = model_with_data();
        let job = build_export(&model, "x").unwrap();
        let value: serde_json::Value = serde_json::from_str(&job.contents).unwrap();
        assert_eq!(value["apiVersion"], 2);
        assert_eq!(value["stale"], true);
        assert_eq!(value["leadTimeIndex"], 1);
        assert_eq!(value["workload"], "api");
        assert_eq!(value["quantiles"]["p50"][1], 12.5);
    }

    #[test]
    fn data_tabs_refuse_to_export_nothing() {
        let mut model = model_with_data();
        model.snapshot = None;
        assert!(build_export(&model, "x").is_err());
        model.tabs.select(TabId::Tables);
        assert!(build_export(&model, "x").is_err());
        model.tabs.select(TabId::Config);
        let job = build_export(&model, "x").unwrap();
        assert!(!job.contents.contains("stepSeconds"));
    }

    #[test]
    fn write_export_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Downloads");
        let job = ExportJob {
            file_name: "kedastral-logs-x.txt".to_string(),
            contents: "[12:00:00] hi\n".to_string(),
        };
        let path = write_export(&target, &job).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[12:00:00] hi\n");
    }

    #[test]
    fn osc52_wraps_base64_payload() {
        let mut out = Vec::new();
        let n = copy_to_clipboard(&mut out, "hi").unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b]52;c;aGk=\x07");
    }

    #[test]
    fn osc52_rejects_oversized_payloads() {
        let big = "x".repeat(MAX_OSC52_PAYLOAD);
        assert!(osc52_sequence(&big).is_err());
    }

    #[test]
    fn clipboard_text_matches_the_table_tab() {
        let mut model = model_with_data();
        model.tabs.select(TabId::Tables);
        let text = clipboard_text(&model);
        assert!(text.starts_with("REPLICA SCALING DECISIONS\n"));
        assert!(text.contains("← SELECTED"));
    }
}
