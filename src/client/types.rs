//! Wire payloads decoded from the forecaster and scaler, plus the enriched
//! forms the dashboard displays.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const P10: &str = "p10";
pub const P50: &str = "p50";
pub const P90: &str = "p90";

/// One forecast result (v1 payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub workload: String,
    #[serde(default)]
    pub metric: String,
    /// Absent on some upstream builds; the age is then unknown.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    /// Signed on the wire; non-positive values are carried through as-is.
    #[serde(default)]
    pub step_seconds: i64,
    #[serde(default)]
    pub horizon_seconds: i64,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub desired_replicas: Vec<i64>,
}

/// Forecast result with optional quantile bands (v2 payload, v1 compatible).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantileSnapshot {
    #[serde(default)]
    pub workload: String,
    #[serde(default)]
    pub metric: String,
    /// Absent on some upstream builds; the age is then unknown.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    /// Signed on the wire; non-positive values are carried through as-is.
    #[serde(default)]
    pub step_seconds: i64,
    #[serde(default)]
    pub horizon_seconds: i64,
    #[serde(default)]
    pub quantiles: BTreeMap<String, Vec<f64>>,
    /// Legacy single series; stands in for p50 when `quantiles` is empty.
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub desired_replicas: Vec<i64>,
    /// 2 when the upstream sent quantiles, else 1. Derived, never on the wire.
    #[serde(skip, default = "default_api_version")]
    pub api_version: u8,
}

const fn default_api_version() -> u8 {
    1
}

impl QuantileSnapshot {
    /// Detect the API version and fill in p50 from `values` for v1 bodies.
    #[must_use]
    pub fn with_detected_version(mut self) -> Self {
        if self.quantiles.is_empty() {
            self.api_version = 1;
            if !self.values.is_empty() {
                self.quantiles.insert(P50.to_string(), self.values.clone());
            }
        } else {
            self.api_version = 2;
        }
        self
    }

    #[must_use]
    pub fn band(&self, label: &str) -> Option<&[f64]> {
        self.quantiles
            .get(label)
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    /// Median series: p50 when present, else the legacy values.
    #[must_use]
    pub fn median(&self) -> &[f64] {
        self.band(P50).unwrap_or(&self.values)
    }

    /// Step duration; zero when upstream sent a non-positive step.
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::from_secs(non_negative(self.step_seconds))
    }

    #[must_use]
    pub fn horizon(&self) -> Duration {
        Duration::from_secs(non_negative(self.horizon_seconds))
    }

    /// Seconds from "now" to step `index`, saturating.
    #[must_use]
    pub fn step_offset_secs(&self, index: usize) -> u64 {
        u64::try_from(index)
            .unwrap_or(u64::MAX)
            .saturating_mul(non_negative(self.step_seconds))
    }
}

fn non_negative(secs: i64) -> u64 {
    u64::try_from(secs).unwrap_or(0)
}

impl From<Snapshot> for QuantileSnapshot {
    fn from(value: Snapshot) -> Self {
        Self {
            workload: value.workload,
            metric: value.metric,
            generated_at: value.generated_at,
            step_seconds: value.step_seconds,
            horizon_seconds: value.horizon_seconds,
            quantiles: BTreeMap::new(),
            values: value.values,
            desired_replicas: value.desired_replicas,
            api_version: 1,
        }
        .with_detected_version()
    }
}

/// Step access shared by both payload versions.
pub trait ForecastSteps {
    fn step_seconds(&self) -> i64;
    fn generated_at(&self) -> Option<DateTime<Utc>>;
    fn replica_count(&self) -> usize;
}

impl ForecastSteps for Snapshot {
    fn step_seconds(&self) -> i64 {
        self.step_seconds
    }
    fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }
    fn replica_count(&self) -> usize {
        self.desired_replicas.len()
    }
}

impl ForecastSteps for QuantileSnapshot {
    fn step_seconds(&self) -> i64 {
        self.step_seconds
    }
    fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }
    fn replica_count(&self) -> usize {
        self.desired_replicas.len()
    }
}

/// A snapshot plus the display-side facts derived when it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSnapshot<S = QuantileSnapshot> {
    pub snapshot: S,
    /// From the `X-Kedastral-Stale` header; never recomputed locally.
    pub stale: bool,
    pub forecast_age: Duration,
    pub lead_time_index: usize,
}

impl<S: ForecastSteps> EnrichedSnapshot<S> {
    #[must_use]
    pub fn new(snapshot: S, stale: bool, now: DateTime<Utc>, lead_time: Duration) -> Self {
        let forecast_age = snapshot
            .generated_at()
            .and_then(|generated| (now - generated).to_std().ok())
            .unwrap_or(Duration::ZERO);
        let lead_time_index =
            lead_time_index(lead_time, snapshot.step_seconds(), snapshot.replica_count());
        Self {
            snapshot,
            stale,
            forecast_age,
            lead_time_index,
        }
    }
}

/// `floor(lead / step)` clamped to the last replica index, never below 0.
/// A non-positive step yields 0.
#[must_use]
pub fn lead_time_index(lead_time: Duration, step_seconds: i64, replica_count: usize) -> usize {
    let step = non_negative(step_seconds);
    if step == 0 || replica_count == 0 {
        return 0;
    }
    let steps = lead_time.as_secs() / step;
    usize::try_from(steps).map_or(replica_count - 1, |steps| steps.min(replica_count - 1))
}

/// Sidebar row from the workload listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub last_forecast: Option<DateTime<Utc>>,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_replicas: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkloadList {
    #[serde(default)]
    pub workloads: Vec<WorkloadInfo>,
}

/// Scaler state scraped from its metrics exposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScalerMetrics {
    pub active: bool,
    pub desired_replicas: i64,
    pub forecast_age_seen_secs: f64,
    pub connection_healthy: bool,
}
