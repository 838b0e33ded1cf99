//! Blocking HTTP client for the forecaster and scaler.
//!
//! Every call takes a [`Deadline`]; the per-request timeout is whatever is
//! left of it, so one deadline bounds a whole refresh cycle. Nothing here
//! retries: the caller decides when to ask again.

#![allow(missing_docs)]

pub mod metrics;
pub mod types;

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};

use crate::core::errors::{KedastralError, Result};

pub use self::types::{
    EnrichedSnapshot, QuantileSnapshot, ScalerMetrics, Snapshot, WorkloadInfo,
};

pub const STALE_HEADER: &str = "X-Kedastral-Stale";

/// Error bodies longer than this are cut before they reach the status line.
const MAX_ERROR_BODY: usize = 512;

pub const ENDPOINT_WORKLOADS: &str = "workloads";
pub const ENDPOINT_FORECAST: &str = "forecast";
pub const ENDPOINT_METRICS: &str = "metrics";
pub const ENDPOINT_HEALTH: &str = "health";

/// Absolute point in time after which a request is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(instant)
    }

    #[must_use]
    pub const fn instant(self) -> Instant {
        self.0
    }

    /// Time left, or `None` once the deadline has passed.
    #[must_use]
    pub fn remaining(self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// The earlier of this deadline and `budget` from now.
    #[must_use]
    pub fn capped(self, budget: Duration) -> Self {
        self.min(Self::after(budget))
    }
}

/// Stateless request/decode wrapper around both upstream services.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    forecaster_url: String,
    scaler_url: String,
    http: Client,
}

impl UpstreamClient {
    pub fn new(forecaster_url: &str, scaler_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("kedastral-tui/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KedastralError::Runtime {
                details: format!("build HTTP client: {e}"),
            })?;
        Ok(Self {
            forecaster_url: forecaster_url.trim_end_matches('/').to_string(),
            scaler_url: scaler_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub fn forecaster_url(&self) -> &str {
        &self.forecaster_url
    }

    #[must_use]
    pub fn scaler_url(&self) -> &str {
        &self.scaler_url
    }

    /// `GET {forecaster}/forecasts/workloads`; 404 means an older forecaster
    /// without the listing, reported as no workloads.
    pub fn list_workloads(&self, deadline: Deadline) -> Result<Vec<WorkloadInfo>> {
        let url = format!("{}/forecasts/workloads", self.forecaster_url);
        let resp = self.send(ENDPOINT_WORKLOADS, self.http.get(url), deadline)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let resp = ensure_ok(ENDPOINT_WORKLOADS, resp)?;
        let list: types::WorkloadList = decode_json(ENDPOINT_WORKLOADS, resp)?;
        Ok(list.workloads)
    }

    /// Current forecast decoded as a v1 [`Snapshot`].
    pub fn get_snapshot(
        &self,
        workload: &str,
        lead_time: Duration,
        deadline: Deadline,
    ) -> Result<EnrichedSnapshot<Snapshot>> {
        let resp = self.current_forecast(workload, deadline)?;
        let stale = is_stale(&resp);
        let snapshot: Snapshot = decode_json(ENDPOINT_FORECAST, resp)?;
        Ok(EnrichedSnapshot::new(snapshot, stale, Utc::now(), lead_time))
    }

    /// Current forecast with quantile bands; v1 bodies get a synthesized p50.
    pub fn get_quantile_snapshot(
        &self,
        workload: &str,
        lead_time: Duration,
        deadline: Deadline,
    ) -> Result<EnrichedSnapshot> {
        let resp = self.current_forecast(workload, deadline)?;
        let stale = is_stale(&resp);
        let snapshot = decode_json::<QuantileSnapshot>(ENDPOINT_FORECAST, resp)?
            .with_detected_version();
        Ok(EnrichedSnapshot::new(snapshot, stale, Utc::now(), lead_time))
    }

    /// `GET {scaler}/metrics`, parsed. Transport failures are errors;
    /// `connection_healthy` is only ever set on success.
    pub fn get_scaler_metrics(&self, deadline: Deadline) -> Result<ScalerMetrics> {
        let url = format!("{}/metrics", self.scaler_url);
        let resp = self.send(ENDPOINT_METRICS, self.http.get(url), deadline)?;
        let resp = ensure_ok(ENDPOINT_METRICS, resp)?;
        let body = resp
            .text()
            .map_err(|e| KedastralError::from_http(ENDPOINT_METRICS, &e))?;
        Ok(metrics::parse_exposition(&body))
    }

    /// True iff `GET {base}/healthz` answers exactly 200. Never fails.
    #[must_use]
    pub fn check_health(&self, base_url: &str, deadline: Deadline) -> bool {
        let url = format!("{}/healthz", base_url.trim_end_matches('/'));
        self.send(ENDPOINT_HEALTH, self.http.get(url), deadline)
            .is_ok_and(|resp| resp.status() == StatusCode::OK)
    }

    /// Health of (forecaster, scaler), checked one after the other.
    #[must_use]
    pub fn health_status(&self, deadline: Deadline) -> (bool, bool) {
        (
            self.check_health(&self.forecaster_url, deadline),
            self.check_health(&self.scaler_url, deadline),
        )
    }

    fn current_forecast(&self, workload: &str, deadline: Deadline) -> Result<Response> {
        let url = format!("{}/forecast/current", self.forecaster_url);
        let request = self.http.get(url).query(&[("workload", workload)]);
        let resp = self.send(ENDPOINT_FORECAST, request, deadline)?;
        ensure_ok(ENDPOINT_FORECAST, resp)
    }

    fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::blocking::RequestBuilder,
        deadline: Deadline,
    ) -> Result<Response> {
        let Some(budget) = deadline.remaining() else {
            return Err(deadline_exceeded(endpoint, Duration::ZERO));
        };
        request.timeout(budget).send().map_err(|e| {
            if e.is_timeout() {
                deadline_exceeded(endpoint, budget)
            } else {
                KedastralError::from_http(endpoint, &e)
            }
        })
    }
}

fn deadline_exceeded(endpoint: &str, budget: Duration) -> KedastralError {
    KedastralError::DeadlineExceeded {
        endpoint: endpoint.to_string(),
        timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
    }
}

fn ensure_ok(endpoint: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
        body.push('…');
    }
    Err(KedastralError::Protocol {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
    let bytes = resp
        .bytes()
        .map_err(|e| KedastralError::from_http(endpoint, &e))?;
    serde_json::from_slice(&bytes).map_err(|e| KedastralError::Decode {
        endpoint: endpoint.to_string(),
        details: e.to_string(),
    })
}

fn is_stale(resp: &Response) -> bool {
    resp.headers()
        .get(STALE_HEADER)
        .is_some_and(|value| value.as_bytes() == b"true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_deadline_has_no_budget() {
        let past = Deadline::at(Instant::now() - Duration::from_millis(1));
        assert_eq!(past.remaining(), None);
        assert!(Deadline::after(Duration::from_secs(5)).remaining().is_some());
    }

    #[test]
    fn capped_deadline_takes_the_earlier_instant() {
        let cycle = Deadline::after(Duration::from_secs(5));
        let health = cycle.capped(Duration::from_secs(2));
        assert!(health < cycle);
        let late = Deadline::after(Duration::from_millis(100));
        assert_eq!(late.capped(Duration::from_secs(2)), late);
    }

    #[test]
    fn expired_deadline_fails_without_network() {
        let client = UpstreamClient::new("http://127.0.0.1:9", "http://127.0.0.1:9/").unwrap();
        assert_eq!(client.scaler_url(), "http://127.0.0.1:9");
        let past = Deadline::at(Instant::now() - Duration::from_millis(1));
        let err = client.get_scaler_metrics(past).unwrap_err();
        assert!(matches!(err, KedastralError::DeadlineExceeded { .. }));
        assert!(!client.check_health(client.forecaster_url(), past));
    }
}
