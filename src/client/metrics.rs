//! Line-oriented parser for the scaler's metrics exposition.
//!
//! Lines starting with `#` are comments. Metrics are matched by substring on
//! their name; the value is the token after the last whitespace run. Lines
//! whose value does not parse are skipped.

use memchr::memmem;

use super::types::ScalerMetrics;

pub const DESIRED_REPLICAS: &str = "kedastral_scaler_desired_replicas_returned";
pub const FORECAST_AGE_SEEN: &str = "kedastral_scaler_forecast_age_seen_seconds";
pub const GRPC_REQUESTS: &str = "kedastral_scaler_grpc_requests_total";
const ACTIVE_LABEL: &str = "status=\"active\"";

/// Fold every recognised line of `body` into `metrics`.
///
/// A desired-replica value of 0 is treated as "no update".
#[allow(clippy::cast_possible_truncation)]
pub fn apply_exposition(metrics: &mut ScalerMetrics, body: &str) {
    let desired = memmem::Finder::new(DESIRED_REPLICAS);
    let age = memmem::Finder::new(FORECAST_AGE_SEEN);
    let grpc = memmem::Finder::new(GRPC_REQUESTS);
    let active = memmem::Finder::new(ACTIVE_LABEL);

    for line in body.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bytes = line.as_bytes();
        let Some(value) = sample_value(line) else {
            continue;
        };

        if desired.find(bytes).is_some() {
            if value != 0.0 {
                metrics.desired_replicas = value as i64;
            }
        } else if age.find(bytes).is_some() {
            metrics.forecast_age_seen_secs = value;
        } else if grpc.find(bytes).is_some() && active.find(bytes).is_some() && value > 0.0 {
            metrics.active = true;
        }
    }
}

/// Parse a full exposition body into a fresh record marked healthy.
#[must_use]
pub fn parse_exposition(body: &str) -> ScalerMetrics {
    let mut metrics = ScalerMetrics {
        connection_healthy: true,
        ..ScalerMetrics::default()
    };
    apply_exposition(&mut metrics, body);
    metrics
}

fn sample_value(line: &str) -> Option<f64> {
    let (_, raw) = line.rsplit_once([' ', '\t'])?;
    let value = raw.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}
