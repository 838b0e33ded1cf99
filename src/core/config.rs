//! Configuration system: TOML file + env var overrides + CLI flag overrides.
//!
//! Precedence, lowest first: built-in defaults, config file, environment,
//! command-line flags. The resolved record is immutable for the dashboard
//! core; the theme and refresh interval are the only fields changed at
//! runtime, and those changes are persisted through [`Config::save`].

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{KedastralError, Result};
use crate::core::paths;
use crate::logger::jsonl::Severity;
use crate::tui::theme::ThemeName;

pub const DEFAULT_SCALER_URL: &str = "http://localhost:8082";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_LEAD_TIME_SECS: u64 = 300;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 60_000;

/// Full dashboard configuration record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub forecaster_url: String,
    pub scaler_url: String,
    pub workload: String,
    pub refresh_interval_ms: u64,
    pub lead_time_secs: u64,
    pub log_level: Severity,
    pub theme: ThemeName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Where this record was loaded from and will be saved to.
    #[serde(skip)]
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecaster_url: String::new(),
            scaler_url: DEFAULT_SCALER_URL.to_string(),
            workload: String::new(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            lead_time_secs: DEFAULT_LEAD_TIME_SECS,
            log_level: Severity::Error,
            theme: ThemeName::Dark,
            log_file: None,
            config_file: paths::default_config_path(),
        }
    }
}

/// Values supplied on the command line; `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub forecaster_url: Option<String>,
    pub scaler_url: Option<String>,
    pub workload: Option<String>,
    pub refresh_interval: Option<Duration>,
    pub lead_time: Option<Duration>,
    pub log_level: Option<Severity>,
    pub theme: Option<ThemeName>,
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        paths::default_config_path()
    }

    /// Load the file layer plus process environment overrides.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_var)
    }

    /// [`Config::load`] with an injectable environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| KedastralError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(KedastralError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Layer command-line values over the loaded record.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.forecaster_url {
            self.forecaster_url.clone_from(url);
        }
        if let Some(url) = &overrides.scaler_url {
            self.scaler_url.clone_from(url);
        }
        if let Some(workload) = &overrides.workload {
            self.workload.clone_from(workload);
        }
        if let Some(interval) = overrides.refresh_interval {
            self.refresh_interval_ms = duration_millis(interval);
        }
        if let Some(lead) = overrides.lead_time {
            self.lead_time_secs = lead.as_secs();
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(theme) = overrides.theme {
            self.theme = theme;
        }
        self.normalize();
    }

    pub fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FORECASTER_URL") {
            self.forecaster_url = raw;
        }
        if let Some(raw) = lookup("SCALER_URL") {
            self.scaler_url = raw;
        }
        if let Some(raw) = lookup("WORKLOAD") {
            self.workload = raw;
        }
        if let Some(raw) = lookup("REFRESH_INTERVAL") {
            let interval = parse_duration(&raw).map_err(|e| env_error("REFRESH_INTERVAL", &raw, &e))?;
            self.refresh_interval_ms = duration_millis(interval);
        }
        if let Some(raw) = lookup("LEAD_TIME") {
            let lead = parse_duration(&raw).map_err(|e| env_error("LEAD_TIME", &raw, &e))?;
            self.lead_time_secs = lead.as_secs();
        }
        if let Some(raw) = lookup("LOG_LEVEL") {
            self.log_level = raw
                .parse::<Severity>()
                .map_err(|e| env_error("LOG_LEVEL", &raw, &e))?;
        }
        if let Some(raw) = lookup("KEDASTRAL_THEME") {
            self.theme = ThemeName::from_name(&raw);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        for url in [&mut self.forecaster_url, &mut self.scaler_url] {
            let trimmed = url.trim().trim_end_matches('/');
            if trimmed.len() != url.len() {
                *url = trimmed.to_string();
            }
        }
        let workload = self.workload.trim();
        if workload.len() != self.workload.len() {
            self.workload = workload.to_string();
        }
    }

    /// True when a required field is still empty and the wizard (or an
    /// explicit flag) has to supply it.
    #[must_use]
    pub fn needs_setup(&self) -> bool {
        self.forecaster_url.is_empty() || self.workload.is_empty()
    }

    /// Reject configurations the dashboard cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            return Err(KedastralError::InvalidConfig {
                details: format!(
                    "refresh interval must be at least 1s, got {}",
                    format_duration(self.refresh_interval())
                ),
            });
        }
        if self.workload.is_empty() {
            return Err(KedastralError::InvalidConfig {
                details: "workload must not be empty".to_string(),
            });
        }
        for (name, url) in [
            ("forecaster_url", &self.forecaster_url),
            ("scaler_url", &self.scaler_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(KedastralError::InvalidConfig {
                    details: format!("{name} must start with http:// or https://, got {url:?}"),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    #[must_use]
    pub const fn lead_time(&self) -> Duration {
        Duration::from_secs(self.lead_time_secs)
    }

    /// Activity log location: explicit `log_file` or the state directory.
    #[must_use]
    pub fn activity_log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(paths::default_activity_log_path)
    }

    /// Serialize as TOML for display or persistence.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Atomic save: serialize → temp file → fsync → rename.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| KedastralError::io(parent, source))?;
        }

        let body = self.to_toml()?;
        let tmp_path = path.with_extension("toml.tmp");
        {
            let mut file =
                fs::File::create(&tmp_path).map_err(|source| KedastralError::io(&tmp_path, source))?;
            file.write_all(body.as_bytes())
                .and_then(|()| file.sync_all())
                .map_err(|source| KedastralError::io(&tmp_path, source))?;
        }
        fs::rename(&tmp_path, path).map_err(|source| KedastralError::io(path, source))?;
        Ok(path.to_path_buf())
    }
}

/// Parse `500ms`, `5s`, `1m30s`, `2h`, or a bare integer (seconds).
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(duration_error(raw, "empty duration"));
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_ms: u64 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(duration_error(raw, "expected a number"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| duration_error(raw, "number out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .bytes()
            .take_while(u8::is_ascii_alphabetic)
            .count();
        let factor = match &rest[..unit_len] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "" => return Err(duration_error(raw, "missing unit")),
            other => return Err(duration_error(raw, &format!("unknown unit {other:?}"))),
        };
        rest = &rest[unit_len..];

        total_ms = amount
            .checked_mul(factor)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| duration_error(raw, "duration overflow"))?;
    }
    Ok(Duration::from_millis(total_ms))
}

/// Compact display form that [`parse_duration`] accepts back.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration_millis(duration);
    if total_ms == 0 {
        return "0s".to_string();
    }
    if total_ms < 1_000 {
        return format!("{total_ms}ms");
    }
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;

    let mut out = String::new();
    for (value, unit) in [(hours, "h"), (minutes, "m"), (seconds, "s"), (millis, "ms")] {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    out
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn duration_error(raw: &str, reason: &str) -> KedastralError {
    KedastralError::ConfigParse {
        context: "duration",
        details: format!("{raw:?}: {reason}"),
    }
}

fn env_error(name: &str, raw: &str, error: &dyn std::fmt::Display) -> KedastralError {
    KedastralError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}
