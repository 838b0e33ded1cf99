//! KTUI-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, KedastralError>;

/// Coarse failure class used by the dashboard to decide what an error clears
/// and how it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Connection refused, DNS failure, timeout, deadline exceeded.
    Transport,
    /// Upstream answered with a non-2xx status.
    Protocol,
    /// Upstream answered but the body could not be decoded.
    Decode,
    /// Configuration rejected before the UI starts.
    Validation,
    /// Local filesystem, terminal, or serialization failure.
    Local,
}

/// Top-level error type for kedastral-tui.
#[derive(Debug, Error)]
pub enum KedastralError {
    #[error("[KTUI-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[KTUI-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[KTUI-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[KTUI-1004] setup required: {details}")]
    SetupRequired { details: String },

    #[error("[KTUI-2001] transport failure calling {endpoint}: {details}")]
    Transport { endpoint: String, details: String },

    #[error("[KTUI-2002] {endpoint} returned HTTP {status}: {body}")]
    Protocol {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("[KTUI-2003] could not decode {endpoint} response: {details}")]
    Decode { endpoint: String, details: String },

    #[error("[KTUI-2004] {endpoint} did not answer within {timeout_ms}ms")]
    DeadlineExceeded { endpoint: String, timeout_ms: u64 },

    #[error("[KTUI-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[KTUI-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[KTUI-3003] terminal failure: {details}")]
    Terminal { details: String },

    #[error("[KTUI-3004] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[KTUI-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl KedastralError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "KTUI-1001",
            Self::MissingConfig { .. } => "KTUI-1002",
            Self::ConfigParse { .. } => "KTUI-1003",
            Self::SetupRequired { .. } => "KTUI-1004",
            Self::Transport { .. } => "KTUI-2001",
            Self::Protocol { .. } => "KTUI-2002",
            Self::Decode { .. } => "KTUI-2003",
            Self::DeadlineExceeded { .. } => "KTUI-2004",
            Self::Serialization { .. } => "KTUI-3001",
            Self::Io { .. } => "KTUI-3002",
            Self::Terminal { .. } => "KTUI-3003",
            Self::ChannelClosed { .. } => "KTUI-3004",
            Self::Runtime { .. } => "KTUI-3900",
        }
    }

    /// Failure class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigParse { .. }
            | Self::SetupRequired { .. } => ErrorClass::Validation,
            Self::Transport { .. } | Self::DeadlineExceeded { .. } => ErrorClass::Transport,
            Self::Protocol { .. } => ErrorClass::Protocol,
            Self::Decode { .. } => ErrorClass::Decode,
            Self::Serialization { .. }
            | Self::Io { .. }
            | Self::Terminal { .. }
            | Self::ChannelClosed { .. }
            | Self::Runtime { .. } => ErrorClass::Local,
        }
    }

    /// Whether a fresh refresh cycle might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::DeadlineExceeded { .. } | Self::Io { .. } => true,
            Self::Protocol { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Map a reqwest failure onto the taxonomy for the named endpoint.
    #[must_use]
    pub fn from_http(endpoint: &str, error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode {
                endpoint: endpoint.to_string(),
                details: error.to_string(),
            };
        }
        let details = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        };
        Self::Transport {
            endpoint: endpoint.to_string(),
            details,
        }
    }
}

impl From<serde_json::Error> for KedastralError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for KedastralError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for KedastralError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
