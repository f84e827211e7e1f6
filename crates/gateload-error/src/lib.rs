//! Unified error types for gateload.
//!
//! Library crates return these typed errors; the app and CLI layers wrap them in
//! `anyhow` with context.

use std::path::PathBuf;

/// Problems resolving configuration from env, TOML, or CLI flags.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid duration for {field}: {value:?} ({reason})")]
    InvalidDuration {
        field: String,
        value: String,
        reason: String,
    },

    #[error("invalid base url {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("unknown scenario {0:?}")]
    UnknownScenario(String),

    #[error("scenario {scenario}: {reason}")]
    InvalidOverride { scenario: String, reason: String },

    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Problems parsing a threshold key or expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold expression is empty")]
    Empty,

    #[error("unknown metric {0:?}")]
    UnknownMetric(String),

    #[error("malformed tag selector in {0:?}")]
    MalformedSelector(String),

    #[error("unknown aggregation {0:?}")]
    UnknownAggregation(String),

    #[error("no comparison operator in {0:?}")]
    MissingOperator(String),

    #[error("invalid threshold value {0:?}")]
    InvalidValue(String),

    #[error("aggregation {aggregation} does not apply to {kind} metric {metric}")]
    IncompatibleAggregation {
        metric: String,
        kind: String,
        aggregation: String,
    },
}

/// Fatal failures of a scenario's one-time setup step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("Setup failed: could not create user. Status: {status}")]
    CreateUser { status: u16 },

    #[error("Setup failed: could not log in. Status: {status}")]
    Login { status: u16 },

    #[error("Setup failed: response of {step} has no {field:?} field")]
    MissingField { step: String, field: String },

    #[error("Setup failed: login returned an empty access token")]
    EmptyToken,
}

#[derive(Debug, thiserror::Error)]
pub enum GateloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GateloadError>;
