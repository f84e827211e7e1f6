//! Configuration loading and merging for gateload.
//!
//! Precedence, highest first: CLI flags, `gateload.toml`, environment, built-in defaults.

use gateload_error::ConfigError;
use gateload_types::{ConfigFile, ScenarioConfigFile, ScenarioOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_LOGIN: &str = "default_login";
pub const DEFAULT_PASSWORD: &str = "default_password";
pub const DEFAULT_SCENARIO_LABEL: &str = "default_scenario";
pub const DEFAULT_RESULTS_DIR: &str = "tests/k6/results";
pub const DEFAULT_CONFIG_FILE: &str = "gateload.toml";
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const ENV_GATEWAY_PORT: &str = "GATEWAY_PORT";
pub const ENV_BOT_KEY: &str = "BOT_KEY";
pub const ENV_SCENARIO: &str = "SCENARIO";

/// The environment inputs gateload reads, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub gateway_port: Option<String>,
    pub bot_key: Option<String>,
    pub scenario: Option<String>,
}

impl EnvSnapshot {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            gateway_port: non_empty(ENV_GATEWAY_PORT),
            bot_key: non_empty(ENV_BOT_KEY),
            scenario: non_empty(ENV_SCENARIO),
        }
    }
}

/// Read-only settings shared by every virtual user.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: Url,
    pub bot_key: String,
    pub user_login: String,
    pub user_password: String,
    pub scenario_label: String,
    pub results_dir: PathBuf,
    pub request_timeout: Duration,
    pub graceful_stop: Duration,
}

impl GatewayConfig {
    /// `<results_dir>/<scenario_label>_summary.json`
    pub fn summary_path(&self) -> PathBuf {
        self.results_dir
            .join(format!("{}_summary.json", self.scenario_label))
    }
}

/// Gateway-level values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct GatewayOverrides {
    pub base_url: Option<String>,
    pub results_dir: Option<PathBuf>,
    pub graceful_stop: Option<Duration>,
}

/// Scenario-level values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub vus: Option<u32>,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
}

pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDuration {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Load `path`. A missing file yields the empty config unless `required`.
pub fn load_config_file(path: &Path, required: bool) -> Result<ConfigFile, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            return Ok(ConfigFile::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let cfg: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), scenarios = cfg.scenarios.len(), "loaded config file");
    Ok(cfg)
}

/// Resolve the gateway configuration.
///
/// Missing `GATEWAY_PORT` or `BOT_KEY` are not fatal: requests will fail at the
/// gateway and show up as failed checks.
pub fn resolve_gateway(
    env: &EnvSnapshot,
    file: &ConfigFile,
    overrides: &GatewayOverrides,
) -> Result<GatewayConfig, ConfigError> {
    let base_url = match (&overrides.base_url, &file.defaults.base_url, &env.gateway_port) {
        (Some(url), _, _) | (None, Some(url), _) => parse_url(url)?,
        (None, None, Some(port)) => parse_url(&format!("http://localhost:{}", port.trim()))?,
        (None, None, None) => {
            tracing::warn!("{ENV_GATEWAY_PORT} is not set; falling back to http://localhost");
            parse_url("http://localhost")?
        }
    };

    let bot_key = env.bot_key.clone().unwrap_or_else(|| {
        tracing::warn!("{ENV_BOT_KEY} is not set; user creation will be rejected");
        String::new()
    });

    let results_dir = overrides
        .results_dir
        .clone()
        .or_else(|| file.defaults.results_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));

    let graceful_stop = match (overrides.graceful_stop, &file.defaults.graceful_stop) {
        (Some(d), _) => d,
        (None, Some(s)) => parse_duration("defaults.graceful_stop", s)?,
        (None, None) => DEFAULT_GRACEFUL_STOP,
    };

    let request_timeout = match &file.defaults.request_timeout {
        Some(s) => parse_duration("defaults.request_timeout", s)?,
        None => DEFAULT_REQUEST_TIMEOUT,
    };

    Ok(GatewayConfig {
        base_url,
        bot_key,
        user_login: DEFAULT_LOGIN.to_string(),
        user_password: DEFAULT_PASSWORD.to_string(),
        scenario_label: env
            .scenario
            .clone()
            .unwrap_or_else(|| DEFAULT_SCENARIO_LABEL.to_string()),
        results_dir,
        request_timeout,
        graceful_stop,
    })
}

/// Layer file and CLI overrides over a scenario's built-in options.
pub fn resolve_options(
    scenario: &str,
    builtin: ScenarioOptions,
    file: Option<&ScenarioConfigFile>,
    cli: &OptionOverrides,
    graceful_stop: Duration,
) -> Result<ScenarioOptions, ConfigError> {
    let mut opts = builtin;

    if let Some(f) = file {
        if let Some(vus) = f.vus {
            opts.vus = vus;
        }
        if let Some(d) = &f.duration {
            opts.duration_ms = Some(duration_ms(parse_duration(
                &format!("scenario.{scenario}.duration"),
                d,
            )?));
        }
        if let Some(n) = f.iterations {
            opts.iterations = Some(n);
        }
        if let Some(t) = &f.thresholds {
            opts.thresholds = t.clone();
        }
    }

    if let Some(vus) = cli.vus {
        opts.vus = vus;
    }
    if let Some(d) = cli.duration {
        opts.duration_ms = Some(duration_ms(d));
    }
    if let Some(n) = cli.iterations {
        opts.iterations = Some(n);
    }

    opts.graceful_stop_ms = duration_ms(graceful_stop);

    if opts.vus == 0 {
        return Err(ConfigError::InvalidOverride {
            scenario: scenario.to_string(),
            reason: "vus must be at least 1".to_string(),
        });
    }
    if opts.iterations == Some(0) {
        return Err(ConfigError::InvalidOverride {
            scenario: scenario.to_string(),
            reason: "iterations must be at least 1".to_string(),
        });
    }
    if opts.duration_ms == Some(0) {
        return Err(ConfigError::InvalidOverride {
            scenario: scenario.to_string(),
            reason: "duration must be positive".to_string(),
        });
    }

    Ok(opts)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Convenience for building threshold maps in scenario definitions.
pub fn thresholds<const N: usize>(pairs: [(&str, &[&str]); N]) -> BTreeMap<String, Vec<String>> {
    pairs
        .into_iter()
        .map(|(k, exprs)| (k.to_string(), exprs.iter().map(|e| e.to_string()).collect()))
        .collect()
}
