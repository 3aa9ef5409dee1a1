//! TOML configuration for the calculator service.
//!
//! Every section has compiled-in defaults, so an empty (or missing) file is a
//! valid configuration. An explicit `--config` path must load; otherwise
//! `CALCULATOR_CONFIG` and the system path are tried in turn and any file
//! that fails to load is skipped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::history::DEFAULT_MAX_HISTORY;

const SYSTEM_CONFIG_PATH: &str = "/etc/calculator/calculator.toml";

/// Environment variable naming a config file to try before the system path.
pub const CONFIG_ENV: &str = "CALCULATOR_CONFIG";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the calculator process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Resolve configuration from `$CALCULATOR_CONFIG`, then
    /// `/etc/calculator/calculator.toml`, then compiled-in defaults.
    ///
    /// Runs before the subscriber is installed, so nothing is logged here;
    /// call [`Resolved::report`] once tracing is up.
    pub fn load_or_default() -> Resolved {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve(env_path.as_deref(), Path::new(SYSTEM_CONFIG_PATH))
    }

    /// First candidate that loads wins. An unset env path is not a
    /// candidate, and the system path only counts when the file exists.
    pub fn resolve(env_path: Option<&Path>, system_path: &Path) -> Resolved {
        let mut skipped = Vec::new();

        let candidates = env_path
            .into_iter()
            .chain(system_path.exists().then_some(system_path));
        for path in candidates {
            match Self::load(path) {
                Ok(config) => {
                    return Resolved {
                        config,
                        source: Some(path.to_path_buf()),
                        skipped,
                    }
                }
                Err(error) => skipped.push(Skipped {
                    path: path.to_path_buf(),
                    error,
                }),
            }
        }

        Resolved {
            config: Self::default(),
            source: None,
            skipped,
        }
    }

    /// Apply the `PORT` environment variable (Cloud Run style) to the bind
    /// address, keeping the configured host.
    pub fn apply_port_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            self.server.override_port(&port);
        }
    }
}

/// A config file that was tried and could not be used.
#[derive(Debug)]
pub struct Skipped {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Outcome of [`Config::load_or_default`].
#[derive(Debug)]
pub struct Resolved {
    pub config: Config,
    /// File the config came from; `None` means compiled-in defaults.
    pub source: Option<PathBuf>,
    pub skipped: Vec<Skipped>,
}

impl Resolved {
    /// Log where the configuration came from and every file passed over.
    pub fn report(&self) {
        for s in &self.skipped {
            warn!(
                path = %s.path.display(),
                error = %format_args!("{:#}", s.error),
                "config file could not be loaded, trying next source"
            );
        }
        match &self.source {
            Some(path) => info!(path = %path.display(), "loaded calculator configuration"),
            None => debug!("no usable config file, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP listener.
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    pub request_body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            request_body_limit: 1 << 20,
        }
    }
}

impl ServerConfig {
    /// Replace the port part of `bind`. Blank or non-numeric ports are
    /// ignored.
    pub fn override_port(&mut self, port: &str) {
        let port = port.trim();
        if port.is_empty() {
            return;
        }
        if port.parse::<u16>().is_err() {
            warn!(port, "ignoring invalid port override");
            return;
        }
        let host = match self.bind.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.bind.as_str(),
        };
        self.bind = format!("{host}:{port}");
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of entries retained. Non-positive values fall back to the
    /// default.
    pub max_history: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY as i64,
        }
    }
}

impl HistoryConfig {
    pub fn effective_max_history(&self) -> usize {
        match usize::try_from(self.max_history) {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(
                    configured = self.max_history,
                    default = DEFAULT_MAX_HISTORY,
                    "history.max_history must be positive, using default"
                );
                DEFAULT_MAX_HISTORY
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
