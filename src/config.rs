//! Layered configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file, `PERFWATCH_*` environment variables and finally CLI flags
//! (applied by the binary).
//!
//! ```toml
//! backend_url = "http://localhost:8000"
//! poll_interval_ms = 5000
//!
//! [server]
//! listen_addr = "127.0.0.1:8000"
//! grafana_origin = "http://grafana:3000"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `PERFWATCH_SERVER__LISTEN_ADDR=0.0.0.0:8000`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "perfwatch.toml";

/// Dashboard and development-backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the metrics backend.
    pub backend_url: String,
    /// How often the performance view polls `/metrics`.
    pub poll_interval_ms: u64,
    /// Per-request timeout for backend calls.
    pub request_timeout_ms: u64,
    /// Where the dashboard writes its logs.
    pub log_file: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub server: ServerConfig,
}

/// Settings for `--serve` mode.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Origin that `/grafana/*` requests are forwarded to.
    pub grafana_origin: String,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_FILE`] is
    /// used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("backend_url", "http://localhost:8000")?
            .set_default("poll_interval_ms", 5_000_i64)?
            .set_default("request_timeout_ms", 10_000_i64)?
            .set_default("log_file", "perfwatch.log")?
            .set_default("log_level", "info")?
            .set_default("server.listen_addr", "127.0.0.1:8000")?
            .set_default("server.grafana_origin", "http://grafana:3000")?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("PERFWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("invalid configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject values that would make the dashboard misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        check_http_url("backend_url", &self.backend_url)?;
        check_http_url("server.grafana_origin", &self.server.grafana_origin)?;
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server.listen_addr: {}", self.server.listen_addr))?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn check_http_url(key: &str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        bail!("{} must be an http(s) URL, got {:?}", key, value)
    }
}
