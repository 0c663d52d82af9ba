//! Environment-driven service configuration.
//!
//! All settings come from `COLLABFLOW_*` environment variables; only the
//! workflow engine base URL is required. See [`OrchestratorConfig::from_env`].

use std::net::SocketAddr;
use std::time::Duration;

use collabflow_core::observability::LogFormat;

use crate::dispatch::webhook::{RetryBackoff, WebhookConfig};
use crate::dispatch::WebhookKind;
use crate::error::{Error, Result};

/// Environment variable names.
pub mod env {
    /// Required: base URL of the workflow engine.
    pub const N8N_BASE_URL: &str = "COLLABFLOW_N8N_BASE_URL";
    /// Per-call webhook timeout in seconds.
    pub const N8N_TIMEOUT_SECS: &str = "COLLABFLOW_N8N_TIMEOUT_SECS";
    /// Maximum delivery attempts per dispatch.
    pub const N8N_MAX_RETRIES: &str = "COLLABFLOW_N8N_MAX_RETRIES";
    /// Base delay between attempts in seconds.
    pub const N8N_RETRY_DELAY_SECS: &str = "COLLABFLOW_N8N_RETRY_DELAY_SECS";
    /// Delay strategy: `fixed` or `exponential`.
    pub const N8N_RETRY_BACKOFF: &str = "COLLABFLOW_N8N_RETRY_BACKOFF";
    /// Listen address for the callback server.
    pub const LISTEN_ADDR: &str = "COLLABFLOW_LISTEN_ADDR";
    /// Log output format: `json` or `pretty`.
    pub const LOG_FORMAT: &str = "COLLABFLOW_LOG_FORMAT";
}

/// Path-override variables, one per webhook kind.
const PATH_OVERRIDES: &[(WebhookKind, &str)] = &[
    (WebhookKind::ProjectStart, "COLLABFLOW_N8N_PROJECT_START_PATH"),
    (WebhookKind::TasksReady, "COLLABFLOW_N8N_TASKS_READY_PATH"),
    (WebhookKind::TaskStatus, "COLLABFLOW_N8N_TASK_STATUS_PATH"),
    (WebhookKind::HitlStart, "COLLABFLOW_N8N_HITL_START_PATH"),
    (
        WebhookKind::DocumentUpload,
        "COLLABFLOW_N8N_DOCUMENT_UPLOAD_PATH",
    ),
    (
        WebhookKind::Notification,
        "COLLABFLOW_N8N_NOTIFICATION_PATH",
    ),
];

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Outbound webhook settings.
    pub webhook: WebhookConfig,
    /// Address the callback server binds to.
    pub listen_addr: SocketAddr,
    /// Log output format.
    pub log_format: LogFormat,
}

impl OrchestratorConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `COLLABFLOW_N8N_BASE_URL` is
    /// missing or any variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let base_url = required_env(env::N8N_BASE_URL)?;
        let mut webhook = WebhookConfig::new(base_url);

        for (kind, var) in PATH_OVERRIDES {
            if let Some(path) = optional_env(var) {
                webhook = webhook.with_path(*kind, path);
            }
        }
        if let Some(secs) = parse_env::<u64>(env::N8N_TIMEOUT_SECS)? {
            webhook = webhook.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = parse_env::<u32>(env::N8N_MAX_RETRIES)? {
            webhook = webhook.with_max_retries(retries);
        }
        if let Some(secs) = parse_env::<u64>(env::N8N_RETRY_DELAY_SECS)? {
            webhook = webhook.with_retry_delay(Duration::from_secs(secs));
        }
        if let Some(raw) = optional_env(env::N8N_RETRY_BACKOFF) {
            let backoff: RetryBackoff = raw.parse().map_err(Error::Core)?;
            webhook = webhook.with_backoff(backoff);
        }

        let listen_addr = optional_env(env::LISTEN_ADDR)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .map_err(|e| {
                Error::Core(collabflow_core::Error::config(format!(
                    "invalid {}: {e}",
                    env::LISTEN_ADDR
                )))
            })?;

        let log_format = match optional_env(env::LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(Error::Core)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            webhook,
            listen_addr,
            log_format,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| {
        Error::Core(collabflow_core::Error::config(format!(
            "{name} is required"
        )))
    })
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e| {
            Error::Core(collabflow_core::Error::config(format!(
                "invalid {name}='{raw}': {e}"
            )))
        }),
    }
}
