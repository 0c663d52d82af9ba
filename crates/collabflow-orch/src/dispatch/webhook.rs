//! Webhook dispatcher for the n8n workflow engine.
//!
//! This module provides [`WebhookDispatcher`], the production
//! implementation of [`WorkflowDispatcher`] delivering triggers over
//! HTTP.
//!
//! ## Features
//!
//! - **Bounded retries**: Configurable attempt count with fixed or
//!   exponential delay between attempts
//! - **Per-call timeout**: A stalled endpoint cannot hold the caller's
//!   project lock past the timeout (default 10s)
//! - **Per-endpoint paths**: Each [`WebhookKind`] resolves its own path,
//!   overridable in configuration

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DispatchOutcome, TriggerEnvelope, WebhookKind, WorkflowDispatcher};
use crate::error::{Error, Result};

/// Delay strategy between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
    /// The same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles after each failed attempt.
    Exponential,
}

impl std::str::FromStr for RetryBackoff {
    type Err = collabflow_core::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(collabflow_core::Error::config(format!(
                "unknown retry backoff '{other}', expected 'fixed' or 'exponential'"
            ))),
        }
    }
}

/// Configuration for the webhook dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Base URL of the workflow engine (e.g. `https://n8n.internal:5678`).
    pub base_url: String,
    /// Per-kind path overrides; kinds not present use their default path.
    #[serde(default)]
    pub path_overrides: HashMap<String, String>,
    /// Per-call timeout (default: 10 seconds).
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Maximum delivery attempts per dispatch (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between attempts (default: 2 seconds).
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,
    /// Delay strategy between attempts.
    #[serde(default)]
    pub backoff: RetryBackoff,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

impl WebhookConfig {
    /// Creates a config for the given base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            path_overrides: HashMap::new(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            backoff: RetryBackoff::default(),
        }
    }

    /// Overrides the path for one webhook kind.
    #[must_use]
    pub fn with_path(mut self, kind: WebhookKind, path: impl Into<String>) -> Self {
        self.path_overrides.insert(kind.as_str().to_string(), path.into());
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum delivery attempts per dispatch.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the delay strategy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the full URL for a webhook kind.
    #[must_use]
    pub fn url_for(&self, kind: WebhookKind) -> String {
        let path = self
            .path_overrides
            .get(kind.as_str())
            .map_or_else(|| kind.default_path().to_string(), Clone::clone);
        format!("{}{}", self.base_url, path)
    }

    /// Returns the delay before the retry following `failed_attempts`
    /// failures.
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        match self.backoff {
            RetryBackoff::Fixed => self.retry_delay,
            RetryBackoff::Exponential => {
                let factor = 2u32.saturating_pow(failed_attempts.saturating_sub(1));
                self.retry_delay.saturating_mul(factor)
            }
        }
    }
}

/// HTTP webhook dispatcher for the workflow engine.
///
/// Retries bounded by [`WebhookConfig::max_retries`]; after exhaustion
/// the failure surfaces as [`Error::DispatchFailed`] and the caller
/// decides (the gate logs it and waits for the next signal).
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    /// Creates a dispatcher from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::storage_with_source("failed to build HTTP client", e))?;
        Ok(Self { config, client })
    }

    /// Returns the dispatcher configuration.
    #[must_use]
    pub const fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn attempt(&self, url: &str, envelope: &TriggerEnvelope) -> std::result::Result<(), String> {
        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("unexpected status {status}"))
        }
    }
}

#[async_trait]
impl WorkflowDispatcher for WebhookDispatcher {
    async fn dispatch(
        &self,
        kind: WebhookKind,
        envelope: TriggerEnvelope,
    ) -> Result<DispatchOutcome> {
        let url = self.config.url_for(kind);
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&url, &envelope).await {
                Ok(()) => {
                    tracing::debug!(
                        url = %url,
                        event = %envelope.event,
                        attempt,
                        "workflow trigger delivered"
                    );
                    return Ok(DispatchOutcome::Delivered { attempts: attempt });
                }
                Err(message) => {
                    tracing::warn!(
                        url = %url,
                        event = %envelope.event,
                        attempt,
                        max_attempts,
                        error = %message,
                        "workflow trigger attempt failed"
                    );
                    last_error = message;
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(Error::DispatchFailed {
            event: envelope.event.to_string(),
            attempts: max_attempts,
            message: last_error,
        })
    }

    fn endpoint_name(&self) -> &str {
        &self.config.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_contract() {
        let config = WebhookConfig::new("http://n8n:5678");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.backoff, RetryBackoff::Fixed);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = WebhookConfig::new("http://n8n:5678/");
        assert_eq!(
            config.url_for(WebhookKind::TasksReady),
            "http://n8n:5678/webhook/tasks-ready"
        );
    }

    #[test]
    fn path_override_wins_over_default() {
        let config = WebhookConfig::new("http://n8n:5678")
            .with_path(WebhookKind::ProjectStart, "/hooks/kickoff");
        assert_eq!(
            config.url_for(WebhookKind::ProjectStart),
            "http://n8n:5678/hooks/kickoff"
        );
        assert_eq!(
            config.url_for(WebhookKind::Notification),
            "http://n8n:5678/webhook/notification"
        );
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let config = WebhookConfig::new("http://n8n:5678")
            .with_retry_delay(Duration::from_secs(2));
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(3), Duration::from_secs(2));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let config = WebhookConfig::new("http://n8n:5678")
            .with_retry_delay(Duration::from_secs(2))
            .with_backoff(RetryBackoff::Exponential);
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_parses() {
        assert_eq!("fixed".parse::<RetryBackoff>().unwrap(), RetryBackoff::Fixed);
        assert_eq!(
            "Exponential".parse::<RetryBackoff>().unwrap(),
            RetryBackoff::Exponential
        );
        assert!("jitter".parse::<RetryBackoff>().is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_exhausts_retries() {
        // Reserved TEST-NET-1 address; connections fail fast enough with
        // a short timeout to keep the test quick.
        let config = WebhookConfig::new("http://192.0.2.1:9")
            .with_timeout(Duration::from_millis(50))
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(1));
        let dispatcher = WebhookDispatcher::new(config).unwrap();

        let envelope = TriggerEnvelope::tasks_ready(
            collabflow_core::ProjectId::generate(),
            vec![collabflow_core::TaskId::generate()],
        );

        let err = dispatcher
            .dispatch(WebhookKind::TasksReady, envelope)
            .await
            .unwrap_err();
        match err {
            Error::DispatchFailed { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected DispatchFailed, got {other}"),
        }
    }
}
