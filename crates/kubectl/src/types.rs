//! Core types for manifest lifecycle management.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default client binary when no explicit path is configured.
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// How to reach the cluster.
///
/// Built once from provider configuration and shared read-only by every
/// operation. `kubeconfig` and `kubeconfig_content` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Path to a kubeconfig file
    pub kubeconfig: Option<String>,
    /// Inline kubeconfig content, materialized to a temporary file per call
    pub kubeconfig_content: Option<String>,
    /// Context name inside the kubeconfig
    pub kubeconfig_context: Option<String>,
    /// Path to the kubectl binary
    pub kubectl_path: Option<String>,
    /// Bearer token passed with `--token`
    pub kubectl_token: Option<String>,
    /// Value of `--validate` on apply
    pub kubectl_validate: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            kubeconfig_content: None,
            kubeconfig_context: None,
            kubectl_path: None,
            kubectl_token: None,
            kubectl_validate: true,
        }
    }
}

impl ConnectionConfig {
    /// Check the configuration for conflicting options.
    pub fn validate(&self) -> Result<()> {
        if non_empty(self.kubeconfig.as_deref()).is_some()
            && non_empty(self.kubeconfig_content.as_deref()).is_some()
        {
            return Err(Error::ConfigurationConflict);
        }
        Ok(())
    }

    /// The kubectl binary to invoke.
    pub fn program(&self) -> &str {
        non_empty(self.kubectl_path.as_deref()).unwrap_or(DEFAULT_KUBECTL)
    }

    /// Configured context, if any.
    pub fn context(&self) -> Option<&str> {
        non_empty(self.kubeconfig_context.as_deref())
    }

    /// Configured token, if any.
    pub fn token(&self) -> Option<&str> {
        non_empty(self.kubectl_token.as_deref())
    }
}

/// Treat empty strings the same as unset options.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A user-declared manifest: the desired state of one cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Namespace to apply into. Changing it forces replacement.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Raw manifest text (YAML or JSON)
    pub content: String,
}

impl Manifest {
    /// Create a manifest without an explicit namespace.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            namespace: None,
            content: content.into(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Namespace, treating an empty string as unset.
    pub fn namespace(&self) -> Option<&str> {
        non_empty(self.namespace.as_deref())
    }
}

/// Configuration for time-bounded retry.
///
/// Every failure the retry loop sees is retried with exponential backoff
/// until `timeout` has elapsed.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total time budget for the operation
    pub timeout: Duration,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20 * 60),
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}
