//! # kubectl
//!
//! Manifest lifecycle management on top of the `kubectl` CLI.
//!
//! This crate provides functionality for:
//! - Resolving kubeconfig settings, including inline kubeconfig content
//! - Applying, reading and deleting a single manifest with retry logic
//! - Deriving a durable identity from kubectl's JSON output
//! - Opening local tunnels with `kubectl port-forward`
//!
//! ## Example
//!
//! ```no_run
//! use kubectl::{Client, ConnectionConfig, Manifest};
//! use std::time::Duration;
//!
//! let client = Client::new(ConnectionConfig::default()).expect("invalid configuration");
//! let manifest = Manifest::new("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: ops\n");
//!
//! let id = client.create(&manifest, Duration::from_secs(300)).expect("create failed");
//! if client.read(&id, Duration::from_secs(60)).expect("read failed").is_none() {
//!     println!("{id} is gone");
//! }
//! ```
//!
//! ## Retry Logic
//!
//! Every kubectl invocation runs under [`retry::with_retry`]: failures of
//! the client are retried with exponential backoff until the timeout given
//! to the lifecycle operation elapses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod connection;
pub mod error;
pub mod identity;
pub mod port_forward;
pub mod retry;
pub mod types;

pub use backend::{Runner, Stdout, process::ProcessRunner};
pub use command::KubectlCommand;
pub use error::{Error, ErrorCategory, Result};
pub use identity::ResourceRef;
pub use port_forward::{Attach, PortForward, PortForwardSpec};
pub use types::{ConnectionConfig, Manifest, RetryConfig};

use std::time::Duration;

/// Reconciles manifests against a cluster through kubectl.
///
/// The client holds no per-resource state: the identity returned by
/// [`Client::create`] is handed back by the caller on every later call.
pub struct Client<R: Runner = ProcessRunner> {
    config: ConnectionConfig,
    runner: R,
    backoff: RetryConfig,
    callback: Box<dyn retry::RetryCallback + Send + Sync>,
}

impl Client<ProcessRunner> {
    /// Create a client that runs real kubectl processes.
    ///
    /// Returns an error if the configuration is inconsistent.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_runner(config, backend::default_runner())
    }
}

impl<R: Runner> Client<R> {
    /// Create a client with a custom runner (useful for testing).
    pub fn with_runner(config: ConnectionConfig, runner: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runner,
            backoff: RetryConfig::default(),
            callback: Box::new(retry::LogCallback),
        })
    }

    /// Override the backoff schedule. The timeout field is ignored; each
    /// operation supplies its own.
    pub fn with_backoff(mut self, backoff: RetryConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Override the retry callback.
    pub fn with_callback(mut self, callback: Box<dyn retry::RetryCallback + Send + Sync>) -> Self {
        self.callback = callback;
        self
    }

    /// Connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn retry_config(&self, timeout: Duration) -> RetryConfig {
        RetryConfig {
            timeout,
            ..self.backoff.clone()
        }
    }

    fn retry<T>(
        &self,
        timeout: Duration,
        operation: &str,
        f: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        retry::with_retry(
            &self.retry_config(timeout),
            operation,
            Some(self.callback.as_ref()),
            f,
        )
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Apply a manifest and return its identity.
    ///
    /// The apply and the follow-up fetch each get the full `timeout`. No
    /// identity is returned unless both succeed and the fetch response
    /// describes exactly one object.
    pub fn create(&self, manifest: &Manifest, timeout: Duration) -> Result<String> {
        let connection = connection::resolve(&self.config)?;
        let namespace = manifest.namespace();

        self.retry(timeout, "apply", || {
            let cmd = KubectlCommand::apply(&self.config, &connection, namespace);
            self.runner
                .run(&cmd, Some(&manifest.content), Stdout::Discard)
        })?;

        let response = self.retry(timeout, "get", || {
            let cmd = KubectlCommand::get_json(&self.config, &connection, namespace);
            self.runner
                .run(&cmd, Some(&manifest.content), Stdout::Capture)
        })?;

        let id = identity::encode(response.as_bytes())?;
        log::info!("Created {id}");
        Ok(id)
    }

    /// Check whether the object behind `id` still exists.
    ///
    /// Returns the identity unchanged when it does, `None` when kubectl
    /// reports nothing for it.
    pub fn read(&self, id: &str, timeout: Duration) -> Result<Option<String>> {
        let target = ResourceRef::from_identity(id)?;
        let connection = connection::resolve(&self.config)?;

        let output = self.retry(timeout, "get", || {
            let cmd = KubectlCommand::get_ignore_not_found(&self.config, &connection, &target);
            self.runner.run(&cmd, None, Stdout::Capture)
        })?;

        if output.trim().is_empty() {
            log::info!("{target} no longer exists");
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    }

    /// Re-apply a manifest.
    ///
    /// The namespace is not passed: a namespace change is a replacement and
    /// never reaches update. The identity is not re-derived.
    pub fn update(&self, manifest: &Manifest, timeout: Duration) -> Result<()> {
        let connection = connection::resolve(&self.config)?;

        self.retry(timeout, "apply", || {
            let cmd = KubectlCommand::apply(&self.config, &connection, None);
            self.runner
                .run(&cmd, Some(&manifest.content), Stdout::Discard)
        })?;
        Ok(())
    }

    /// Delete the object behind `id`.
    pub fn delete(&self, id: &str, timeout: Duration) -> Result<()> {
        let target = ResourceRef::from_identity(id)?;
        let connection = connection::resolve(&self.config)?;

        self.retry(timeout, "delete", || {
            let cmd = KubectlCommand::delete(&self.config, &connection, &target);
            self.runner.run(&cmd, None, Stdout::Discard)
        })?;

        log::info!("Deleted {target}");
        Ok(())
    }

    // =========================================================================
    // Tunnels
    // =========================================================================

    /// Start a `kubectl port-forward` tunnel.
    pub fn port_forward(&self, spec: &PortForwardSpec, attach: Attach) -> Result<PortForward> {
        PortForward::start(&self.config, spec, attach)
    }
}
