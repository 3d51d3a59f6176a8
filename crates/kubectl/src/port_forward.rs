//! Local tunnels to cluster services via `kubectl port-forward`.
//!
//! A tunnel is a detached child process with its own lifecycle. It shares
//! nothing with manifest reconciliation apart from connection settings.

use crate::command::KubectlCommand;
use crate::connection::{self, ResolvedConnection};
use crate::error::{Error, Result};
use crate::types::ConnectionConfig;
use std::process::{Child, ExitStatus, Stdio};

/// What to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForwardSpec {
    /// Service name
    pub name: String,
    /// Service namespace
    pub namespace: String,
    /// Service port
    pub port: u16,
    /// Local port, defaults to `port`
    pub local_port: Option<u16>,
}

impl PortForwardSpec {
    /// Identity of the tunnel: `<name>.<namespace>:<port>`.
    pub fn id(&self) -> String {
        format!("{}.{}:{}", self.name, self.namespace, self.port)
    }

    /// Port argument for kubectl.
    fn ports(&self) -> String {
        match self.local_port {
            Some(local) if local != self.port => format!("{local}:{}", self.port),
            _ => self.port.to_string(),
        }
    }
}

/// How the tunnel's stdio is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// Inherit the caller's terminal
    Inherit,
    /// Run silently in the background
    Detached,
}

/// A running `kubectl port-forward` process.
///
/// Owns the resolved connection so a materialized kubeconfig outlives
/// the child that reads it.
#[derive(Debug)]
pub struct PortForward {
    id: String,
    child: Child,
    _connection: ResolvedConnection,
}

impl PortForward {
    /// Start forwarding.
    pub fn start(config: &ConnectionConfig, spec: &PortForwardSpec, attach: Attach) -> Result<Self> {
        let connection = connection::resolve(config)?;
        let command = KubectlCommand::port_forward(
            config,
            &connection,
            &spec.namespace,
            &spec.name,
            &spec.ports(),
        );

        log::info!("Starting port-forward {}", spec.id());
        log::debug!("Executing {command}");

        let mut cmd = command.to_command();
        match attach {
            Attach::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            Attach::Detached => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
        }

        let child = cmd.spawn().map_err(|e| Error::Execution {
            command: command.to_string(),
            stderr: e.to_string(),
        })?;

        Ok(Self {
            id: spec.id(),
            child,
            _connection: connection,
        })
    }

    /// Tunnel identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the child is still running.
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Block until the tunnel exits.
    pub fn wait(mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Terminate the tunnel.
    pub fn stop(mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill()?;
            self.child.wait()?;
        }
        log::info!("Stopped port-forward {}", self.id);
        Ok(())
    }
}
