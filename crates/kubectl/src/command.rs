//! kubectl invocation building.
//!
//! Global flags come first, outermost to innermost: `--token`,
//! `--context`, `--kubeconfig`. Then the verb and its arguments.

use crate::connection::ResolvedConnection;
use crate::identity::ResourceRef;
use crate::types::ConnectionConfig;
use std::fmt;
use std::process::Command;

/// Marker for manifest content on standard input.
const STDIN: &str = "-";

/// A fully built kubectl invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlCommand {
    program: String,
    args: Vec<String>,
    token: Option<String>,
}

impl KubectlCommand {
    /// Build an invocation from connection settings and verb arguments.
    pub fn new<I, S>(config: &ConnectionConfig, connection: &ResolvedConnection, verb: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = Vec::new();

        if let Some(token) = config.token() {
            args.push("--token".to_string());
            args.push(token.to_string());
        }
        if let Some(context) = config.context() {
            args.push("--context".to_string());
            args.push(context.to_string());
        }
        if let Some(path) = connection.kubeconfig() {
            args.push("--kubeconfig".to_string());
            args.push(path.display().to_string());
        }

        args.extend(verb.into_iter().map(Into::into));

        Self {
            program: config.program().to_string(),
            args,
            token: config.token().map(str::to_string),
        }
    }

    /// `apply --validate=<bool> [-n ns] -f -`
    pub fn apply(
        config: &ConnectionConfig,
        connection: &ResolvedConnection,
        namespace: Option<&str>,
    ) -> Self {
        let mut verb = vec!["apply".to_string(), validate_flag(config)];
        push_namespace(&mut verb, namespace);
        verb.extend(["-f".to_string(), STDIN.to_string()]);
        Self::new(config, connection, verb)
    }

    /// `get -o json [-n ns] -f -`
    pub fn get_json(
        config: &ConnectionConfig,
        connection: &ResolvedConnection,
        namespace: Option<&str>,
    ) -> Self {
        let mut verb = vec!["get".to_string(), "-o".to_string(), "json".to_string()];
        push_namespace(&mut verb, namespace);
        verb.extend(["-f".to_string(), STDIN.to_string()]);
        Self::new(config, connection, verb)
    }

    /// `get --ignore-not-found <kind/name> [-n ns]`
    pub fn get_ignore_not_found(
        config: &ConnectionConfig,
        connection: &ResolvedConnection,
        target: &ResourceRef,
    ) -> Self {
        let mut verb = vec![
            "get".to_string(),
            "--ignore-not-found".to_string(),
            target.resource.clone(),
        ];
        push_namespace(&mut verb, target.namespace());
        Self::new(config, connection, verb)
    }

    /// `delete <kind/name> [-n ns]`
    pub fn delete(
        config: &ConnectionConfig,
        connection: &ResolvedConnection,
        target: &ResourceRef,
    ) -> Self {
        let mut verb = vec!["delete".to_string(), target.resource.clone()];
        push_namespace(&mut verb, target.namespace());
        Self::new(config, connection, verb)
    }

    /// `port-forward -n ns service/<name> [local:]port`
    pub fn port_forward(
        config: &ConnectionConfig,
        connection: &ResolvedConnection,
        namespace: &str,
        service: &str,
        ports: &str,
    ) -> Self {
        let verb = vec![
            "port-forward".to_string(),
            "-n".to_string(),
            namespace.to_string(),
            format!("service/{service}"),
            ports.to_string(),
        ];
        Self::new(config, connection, verb)
    }

    /// Program to execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Ordered argument list.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Convert into a `std::process::Command` with no stdio configured.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Renders the invocation with the token value masked.
impl fmt::Display for KubectlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if self.token.as_deref() == Some(arg.as_str()) {
                write!(f, " <redacted>")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn validate_flag(config: &ConnectionConfig) -> String {
    format!("--validate={}", config.kubectl_validate)
}

fn push_namespace(args: &mut Vec<String>, namespace: Option<&str>) {
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        args.push("-n".to_string());
        args.push(ns.to_string());
    }
}
