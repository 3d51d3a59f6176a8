//! Real process runner using `std::process`.

use crate::backend::{Runner, Stdout};
use crate::command::KubectlCommand;
use crate::error::{Error, Result};
use std::io::Write;
use std::process::Stdio;
use std::thread;

/// Runner that spawns real kubectl processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(
        &self,
        command: &KubectlCommand,
        input: Option<&str>,
        stdout: Stdout,
    ) -> Result<String> {
        log::debug!("Executing {command}");

        let mut cmd = command.to_command();
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(match stdout {
            Stdout::Capture => Stdio::piped(),
            Stdout::Discard => Stdio::null(),
        })
        .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Error::Execution {
            command: command.to_string(),
            stderr: e.to_string(),
        })?;

        // Feed stdin from a separate thread so a child that fills its
        // stdout pipe before reading all input cannot deadlock us.
        let writer = match (input, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => {
                let input = input.to_owned();
                Some(thread::spawn(move || stdin.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(|e| Error::Execution {
            command: command.to_string(),
            stderr: e.to_string(),
        })?;

        if let Some(writer) = writer
            && let Ok(Err(e)) = writer.join()
        {
            // kubectl may exit before reading everything; its exit status
            // and stderr are the better diagnostic.
            log::debug!("Writing stdin to {} failed: {e}", command.program());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::Execution {
                command: command.to_string(),
                stderr: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    format!("{}: {stderr}", output.status)
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::connection::ResolvedConnection;
    use crate::types::ConnectionConfig;

    fn command(program: &str, verb: &[&str]) -> KubectlCommand {
        let config = ConnectionConfig {
            kubectl_path: Some(program.to_string()),
            ..Default::default()
        };
        KubectlCommand::new(&config, &ResolvedConnection::ambient(), verb.iter().copied())
    }

    #[test]
    fn test_captures_stdout_and_feeds_stdin() {
        let out = ProcessRunner
            .run(&command("cat", &[]), Some("kind: Service\n"), Stdout::Capture)
            .unwrap();
        assert_eq!(out, "kind: Service\n");
    }

    #[test]
    fn test_discarded_stdout_is_empty() {
        let out = ProcessRunner
            .run(&command("echo", &["hello"]), None, Stdout::Discard)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let err = ProcessRunner
            .run(
                &command("sh", &["-c", "echo boom >&2; exit 3"]),
                None,
                Stdout::Discard,
            )
            .unwrap_err();
        match err {
            Error::Execution { command, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_zero_exit_without_stderr_reports_status() {
        let err = ProcessRunner
            .run(&command("false", &[]), None, Stdout::Discard)
            .unwrap_err();
        match err {
            Error::Execution { stderr, .. } => assert!(stderr.contains("exit status")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_binary_is_execution_error() {
        let err = ProcessRunner
            .run(
                &command("/nonexistent/kubectl-binary", &["version"]),
                None,
                Stdout::Discard,
            )
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
