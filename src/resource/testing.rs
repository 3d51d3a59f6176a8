//! Scripted kubectl runner for tests

use kubectl::{Client, ConnectionConfig, KubectlCommand, RetryConfig, Runner, Stdout};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Runner that replays scripted output and records kubectl arguments
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<kubectl::Result<String>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(responses: Vec<kubectl::Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Recorded invocations, arguments joined by spaces
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|args| args.join(" "))
            .collect()
    }
}

impl Runner for ScriptedRunner {
    fn run(
        &self,
        command: &KubectlCommand,
        _input: Option<&str>,
        _stdout: Stdout,
    ) -> kubectl::Result<String> {
        self.calls.lock().unwrap().push(command.args().to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Client over `runner` with millisecond backoff
pub fn test_client(runner: &ScriptedRunner) -> Client<&ScriptedRunner> {
    Client::with_runner(ConnectionConfig::default(), runner)
        .unwrap()
        .with_backoff(RetryConfig {
            timeout: Duration::ZERO,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(1),
        })
}

/// `kubectl get -o json` output describing one object
pub fn list_response(self_link: &str) -> String {
    format!(r#"{{"items":[{{"metadata":{{"selfLink":"{self_link}"}}}}]}}"#)
}
