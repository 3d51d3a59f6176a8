//! A loaded stack with its state and resource handler

use anyhow::{Context as _, Result, bail};
use declarative::{Attributes, ExecutionPlan, RefreshOutcome};
use kubectl::{Client, ProcessRunner, Runner};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::{ProviderArgs, StackArgs};
use crate::config::Stack;
use crate::paths;
use crate::resource::{ManifestResource, RESOURCE_TYPE};
use crate::state::State;
use crate::ui;

pub struct Session<R: Runner = ProcessRunner> {
    pub stack: Stack,
    pub state_path: PathBuf,
    pub state: State,
    pub resource: ManifestResource<R>,
}

impl Session<ProcessRunner> {
    /// Load the stack file and its state, and connect through kubectl
    pub fn open(stack_args: &StackArgs, provider: &ProviderArgs) -> Result<Self> {
        let stack = Stack::load(stack_args.path())?;
        let state_path = match &stack_args.state {
            Some(path) => path.clone(),
            None => paths::state_file_for(&stack.path)?,
        };
        let state = State::load(&state_path)?;

        let config = stack.connection(provider)?;
        let client = Client::new(config).context("determining kubeconfig")?;

        Ok(Self::with_resource(
            stack,
            state_path,
            state,
            ManifestResource::new(client),
        ))
    }
}

impl<R: Runner> Session<R> {
    pub fn with_resource(
        stack: Stack,
        state_path: PathBuf,
        state: State,
        resource: ManifestResource<R>,
    ) -> Self {
        Self {
            stack,
            state_path,
            state,
            resource,
        }
    }

    /// Re-read every managed object and fold the results into state
    ///
    /// Read failures keep the stored record and are returned alongside.
    pub fn refresh(&mut self, jobs: usize) -> Result<Vec<RefreshOutcome>> {
        let records = self.state.records().into_iter().collect();
        let outcomes = declarative::refresh(&self.resource, records, &self.stack.timeouts, jobs)?;
        self.state.apply_refresh(&outcomes);
        Ok(outcomes)
    }

    /// Refresh before planning; gone objects are reported, read failures abort
    pub fn refresh_for_plan(&mut self, jobs: usize, quiet: bool) -> Result<()> {
        let outcomes = self.refresh(jobs)?;

        let mut failed = 0;
        for outcome in &outcomes {
            if let Some(error) = &outcome.error {
                ui::error(&format!("{}: {error}", outcome.name));
                failed += 1;
            } else if outcome.record.is_none() && !quiet {
                ui::warn(&format!(
                    "{} no longer exists in the cluster and will be created again",
                    outcome.name
                ));
            }
        }

        if failed > 0 {
            bail!("Could not refresh {failed} manifest(s)");
        }
        Ok(())
    }

    /// Plan `desired` against state, limited to `target`
    pub fn plan(
        &self,
        desired: &BTreeMap<String, Attributes>,
        target: Option<&str>,
    ) -> Result<ExecutionPlan> {
        let plan = ExecutionPlan::build(&self.resource, &self.state.records(), desired)?
            .filter_by_target(RESOURCE_TYPE, target);

        if let Some(target) = target
            && plan.changes.is_empty()
        {
            bail!("No manifest matches target \"{target}\"");
        }
        Ok(plan)
    }

    /// Persist state
    pub fn save(&mut self) -> Result<()> {
        self.state.save(&self.state_path)
    }
}
