//! Execution engine - runs planned changes with parallelism
//!
//! Each instance's steps run sequentially; different instances run in
//! parallel on a bounded thread pool. Every outcome carries the record the
//! caller should persist, so a failure on one instance never loses the
//! identity of another.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::planner::{ExecutionPlan, PlannedChange};
use crate::resource::Resource;
use crate::types::{
    Action, ApplyResult, Attributes, ExecuteOptions, ExecuteSummary, ResourceData, TimeoutPolicy,
    Timeouts,
};
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::time::Duration;

/// Result of one planned change
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Instance name
    pub name: String,
    /// What happened
    pub result: ApplyResult,
    /// Record to persist; `None` removes the instance from state
    pub record: Option<ResourceData>,
}

/// Result of running a plan
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<Outcome>,
}

/// Result of refreshing one instance
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Instance name
    pub name: String,
    /// Refreshed record; `None` when the object is gone
    pub record: Option<ResourceData>,
    /// Read failure, in which case `record` is the unchanged input
    pub error: Option<String>,
}

/// Execute a plan with the given options and callbacks
pub fn execute<P, C>(
    resource: &dyn Resource,
    plan: ExecutionPlan,
    timeouts: &TimeoutPolicy,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (pending, unchanged): (Vec<_>, Vec<_>) = plan
        .changes
        .into_iter()
        .partition(|c| c.action().is_change());

    let mut report = ExecuteReport::default();
    for change in unchanged {
        report.push(Outcome {
            name: change.diff.name,
            result: ApplyResult::NoChange,
            record: change.prior,
        });
    }

    if pending.is_empty() {
        return Ok(report);
    }

    let skip_reason = if opts.dry_run {
        Some("Dry run")
    } else if !confirm.confirm("Apply changes?")? {
        Some("Declined")
    } else {
        None
    };

    if let Some(reason) = skip_reason {
        for change in pending {
            report.push(Outcome {
                name: change.diff.name,
                result: ApplyResult::Skipped {
                    reason: reason.to_string(),
                },
                record: change.prior,
            });
        }
        report.outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(report);
    }

    progress.on_batch_start(pending.len());

    let outcomes = if opts.jobs <= 1 || pending.len() == 1 {
        let mut outcomes = Vec::with_capacity(pending.len());
        for change in &pending {
            progress.on_resource_start(change.name(), change.action());
            let outcome = apply_change(resource, change, &timeouts.for_instance(change.name()));
            progress.on_resource_complete(&outcome.name, &outcome.result);
            outcomes.push(outcome);
        }
        outcomes
    } else {
        let outcomes = run_parallel(opts.jobs, &pending, |change| {
            apply_change(resource, change, &timeouts.for_instance(change.name()))
        })?;
        // Progress callbacks are not thread-safe; report after the pool is done
        for outcome in &outcomes {
            progress.on_resource_complete(&outcome.name, &outcome.result);
        }
        outcomes
    };

    progress.on_batch_complete();

    for outcome in outcomes {
        report.push(outcome);
    }
    report.outcomes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(report)
}

/// Execute without progress reporting or confirmation
pub fn execute_simple(
    resource: &dyn Resource,
    plan: ExecutionPlan,
    timeouts: &TimeoutPolicy,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(resource, plan, timeouts, opts, &mut NoProgress, &mut AutoConfirm)
}

/// Read every managed instance, dropping the ones that no longer exist
pub fn refresh(
    resource: &dyn Resource,
    records: Vec<(String, ResourceData)>,
    timeouts: &TimeoutPolicy,
    jobs: usize,
) -> Result<Vec<RefreshOutcome>> {
    let managed: Vec<_> = records.into_iter().filter(|(_, r)| r.is_managed()).collect();

    run_parallel(jobs.max(1), &managed, |(name, record)| {
        let mut data = record.clone();
        match resource.read(&mut data, timeouts.for_instance(name).read) {
            Ok(()) if data.is_managed() => RefreshOutcome {
                name: name.clone(),
                record: Some(data),
                error: None,
            },
            Ok(()) => {
                log::info!("{name}: object no longer exists, dropping from state");
                RefreshOutcome {
                    name: name.clone(),
                    record: None,
                    error: None,
                }
            }
            Err(e) => RefreshOutcome {
                name: name.clone(),
                record: Some(record.clone()),
                error: Some(format!("{e:#}")),
            },
        }
    })
}

impl ExecuteReport {
    fn push(&mut self, outcome: Outcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }
}

/// Map `items` on a dedicated pool of `jobs` threads, preserving order
fn run_parallel<T, U, F>(jobs: usize, items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create thread pool")?;

    Ok(pool.install(|| items.par_iter().map(f).collect()))
}

/// Apply a single planned change
fn apply_change(resource: &dyn Resource, change: &PlannedChange, timeouts: &Timeouts) -> Outcome {
    let name = change.name().to_string();
    let (result, record) = match run_change(resource, change, timeouts) {
        Ok((result, record)) => (result, record),
        Err((e, record)) => {
            log::error!("{name}: {e:#}");
            (
                ApplyResult::Failed {
                    error: format!("{e:#}"),
                },
                record,
            )
        }
    };
    Outcome {
        name,
        result,
        record,
    }
}

type ChangeResult =
    std::result::Result<(ApplyResult, Option<ResourceData>), (anyhow::Error, Option<ResourceData>)>;

fn run_change(resource: &dyn Resource, change: &PlannedChange, timeouts: &Timeouts) -> ChangeResult {
    let name = change.name();
    let prior = change.prior.clone();
    let desired = change.desired.clone().unwrap_or_default();

    match change.action() {
        Action::NoChange => Ok((ApplyResult::NoChange, prior)),
        Action::Create => create(resource, name, desired, timeouts.create)
            .map(|data| (ApplyResult::Created, Some(data)))
            .map_err(|e| (e, None)),
        Action::Update => {
            let Some(mut data) = prior.clone() else {
                return Err((anyhow::anyhow!("{name}: no prior state to update"), None));
            };
            data.attributes = desired;
            resource
                .update(&mut data, timeouts.update)
                .with_context(|| format!("updating {name}"))
                .map(|()| (ApplyResult::Modified, Some(data)))
                .map_err(|e| (e, prior))
        }
        Action::Delete => delete(resource, name, prior.clone(), timeouts.delete)
            .map(|()| (ApplyResult::Removed, None))
            .map_err(|e| (e, prior)),
        Action::Replace => {
            delete(resource, name, prior.clone(), timeouts.delete).map_err(|e| (e, prior))?;
            create(resource, name, desired, timeouts.create)
                .map(|data| (ApplyResult::Replaced, Some(data)))
                .map_err(|e| (e, None))
        }
    }
}

fn create(
    resource: &dyn Resource,
    name: &str,
    desired: Attributes,
    timeout: Duration,
) -> Result<ResourceData> {
    let mut data = ResourceData::new(desired);
    resource
        .create(&mut data, timeout)
        .with_context(|| format!("creating {name}"))?;
    if !data.is_managed() {
        bail!("creating {name}: no identity was recorded");
    }
    Ok(data)
}

fn delete(
    resource: &dyn Resource,
    name: &str,
    prior: Option<ResourceData>,
    timeout: Duration,
) -> Result<()> {
    let Some(mut data) = prior else {
        return Ok(());
    };
    resource
        .delete(&mut data, timeout)
        .with_context(|| format!("deleting {name}"))
}
