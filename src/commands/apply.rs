//! `apply` and `destroy` - converge the cluster and record identities

use anyhow::{Result, bail};
use declarative::{ConfirmCallback, ExecuteOptions, ExecutionPlan, execute};
use kubectl::Runner;
use std::collections::BTreeMap;

use super::plan::print_plan;
use super::session::Session;
use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs};
use crate::progress::ApplyProgress;
use crate::ui::{self, PromptConfirm};

pub fn apply<R: Runner>(ctx: &Context, session: &mut Session<R>, args: &ApplyArgs) -> Result<()> {
    let jobs = args.plan.jobs.jobs;
    if !args.plan.no_refresh {
        session.refresh_for_plan(jobs, ctx.quiet)?;
    }

    let plan = session.plan(&session.stack.desired(), args.plan.target.as_deref())?;
    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs,
    };
    let mut confirm = PromptConfirm {
        assume_yes: args.yes,
    };
    converge(ctx, session, plan, &opts, &mut confirm)
}

pub fn destroy<R: Runner>(
    ctx: &Context,
    session: &mut Session<R>,
    args: &DestroyArgs,
) -> Result<()> {
    let plan = session.plan(&BTreeMap::new(), args.target.as_deref())?;
    let opts = ExecuteOptions {
        dry_run: false,
        jobs: args.jobs.jobs,
    };
    let mut confirm = PromptConfirm {
        assume_yes: args.yes,
    };
    converge(ctx, session, plan, &opts, &mut confirm)
}

/// Run a plan, persist every outcome, then report
///
/// State is saved even when some changes failed so identities of objects
/// that were created are never lost.
pub fn converge<R: Runner, C: ConfirmCallback>(
    ctx: &Context,
    session: &mut Session<R>,
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    confirm: &mut C,
) -> Result<()> {
    print_plan(ctx, &plan);
    if plan.is_empty() {
        return session.save();
    }
    println!();

    let mut progress = ApplyProgress::new(ctx.quiet);
    let report = execute(
        &session.resource,
        plan,
        &session.stack.timeouts,
        opts,
        &mut progress,
        confirm,
    )?;

    session.state.apply_outcomes(&report.outcomes);
    session.save()?;

    let summary = &report.summary;
    if summary.total_changes() == 0 && summary.failed == 0 {
        if summary.skipped > 0 {
            ui::info("No changes were made.");
        }
        return Ok(());
    }

    ui::print_summary(summary);
    if !summary.is_success() {
        bail!("{} manifest(s) failed", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{JobsArgs, PlanArgs};
    use crate::commands::session::tests::{WEB_ID, session, web_manifest, web_record};
    use crate::resource::testing::{ScriptedRunner, list_response};
    use crate::state::State;
    use declarative::AutoDecline;
    use tempfile::TempDir;

    fn ctx() -> Context {
        Context {
            verbose: 0,
            quiet: true,
        }
    }

    fn apply_args(target: Option<&str>, dry_run: bool) -> ApplyArgs {
        ApplyArgs {
            plan: PlanArgs {
                target: target.map(str::to_string),
                no_refresh: true,
                jobs: JobsArgs { jobs: 1 },
            },
            dry_run,
            yes: true,
        }
    }

    #[test]
    fn test_apply_creates_and_saves_identity() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new(vec![Ok(String::new()), Ok(list_response(WEB_ID))]);
        let mut session = session(&dir, &runner, vec![web_manifest("ops")], vec![]);

        apply(&ctx(), &mut session, &apply_args(None, false)).unwrap();

        let saved = State::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(saved.resources["web"], web_record());
    }

    #[test]
    fn test_failed_apply_still_saves_state() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new(vec![
            Ok(String::new()),
            Ok(r#"{"items":[]}"#.to_string()),
        ]);
        let mut session = session(&dir, &runner, vec![web_manifest("ops")], vec![]);

        let err = apply(&ctx(), &mut session, &apply_args(None, false)).unwrap_err();

        assert!(err.to_string().contains("1 manifest(s) failed"));
        let saved = State::load(&dir.path().join("state.json")).unwrap();
        assert!(saved.resources.is_empty());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::default();
        let mut session = session(&dir, &runner, vec![web_manifest("ops")], vec![]);

        apply(&ctx(), &mut session, &apply_args(None, true)).unwrap();

        assert!(runner.calls().is_empty());
        assert!(session.state.resources.is_empty());
    }

    #[test]
    fn test_destroy_deletes_and_forgets() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::default();
        let mut session = session(
            &dir,
            &runner,
            vec![web_manifest("ops")],
            vec![("web", web_record())],
        );

        let args = DestroyArgs {
            target: None,
            yes: true,
            jobs: JobsArgs { jobs: 1 },
        };
        destroy(&ctx(), &mut session, &args).unwrap();

        assert_eq!(runner.calls(), ["delete services/web -n ops"]);
        let saved = State::load(&dir.path().join("state.json")).unwrap();
        assert!(saved.resources.is_empty());
    }

    #[test]
    fn test_declined_keeps_state() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::default();
        let mut session = session(&dir, &runner, vec![], vec![("web", web_record())]);

        let plan = session.plan(&BTreeMap::new(), None).unwrap();
        converge(
            &ctx(),
            &mut session,
            plan,
            &ExecuteOptions::default(),
            &mut AutoDecline,
        )
        .unwrap();

        assert!(runner.calls().is_empty());
        assert_eq!(session.state.resources["web"], web_record());
    }
}
