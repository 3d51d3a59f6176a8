//! `plan` - show what apply would change

use anyhow::Result;
use colored::Colorize;
use declarative::{Action, DiffSummary, ExecutionPlan, PlannedChange, ResourceDiff};
use kubectl::Runner;
use similar::{ChangeTag, TextDiff};

use super::session::Session;
use crate::Context;
use crate::cli::PlanArgs;
use crate::resource::{ATTR_CONTENT, RESOURCE_TYPE};
use crate::ui;

pub fn run<R: Runner>(ctx: &Context, session: &mut Session<R>, args: &PlanArgs) -> Result<()> {
    if !args.no_refresh {
        session.refresh_for_plan(args.jobs.jobs, ctx.quiet)?;
    }

    let plan = session.plan(&session.stack.desired(), args.target.as_deref())?;
    print_plan(ctx, &plan);
    Ok(())
}

/// Print planned changes and a one-line summary
pub fn print_plan(ctx: &Context, plan: &ExecutionPlan) {
    if plan.is_empty() {
        ui::success("No changes. The cluster matches the stack.");
        return;
    }

    ui::header("Planned changes");
    for change in plan.pending() {
        print_change(ctx, change);
    }

    let diffs: Vec<ResourceDiff> = plan.changes.iter().map(|c| c.diff.clone()).collect();
    let summary = DiffSummary::from_diffs(&diffs);
    println!();
    println!("  {}", summary_line(&summary).bold());
}

fn print_change(ctx: &Context, change: &PlannedChange) {
    let action = change.action();
    println!(
        "  {} {}.{} {}",
        ui::action_symbol(action),
        RESOURCE_TYPE,
        change.name().bold(),
        format!("({action})").dimmed()
    );

    let forced = change.diff.forced_by();
    if !forced.is_empty() {
        ui::dim(&format!("  forces replacement: {}", forced.join(", ")));
    }

    for attr in change.diff.changes.iter().filter(|c| c.name != ATTR_CONTENT) {
        ui::dim(&format!(
            "  {}: {} -> {}",
            attr.name,
            attr.from.as_deref().unwrap_or("(unset)"),
            attr.to.as_deref().unwrap_or("(unset)")
        ));
    }

    // Full manifests of creates and deletes only at -v
    let show_content = match action {
        Action::Update | Action::Replace => !ctx.quiet,
        Action::Create | Action::Delete => ctx.verbose > 0,
        Action::NoChange => false,
    };
    if show_content {
        let prior = change.prior.as_ref().and_then(|p| p.get(ATTR_CONTENT));
        let desired = change
            .desired
            .as_ref()
            .and_then(|d| d.get(ATTR_CONTENT))
            .map(String::as_str);
        for line in content_diff(prior.unwrap_or_default(), desired.unwrap_or_default()) {
            let colored = match line.chars().next() {
                Some('+') => line.green(),
                Some('-') => line.red(),
                _ => line.normal(),
            };
            println!("      {colored}");
        }
    }
}

/// Changed lines between two manifests, prefixed with `+ ` or `- `
pub fn content_diff(from: &str, to: &str) -> Vec<String> {
    TextDiff::from_lines(from, to)
        .iter_all_changes()
        .filter_map(|change| {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => return None,
            };
            Some(format!("{sign} {}", change.value().trim_end_matches('\n')))
        })
        .collect()
}

pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.additions, summary.updates, summary.replacements, summary.removals
    )
}
