//! `refresh` - re-read managed objects and update state

use anyhow::{Result, bail};
use kubectl::Runner;

use super::session::Session;
use crate::Context;
use crate::ui;

pub fn run<R: Runner>(ctx: &Context, session: &mut Session<R>, jobs: usize) -> Result<()> {
    if session.state.resources.is_empty() {
        ui::info("No managed manifests to refresh.");
        return Ok(());
    }

    let outcomes = session.refresh(jobs)?;
    session.save()?;

    let mut failed = 0;
    for outcome in &outcomes {
        match (&outcome.error, &outcome.record) {
            (Some(error), _) => {
                ui::error(&format!("{}: {error}", outcome.name));
                failed += 1;
            }
            (None, None) => ui::warn(&format!(
                "{} no longer exists, removed from state",
                outcome.name
            )),
            (None, Some(_)) if !ctx.quiet => ui::success(&outcome.name),
            (None, Some(_)) => {}
        }
    }

    if failed > 0 {
        bail!("Could not refresh {failed} manifest(s)");
    }
    Ok(())
}
