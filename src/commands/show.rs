//! `show` - list managed objects recorded in state

use anyhow::{Result, bail};
use colored::Colorize;
use kubectl::{ResourceRef, Runner};

use super::session::Session;
use crate::Context;
use crate::ui;

pub fn run<R: Runner>(ctx: &Context, session: &Session<R>, name: Option<&str>) -> Result<()> {
    let state = &session.state;

    if let Some(name) = name
        && !state.resources.contains_key(name)
    {
        bail!("\"{name}\" is not managed by this stack");
    }

    ui::header("Managed manifests");
    if !ctx.quiet {
        ui::kv("State", &session.state_path.display().to_string());
        ui::kv("Updated", &state.last_updated.to_rfc3339());
        println!();
    }

    if state.resources.is_empty() {
        ui::info("No managed manifests.");
        return Ok(());
    }

    let declared: Vec<&str> = session
        .stack
        .manifests
        .iter()
        .map(|m| m.name.as_str())
        .collect();

    for (record_name, record) in state
        .resources
        .iter()
        .filter(|(n, _)| name.is_none_or(|want| want == n.as_str()))
    {
        let marker = if declared.contains(&record_name.as_str()) {
            "●".green()
        } else {
            // Recorded but no longer declared; the next apply deletes it
            "●".red()
        };
        println!("  {} {}", marker, record_name.bold());

        let object = ResourceRef::from_identity(&record.id)
            .map_or_else(|_| record.id.clone(), |r| r.to_string());
        ui::kv("object", &object);
        ui::kv("id", &record.id);
        if let Some(ns) = &record.namespace {
            ui::kv("namespace", ns);
        }
    }

    Ok(())
}
