mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use commands::session::Session;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let result = run(&ctx, cli);
    if let Err(err) = &result
        && let Some(kube) = err.chain().find_map(|e| e.downcast_ref::<kubectl::Error>())
    {
        let category = kube.category();
        ui::dim(&format!("{}: {}", category.description(), category.advice()));
    }
    result
}

fn run(ctx: &Context, cli: Cli) -> Result<()> {
    match cli.command {
        Command::Plan(args) => {
            let mut session = Session::open(&cli.stack, &cli.provider)?;
            commands::plan::run(ctx, &mut session, &args)
        }
        Command::Apply(args) => {
            let mut session = Session::open(&cli.stack, &cli.provider)?;
            commands::apply::apply(ctx, &mut session, &args)
        }
        Command::Refresh(args) => {
            let mut session = Session::open(&cli.stack, &cli.provider)?;
            commands::refresh::run(ctx, &mut session, args.jobs)
        }
        Command::Destroy(args) => {
            let mut session = Session::open(&cli.stack, &cli.provider)?;
            commands::apply::destroy(ctx, &mut session, &args)
        }
        Command::Show { name } => {
            let session = Session::open(&cli.stack, &cli.provider)?;
            commands::show::run(ctx, &session, name.as_deref())
        }
        Command::PortForward(args) => {
            commands::port_forward::run(ctx, &cli.stack, &cli.provider, &args)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "kubemanifest", &mut io::stdout());
            Ok(())
        }
    }
}
