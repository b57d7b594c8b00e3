//! ukbuild CLI - build, package and pull unikernel projects

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use miette::{GraphicalReportHandler, GraphicalTheme};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod progress;

use cli::{Cli, Commands};
use commands::Session;
use ukbuild::core::{ManifestError, ProjectError};
use ukbuild::ops::{find_ops_error, OpsError};
use ukbuild::util::diagnostic;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn report(e: &anyhow::Error, color: bool) {
    // Manifest errors carry source spans; render them with miette.
    let manifest = e
        .chain()
        .find_map(|c| c.downcast_ref::<ManifestError>())
        .or_else(|| match find_ops_error(e) {
            Some(OpsError::Project(ProjectError::Manifest(m))) => Some(m),
            _ => None,
        });
    if let Some(manifest) = manifest {
        let handler = if color {
            GraphicalReportHandler::new()
        } else {
            GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        };
        let mut out = String::new();
        if handler.render_report(&mut out, manifest).is_ok() {
            eprint!("{}", out);
            return;
        }
    }

    match find_ops_error(e) {
        Some(ops) => diagnostic::emit(&ops.to_diagnostic(), color),
        None => eprintln!("error: {:#}", e),
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ukbuild=debug")
    } else {
        EnvFilter::new("ukbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let session = Session::new(cli.workdir.as_deref(), cli.verbose)?;

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(&session, args),
        Commands::Pkg(args) => commands::pkg::execute(&session, args),
        Commands::Pull(args) => commands::pull::execute(&session, args),
        Commands::Source(args) => commands::source::add(&session, args),
        Commands::Unsource(args) => commands::source::remove(&session, args),
        Commands::Update(args) => commands::update::execute(&session, args),
        Commands::Set(args) => commands::set::execute(&session, args),
        Commands::Properclean => commands::properclean::execute(&session),
    }
}
