//! `ukbuild pull` command

use anyhow::Result;

use crate::cli::PullArgs;
use crate::commands::Session;
use ukbuild::core::PackageFormat;
use ukbuild::ops::ukbuild_pull::{pull, PullOptions};

pub fn execute(session: &Session, args: PullArgs) -> Result<()> {
    let config = &session.config.pull;

    let opts = PullOptions {
        manager: args
            .manager
            .as_deref()
            .map(PackageFormat::from)
            .unwrap_or_else(PackageFormat::auto),
        force_cache: args.force_cache || config.force_cache,
        no_checksum: args.no_checksum || config.no_checksum,
    };

    let report = pull(
        &session.ctx,
        &session.managers,
        &session.workdir,
        &args.args,
        &opts,
    )?;

    for pulled in &report.pulled {
        let status = if pulled.outcome.is_up_to_date() {
            "Fresh"
        } else {
            "Pulled"
        };
        eprintln!(
            "{:>12} {} -> {}",
            status,
            pulled.package,
            pulled.outcome.path().display()
        );
    }
    if !report.skipped.is_empty() {
        eprintln!("{:>12} {} item(s)", "Skipped", report.skipped.len());
    }

    Ok(())
}
