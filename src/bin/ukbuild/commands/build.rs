//! `ukbuild build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::Session;
use ukbuild::builder::{JsonLinesObserver, MakeDriver, StageObserver};
use ukbuild::ops::ukbuild_build::{build, BuildOptions, FailurePolicy};

pub fn execute(session: &Session, args: BuildArgs) -> Result<()> {
    let config = &session.config.build;

    let opts = BuildOptions {
        filter: args.select.filter(),
        dot_config: args.config,
        fast: args.fast || config.fast,
        // Jobs: CLI > config > derived from CPU count
        jobs: args.jobs.or(config.jobs).unwrap_or(0),
        kernel_dbg: args.dbg,
        no_cache: args.no_cache || config.no_cache,
        no_configure: args.no_configure,
        no_fetch: args.no_fetch,
        no_prepare: args.no_prepare,
        save_build_log: args.build_log,
        policy: if args.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::BestEffort
        },
    };

    let observer: Box<dyn StageObserver> = if args.json {
        Box::new(JsonLinesObserver::new(std::io::stdout()))
    } else {
        session.observer()
    };

    let report = build(
        &session.ctx,
        &session.managers,
        &MakeDriver::new(),
        observer.as_ref(),
        &session.workdir,
        &opts,
    )?;

    for outcome in report.succeeded() {
        eprintln!(
            "    Finished `{}` -> {}",
            outcome.target,
            outcome.kernel.display()
        );
    }

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{} target(s) failed to build", failed);
    }

    Ok(())
}
