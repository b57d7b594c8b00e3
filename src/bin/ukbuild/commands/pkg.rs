//! `ukbuild pkg` command

use anyhow::{bail, Result};

use crate::cli::PkgArgs;
use crate::commands::Session;
use ukbuild::core::PackageFormat;
use ukbuild::ops::ukbuild_build::FailurePolicy;
use ukbuild::ops::ukbuild_pkg::{package, PackageOptions};

pub fn execute(session: &Session, args: PkgArgs) -> Result<()> {
    let opts = PackageOptions {
        filter: args.select.filter(),
        format: args
            .format
            .as_deref()
            .map(PackageFormat::from)
            .unwrap_or_else(PackageFormat::auto),
        name: args.name,
        output: args.output,
        initrd: args.initrd,
        kernel: args.kernel,
        dbg: args.dbg,
        with_kconfig: args.with_kconfig,
        force: args.force,
        policy: if args.keep_going {
            FailurePolicy::BestEffort
        } else {
            FailurePolicy::FailFast
        },
    };

    let observer = session.observer();
    let report = package(
        &session.ctx,
        &session.managers,
        observer.as_ref(),
        &session.workdir,
        &opts,
    )?;
    drop(observer);

    for packaged in &report.packaged {
        eprintln!(
            "    Packaged `{}` ({}) as {}",
            packaged.target,
            packaged.format,
            packaged.package.type_name_version()
        );
    }

    if !report.is_success() {
        bail!("{} target(s) failed to package", report.failures.len());
    }

    Ok(())
}
