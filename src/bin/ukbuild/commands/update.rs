//! `ukbuild update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::commands::Session;
use ukbuild::core::PackageFormat;
use ukbuild::ops::ukbuild_source::update;

pub fn execute(session: &Session, args: UpdateArgs) -> Result<()> {
    let format = args
        .manager
        .as_deref()
        .map(PackageFormat::from)
        .unwrap_or_else(PackageFormat::auto);
    update(&session.managers, &format)
}
