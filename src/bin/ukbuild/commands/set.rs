//! `ukbuild set` command

use anyhow::Result;

use crate::cli::SetArgs;
use crate::commands::Session;
use ukbuild::ops::ukbuild_set::set;

pub fn execute(session: &Session, args: SetArgs) -> Result<()> {
    set(&session.workdir, &args.options)?;
    eprintln!("     Updated {} option(s)", args.options.len());
    Ok(())
}
