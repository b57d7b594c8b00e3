//! `ukbuild properclean` command

use anyhow::Result;

use crate::commands::Session;
use ukbuild::builder::MakeDriver;
use ukbuild::ops::ukbuild_clean::properclean;

pub fn execute(session: &Session) -> Result<()> {
    properclean(&MakeDriver::new(), &session.workdir)?;
    eprintln!("     Cleaned {}", session.workdir.display());
    Ok(())
}
