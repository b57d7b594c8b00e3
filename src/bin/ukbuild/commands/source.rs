//! `ukbuild source` and `ukbuild unsource` commands

use anyhow::Result;

use crate::cli::SourceArgs;
use crate::commands::Session;
use ukbuild::ops::ukbuild_source::{source, unsource};

pub fn add(session: &Session, args: SourceArgs) -> Result<()> {
    source(&session.managers, &args.source)?;
    eprintln!("       Added source {}", args.source);
    Ok(())
}

pub fn remove(session: &Session, args: SourceArgs) -> Result<()> {
    unsource(&session.managers, &args.source)?;
    eprintln!("     Removed source {}", args.source);
    Ok(())
}
