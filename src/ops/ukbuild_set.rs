//! Implementation of `ukbuild set`.

use std::path::Path;

use anyhow::Result;

use crate::core::project::{Project, DOTCONFIG};
use crate::core::target::KConfig;
use crate::ops::errors::OpsError;

/// Parse `KEY=VALUE` arguments into configuration overrides.
pub fn parse_assignments(args: &[String]) -> Result<KConfig, OpsError> {
    if args.is_empty() {
        return Err(OpsError::usage("no options to set"));
    }

    let mut config = KConfig::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => config.set(key, value),
            _ => {
                return Err(OpsError::usage(format!(
                    "invalid or malformed argument: {}",
                    arg
                )))
            }
        }
    }
    Ok(config)
}

/// Write `KEY=VALUE` overrides into the project's existing `.config`.
pub fn set(workdir: &Path, args: &[String]) -> Result<()> {
    let config = parse_assignments(args)?;

    let dotconfig = workdir.join(DOTCONFIG);
    if !dotconfig.is_file() {
        return Err(OpsError::MissingDotConfig { path: dotconfig }.into());
    }

    Project::load(workdir)
        .map_err(OpsError::from)?
        .with_config(config)
        .set()
}
