//! Implementation of `ukbuild source`, `ukbuild unsource` and `ukbuild update`.

use anyhow::{Context, Result};

use crate::core::format::PackageFormat;
use crate::ops::errors::OpsError;
use crate::packmanager::PackageManagers;

/// Register `locator` with the manager that claims it.
pub fn source(managers: &PackageManagers, locator: &str) -> Result<()> {
    let manager = managers.probe_required(locator).map_err(OpsError::from)?;
    manager
        .add_source(locator)
        .with_context(|| format!("failed to add source `{}`", locator))?;
    tracing::info!("added source {} ({})", locator, manager.format());
    Ok(())
}

/// Unregister `locator` from the manager that claims it.
pub fn unsource(managers: &PackageManagers, locator: &str) -> Result<()> {
    let manager = managers.probe_required(locator).map_err(OpsError::from)?;
    manager
        .remove_source(locator)
        .with_context(|| format!("failed to remove source `{}`", locator))?;
    tracing::info!("removed source {} ({})", locator, manager.format());
    Ok(())
}

/// Refresh the catalog of the manager for `format` (`auto` = default).
pub fn update(managers: &PackageManagers, format: &PackageFormat) -> Result<()> {
    let manager = managers.route(format).map_err(OpsError::from)?;
    manager
        .update()
        .with_context(|| format!("failed to update `{}` catalog", manager.format()))
}
