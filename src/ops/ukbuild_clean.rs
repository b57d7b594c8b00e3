//! Implementation of `ukbuild properclean`.

use std::path::Path;

use anyhow::Result;

use crate::builder::driver::BuildDriver;
use crate::core::project::Project;
use crate::ops::errors::OpsError;

/// Remove every build artifact of the project in `workdir`.
pub fn properclean(driver: &dyn BuildDriver, workdir: &Path) -> Result<()> {
    let project = Project::load(workdir).map_err(OpsError::from)?;
    tracing::info!("cleaning {}", project.name());
    driver.properclean(&project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project::ProjectError;
    use crate::ops::errors::find_ops_error;
    use crate::test_support::{fixtures, RecordingDriver};
    use tempfile::TempDir;

    #[test]
    fn test_properclean_invokes_driver() {
        let tmp = TempDir::new().unwrap();
        fixtures::write_manifest(tmp.path(), "name = \"hello\"\n");
        let driver = RecordingDriver::new();

        properclean(&driver, tmp.path()).unwrap();
        assert_eq!(driver.calls(), vec!["properclean hello".to_string()]);
    }

    #[test]
    fn test_uninitialized_workdir() {
        let tmp = TempDir::new().unwrap();
        let err = properclean(&RecordingDriver::new(), tmp.path()).unwrap_err();
        assert!(matches!(
            find_ops_error(&err),
            Some(OpsError::Project(ProjectError::Uninitialized { .. }))
        ));
    }
}
