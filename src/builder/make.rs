//! `make` build driver.
//!
//! Runs the core build system with the project as application directory:
//! `make -C <core> A=<workdir> L=<lib>:<lib> O=<build dir> [-j N] <goal>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::driver::{BuildDriver, ConfigureOptions, MakeOptions};
use crate::core::project::Project;
use crate::core::target::Target;
use crate::util::fs;
use crate::util::process::{find_executable, OutputSink, ProcessBuilder};

/// Driver invoking `make` in the core source tree.
#[derive(Debug, Clone)]
pub struct MakeDriver {
    program: PathBuf,
}

impl MakeDriver {
    /// Use the `make` found in `PATH`.
    ///
    /// Never fails: a missing `make` surfaces when a stage first runs.
    pub fn new() -> Self {
        let program = find_executable("make").unwrap_or_else(|| PathBuf::from("make"));
        Self::with_program(program)
    }

    /// Use a specific `make` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        MakeDriver {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, project: &Project, jobs: Option<usize>, goal: Option<&str>) -> ProcessBuilder {
        let libs = project
            .library_dirs()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");

        let mut cmd = ProcessBuilder::new(&self.program)
            .arg("-C")
            .arg(project.core_dir())
            .arg(format!("A={}", project.workdir().display()))
            .arg(format!("L={}", libs))
            .arg(format!("O={}", project.build_dir().display()))
            .cwd(project.workdir());

        if let Some(jobs) = jobs {
            cmd = cmd.arg(format!("-j{}", jobs));
        }
        if let Some(goal) = goal {
            cmd = cmd.arg(goal);
        }
        cmd
    }
}

impl Default for MakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildDriver for MakeDriver {
    fn name(&self) -> &str {
        "make"
    }

    fn configure(
        &self,
        project: &Project,
        target: &Target,
        options: &ConfigureOptions,
    ) -> Result<()> {
        let mut kconfig = target.kconfig().clone();
        kconfig.merge(&options.extra);

        let dotconfig = project.dotconfig_path();
        fs::write_string(&dotconfig, &kconfig.to_dotconfig())
            .with_context(|| format!("failed to write configuration for {}", target.name()))?;

        self.command(project, None, Some("olddefconfig"))
            .exec_streaming(&OutputSink {
                silent: options.silent,
                log_file: None,
            })
    }

    fn prepare(&self, project: &Project, _target: &Target, options: &MakeOptions) -> Result<()> {
        self.command(project, options.jobs.count(), Some("prepare"))
            .exec_streaming(&OutputSink {
                silent: options.silent,
                log_file: None,
            })
    }

    fn build(&self, project: &Project, _target: &Target, options: &MakeOptions) -> Result<()> {
        self.command(project, options.jobs.count(), None)
            .exec_streaming(&OutputSink {
                silent: options.silent,
                log_file: options.log_file.clone(),
            })
    }

    fn properclean(&self, project: &Project) -> Result<()> {
        if project.core_dir().is_dir() {
            self.command(project, None, Some("properclean"))
                .exec_streaming(&OutputSink::default())?;
        }
        fs::remove_dir_all_if_exists(&project.build_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::driver::Jobs;
    use crate::core::target::{Architecture, KConfig, Platform};
    use tempfile::TempDir;

    fn project(tmp: &TempDir) -> Project {
        std::fs::write(
            tmp.path().join("Kraftfile.toml"),
            "name = \"hello\"\n\n[libraries]\nmusl = \"stable\"\n\n[[targets]]\narchitecture = \"x86_64\"\nplatform = \"qemu\"\n",
        )
        .unwrap();
        Project::load(tmp.path()).unwrap()
    }

    #[test]
    fn test_command_line() {
        let tmp = TempDir::new().unwrap();
        let project = project(&tmp);
        let driver = MakeDriver::with_program("make");

        let cmd = driver.command(&project, Jobs::Fixed(8).count(), Some("prepare"));
        let args = cmd.get_args();

        assert_eq!(args[0], "-C");
        assert_eq!(args[1], project.core_dir().display().to_string());
        assert_eq!(args[2], format!("A={}", tmp.path().display()));
        assert_eq!(
            args[3],
            format!("L={}", tmp.path().join(".unikraft/libs/musl").display())
        );
        assert_eq!(args[5], "-j8");
        assert_eq!(args[6], "prepare");
    }

    #[cfg(unix)]
    #[test]
    fn test_configure_writes_dotconfig() {
        let tmp = TempDir::new().unwrap();
        let project = project(&tmp);
        let driver = MakeDriver::with_program("true");
        let target = Target::new("hello", Architecture::new("x86_64"), Platform::new("qemu"))
            .with_kconfig(KConfig::new().with("CONFIG_A", "y"));

        let options = ConfigureOptions {
            extra: KConfig::new().with("CONFIG_B", "n"),
            ..Default::default()
        };
        driver.configure(&project, &target, &options).unwrap();

        let contents = std::fs::read_to_string(tmp.path().join(".config")).unwrap();
        assert_eq!(contents, "CONFIG_A=y\n# CONFIG_B is not set\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_goal_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let project = project(&tmp);
        let driver = MakeDriver::with_program("false");
        let target = project.targets()[0].clone();

        assert!(driver.build(&project, &target, &MakeOptions::default()).is_err());
    }

    #[test]
    fn test_properclean_removes_build_dir() {
        let tmp = TempDir::new().unwrap();
        let project = project(&tmp);
        std::fs::create_dir_all(project.build_dir().join("obj")).unwrap();

        MakeDriver::with_program("make").properclean(&project).unwrap();
        assert!(!project.build_dir().exists());
    }
}
