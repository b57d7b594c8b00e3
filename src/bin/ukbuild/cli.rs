//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ukbuild - build, package and pull unikernel projects
#[derive(Parser)]
#[command(name = "ukbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub workdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure, prepare and build the project's targets
    Build(BuildArgs),

    /// Package built targets
    Pkg(PkgArgs),

    /// Pull the project's components, or a list of packages
    Pull(PullArgs),

    /// Add a package source
    Source(SourceArgs),

    /// Remove a package source
    Unsource(SourceArgs),

    /// Refresh the package catalog
    Update(UpdateArgs),

    /// Set configuration options in the project's .config
    Set(SetArgs),

    /// Remove every build artifact
    Properclean,
}

/// Target selection shared by `build` and `pkg`.
#[derive(Args)]
pub struct SelectArgs {
    /// Architecture to select
    #[arg(short = 'm', long = "arch")]
    pub architecture: Option<String>,

    /// Platform to select
    #[arg(short, long = "plat")]
    pub platform: Option<String>,

    /// Target name to select
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Alternative kconfig file whose values are passed to configure
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use all CPUs when no job count is given
    #[arg(long)]
    pub fast: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Build the debug kernel
    #[arg(long)]
    pub dbg: bool,

    /// Ignore cached catalogs and packages
    #[arg(long)]
    pub no_cache: bool,

    /// Skip the configure stage
    #[arg(long)]
    pub no_configure: bool,

    /// Skip resolving and pulling components
    #[arg(long)]
    pub no_fetch: bool,

    /// Skip the prepare stage
    #[arg(long)]
    pub no_prepare: bool,

    /// Write build output to this file
    #[arg(long)]
    pub build_log: Option<PathBuf>,

    /// Stop at the first failed target
    #[arg(long)]
    pub fail_fast: bool,

    /// Emit stage events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PkgArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Package format (defaults to each target's declared format)
    #[arg(short = 'M', long)]
    pub format: Option<String>,

    /// Name of the packaged target
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Initramfs to include
    #[arg(short, long)]
    pub initrd: Option<PathBuf>,

    /// Kernel image overriding the built one
    #[arg(short, long)]
    pub kernel: Option<PathBuf>,

    /// Package the debug kernel
    #[arg(long)]
    pub dbg: bool,

    /// Include the target's kconfig
    #[arg(long)]
    pub with_kconfig: bool,

    /// Overwrite an existing output
    #[arg(long)]
    pub force: bool,

    /// Keep packaging remaining targets after a failure
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args)]
pub struct PullArgs {
    /// Project directory, or packages to pull
    pub args: Vec<String>,

    /// Package manager used for a project directory
    #[arg(short = 'M', long)]
    pub manager: Option<String>,

    /// Answer queries from the cached catalog index
    #[arg(long)]
    pub force_cache: bool,

    /// Skip checksum verification
    #[arg(long)]
    pub no_checksum: bool,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Source locator (directory or file:// URL)
    pub source: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Package manager to update
    #[arg(short = 'M', long)]
    pub manager: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    /// KEY=VALUE assignments
    pub options: Vec<String>,
}
