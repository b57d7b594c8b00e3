//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;

pub use config::Config;
pub use context::{CancellationToken, Cancelled, GlobalContext};
pub use diagnostic::Diagnostic;
