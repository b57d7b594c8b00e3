//! Unikernel build backends.
//!
//! This module holds the build driver abstraction, the `make` driver and
//! the stage events reported while building.

pub mod driver;
pub mod events;
pub mod make;

pub use driver::{BuildDriver, ConfigureOptions, Jobs, MakeOptions};
pub use events::{JsonLinesObserver, NoopObserver, Stage, StageEvent, StageObserver, TracingObserver};
pub use make::MakeDriver;
