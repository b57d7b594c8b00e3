//! Package managers.
//!
//! Package managers answer catalog queries, materialize packages into a
//! project and produce packages from built targets. They are registered
//! with a [`PackageManagers`] router under a format string.

pub mod local;
pub mod manager;
pub mod package;
pub mod query;
pub mod router;

pub use local::{LocalManager, LOCAL_FORMAT};
pub use manager::{PackOptions, PackageManager};
pub use package::{Package, PullOptions, PullOutcome};
pub use query::CatalogQuery;
pub use router::{PackageManagers, RouteError};
