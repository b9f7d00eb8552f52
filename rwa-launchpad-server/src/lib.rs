//! RWA Launchpad server: the HTTP API over the launchpad core, plus shared
//! infrastructure for the operational binaries (`deploy-factory`,
//! `launch-property`).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod deployments;
pub mod observability;
pub mod routes;

pub use observability::{LogFormat, init_observability};
pub use routes::{ApiError, AppState, router};
