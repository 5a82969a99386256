//! Proxy connection and configuration synchronization engine for a
//! service-mesh discovery (xDS) control plane.
//!
//! The engine sits behind the discovery server's stream callbacks:
//! - [`DataplaneSyncRegistry`] multiplexes discovery streams onto proxies and
//!   runs exactly one [`Watchdog`] per connected proxy.
//! - [`DataplaneWatchdog`] periodically regenerates the proxy's
//!   configuration through a [`SnapshotReconciler`] into the
//!   [`SnapshotCache`].
//! - [`DataplaneLifecycle`] registers self-describing proxies on connect and
//!   deregisters them after they disconnect.
//! - [`DataplaneStatusTracker`] records per-stream discovery telemetry and
//!   flushes it to the proxy's insight resource.
//!
//! [`ControlPlaneBuilder`] wires everything together.

mod config;
pub mod constants;
mod errors;
mod insight;
mod metrics;
mod model;
mod server;
mod snapshot;
mod store;
mod sync;
pub mod utils;
mod xds;

pub use config::*;
pub use errors::*;
pub use insight::*;
pub use metrics::*;
pub use model::*;
pub use server::*;
pub use snapshot::*;
pub use store::*;
pub use sync::*;
pub use utils::*;
pub use xds::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
mod errors_test;
#[cfg(test)]
pub mod test_utils;
