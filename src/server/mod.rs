//! Composition root of the synchronization engine.
//!
//! [`ControlPlaneBuilder`] wires the resource store, the snapshot pipeline,
//! the sync registry and the status tracker around a single shutdown token,
//! and hands out a [`ControlPlane`] whose [`ControlPlane::callbacks`] are
//! plugged into the discovery server.
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let control_plane = ControlPlaneBuilder::new(config, shutdown_rx)
//!     .snapshot_generator(generator)
//!     .build()
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .ready()?;
//! let callbacks = control_plane.callbacks();
//! ```

mod builder;
mod control_plane;

pub use builder::*;
pub use control_plane::*;
