//! Per-proxy synchronization: stream multiplexing, proxy registration and
//! the watchdog that keeps a proxy's snapshot up to date.

mod lifecycle;
mod registry;
mod watchdog;

pub use lifecycle::*;
pub use registry::*;
pub use watchdog::*;

#[cfg(test)]
mod lifecycle_test;
