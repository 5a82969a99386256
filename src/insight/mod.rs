//! Subscription telemetry: per-stream counters of sent, acknowledged and
//! rejected responses, and their debounced persistence into the insight
//! resource of the proxy.

mod sink;
mod store;
mod tracker;

pub use sink::*;
pub use store::*;
pub use tracker::*;

#[cfg(test)]
mod sink_test;
