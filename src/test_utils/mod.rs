//! Fixtures and helpers shared by the unit tests
mod common;
mod fixtures;

pub use common::*;
pub use fixtures::*;
