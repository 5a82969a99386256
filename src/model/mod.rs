//! Domain types shared by the synchronization components: proxy identity,
//! node metadata, stored resources and subscription telemetry.

mod insight;
mod key;
mod metadata;
mod proxy;
mod proxy_type;
mod resource;
mod subscription;

pub use insight::*;
pub use key::*;
pub use metadata::*;
pub use proxy::*;
pub use proxy_type::*;
pub use resource::*;
pub use subscription::*;

#[cfg(test)]
mod insight_test;
