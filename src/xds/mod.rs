//! Discovery protocol surface consumed by the engine: request and response
//! views for both protocol variants, stream identity and context, and the
//! callback hooks the transport drives.

mod auth;
mod callbacks;
mod context;
mod request;

pub use auth::*;
pub use callbacks::*;
pub use context::*;
pub use request::*;
