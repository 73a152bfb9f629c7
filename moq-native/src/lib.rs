//! Helper library bridging protocol-level [`moq_lite`] types to a native application:
//! connection lifecycle, reconnect policy, and the client-visible configuration knobs
//! (relay, rendition target, pause/mute/volume) an embedder actually needs to expose.

mod config;
mod error;
mod supervisor;

pub use config::*;
pub use error::*;
pub use supervisor::*;

pub use moq_lite;
