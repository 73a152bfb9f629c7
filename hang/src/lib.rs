//! # hang: WebCodecs compatible media encoding for MoQ
//!
//! Media-specific library built on [`moq_lite`] for consuming audio and video as
//! WebCodecs-compatible frames.
//!
//! ## Overview
//!
//! `hang` adds media semantics to the generic [`moq_lite`] pub/sub transport:
//!
//! - **Catalog** ([catalog]): JSON track describing a broadcast's renditions and codec
//!   configs, updated live as tracks change.
//! - **Container** ([container]): the per-frame wire format — a timestamp prefix
//!   (`legacy`) or complete fMP4 fragments (`cmaf`, discriminated by the catalog).
//! - **Jitter** ([jitter]): reorders out-of-order groups and drops ones that fall too
//!   far behind the live edge.
//! - **Sync** ([sync]): converts a stream-local timestamp into a wall-clock
//!   presentation time.
//!
//! Encoding, decoding, and rendering are deliberately out of scope: frames in, frames
//! out. An embedding application supplies its own decoder/sink.

mod error;

pub mod catalog;
pub mod container;
pub mod jitter;
pub mod sync;

// export the moq-lite version in use
pub use moq_lite;

pub use error::*;
