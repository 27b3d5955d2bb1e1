//! Publish/subscribe transport contract used by the subscriber core.
//!
//! The wire-level transport (connecting, framing, filtering) lives outside this
//! workspace. This crate only pins down the two calls the subscriber relies on
//! and ships an in-process broker that honours the same contract.

mod client;
mod error;
mod memory;

pub use client::TransportClient;
pub use error::TransportError;
pub use memory::{MemoryHub, MemoryMessage, MemoryPublisher, MemoryTransport};
