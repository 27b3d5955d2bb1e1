//! Transport-agnostic client interface.
use std::{fmt::Debug, future::Future};

use crate::TransportError;

pub trait TransportClient: Send + Sync + 'static {
    /// Opaque message type produced by [`read`](TransportClient::read).
    type Message: Debug + Send + 'static;

    /// Subscribe to the publisher at `address`, receiving messages that match
    /// any of `filters` (an empty list matches everything).
    ///
    /// Safe to call again with the same arguments after a failure.
    fn subscribe(
        &self,
        address: &str,
        filters: &[String],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait for the next message from any active subscription.
    ///
    /// The subscriber drives this from a single task, so implementations only
    /// need to support one reader at a time.
    fn read(&self) -> impl Future<Output = Result<Self::Message, TransportError>> + Send;
}
