//! Subscription and handshake payloads.
use serde::{Deserialize, Serialize};

/// A pending subscription to a remote publisher.
///
/// Consumed exactly once by the subscription worker, which retries it until
/// the transport accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub address: String,
    /// Interest filters; empty means every message from the publisher.
    pub filters: Vec<String>,
}

impl SubscriptionRequest {
    pub fn new(address: impl Into<String>, filters: Vec<String>) -> Self {
        Self {
            address: address.into(),
            filters,
        }
    }
}

/// Handshake offer exchanged between peers.
///
/// - `publisher_addr`: subscribe to my publisher at this address
/// - `subscriber_endpoint`: POST your publisher address here and I will
///   subscribe to you
///
/// Both fields are optional and acted on independently. Empty strings are
/// treated the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    #[serde(
        rename = "publisher-address",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub publisher_addr: Option<String>,
    #[serde(
        rename = "subscriber-endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscriber_endpoint: Option<String>,
}

impl ConnectionRequest {
    /// A request that only announces `publisher_addr`.
    pub fn publisher(publisher_addr: impl Into<String>) -> Self {
        Self {
            publisher_addr: Some(publisher_addr.into()),
            subscriber_endpoint: None,
        }
    }

    pub fn with_subscriber_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.subscriber_endpoint = Some(endpoint.into());
        self
    }

    pub fn publisher_addr(&self) -> Option<&str> {
        non_empty(&self.publisher_addr)
    }

    pub fn subscriber_endpoint(&self) -> Option<&str> {
        non_empty(&self.subscriber_endpoint)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
