//! Subscription management between an application and a pub/sub transport.
//!
//! The [`Subscriber`] queues subscription requests, retries each until the
//! transport accepts it, and forwards every received message to a single
//! consumer channel. The handshake lets a peer ask us to subscribe to its
//! publisher and to report our own publisher address back over HTTP.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handshake;
pub mod request;
pub mod server;
pub mod subscriber;
pub mod subscriber_actor;

pub use bootstrap::{bootstrap_node, Node, NodeConfig};
pub use config::SubscriberConfig;
pub use error::{BootstrapError, SubscriberError};
pub use request::{ConnectionRequest, SubscriptionRequest};
pub use subscriber::Subscriber;
pub use subscriber_actor::HandleConnectionRequest;

pub use transport::{TransportClient, TransportError};
