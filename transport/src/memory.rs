//! In-process transport.
//!
//! Publishers register on a shared [`MemoryHub`] under an address. Every
//! [`MemoryTransport`] on the same hub can subscribe to those addresses and
//! read what is published there, the way nodes connected to a real broker
//! would.
//!
//! Matching is by topic prefix: a subscription receives a message when its
//! filter list is empty or any filter is a prefix of the message topic.
//! Delivery into a transport inbox is a bounded send, so a transport that is
//! not read stalls its publishers instead of losing messages.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use tokio::sync::{mpsc, watch, Mutex, RwLock};

use crate::{TransportClient, TransportError};

const DEFAULT_INBOX_CAPACITY: usize = 256;

/// A message delivered by the in-memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMessage {
    /// Address of the publisher that produced the message.
    pub publisher: String,
    pub topic: String,
    pub payload: Vec<u8>,
}

struct Route {
    filters: Vec<String>,
    inbox: mpsc::Sender<MemoryMessage>,
}

impl Route {
    fn matches(&self, topic: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| topic.starts_with(f.as_str()))
    }
}

/// Shared message bus for in-memory transports.
#[derive(Default)]
pub struct MemoryHub {
    publishers: RwLock<HashMap<String, Vec<Route>>>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a publisher at `address`.
    ///
    /// Subscriptions to `address` fail with [`TransportError::Unreachable`]
    /// until this is called. Registering an address twice keeps the existing
    /// subscribers.
    pub async fn register_publisher(self: &Arc<Self>, address: &str) -> MemoryPublisher {
        self.publishers
            .write()
            .await
            .entry(address.to_string())
            .or_default();
        info!("Registered publisher at {address}");

        MemoryPublisher {
            address: address.to_string(),
            hub: self.clone(),
        }
    }

    /// Drop the publisher at `address` along with all of its subscribers.
    pub async fn remove_publisher(&self, address: &str) {
        if self.publishers.write().await.remove(address).is_some() {
            info!("Removed publisher at {address}");
        }
    }

    pub async fn is_registered(&self, address: &str) -> bool {
        self.publishers.read().await.contains_key(address)
    }

    /// Number of live subscriptions on the publisher at `address`.
    pub async fn subscriber_count(&self, address: &str) -> usize {
        self.publishers
            .read()
            .await
            .get(address)
            .map_or(0, |routes| routes.len())
    }

    async fn attach(
        &self,
        address: &str,
        filters: &[String],
        inbox: mpsc::Sender<MemoryMessage>,
    ) -> Result<(), TransportError> {
        let mut publishers = self.publishers.write().await;
        let routes = publishers
            .get_mut(address)
            .ok_or_else(|| TransportError::Unreachable(address.to_string()))?;

        // A retried subscribe must not double the deliveries.
        if routes
            .iter()
            .any(|r| r.inbox.same_channel(&inbox) && r.filters == filters)
        {
            debug!("Subscription to {address} already active");
            return Ok(());
        }

        routes.push(Route {
            filters: filters.to_vec(),
            inbox,
        });
        Ok(())
    }

    async fn publish(&self, address: &str, topic: &str, payload: Vec<u8>) -> usize {
        // Collect targets first so the lock is not held while a slow inbox
        // applies backpressure.
        let targets: Vec<mpsc::Sender<MemoryMessage>> = {
            let publishers = self.publishers.read().await;
            let Some(routes) = publishers.get(address) else {
                return 0;
            };
            routes
                .iter()
                .filter(|r| r.matches(topic))
                .map(|r| r.inbox.clone())
                .collect()
        };

        let msg = MemoryMessage {
            publisher: address.to_string(),
            topic: topic.to_string(),
            payload,
        };

        let mut delivered = 0;
        let mut stale = false;
        for inbox in targets {
            match inbox.send(msg.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => stale = true,
            }
        }

        if stale {
            debug!("{address}: pruning closed subscriber inboxes");
            if let Some(routes) = self.publishers.write().await.get_mut(address) {
                routes.retain(|r| !r.inbox.is_closed());
            }
        }

        delivered
    }
}

/// Publishing side of a registered address.
#[derive(Clone)]
pub struct MemoryPublisher {
    address: String,
    hub: Arc<MemoryHub>,
}

impl MemoryPublisher {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Publish to every matching subscriber and return how many received it.
    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.hub.publish(&self.address, topic, payload.into()).await
    }
}

/// Transport client backed by a [`MemoryHub`].
///
/// All subscriptions made through one transport feed a single inbox, which
/// [`read`](TransportClient::read) drains in arrival order.
pub struct MemoryTransport {
    hub: Arc<MemoryHub>,
    inbox_tx: mpsc::Sender<MemoryMessage>,
    inbox_rx: Mutex<mpsc::Receiver<MemoryMessage>>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl MemoryTransport {
    pub fn new(hub: Arc<MemoryHub>) -> Self {
        Self::with_capacity(hub, DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_capacity(hub: Arc<MemoryHub>, capacity: usize) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(capacity);
        let (closed_tx, closed_rx) = watch::channel(false);
        Self {
            hub,
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            closed_tx,
            closed_rx,
        }
    }

    /// Close the transport.
    ///
    /// A pending or later `read` returns [`TransportError::Closed`], and
    /// publishers stop delivering to this transport.
    pub async fn close(&self) {
        self.closed_tx.send_replace(true);
        self.inbox_rx.lock().await.close();
        debug!("Memory transport closed");
    }

    fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }
}

impl TransportClient for MemoryTransport {
    type Message = MemoryMessage;

    async fn subscribe(&self, address: &str, filters: &[String]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.hub.attach(address, filters, self.inbox_tx.clone()).await
    }

    async fn read(&self) -> Result<MemoryMessage, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut closed = self.closed_rx.clone();
        let mut inbox = self.inbox_rx.lock().await;
        tokio::select! {
            msg = inbox.recv() => msg.ok_or(TransportError::Closed),
            _ = closed.wait_for(|c| *c) => Err(TransportError::Closed),
        }
    }
}
