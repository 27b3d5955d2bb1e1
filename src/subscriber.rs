//! Subscription queue, retry loop and message delivery.
//!
//! A [`Subscriber`] is a cheap handle over two background tasks that share one
//! transport client:
//!
//! - the subscription worker drains a bounded queue of
//!   [`SubscriptionRequest`]s and retries each one at a fixed delay until the
//!   transport accepts it. Requests are handled strictly one at a time, so a
//!   publisher that stays unreachable holds up everything queued behind it.
//! - the delivery worker reads from the transport and forwards every message,
//!   in order, onto a bounded channel handed to the consumer at construction.
//!
//! Both channels are bounded and block instead of dropping: a full queue
//! stalls [`Subscriber::subscribe`] callers and a slow consumer stalls
//! transport reads.

use std::{sync::Arc, time::Duration};

use kameo::Actor;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use transport::{TransportClient, TransportError};

use crate::{config::SubscriberConfig, error::SubscriberError, request::SubscriptionRequest};

#[derive(Debug, Clone, Actor)]
pub struct Subscriber {
    queue: mpsc::Sender<SubscriptionRequest>,
    pub(crate) http: reqwest::Client,
    cancel: CancellationToken,
}

impl Subscriber {
    /// Start both workers on `transport` and queue `requests` for
    /// subscription.
    ///
    /// Returns the subscriber handle and the receiving end of the message
    /// channel. Waits while the initial requests do not fit in the queue.
    pub async fn new<T: TransportClient>(
        transport: Arc<T>,
        config: SubscriberConfig,
        requests: Vec<SubscriptionRequest>,
    ) -> Result<(Self, mpsc::Receiver<T::Message>), SubscriberError> {
        let http = build_http_client(&config)?;
        let cancel = CancellationToken::new();

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (message_tx, message_rx) = mpsc::channel(config.message_capacity.max(1));

        tokio::spawn(run_subscription_worker(
            transport.clone(),
            queue_rx,
            config.retry_delay,
            cancel.clone(),
        ));
        tokio::spawn(run_delivery_worker(
            transport,
            message_tx,
            config.retry_delay,
            cancel.clone(),
        ));

        let subscriber = Self {
            queue: queue_tx,
            http,
            cancel,
        };
        for request in requests {
            subscriber.subscribe(request).await?;
        }

        Ok((subscriber, message_rx))
    }

    /// Queue a subscription request.
    ///
    /// Waits while the queue is full. The outcome of the subscribe call is not
    /// reported back; the worker keeps retrying until it succeeds.
    pub async fn subscribe(&self, request: SubscriptionRequest) -> Result<(), SubscriberError> {
        if self.cancel.is_cancelled() {
            return Err(SubscriberError::QueueClosed);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(SubscriberError::QueueClosed),
            sent = self.queue.send(request) => sent.map_err(|_| SubscriberError::QueueClosed),
        }
    }

    /// Stop both workers.
    ///
    /// Requests still queued are discarded, the message channel closes once
    /// the delivery worker exits, and later `subscribe` calls fail with
    /// [`SubscriberError::QueueClosed`].
    pub fn shutdown(&self) {
        info!("Shutting down subscriber");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn build_http_client(config: &SubscriberConfig) -> Result<reqwest::Client, SubscriberError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.callback_timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(SubscriberError::HttpClient)
}

async fn run_subscription_worker<T: TransportClient>(
    transport: Arc<T>,
    mut queue: mpsc::Receiver<SubscriptionRequest>,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    info!("Subscription worker started");
    loop {
        let request = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = queue.recv() => match maybe {
                Some(request) => request,
                None => {
                    error!("Subscription queue closed");
                    break;
                }
            },
        };

        if !subscribe_until_accepted(transport.as_ref(), &request, retry_delay, &cancel).await {
            break;
        }
    }
    info!("Subscription worker stopped");
}

/// Returns `false` when cancelled before the transport accepted the request.
async fn subscribe_until_accepted<T: TransportClient>(
    transport: &T,
    request: &SubscriptionRequest,
    retry_delay: Duration,
    cancel: &CancellationToken,
) -> bool {
    info!("Starting subscription to {}", request.address);
    let mut attempt: u32 = 1;
    loop {
        let res = tokio::select! {
            _ = cancel.cancelled() => return false,
            res = transport.subscribe(&request.address, &request.filters) => res,
        };

        match res {
            Ok(()) => {
                info!("Subscribed to {} after {attempt} attempt(s)", request.address);
                return true;
            }
            Err(e) => {
                error!("Failed to subscribe to {}: {e}", request.address);
                warn!("Trying again in {retry_delay:?}");
                tokio::select! {
                    _ = cancel.cancelled() => return false,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

async fn run_delivery_worker<T: TransportClient>(
    transport: Arc<T>,
    outbound: mpsc::Sender<T::Message>,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    info!("Delivery worker started");
    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = transport.read() => read,
        };

        match read {
            Ok(message) => {
                debug!("Received message: {message:?}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = outbound.send(message) => {
                        if sent.is_err() {
                            info!("Message receiver dropped");
                            break;
                        }
                    }
                }
            }
            Err(TransportError::Closed) => {
                warn!("Transport closed, no more messages will be delivered");
                break;
            }
            Err(e) => {
                error!("Failed to read from transport: {e}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }
    info!("Delivery worker stopped");
}
