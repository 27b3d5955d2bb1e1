//! Two-party connection handshake.
//!
//! A peer sends a [`ConnectionRequest`] that may ask us to subscribe to its
//! publisher, to tell it our publisher address, or both. The two halves are
//! independent and run in that order: the subscription is queued before the
//! callback POST is sent.

use log::{error, info};
use reqwest::{header::CONTENT_TYPE, StatusCode};

use crate::{
    error::SubscriberError,
    request::{ConnectionRequest, SubscriptionRequest},
    subscriber::Subscriber,
};

impl Subscriber {
    /// Act on a peer's handshake offer.
    ///
    /// Missing fields skip the corresponding step and are not errors. A
    /// non-200 reply to the callback is logged only. Errors come from
    /// serializing or sending the callback, or from a closed queue.
    pub async fn handle_connection_request(
        &self,
        request: &ConnectionRequest,
        filters: &[String],
        publisher_addr: &str,
    ) -> Result<(), SubscriberError> {
        match request.publisher_addr() {
            Some(address) if !filters.is_empty() => {
                self.subscribe(SubscriptionRequest::new(address, filters.to_vec()))
                    .await?;
            }
            _ => info!("Connection request is missing an address to subscribe to and/or filters"),
        }

        let Some(endpoint) = request.subscriber_endpoint() else {
            info!("Connection request has no subscriber endpoint, skipping callback");
            return Ok(());
        };
        if publisher_addr.is_empty() {
            info!("No local publisher address to send to {endpoint}, skipping callback");
            return Ok(());
        }

        let status = self
            .request_connection(endpoint, &ConnectionRequest::publisher(publisher_addr))
            .await?;
        if status != StatusCode::OK {
            error!("Response from {endpoint}: {status}");
        }
        Ok(())
    }

    /// POST `request` to a peer's handshake endpoint and return its status.
    ///
    /// Single attempt, no retry.
    pub async fn request_connection(
        &self,
        endpoint: &str,
        request: &ConnectionRequest,
    ) -> Result<StatusCode, SubscriberError> {
        let body = serde_json::to_vec(request)?;
        let response = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| SubscriberError::Callback {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(response.status())
    }
}
