use kameo::message::{Context, Message};

use crate::{
    error::SubscriberError,
    request::{ConnectionRequest, SubscriptionRequest},
    subscriber::Subscriber,
};

impl Message<SubscriptionRequest> for Subscriber {
    type Reply = Result<(), SubscriberError>;

    async fn handle(
        &mut self,
        msg: SubscriptionRequest,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        self.subscribe(msg).await
    }
}

/// Handshake offer received from a peer, with the local settings needed to
/// answer it.
#[derive(Debug, Clone)]
pub struct HandleConnectionRequest {
    pub request: ConnectionRequest,
    /// Filters to subscribe to the peer's publisher with.
    pub filters: Vec<String>,
    /// Our own publisher address, sent back to the peer's endpoint.
    pub publisher_addr: String,
}

impl Message<HandleConnectionRequest> for Subscriber {
    type Reply = Result<(), SubscriberError>;

    async fn handle(
        &mut self,
        msg: HandleConnectionRequest,
        _ctx: Context<'_, Self, Self::Reply>,
    ) -> Self::Reply {
        self.handle_connection_request(&msg.request, &msg.filters, &msg.publisher_addr)
            .await
    }
}
