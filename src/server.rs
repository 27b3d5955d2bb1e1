//! Inbound handshake endpoint.
//!
//! Each request runs on its own handler task against a clone of the
//! [`Subscriber`] handle, so concurrent handshakes never wait on each other.
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use log::error;

use crate::{error::SubscriberError, request::ConnectionRequest, subscriber::Subscriber};

pub const CONNECT_PATH: &str = "/connect";

#[derive(Clone)]
pub struct HandshakeState {
    pub subscriber: Subscriber,
    /// Filters used when subscribing to a peer's publisher.
    pub filters: Arc<Vec<String>>,
    pub publisher_addr: Arc<str>,
}

/// Router serving `POST /connect` with a JSON [`ConnectionRequest`] body.
pub fn router(state: HandshakeState) -> Router {
    Router::new()
        .route(CONNECT_PATH, post(connect))
        .with_state(state)
}

async fn connect(
    State(state): State<HandshakeState>,
    Json(request): Json<ConnectionRequest>,
) -> StatusCode {
    let res = state
        .subscriber
        .handle_connection_request(&request, &state.filters, &state.publisher_addr)
        .await;

    match res {
        Ok(()) => StatusCode::OK,
        Err(SubscriberError::QueueClosed) => {
            error!("Connection request received after shutdown");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            error!("Failed to handle connection request: {e}");
            StatusCode::BAD_GATEWAY
        }
    }
}
