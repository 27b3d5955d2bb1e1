use std::{net::SocketAddr, sync::Arc};

use kameo::actor::ActorRef;
use log::{error, info};
use tokio::{sync::mpsc, task::JoinHandle};

use transport::TransportClient;

use crate::{
    config::SubscriberConfig,
    error::BootstrapError,
    request::SubscriptionRequest,
    server::{router, HandshakeState, CONNECT_PATH},
    subscriber::Subscriber,
};

#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Address the handshake endpoint binds to
    pub listen_addr: SocketAddr,
    /// Our publisher address, announced to peers during the handshake
    pub publisher_addr: String,
    /// Filters applied to every subscription this node makes
    pub filters: Vec<String>,
    /// Publisher addresses to subscribe to at start-up
    pub peers: Vec<String>,
    pub subscriber: SubscriberConfig,
}

impl NodeConfig {
    pub fn new(listen_addr: SocketAddr, publisher_addr: impl Into<String>) -> Self {
        Self {
            listen_addr,
            publisher_addr: publisher_addr.into(),
            filters: Vec::new(),
            peers: Vec::new(),
            subscriber: SubscriberConfig::default(),
        }
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_peers(mut self, peers: Vec<String>) -> Self {
        self.peers = peers;
        self
    }

    /// Read the node settings from the environment:
    /// - requires LISTEN_ADDR (e.g. `0.0.0.0:8000`)
    /// - requires PUBLISHER_ADDRESS
    /// - optional SUBSCRIPTION_FILTERS and PEER_PUBLISHERS (comma-separated)
    pub fn from_env() -> Result<Self, BootstrapError> {
        let listen_addr = std::env::var("LISTEN_ADDR")
            .map_err(|e| BootstrapError::EnvVar("LISTEN_ADDR", e))?
            .parse::<SocketAddr>()?;
        let publisher_addr = std::env::var("PUBLISHER_ADDRESS")
            .map_err(|e| BootstrapError::EnvVar("PUBLISHER_ADDRESS", e))?;
        let filters = parse_list(&std::env::var("SUBSCRIPTION_FILTERS").unwrap_or_default());
        let peers = parse_list(&std::env::var("PEER_PUBLISHERS").unwrap_or_default());

        Ok(Self::new(listen_addr, publisher_addr)
            .with_filters(filters)
            .with_peers(peers))
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A running node: subscriber workers, its actor and the handshake endpoint.
pub struct Node<M> {
    pub actor: ActorRef<Subscriber>,
    pub subscriber: Subscriber,
    pub messages: mpsc::Receiver<M>,
    pub local_addr: SocketAddr,
    server: JoinHandle<()>,
}

impl<M> Node<M> {
    /// URL peers should POST connection requests to.
    pub fn connect_url(&self) -> String {
        format!("http://{}{CONNECT_PATH}", self.local_addr)
    }

    /// Stop the workers, the actor and the handshake endpoint.
    pub fn shutdown(&self) {
        self.subscriber.shutdown();
        self.actor.kill();
        self.server.abort();
    }
}

pub async fn bootstrap_node<T: TransportClient>(
    config: NodeConfig,
    transport: Arc<T>,
) -> Result<Node<T::Message>, BootstrapError> {
    let requests = config
        .peers
        .iter()
        .map(|peer| SubscriptionRequest::new(peer.as_str(), config.filters.clone()))
        .collect();
    let (subscriber, messages) =
        Subscriber::new(transport, config.subscriber.clone(), requests).await?;
    let actor = kameo::spawn(subscriber.clone());

    let state = HandshakeState {
        subscriber: subscriber.clone(),
        filters: Arc::new(config.filters.clone()),
        publisher_addr: Arc::from(config.publisher_addr.as_str()),
    };

    let listener = std::net::TcpListener::bind(config.listen_addr)?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;
    let server = axum::Server::from_tcp(listener)
        .map_err(|e| BootstrapError::Server(e.to_string()))?
        .serve(router(state).into_make_service());
    let server = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Handshake server failed: {e}");
        }
    });
    info!("Handshake endpoint listening on http://{local_addr}{CONNECT_PATH}");

    Ok(Node {
        actor,
        subscriber,
        messages,
        local_addr,
        server,
    })
}
