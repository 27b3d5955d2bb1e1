use std::{env::VarError, net::AddrParseError};

use transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Subscription queue is closed")]
    QueueClosed,

    #[error("JSON processing error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to reach {endpoint}: {source}")]
    Callback {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to read env var {0}: {1}")]
    EnvVar(&'static str, #[source] VarError),
    #[error("Failed to parse listen address: {0}")]
    AddrParse(#[from] AddrParseError),
    #[error("Failed to bind handshake listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("Failed to start handshake server: {0}")]
    Server(String),

    #[error(transparent)]
    Subscriber(#[from] SubscriberError),
}
