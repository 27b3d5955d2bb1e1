#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::{timeout, Instant};

use event_subscriber::{TransportClient, TransportError};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn filters(list: &[&str]) -> Vec<String> {
    list.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeCall {
    pub address: String,
    pub filters: Vec<String>,
}

impl SubscribeCall {
    pub fn new(address: &str, filters: &[&str]) -> Self {
        Self {
            address: address.to_string(),
            filters: self::filters(filters),
        }
    }
}

/// Sender side of the fake transport's read stream.
pub type ReadFeed = mpsc::Sender<Result<String, TransportError>>;

/// Scripted transport client.
///
/// - `fail_first(n)` rejects the first `n` subscribe calls
/// - `gated()` holds every subscribe call until `release` hands out permits
/// - reads come from the [`ReadFeed`] returned by `new`; dropping the feed
///   makes `read` report [`TransportError::Closed`]
pub struct FakeTransport {
    failures: AtomicUsize,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<SubscribeCall>>,
    attempted_at: Mutex<Vec<Instant>>,
    started: watch::Sender<usize>,
    accepted: watch::Sender<usize>,
    reads: tokio::sync::Mutex<mpsc::Receiver<Result<String, TransportError>>>,
}

impl FakeTransport {
    pub fn new() -> (Self, ReadFeed) {
        let (feed, reads) = mpsc::channel(8);
        let transport = Self {
            failures: AtomicUsize::new(0),
            gate: None,
            calls: Mutex::new(Vec::new()),
            attempted_at: Mutex::new(Vec::new()),
            started: watch::channel(0).0,
            accepted: watch::channel(0).0,
            reads: tokio::sync::Mutex::new(reads),
        };
        (transport, feed)
    }

    pub fn fail_first(self, n: usize) -> Self {
        self.failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Let `n` gated subscribe calls through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every subscribe call seen so far, including ones still held at the gate.
    pub fn calls(&self) -> Vec<SubscribeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// When each subscribe call arrived, in call order.
    pub fn attempted_at(&self) -> Vec<Instant> {
        self.attempted_at.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> usize {
        *self.accepted.borrow()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        assert!(
            self.saw_calls(n, WAIT).await,
            "timed out waiting for subscribe calls"
        );
    }

    /// Whether `n` subscribe calls are seen within `limit`.
    pub async fn saw_calls(&self, n: usize, limit: Duration) -> bool {
        let mut rx = self.started.subscribe();
        let seen = matches!(timeout(limit, rx.wait_for(|c| *c >= n)).await, Ok(Ok(_)));
        seen
    }

    pub async fn wait_for_accepted(&self, n: usize) {
        let mut rx = self.accepted.subscribe();
        timeout(WAIT, rx.wait_for(|c| *c >= n))
            .await
            .expect("timed out waiting for accepted subscriptions")
            .expect("watch closed");
    }
}

impl TransportClient for FakeTransport {
    type Message = String;

    async fn subscribe(&self, address: &str, filters: &[String]) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(SubscribeCall {
            address: address.to_string(),
            filters: filters.to_vec(),
        });
        self.attempted_at.lock().unwrap().push(Instant::now());
        self.started.send_modify(|c| *c += 1);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| TransportError::Other(e.into()))?
                .forget();
        }

        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(TransportError::Unreachable(address.to_string()));
        }

        self.accepted.send_modify(|c| *c += 1);
        Ok(())
    }

    async fn read(&self) -> Result<String, TransportError> {
        match self.reads.lock().await.recv().await {
            Some(res) => res,
            None => Err(TransportError::Closed),
        }
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener
        .set_nonblocking(true)
        .expect("Failed to set nonblocking");
    let addr = listener.local_addr().expect("Failed to get local address");
    let server = axum::Server::from_tcp(listener)
        .expect("Failed to build server")
        .serve(router.into_make_service());
    tokio::spawn(async move {
        let _ = server.await;
    });
    addr
}

/// A local address nothing is listening on.
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    drop(listener);
    format!("http://{addr}/connect")
}

#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct PeerState {
    status: StatusCode,
    posts: Arc<Mutex<Vec<RecordedPost>>>,
}

/// Peer handshake endpoint that records every POST and answers with a fixed
/// status.
pub struct RecordingPeer {
    pub url: String,
    posts: Arc<Mutex<Vec<RecordedPost>>>,
}

impl RecordingPeer {
    pub async fn spawn(status: u16) -> Self {
        let posts = Arc::new(Mutex::new(Vec::new()));
        let state = PeerState {
            status: StatusCode::from_u16(status).expect("invalid status"),
            posts: posts.clone(),
        };
        let router = Router::new()
            .route("/connect", post(record))
            .with_state(state);
        let addr = serve(router).await;

        Self {
            url: format!("http://{addr}/connect"),
            posts,
        }
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }
}

async fn record(State(state): State<PeerState>, headers: HeaderMap, body: String) -> StatusCode {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
    state
        .posts
        .lock()
        .unwrap()
        .push(RecordedPost { content_type, body });
    state.status
}
