//! Two in-process nodes complete a handshake over HTTP and exchange messages
//! through a shared in-memory broker.
//!
//! The first node reads its settings from the environment when LISTEN_ADDR
//! and PUBLISHER_ADDRESS are set. Run with `RUST_LOG=info` to follow along.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use log::info;
use tokio::time::{sleep, timeout};

use event_subscriber::{bootstrap_node, ConnectionRequest, NodeConfig};
use transport::{MemoryHub, MemoryTransport};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let alice_config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            info!("{e}; using demo settings");
            NodeConfig::new("127.0.0.1:0".parse()?, "memory://alice")
                .with_filters(vec!["chat".to_string()])
        }
    };
    let bob_config = NodeConfig::new("127.0.0.1:0".parse()?, "memory://bob")
        .with_filters(vec!["chat".to_string()]);

    let hub = MemoryHub::new();
    let alice_publisher = hub.register_publisher(&alice_config.publisher_addr).await;
    let bob_publisher = hub.register_publisher(&bob_config.publisher_addr).await;

    let alice_transport = Arc::new(MemoryTransport::new(hub.clone()));
    let bob_transport = Arc::new(MemoryTransport::new(hub.clone()));
    let mut alice = bootstrap_node(alice_config, alice_transport).await?;
    let mut bob = bootstrap_node(bob_config, bob_transport).await?;

    // Bob asks Alice to subscribe to him and to send back her publisher address.
    let offer = ConnectionRequest::publisher(bob_publisher.address())
        .with_subscriber_endpoint(bob.connect_url());
    let status = bob
        .subscriber
        .request_connection(&alice.connect_url(), &offer)
        .await?;
    info!("Alice answered the handshake with {status}");

    timeout(WAIT, async {
        while hub.subscriber_count(alice_publisher.address()).await == 0
            || hub.subscriber_count(bob_publisher.address()).await == 0
        {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .context("handshake did not complete")?;

    alice_publisher.publish("chat.general", "hello bob").await;
    let msg = timeout(WAIT, bob.messages.recv())
        .await
        .context("bob received nothing")?
        .context("bob's message channel closed")?;
    println!("bob <- {}: {}", msg.publisher, String::from_utf8_lossy(&msg.payload));

    bob_publisher.publish("chat.general", "hi alice").await;
    let msg = timeout(WAIT, alice.messages.recv())
        .await
        .context("alice received nothing")?
        .context("alice's message channel closed")?;
    println!("alice <- {}: {}", msg.publisher, String::from_utf8_lossy(&msg.payload));

    alice.shutdown();
    bob.shutdown();
    Ok(())
}
