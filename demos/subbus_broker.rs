//! In-process subscription bus broker
//!
//! Run with: cargo run --example subbus_broker
//!
//! A raw SubBus socket acts as a device: every data message it receives is
//! sent straight back out, excluding the peer it came from. Three peers
//! subscribe to different topic prefixes and publish a few messages each.
//!
//! Set `RUST_LOG=subbus_rs=trace` to watch subscriptions and fan-out.

use std::time::Duration;

use subbus_rs::{Domain, Message, PeerEndpoint, PipeId, Protocol, SocketConfig, SocketRegistry};

const PEERS: [(&str, &[u8]); 3] = [
    ("alice", b"weather."),
    ("bob", b"weather.paris"),
    ("carol", b"weather.oslo"),
];

const TRAFFIC: [&[u8]; 3] = [
    b"weather.paris rain",
    b"weather.oslo snow",
    b"weather.paris.sunday sun",
];

async fn run_peer(
    name: &'static str,
    topic: &'static [u8],
    mut peer: PeerEndpoint,
    publish: &'static [u8],
) {
    if peer.send(Message::subscribe(topic)).await.is_err() {
        return;
    }
    // Let the broker apply the subscription before traffic starts
    tokio::time::sleep(Duration::from_millis(20)).await;
    if peer.send(Message::data(publish)).await.is_err() {
        return;
    }

    let deadline = tokio::time::sleep(Duration::from_millis(200));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            msg = peer.recv() => match msg {
                Some(msg) => {
                    let topic = msg.body().get(1..).unwrap_or_default();
                    let body = String::from_utf8_lossy(topic).into_owned();
                    tracing::info!(peer = name, body = %body, "Delivered");
                }
                None => break,
            },
            _ = &mut deadline => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("subbus_rs=debug".parse()?)
                .add_directive("subbus_broker=info".parse()?),
        )
        .init();

    let registry = SocketRegistry::with_defaults();
    let mut broker = registry.create(Domain::Raw, Protocol::SubBus, SocketConfig::default())?;

    let mut ids: Vec<PipeId> = Vec::new();
    let mut tasks = Vec::new();
    for (i, (name, topic)) in PEERS.into_iter().enumerate() {
        let (id, peer) = broker.connect()?;
        ids.push(id);
        tasks.push(tokio::spawn(run_peer(name, topic, peer, TRAFFIC[i])));
    }
    // Nobody has subscribed to "sports."; this one is dropped
    let (late, late_peer) = broker.connect()?;
    ids.push(late);
    late_peer.send(Message::data(b"sports.final 3-1")).await.ok();

    let mut tick = tokio::time::interval(Duration::from_millis(5));
    let stop = tokio::time::sleep(Duration::from_millis(250));
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                for &id in &ids {
                    broker.readable(id)?;
                    broker.writable(id)?;
                }
                while let Ok(msg) = broker.recv() {
                    broker.send(msg)?;
                }
            }
            _ = &mut stop => break,
        }
    }

    for task in tasks {
        task.await?;
    }

    let stats = broker.stats();
    println!();
    println!("=== Broker stats ===");
    println!("attached pipes:      {}", stats.attached_pipes);
    println!("messages sent:       {}", stats.messages_sent);
    println!("copies delivered:    {}", stats.copies_delivered);
    println!("dropped (no match):  {}", stats.dropped_no_match);
    println!("control frames:      {}", stats.control_frames);
    println!("fan-out ratio:       {:.2}", stats.fanout_ratio());

    Ok(())
}
