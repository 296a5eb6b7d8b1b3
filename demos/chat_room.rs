//! In-process chat room demo
//!
//! Run with: cargo run --example chat_room [ROOM]
//!
//! Spawns a listener on the room plus a few simulated publishers, one of
//! which posts fast enough to trip the rate limiter. Stats events arrive
//! once per second. Press Ctrl+C to stop.

use std::sync::Arc;
use std::time::Duration;

use roomcast::stats::CountingAllocator;
use roomcast::{Broadcaster, Error, EventKind, RoomId, ServiceConfig, StatsSnapshot};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

fn print_usage() {
    eprintln!("Usage: chat_room [ROOM]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  ROOM    Room to join (default: hn)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let room = RoomId::new(args.get(1).map(String::as_str).unwrap_or("hn"));

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roomcast=debug".parse()?)
                .add_directive("chat_room=debug".parse()?),
        )
        .init();

    let config = ServiceConfig::default().rate_limit(20).log_interval(5);
    let service = Arc::new(Broadcaster::new(config));

    println!("Joining room '{}'", room);
    let mut sub = service.subscribe(&room).await;

    let listener = tokio::spawn(async move {
        while let Some(event) = sub.recv().await {
            match event.kind {
                EventKind::Message => {
                    println!("[message] {}", String::from_utf8_lossy(&event.payload));
                }
                EventKind::Stats => {
                    if let Ok(stats) = serde_json::from_slice::<StatsSnapshot>(&event.payload) {
                        println!(
                            "[stats] connected={} inbound={} outbound={} heap={}B",
                            stats.connected_count,
                            stats.inbound_delta,
                            stats.outbound_delta,
                            stats.heap_in_use
                        );
                    }
                }
            }
        }
    });

    let publishers: Vec<_> = [("alice", "10.0.0.1", 1000u64), ("mallory", "10.0.0.66", 50)]
        .into_iter()
        .map(|(nick, client, every_ms)| {
            let service = Arc::clone(&service);
            let room = room.clone();
            tokio::spawn(async move {
                let mut n = 0u32;
                loop {
                    n += 1;
                    let text = format!("message #{} from {}", n, nick);
                    match service.post_message(client, &room, nick, &text).await {
                        Ok(_) => {}
                        Err(Error::RateLimitExceeded { count, .. }) => {
                            println!("[{}] banned after {} requests", nick, count);
                            return;
                        }
                        Err(e) => eprintln!("[{}] post failed: {}", nick, e),
                    }
                    tokio::time::sleep(Duration::from_millis(every_ms)).await;
                }
            })
        })
        .collect();

    service
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    for publisher in publishers {
        publisher.abort();
    }
    listener.abort();

    Ok(())
}
