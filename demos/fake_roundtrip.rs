//! End-to-end demo against the in-memory fakes: list and read objects from a
//! seeded store, then drain a concurrently-delivered subscription to stdout.
//!
//! Run with: `cargo run --example fake_roundtrip --no-default-features`

use anyhow::Result;
use cloudpipe::batch;
use cloudpipe::{run_subscription, CancelToken, DeliveryOptions, FakeBroker, FakeStore};
use std::io;

fn main() -> Result<()> {
    // Object storage: seed a bucket, list a prefix, read one object.
    let store = FakeStore::new();
    store.insert("logs/a", b"alpha\n");
    store.insert("logs/b", b"beta\n");
    store.insert("other/c", b"gamma\n");

    let stdout = io::stdout();
    println!("-- ls logs/ --");
    batch::list_objects(&store, "logs/", &mut stdout.lock())?;
    println!("-- read logs/a --");
    batch::read_object(&store, "logs/a", &mut stdout.lock())?;

    // Messaging: queue deliveries, drain them through the serializer.
    let broker = FakeBroker::new().with_workers(4);
    for i in 0..5 {
        broker.queue_message(format!("event-{i}").as_bytes());
    }
    println!("-- subscribe --");
    let serializer = run_subscription(
        &broker,
        &CancelToken::new(),
        DeliveryOptions::default(),
        io::stdout(),
    )?;
    eprintln!(
        "delivered {} message(s), acked {}",
        serializer.delivered(),
        serializer.acked()
    );
    Ok(())
}
