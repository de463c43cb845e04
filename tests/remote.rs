// Integration tests for the remote service fakes.
//
// These exercise the facade contracts entirely in process: error kinds for
// missing objects, lazy sink creation, deterministic listing order, and the
// publish pending/flushed ledger.

use anyhow::Result;
use cloudpipe::{
    Delivery, ErrorKind, FakeBroker, FakeStore, ObjectStore, Publisher, ServiceError,
};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// FakeStore
// ============================================================================

#[test]
fn test_open_read_round_trip() -> Result<()> {
    let store = FakeStore::new();
    store.insert("data/file.txt", b"Hello, World!");

    let mut reader = store.open_read("data/file.txt")?;
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents)?;
    assert_eq!(contents, b"Hello, World!");
    Ok(())
}

#[test]
fn test_open_read_missing_object_is_not_found() {
    let store = FakeStore::new();
    let err = store.open_read("nonexistent.txt").err().unwrap();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_injected_read_fault_keeps_its_kind() {
    let store = FakeStore::new();
    store.insert("locked", b"secret");
    store.fail_reads("locked", ErrorKind::Access);
    let err = store.open_read("locked").err().unwrap();
    assert_eq!(err.kind, ErrorKind::Access);
}

#[test]
fn test_sink_creation_is_lazy() -> Result<()> {
    let store = FakeStore::new();

    let mut sink = store.open_write("pending")?;
    sink.write_all(b"buffered bytes")?;
    // Nothing visible until finalize.
    assert_eq!(store.contents("pending"), None);

    sink.finalize()?;
    assert_eq!(store.contents("pending"), Some(b"buffered bytes".to_vec()));
    Ok(())
}

#[test]
fn test_finalize_fault_leaves_no_object() -> Result<()> {
    let store = FakeStore::new();
    store.fail_finalize("doomed", ErrorKind::Transport);

    let mut sink = store.open_write("doomed")?;
    sink.write_all(b"bytes")?;
    let err = sink.finalize().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(store.contents("doomed"), None);
    Ok(())
}

#[test]
fn test_write_fault_surfaces_on_first_write() -> Result<()> {
    let store = FakeStore::new();
    store.fail_writes("blocked", ErrorKind::Access);

    let mut sink = store.open_write("blocked")?;
    assert!(sink.write_all(b"bytes").is_err());
    Ok(())
}

#[test]
fn test_delete_missing_object_is_not_found() {
    let store = FakeStore::new();
    store.insert("keep", b"k");

    assert!(store.delete("keep").is_ok());
    let err = store.delete("keep").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_listing_is_ordered_and_idempotent() {
    let store = FakeStore::new();
    store.insert("logs/b", b"2");
    store.insert("other/c", b"3");
    store.insert("logs/a", b"1");

    let first: Vec<_> = store.list("logs/").map(|entry| entry.unwrap()).collect();
    let second: Vec<_> = store.list("logs/").map(|entry| entry.unwrap()).collect();
    assert_eq!(first, vec!["logs/a".to_string(), "logs/b".to_string()]);
    assert_eq!(first, second);
}

#[test]
fn test_listing_error_is_terminal() {
    let store = FakeStore::new();
    store.insert("a", b"1");
    store.insert("b", b"2");
    store.insert("c", b"3");
    store.fail_listing_after(1);

    let entries: Vec<_> = store.list("").collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_ok());
    assert_eq!(entries[1].as_ref().unwrap_err().kind, ErrorKind::Transport);
}

// ============================================================================
// FakeBroker
// ============================================================================

#[test]
fn test_publish_is_pending_until_flush() {
    let broker = FakeBroker::new();
    broker.publish(b"one".to_vec());
    broker.publish(b"two".to_vec());

    assert_eq!(broker.outstanding(), 2);
    assert!(broker.flushed().is_empty());

    broker.flush().expect("flush failed");
    assert_eq!(broker.outstanding(), 0);
    assert_eq!(broker.flushed(), vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn test_flush_fault_is_reported() {
    let broker = FakeBroker::new();
    broker.publish(b"one".to_vec());
    broker.fail_flush(ServiceError::transport("broker going away"));

    let err = broker.flush().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(broker.outstanding(), 1);
}

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn test_ack_consumes_the_handle() {
    let count = Arc::new(AtomicUsize::new(0));
    let delivery = {
        let count = Arc::clone(&count);
        Delivery::new(b"payload".to_vec(), move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert_eq!(delivery.payload(), b"payload");
    delivery.ack();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropped_delivery_never_acks() {
    let count = Arc::new(AtomicUsize::new(0));
    {
        let count = Arc::clone(&count);
        let _delivery = Delivery::new(b"payload".to_vec(), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unacked_delivery_is_a_no_op() {
    Delivery::unacked(b"payload".to_vec()).ack();
}
