//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate the object
//! store and the message broker, making them ideal for unit testing without
//! external dependencies. [`FakeBroker`] reproduces the delivery concurrency a
//! real broker imposes by fanning deliveries out across worker threads.

use crate::cancel::CancelToken;
use crate::remote::traits::{
    Delivery, DeliveryHandler, ErrorKind, NameIter, ObjectSink, ObjectStore, Publisher,
    ServiceError, ServiceResult, Subscriber,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;

// Type aliases for the shared in-memory state
type ObjectMap = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;
type FaultMap = Arc<Mutex<HashMap<String, ErrorKind>>>;
type MessageQueue = Arc<Mutex<VecDeque<(u64, Vec<u8>)>>>;
type PayloadLog = Arc<Mutex<Vec<Vec<u8>>>>;

// ============================================================================
// FakeStore
// ============================================================================

/// In-memory object store.
///
/// Objects live in a `BTreeMap`, so listings are deterministic and
/// lexicographic - matching the stable-order contract of
/// [`ObjectStore::list`]. Failures can be injected per object name for each
/// operation; an injected write failure surfaces on the sink's first write,
/// an injected finalize failure only at finalize, mirroring how real stores
/// defer creation.
#[derive(Clone, Default)]
pub struct FakeStore {
    objects: ObjectMap,
    read_faults: FaultMap,
    write_faults: FaultMap,
    finalize_faults: FaultMap,
    delete_faults: FaultMap,
    list_fault_after: Arc<Mutex<Option<usize>>>,
}

impl FakeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn insert(&self, name: &str, data: &[u8]) {
        self.objects
            .lock()
            .expect("objects mutex poisoned")
            .insert(name.to_string(), data.to_vec());
    }

    /// Make `open_read` fail for the named object.
    pub fn fail_reads(&self, name: &str, kind: ErrorKind) {
        self.read_faults
            .lock()
            .expect("faults mutex poisoned")
            .insert(name.to_string(), kind);
    }

    /// Make the first write through a sink for the named object fail.
    pub fn fail_writes(&self, name: &str, kind: ErrorKind) {
        self.write_faults
            .lock()
            .expect("faults mutex poisoned")
            .insert(name.to_string(), kind);
    }

    /// Make finalize fail for the named object (the copy itself succeeds).
    pub fn fail_finalize(&self, name: &str, kind: ErrorKind) {
        self.finalize_faults
            .lock()
            .expect("faults mutex poisoned")
            .insert(name.to_string(), kind);
    }

    /// Make `delete` fail for the named object.
    pub fn fail_deletes(&self, name: &str, kind: ErrorKind) {
        self.delete_faults
            .lock()
            .expect("faults mutex poisoned")
            .insert(name.to_string(), kind);
    }

    /// Make listings yield a terminal error after `n` names.
    pub fn fail_listing_after(&self, n: usize) {
        *self
            .list_fault_after
            .lock()
            .expect("faults mutex poisoned") = Some(n);
    }

    #[must_use]
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("objects mutex poisoned")
            .get(name)
            .cloned()
    }

    /// Every stored object name, in listing order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("objects mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects
            .lock()
            .expect("objects mutex poisoned")
            .is_empty()
    }

    fn fault_for(map: &FaultMap, name: &str) -> Option<ErrorKind> {
        map.lock()
            .expect("faults mutex poisoned")
            .get(name)
            .copied()
    }
}

impl ObjectStore for FakeStore {
    fn list(&self, prefix: &str) -> NameIter {
        let mut entries: Vec<ServiceResult<String>> = self
            .objects
            .lock()
            .expect("objects mutex poisoned")
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .map(Ok)
            .collect();
        if let Some(n) = *self
            .list_fault_after
            .lock()
            .expect("faults mutex poisoned")
        {
            entries.truncate(n);
            entries.push(Err(ServiceError::transport("listing interrupted")));
        }
        Box::new(entries.into_iter())
    }

    fn open_read(&self, name: &str) -> ServiceResult<Box<dyn Read + Send>> {
        if let Some(kind) = Self::fault_for(&self.read_faults, name) {
            return Err(ServiceError::new(
                kind,
                format!("injected read failure for {name}"),
            ));
        }
        match self.contents(name) {
            Some(data) => Ok(Box::new(Cursor::new(data))),
            None => Err(ServiceError::not_found(name)),
        }
    }

    fn open_write(&self, name: &str) -> ServiceResult<Box<dyn ObjectSink>> {
        // Creation is lazy: nothing is visible in the store until finalize.
        Ok(Box::new(FakeSink {
            name: name.to_string(),
            buf: Vec::new(),
            objects: Arc::clone(&self.objects),
            write_fault: Self::fault_for(&self.write_faults, name),
            finalize_fault: Self::fault_for(&self.finalize_faults, name),
        }))
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        if let Some(kind) = Self::fault_for(&self.delete_faults, name) {
            return Err(ServiceError::new(
                kind,
                format!("injected delete failure for {name}"),
            ));
        }
        match self
            .objects
            .lock()
            .expect("objects mutex poisoned")
            .remove(name)
        {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(name)),
        }
    }
}

struct FakeSink {
    name: String,
    buf: Vec<u8>,
    objects: ObjectMap,
    write_fault: Option<ErrorKind>,
    finalize_fault: Option<ErrorKind>,
}

impl Write for FakeSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(kind) = self.write_fault.take() {
            return Err(std::io::Error::other(ServiceError::new(
                kind,
                format!("injected write failure for {}", self.name),
            )));
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ObjectSink for FakeSink {
    fn finalize(self: Box<Self>) -> ServiceResult<()> {
        if let Some(kind) = self.finalize_fault {
            return Err(ServiceError::new(
                kind,
                format!("injected finalize failure for {}", self.name),
            ));
        }
        self.objects
            .lock()
            .expect("objects mutex poisoned")
            .insert(self.name, self.buf);
        Ok(())
    }
}

// ============================================================================
// FakeBroker
// ============================================================================

/// In-memory message broker.
///
/// Publishing records payloads as *pending* until [`flush`](Publisher::flush)
/// moves them to the flushed log, so tests can verify the drain barrier.
/// Subscribing fans the queued messages out across `workers` OS threads, each
/// invoking the handler directly - the same unserialized concurrency a real
/// broker's delivery workers impose. The session returns once the queue is
/// drained or the token is cancelled (a test-double convenience; a real
/// session blocks until cancel or fatal error), then reports the injected
/// terminal error, if any.
#[derive(Clone)]
pub struct FakeBroker {
    queue: MessageQueue,
    acked: Arc<Mutex<Vec<u64>>>,
    pending: PayloadLog,
    flushed: PayloadLog,
    flush_fault: Arc<Mutex<Option<ServiceError>>>,
    terminal_fault: Arc<Mutex<Option<ServiceError>>>,
    next_id: Arc<Mutex<u64>>,
    workers: usize,
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            acked: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
            flushed: Arc::new(Mutex::new(Vec::new())),
            flush_fault: Arc::new(Mutex::new(None)),
            terminal_fault: Arc::new(Mutex::new(None)),
            next_id: Arc::new(Mutex::new(0)),
            workers: num_cpus::get().clamp(2, 8),
        }
    }

    /// Override the number of delivery workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Queue a message for delivery; returns its id for ack assertions.
    pub fn queue_message(&self, payload: &[u8]) -> u64 {
        let mut next_id = self.next_id.lock().expect("id mutex poisoned");
        let id = *next_id;
        *next_id += 1;
        self.queue
            .lock()
            .expect("queue mutex poisoned")
            .push_back((id, payload.to_vec()));
        id
    }

    /// Make `flush` fail.
    pub fn fail_flush(&self, error: ServiceError) {
        *self.flush_fault.lock().expect("fault mutex poisoned") = Some(error);
    }

    /// Make the subscription session end with a fatal error after the queue
    /// drains.
    pub fn fail_subscription(&self, error: ServiceError) {
        *self.terminal_fault.lock().expect("fault mutex poisoned") = Some(error);
    }

    /// Ids of acknowledged deliveries, in ack order.
    #[must_use]
    pub fn acked(&self) -> Vec<u64> {
        self.acked.lock().expect("acked mutex poisoned").clone()
    }

    /// Messages published but not yet flushed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.lock().expect("pending mutex poisoned").len()
    }

    /// Messages durably handed off by `flush`, in publish order.
    #[must_use]
    pub fn flushed(&self) -> Vec<Vec<u8>> {
        self.flushed.lock().expect("flushed mutex poisoned").clone()
    }

    /// Messages still queued for delivery.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().expect("queue mutex poisoned").len()
    }
}

impl Publisher for FakeBroker {
    fn publish(&self, payload: Vec<u8>) {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .push(payload);
    }

    fn flush(&self) -> ServiceResult<()> {
        if let Some(error) = self
            .flush_fault
            .lock()
            .expect("fault mutex poisoned")
            .take()
        {
            return Err(error);
        }
        let mut pending = self.pending.lock().expect("pending mutex poisoned");
        self.flushed
            .lock()
            .expect("flushed mutex poisoned")
            .append(&mut pending);
        Ok(())
    }
}

impl Subscriber for FakeBroker {
    fn subscribe(&self, cancel: &CancelToken, handler: DeliveryHandler) -> ServiceResult<()> {
        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let queue = Arc::clone(&self.queue);
            let acked = Arc::clone(&self.acked);
            let cancel = cancel.clone();
            let handler = Arc::clone(&handler);
            handles.push(thread::spawn(move || {
                loop {
                    // Cancellation is observed between deliveries, never
                    // mid-handler.
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = queue.lock().expect("queue mutex poisoned").pop_front();
                    let Some((id, payload)) = next else { break };
                    let acked = Arc::clone(&acked);
                    let delivery = Delivery::new(payload, move || {
                        acked.lock().expect("acked mutex poisoned").push(id);
                    });
                    handler(delivery);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("delivery worker panicked");
        }
        if let Some(error) = self
            .terminal_fault
            .lock()
            .expect("fault mutex poisoned")
            .take()
        {
            return Err(error);
        }
        Ok(())
    }
}
