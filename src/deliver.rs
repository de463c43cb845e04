//! Serialized output for concurrently delivered messages.
//!
//! The broker invokes the delivery handler from an arbitrary number of
//! workers with no ordering or serialization of its own. [`Serializer`]
//! funnels those deliveries into a single output stream: one mutual-exclusion
//! lock is held for exactly one payload-plus-terminator write, so records from
//! distinct deliveries never interleave mid-record. There is no backpressure -
//! a slow output write stalls only the worker holding the lock; the other
//! workers keep handling their own messages up to the point they also need
//! the lock.
//!
//! Two configuration toggles shape each delivery's handling:
//!
//! - **quiet**: skip output entirely (acknowledge behavior is unchanged)
//! - **acknowledge**: when enabled, every delivery is acknowledged after the
//!   *attempted* output, whether or not the write succeeded; when disabled no
//!   delivery is ever acknowledged and the broker will eventually redeliver
//!   ("peek" mode)

use crate::cancel::CancelToken;
use crate::remote::{Delivery, DeliveryHandler, ServiceResult, Subscriber};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Per-session delivery handling configuration.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryOptions {
    pub quiet: bool,
    pub acknowledge: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            acknowledge: true,
        }
    }
}

/// Funnels concurrent deliveries into one ordered output stream.
///
/// The output lock is owned by the serializer instance, not shared process
/// state; two serializers never contend with each other.
pub struct Serializer<W> {
    out: Mutex<W>,
    options: DeliveryOptions,
    delivered: AtomicU64,
    written: AtomicU64,
    acked: AtomicU64,
}

impl<W: Write + Send> Serializer<W> {
    pub fn new(out: W, options: DeliveryOptions) -> Self {
        Self {
            out: Mutex::new(out),
            options,
            delivered: AtomicU64::new(0),
            written: AtomicU64::new(0),
            acked: AtomicU64::new(0),
        }
    }

    /// Handle one delivery. Safe to call concurrently from any number of
    /// delivery workers.
    pub fn handle(&self, delivery: Delivery) {
        self.delivered.fetch_add(1, Ordering::Relaxed);

        if !self.options.quiet {
            // The lock spans exactly one full payload-plus-terminator write.
            // A failed write must not take down the session; the broker keeps
            // delivering.
            let mut out = self.out.lock().expect("output mutex poisoned");
            let wrote = out
                .write_all(delivery.payload())
                .and_then(|()| out.write_all(b"\n"))
                .and_then(|()| out.flush());
            drop(out);
            if wrote.is_ok() {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
        }

        if self.options.acknowledge {
            delivery.ack();
            self.acked.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total deliveries handled.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Deliveries whose full record reached the output.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Deliveries acknowledged to the broker.
    #[must_use]
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }
}

/// Run one delivery session to completion: subscribe, serialize every
/// delivery into `out`, and return the serializer (for its counters) once the
/// session ends by cancellation or drains.
///
/// # Errors
///
/// Returns the broker's terminal error; the counters accumulated before the
/// failure are lost with the serializer.
pub fn run_subscription<W>(
    subscriber: &dyn Subscriber,
    cancel: &CancelToken,
    options: DeliveryOptions,
    out: W,
) -> ServiceResult<Arc<Serializer<W>>>
where
    W: Write + Send + 'static,
{
    let serializer = Arc::new(Serializer::new(out, options));
    let handler: DeliveryHandler = {
        let serializer = Arc::clone(&serializer);
        Arc::new(move |delivery| serializer.handle(delivery))
    };
    subscriber.subscribe(cancel, handler)?;
    Ok(serializer)
}
