//! Core traits and types for the remote service facades.

use crate::cancel::CancelToken;
use std::error::Error;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

// ============================================================================
// Error Type
// ============================================================================

/// Error raised by a remote service operation.
#[derive(Debug, Clone)]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Coarse classification of a remote failure.
///
/// The transfer executor only branches on whether an operation failed, not on
/// the kind; kinds exist so callers (and diagnostics) can tell a missing item
/// from a permission problem from a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Access,
    Transport,
    AlreadyExists,
    InvalidInput,
    Other,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ServiceError {}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ErrorKind::NotFound`] error about a named item.
    pub fn not_found(name: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("object {name} does not exist"))
    }

    /// Shorthand for a [`ErrorKind::Transport`] error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// Object Storage
// ============================================================================

/// Lazy sequence of object names.
///
/// End-of-sequence (iterator exhaustion) is distinct from a terminal listing
/// error: the latter is surfaced as an `Err` item, after which implementations
/// yield nothing further.
pub type NameIter = Box<dyn Iterator<Item = ServiceResult<String>> + Send>;

/// A byte sink for one remote object.
///
/// Creation is lazy: opening a sink is cheap and may not touch the service at
/// all. A failure can surface on the first write or only at [`finalize`],
/// so callers must always attempt `finalize` - even after a copy error - and
/// must treat its failure as distinct from a copy failure, since data may have
/// been partially committed remotely.
///
/// [`finalize`]: ObjectSink::finalize
pub trait ObjectSink: Write + Send {
    /// Complete the write and release the sink.
    fn finalize(self: Box<Self>) -> ServiceResult<()>;
}

/// Bucket-scoped object storage.
pub trait ObjectStore: Send + Sync {
    /// Enumerate object names starting with `prefix` (every name when the
    /// prefix is empty), in a stable order for an unchanged object set.
    fn list(&self, prefix: &str) -> NameIter;

    /// Open the named object for reading.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NotFound`], [`ErrorKind::Access`], or
    /// [`ErrorKind::Transport`] if the object does not exist or cannot be
    /// opened.
    fn open_read(&self, name: &str) -> ServiceResult<Box<dyn Read + Send>>;

    /// Open the named object for writing. See [`ObjectSink`] for the
    /// finalize contract.
    ///
    /// # Errors
    ///
    /// May fail immediately, but lazy implementations report most problems
    /// through the sink instead.
    fn open_write(&self, name: &str) -> ServiceResult<Box<dyn ObjectSink>>;

    /// Delete the named object.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NotFound`] if the object does not exist, or
    /// another kind for access/transport problems.
    fn delete(&self, name: &str) -> ServiceResult<()>;
}

// ============================================================================
// Publish / Subscribe
// ============================================================================

/// Fire-and-forget message publishing.
pub trait Publisher: Send + Sync {
    /// Enqueue one message for asynchronous delivery. There is no per-message
    /// acknowledgment; outcomes surface at [`flush`](Publisher::flush).
    fn publish(&self, payload: Vec<u8>);

    /// Block until every previously published message has been durably handed
    /// off. A process feeding this publisher must not exit before `flush`
    /// completes, or in-flight sends may be lost.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the outstanding publishes.
    fn flush(&self) -> ServiceResult<()>;
}

/// One delivered message: an opaque payload plus its acknowledgment handle.
///
/// Delivery is at-least-once. Acknowledging consumes the handle, so a message
/// is acknowledged zero or one times - never more. A dropped, unacknowledged
/// delivery is redelivered by the broker at its discretion.
pub struct Delivery {
    payload: Vec<u8>,
    acker: Option<Box<dyn FnOnce() + Send>>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: impl FnOnce() + Send + 'static) -> Self {
        Self {
            payload,
            acker: Some(Box::new(acker)),
        }
    }

    /// A delivery whose acknowledgment is a no-op. Useful in tests.
    pub fn unacked(payload: Vec<u8>) -> Self {
        Self {
            payload,
            acker: None,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Confirm to the broker that this message need not be redelivered.
    pub fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker();
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Handler invoked once per delivered message.
///
/// The facade owns the delivery workers and **does not serialize calls**: the
/// handler may run concurrently from multiple threads or tasks and must do its
/// own coordination around shared state.
pub type DeliveryHandler = Arc<dyn Fn(Delivery) + Send + Sync>;

/// Push-delivery subscription to one named channel.
pub trait Subscriber: Send + Sync {
    /// Run the delivery session, blocking the calling thread until the token
    /// is cancelled or the broker reports an unrecoverable error. One session
    /// is used for the lifetime of a command invocation; there is no restart.
    ///
    /// # Errors
    ///
    /// Returns the broker's terminal error. Cancellation is not an error.
    fn subscribe(&self, cancel: &CancelToken, handler: DeliveryHandler) -> ServiceResult<()>;
}
