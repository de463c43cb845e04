//! # cloudpipe
//!
//! Command-line bridges between local processes and two managed cloud
//! services: a bucket-scoped **object store** and a **publish/subscribe**
//! messaging service. Data flows through stdin/stdout/files; the remote
//! services stay behind a minimal facade.
//!
//! ## Key Pieces
//!
//! - **Remote service facade** - [`ObjectStore`], [`Publisher`], and
//!   [`Subscriber`] traits hide transport, auth, and protocol detail behind a
//!   handful of primitive operations (list, open-read, open-write, delete;
//!   publish, flush, subscribe)
//! - **Batch transfer executor** - [`batch`] drives download/upload/delete
//!   over ordered item lists with per-item failure isolation, `[<item>]
//!   <cause>` diagnostics, and exactly one success-count summary per batch
//! - **Streaming delivery serializer** - [`deliver`] funnels concurrently
//!   delivered messages into one ordered output stream under a single write
//!   lock, with quiet and acknowledge toggles
//! - **Publish pump** - [`publish`] turns stdin lines into messages and
//!   blocks on a flush barrier before the process may exit
//! - **Fakes** - [`FakeStore`] and [`FakeBroker`] simulate both services in
//!   memory, including multi-worker delivery concurrency, for tests without
//!   network access
//!
//! ## Quick Start
//!
//! ```
//! use cloudpipe::{run_batch, BatchLabel, BatchPolicy, FakeStore};
//! use cloudpipe::batch::delete_object;
//!
//! # fn main() {
//! let store = FakeStore::new();
//! store.insert("logs/a", b"alpha");
//! store.insert("logs/b", b"beta");
//!
//! let items = vec!["logs/a".to_string(), "logs/missing".to_string()];
//! let mut diag = Vec::new();
//! let report = run_batch(
//!     &items,
//!     BatchPolicy::ContinueOnError,
//!     BatchLabel::new("Deleted", "object(s)"),
//!     &mut diag,
//!     |name| delete_object(&store, name),
//! );
//!
//! assert_eq!(report.succeeded, 1);
//! assert!(String::from_utf8_lossy(&diag).contains("Deleted 1 object(s)"));
//! # }
//! ```
//!
//! ## Batch Semantics
//!
//! Items are processed strictly in list order, sequentially. Download and
//! delete batches continue past per-item failures; an upload failure aborts
//! the whole batch after emitting the summary (the historical contract,
//! preserved as-is). Every opened source and sink is released on every exit
//! path of its item, and a remote finalize failure after a clean copy is its
//! own failure - an item is never left half-written and counted as a success.
//!
//! ## Delivery Semantics
//!
//! The broker delivers at-least-once and invokes the handler from arbitrarily
//! many workers. The serializer's lock spans exactly one
//! payload-plus-terminator write, so records never interleave mid-record.
//! Acknowledge-on means every delivery is acked after the attempted output;
//! acknowledge-off never acks and relies on broker redelivery ("peek" mode).
//! Sessions end on a fatal broker error or through a [`CancelToken`].
//!
//! ## Feature Flags
//!
//! - `gcs` - Google Cloud Storage backend for the object-store facade
//! - `pubsub` - Google Cloud Pub/Sub backends for the publisher/subscriber
//!   facades
//!
//! Both are enabled by default; the `cloudpipe` binary requires both. With
//! `--no-default-features` the facade, executor, serializer, and fakes still
//! build, for embedding or testing.
//!
//! ## Module Overview
//!
//! - [`remote`] - facade traits, error kinds, fakes, provider backends
//! - [`batch`] - batch transfer executor and per-item operations
//! - [`deliver`] - streaming delivery serializer
//! - [`publish`] - stdin-to-broker pump with flush barrier
//! - [`config`] - credential source resolution and validation
//! - [`cancel`] - cancellation token for delivery sessions
//! - [`cli`] - command definitions and drivers for the binary
//! - [`testing`] - helpers for writing tests against the fakes

pub mod batch;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod deliver;
pub mod publish;
pub mod remote;
pub mod testing;

// General re-exports
pub use batch::{run_batch, BatchLabel, BatchPolicy, BatchReport, ItemOutcome};
pub use cancel::CancelToken;
pub use config::{ConfigError, CredentialsSource};
pub use deliver::{run_subscription, DeliveryOptions, Serializer};
pub use publish::{pump, PumpStats};
pub use remote::fake::{FakeBroker, FakeStore};
pub use remote::{
    Delivery, DeliveryHandler, ErrorKind, NameIter, ObjectSink, ObjectStore, Publisher,
    ServiceError, ServiceResult, Subscriber,
};

// Gated re-exports
#[cfg(feature = "gcs")]
pub use remote::gcs::GcsStore;

#[cfg(feature = "pubsub")]
pub use remote::pubsub::{SubscriptionFeed, TopicPublisher};
