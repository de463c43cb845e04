//! Remote service facades for the two managed services cloudpipe bridges.
//!
//! This module hides transport, authentication, and protocol detail behind a
//! handful of primitive operation shapes:
//!
//! - [`ObjectStore`] - bucket-scoped blob storage (list, open for read, open
//!   for write, delete)
//! - [`Publisher`] - fire-and-forget message publishing with a flush barrier
//! - [`Subscriber`] - push delivery of messages to a concurrently-invoked
//!   handler
//!
//! All interfaces are **synchronous by design**: provider implementations are
//! free to run async machinery internally (and the bundled GCP backends do),
//! but callers see blocking calls. This keeps the transfer and delivery logic
//! free of executor concerns.
//!
//! ## Fakes
//!
//! [`fake`] provides in-memory implementations ([`FakeStore`](fake::FakeStore),
//! [`FakeBroker`](fake::FakeBroker)) that simulate both services entirely in
//! process, including the delivery concurrency a real broker imposes. They are
//! part of the library, not test-only code, so downstream users can exercise
//! their own integrations without network access.
//!
//! ## Providers
//!
//! - [`gcs`] (feature `gcs`) - Google Cloud Storage via the `object_store`
//!   crate
//! - [`pubsub`] (feature `pubsub`) - Google Cloud Pub/Sub via the official
//!   Rust client

pub mod fake;
pub mod traits;

#[cfg(feature = "gcs")]
pub mod gcs;

#[cfg(feature = "pubsub")]
pub mod pubsub;

pub use traits::*;
