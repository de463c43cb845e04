//! Google Cloud Pub/Sub backends for the [`Publisher`] and [`Subscriber`]
//! facades.
//!
//! Built on the official Rust client with an internal tokio runtime behind
//! the sync interface. Publishing keeps the SDK's per-message awaiter so
//! [`Publisher::flush`] can resolve every outstanding send - the drain
//! barrier that keeps the process alive until all handoffs complete.
//! Subscribing bridges the SDK's concurrent async callbacks onto the sync
//! [`DeliveryHandler`]; the sync [`CancelToken`] is watched by a small task
//! that forwards cancellation into the SDK's own token.

use crate::cancel::CancelToken;
use crate::config::CredentialsSource;
use crate::remote::traits::{
    Delivery, DeliveryHandler, ErrorKind, Publisher, ServiceError, ServiceResult, Subscriber,
};
use google_cloud_googleapis::pubsub::v1::PubsubMessage;
use google_cloud_pubsub::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_pubsub::client::{Client, ClientConfig};
use google_cloud_pubsub::publisher::{Awaiter, Publisher as GcpPublisher};
use google_cloud_pubsub::subscription::Subscription;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

fn auth_error(err: impl Display) -> ServiceError {
    ServiceError::new(ErrorKind::Access, err.to_string())
}

fn new_runtime() -> ServiceResult<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| ServiceError::new(ErrorKind::Other, format!("tokio runtime: {err}")))
}

fn connect_client(
    runtime: &Runtime,
    project: &str,
    credentials: &CredentialsSource,
) -> ServiceResult<Client> {
    runtime.block_on(async {
        let mut config = match credentials {
            CredentialsSource::Default => {
                ClientConfig::default().with_auth().await.map_err(auth_error)?
            }
            CredentialsSource::File(path) => {
                let file = CredentialsFile::new_from_file(path.to_string_lossy().into_owned())
                    .await
                    .map_err(auth_error)?;
                ClientConfig::default()
                    .with_credentials(file)
                    .await
                    .map_err(auth_error)?
            }
            CredentialsSource::Inline(json) => {
                let file = CredentialsFile::new_from_str(json).await.map_err(auth_error)?;
                ClientConfig::default()
                    .with_credentials(file)
                    .await
                    .map_err(auth_error)?
            }
        };
        config.project_id = Some(project.to_string());
        Client::new(config)
            .await
            .map_err(|err| ServiceError::transport(err.to_string()))
    })
}

// ============================================================================
// TopicPublisher
// ============================================================================

pub struct TopicPublisher {
    runtime: Runtime,
    publisher: Mutex<GcpPublisher>,
    pending: Mutex<Vec<Awaiter>>,
}

impl TopicPublisher {
    /// Build a publisher for one topic.
    ///
    /// # Errors
    ///
    /// Fails when credentials cannot be loaded or the client cannot be
    /// constructed. A missing topic surfaces later, through `flush`.
    pub fn connect(
        project: &str,
        topic: &str,
        credentials: &CredentialsSource,
    ) -> ServiceResult<Self> {
        let runtime = new_runtime()?;
        let client = connect_client(&runtime, project, credentials)?;
        let publisher = client.topic(topic).new_publisher(None);
        debug!(project, topic, "pubsub publisher ready");
        Ok(Self {
            runtime,
            publisher: Mutex::new(publisher),
            pending: Mutex::new(Vec::new()),
        })
    }
}

impl Publisher for TopicPublisher {
    fn publish(&self, payload: Vec<u8>) {
        let message = PubsubMessage {
            data: payload.into(),
            ..Default::default()
        };
        let awaiter = {
            let publisher = self.publisher.lock().expect("publisher mutex poisoned");
            self.runtime.block_on(publisher.publish(message))
        };
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .push(awaiter);
    }

    fn flush(&self) -> ServiceResult<()> {
        let pending: Vec<Awaiter> = self
            .pending
            .lock()
            .expect("pending mutex poisoned")
            .drain(..)
            .collect();
        debug!(outstanding = pending.len(), "pubsub flush");
        let mut first_failure = None;
        for awaiter in pending {
            if let Err(status) = self.runtime.block_on(awaiter.get())
                && first_failure.is_none()
            {
                first_failure = Some(ServiceError::transport(status.to_string()));
            }
        }
        let mut publisher = self.publisher.lock().expect("publisher mutex poisoned");
        self.runtime.block_on(publisher.shutdown());
        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SubscriptionFeed
// ============================================================================

pub struct SubscriptionFeed {
    runtime: Runtime,
    subscription: Subscription,
}

impl SubscriptionFeed {
    /// Build a delivery session for one subscription.
    ///
    /// # Errors
    ///
    /// Fails when credentials cannot be loaded or the client cannot be
    /// constructed. A missing subscription surfaces when the session starts.
    pub fn connect(
        project: &str,
        subscription: &str,
        credentials: &CredentialsSource,
    ) -> ServiceResult<Self> {
        let runtime = new_runtime()?;
        let client = connect_client(&runtime, project, credentials)?;
        debug!(project, subscription, "pubsub subscription ready");
        let subscription = client.subscription(subscription);
        Ok(Self {
            runtime,
            subscription,
        })
    }
}

impl Subscriber for SubscriptionFeed {
    fn subscribe(&self, cancel: &CancelToken, handler: DeliveryHandler) -> ServiceResult<()> {
        let token = CancellationToken::new();
        let result = self.runtime.block_on(async {
            // Forward the sync token into the SDK's token so Ctrl-C stops the
            // streaming pull deterministically.
            let watcher = {
                let token = token.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    while !cancel.is_cancelled() {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    token.cancel();
                })
            };
            let received = self
                .subscription
                .receive(
                    move |message, _token| {
                        let handler = Arc::clone(&handler);
                        async move {
                            let payload = message.message.data.to_vec();
                            let spawner = tokio::runtime::Handle::current();
                            let delivery = Delivery::new(payload, move || {
                                spawner.spawn(async move {
                                    let _ = message.ack().await;
                                });
                            });
                            handler(delivery);
                        }
                    },
                    token.clone(),
                    None,
                )
                .await;
            watcher.abort();
            received
        });
        result.map_err(|status| ServiceError::transport(status.to_string()))
    }
}
