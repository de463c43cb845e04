//! Google Cloud Storage backend for the [`ObjectStore`] facade.
//!
//! Built on the `object_store` crate with an internal current-thread tokio
//! runtime, so the facade stays synchronous. Reads buffer the whole object;
//! writes buffer locally and perform the actual put at finalize, which is
//! also what gives this backend the facade's lazy-creation semantics for
//! free: nothing touches the bucket until [`ObjectSink::finalize`], so a
//! write failure surfaces there rather than at open time.

use crate::config::CredentialsSource;
use crate::remote::traits::{
    ErrorKind, NameIter, ObjectSink, ObjectStore, ServiceError, ServiceResult,
};
use futures::StreamExt;
use object_store::ObjectStore as _;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path as StorePath;
use object_store::PutPayload;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

pub struct GcsStore {
    runtime: Arc<Runtime>,
    store: Arc<GoogleCloudStorage>,
}

impl GcsStore {
    /// Build a client for one bucket.
    ///
    /// # Errors
    ///
    /// Fails when the credentials cannot be loaded or the client cannot be
    /// constructed; no request is made to the service yet.
    pub fn connect(bucket: &str, credentials: &CredentialsSource) -> ServiceResult<Self> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        match credentials {
            CredentialsSource::Default => {}
            CredentialsSource::File(path) => {
                builder = builder.with_service_account_path(path.to_string_lossy().into_owned());
            }
            CredentialsSource::Inline(json) => {
                builder = builder.with_service_account_key(json);
            }
        }
        let store = builder
            .build()
            .map_err(|err| ServiceError::new(ErrorKind::Access, err.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                ServiceError::new(ErrorKind::Other, format!("tokio runtime: {err}"))
            })?;
        debug!(bucket, "gcs client ready");
        Ok(Self {
            runtime: Arc::new(runtime),
            store: Arc::new(store),
        })
    }

    fn map_err(err: object_store::Error) -> ServiceError {
        let kind = match &err {
            object_store::Error::NotFound { .. } => ErrorKind::NotFound,
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => ErrorKind::Access,
            object_store::Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            object_store::Error::InvalidPath { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::Transport,
        };
        ServiceError::new(kind, err.to_string())
    }
}

impl ObjectStore for GcsStore {
    fn list(&self, prefix: &str) -> NameIter {
        debug!(prefix, "gcs list");
        // The service lists by path segment; a raw string prefix is only
        // equivalent when it is empty or `/`-terminated. Otherwise list
        // everything and filter client-side so `log` still matches
        // `logs-archive/x`.
        let server_prefix = if prefix.is_empty() || !prefix.ends_with('/') {
            None
        } else {
            Some(StorePath::from(prefix.trim_end_matches('/')))
        };
        let entries: Vec<ServiceResult<String>> = self.runtime.block_on(async {
            let mut stream = self.store.list(server_prefix.as_ref());
            let mut entries = Vec::new();
            while let Some(entry) = stream.next().await {
                match entry {
                    Ok(meta) => entries.push(Ok(meta.location.to_string())),
                    Err(err) => {
                        // Terminal: nothing after the first listing error.
                        entries.push(Err(Self::map_err(err)));
                        break;
                    }
                }
            }
            entries
        });
        let prefix = prefix.to_string();
        Box::new(entries.into_iter().filter(move |entry| match entry {
            Ok(name) => name.starts_with(&prefix),
            Err(_) => true,
        }))
    }

    fn open_read(&self, name: &str) -> ServiceResult<Box<dyn Read + Send>> {
        debug!(object = name, "gcs open_read");
        let path = StorePath::from(name);
        let bytes = self
            .runtime
            .block_on(async {
                let result = self.store.get(&path).await?;
                result.bytes().await
            })
            .map_err(Self::map_err)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, name: &str) -> ServiceResult<Box<dyn ObjectSink>> {
        debug!(object = name, "gcs open_write");
        Ok(Box::new(GcsSink {
            path: StorePath::from(name),
            buf: Vec::new(),
            store: Arc::clone(&self.store),
            runtime: Arc::clone(&self.runtime),
        }))
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        debug!(object = name, "gcs delete");
        let path = StorePath::from(name);
        self.runtime
            .block_on(self.store.delete(&path))
            .map_err(Self::map_err)
    }
}

struct GcsSink {
    path: StorePath,
    buf: Vec<u8>,
    store: Arc<GoogleCloudStorage>,
    runtime: Arc<Runtime>,
}

impl Write for GcsSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ObjectSink for GcsSink {
    fn finalize(self: Box<Self>) -> ServiceResult<()> {
        let sink = *self;
        debug!(object = %sink.path, bytes = sink.buf.len(), "gcs put");
        sink.runtime
            .block_on(sink.store.put(&sink.path, PutPayload::from(sink.buf)))
            .map(|_| ())
            .map_err(GcsStore::map_err)
    }
}
