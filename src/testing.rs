//! Testing utilities for cloudpipe integrations.
//!
//! Small helpers used by the integration suite and available to downstream
//! users testing against the [`remote::fake`](crate::remote::fake) backends:
//!
//! - [`SharedBuf`] - a cloneable, thread-safe capture buffer implementing
//!   `Write`, for asserting on output produced by concurrent delivery
//!   workers
//! - [`scratch_dir`] - a temporary directory that cleans up after itself,
//!   for the local-file side of download/upload tests

use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A cloneable in-memory `Write` target. All clones share one buffer.
#[derive(Clone, Default)]
pub struct SharedBuf {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().expect("buffer mutex poisoned").clone()
    }

    /// The captured bytes as UTF-8 text.
    ///
    /// # Panics
    ///
    /// Panics if the captured bytes are not valid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8(self.contents()).expect("captured output was not UTF-8")
    }

    /// The captured text split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner
            .lock()
            .expect("buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Create a scratch directory removed on drop.
///
/// # Panics
///
/// Panics if the directory cannot be created; tests have no useful recovery.
#[must_use]
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create scratch directory")
}

/// Absolute path inside `dir`, in the string form used for item names.
#[must_use]
pub fn scratch_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}
