//! Batch transfer execution over ordered item lists.
//!
//! A batch applies one operation (download, upload, delete) to each item of an
//! explicit list, strictly in list order and with no parallelism. Failures are
//! isolated per item: every item yields exactly one outcome, failures are
//! reported to the diagnostic stream as `[<item>] <cause>`, and exactly one
//! summary line reports the success count - including when an
//! [`AbortOnError`](BatchPolicy::AbortOnError) batch stops early.
//!
//! The single-item operations ([`read_object`], [`write_object`]) and
//! [`list_objects`] have no per-item recovery: any failure is returned to the
//! caller, which treats it as fatal. No operation retries; failure handling is
//! classify, report, move on (batches) or classify, terminate (everything
//! else).

use crate::remote::ObjectStore;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read, Write};
use tracing::debug;

// ============================================================================
// Executor
// ============================================================================

/// What to do with the rest of a batch when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Report the failure and keep going. Used by download and delete.
    ContinueOnError,
    /// Report the failure, emit the summary, and stop; no later item is
    /// attempted. Used by upload.
    AbortOnError,
}

/// Wording for the batch summary line, e.g. `Downloaded 3 object(s)`.
#[derive(Debug, Clone, Copy)]
pub struct BatchLabel {
    pub verb: &'static str,
    pub noun: &'static str,
}

impl BatchLabel {
    #[must_use]
    pub const fn new(verb: &'static str, noun: &'static str) -> Self {
        Self { verb, noun }
    }
}

/// One item's outcome. Never dropped: failed items carry their rendered cause.
#[derive(Debug)]
pub struct ItemOutcome {
    pub name: String,
    pub error: Option<String>,
}

impl ItemOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of one batch invocation. Owned by the caller and
/// discarded after reporting; nothing is persisted.
#[derive(Debug)]
pub struct BatchReport {
    /// Per-item outcomes in processing order. Shorter than the input list
    /// only when the batch aborted.
    pub outcomes: Vec<ItemOutcome>,
    pub succeeded: usize,
    /// Whether an [`BatchPolicy::AbortOnError`] failure stopped the batch.
    pub aborted: bool,
}

/// Apply `op` to each item in order, isolating per-item failures.
///
/// Diagnostics (one `[<item>] <cause>` line per failure, then the summary
/// line) are written to `diag`; write failures on the diagnostic stream are
/// ignored, matching the usual fate of stderr.
pub fn run_batch<F>(
    items: &[String],
    policy: BatchPolicy,
    label: BatchLabel,
    diag: &mut dyn Write,
    mut op: F,
) -> BatchReport
where
    F: FnMut(&str) -> Result<()>,
{
    debug!(items = items.len(), ?policy, "starting batch");
    let mut outcomes = Vec::with_capacity(items.len());
    let mut succeeded = 0;
    let mut aborted = false;

    for name in items {
        match op(name) {
            Ok(()) => {
                succeeded += 1;
                outcomes.push(ItemOutcome {
                    name: name.clone(),
                    error: None,
                });
            }
            Err(err) => {
                let _ = writeln!(diag, "[{name}] {err:#}");
                outcomes.push(ItemOutcome {
                    name: name.clone(),
                    error: Some(format!("{err:#}")),
                });
                if policy == BatchPolicy::AbortOnError {
                    aborted = true;
                    break;
                }
            }
        }
    }

    let _ = writeln!(diag, "{} {} {}", label.verb, succeeded, label.noun);
    BatchReport {
        outcomes,
        succeeded,
        aborted,
    }
}

// ============================================================================
// Per-Item Operations
// ============================================================================

/// Copy one remote object into a same-named local file.
pub fn download_object(store: &dyn ObjectStore, name: &str) -> Result<()> {
    let mut src = store.open_read(name).context("error opening object")?;
    let mut dst = File::create(name).context("error opening file for writing")?;
    io::copy(&mut src, &mut dst).context("error downloading object")?;
    Ok(())
}

/// Copy one local file into a same-named remote object.
///
/// Finalize is attempted even when the copy failed; a finalize failure after
/// a successful copy is its own error, since data may have been partially
/// committed remotely.
pub fn upload_file(store: &dyn ObjectStore, name: &str) -> Result<()> {
    let mut src = File::open(name).context("error opening file")?;
    let mut sink = store
        .open_write(name)
        .context("error opening object for writing")?;
    let copied = io::copy(&mut src, &mut sink);
    let finalized = sink.finalize();
    copied.context("error uploading file")?;
    finalized.context("error closing object")?;
    Ok(())
}

/// Delete one remote object.
pub fn delete_object(store: &dyn ObjectStore, name: &str) -> Result<()> {
    store.delete(name).context("error deleting object")
}

/// Copy one remote object's full content to `out`.
pub fn read_object(store: &dyn ObjectStore, name: &str, out: &mut dyn Write) -> Result<()> {
    let mut src = store.open_read(name).context("error opening object")?;
    io::copy(&mut src, out).context("error reading object")?;
    out.flush().context("error reading object")?;
    Ok(())
}

/// Copy `input` fully into one remote object.
pub fn write_object(store: &dyn ObjectStore, name: &str, input: &mut dyn Read) -> Result<()> {
    let mut sink = store
        .open_write(name)
        .context("error opening object for writing")?;
    let copied = io::copy(input, &mut sink);
    let finalized = sink.finalize();
    copied.context("error writing object")?;
    finalized.context("error closing object")?;
    Ok(())
}

/// Enumerate object names under `prefix`, one per output line, in listing
/// order.
///
/// # Errors
///
/// Any enumeration error aborts immediately - order and completeness are the
/// entire contract, so no partial listing is recovered from.
pub fn list_objects(store: &dyn ObjectStore, prefix: &str, out: &mut dyn Write) -> Result<()> {
    for entry in store.list(prefix) {
        let name = entry.context("error listing objects")?;
        writeln!(out, "{name}").context("error writing listing")?;
    }
    out.flush().context("error writing listing")?;
    Ok(())
}
