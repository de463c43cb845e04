//! The stdin-to-broker pump.
//!
//! Reads the input line by line, publishes each line as one opaque message
//! payload, then runs the publisher's flush barrier so the process does not
//! exit while sends are still in flight. Line splitting matches the usual
//! text conventions: records are split on `\n`, one trailing `\r` is
//! stripped, empty lines become empty payloads, and a final unterminated line
//! is still published.

use crate::remote::Publisher;
use anyhow::{Context, Result};
use std::io::BufRead;
use tracing::debug;

/// Accounting for one pump run.
#[derive(Debug, Clone, Copy)]
pub struct PumpStats {
    pub published: u64,
}

/// Publish one message per input line, then flush.
///
/// # Errors
///
/// An input read error or a flush failure is returned to the caller; both are
/// fatal to the publish command. After a read error the outstanding publishes
/// are abandoned unflushed.
pub fn pump(input: impl BufRead, publisher: &dyn Publisher) -> Result<PumpStats> {
    let mut published = 0u64;
    for (idx, chunk) in input.split(b'\n').enumerate() {
        let mut line =
            chunk.with_context(|| format!("error reading input line {}", idx + 1))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        publisher.publish(line);
        published += 1;
    }
    debug!(published, "input drained, flushing");
    publisher.flush().context("error flushing publisher")?;
    Ok(PumpStats { published })
}
