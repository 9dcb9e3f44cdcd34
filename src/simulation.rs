//! Simulation driver
//!
//! Feeds requests to a [`BuddyAllocator`] one at a time and writes one
//! outcome line per request. Capacity failures are reported and the run
//! continues; a read or format error from the feed is reported and ends the
//! run. Either way the allocator is left ready for the final report.

use crate::buddy::BuddyAllocator;
use crate::error::{Error, Result};
use crate::input::{Request, RequestReader};
use std::io::Write;
use std::path::Path;
use tracing::{error, info};

/// What happened during a run
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Requests handed to the allocator
    pub processed: usize,
    /// Requests that got a block
    pub allocated: usize,
    /// Requests that found no block
    pub failed: usize,
    /// Error that stopped the feed early, if any
    pub aborted: Option<Error>,
}

/// Replay `requests` against `allocator`, writing outcome lines to `out`.
///
/// Only a failure to write to `out` is returned as an error.
pub fn run<I, W>(allocator: &mut BuddyAllocator, requests: I, out: &mut W) -> Result<RunOutcome>
where
    I: IntoIterator<Item = Result<Request>>,
    W: Write,
{
    let mut outcome = RunOutcome::default();

    for request in requests {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                error!("Stopping after feed error: {}", e);
                writeln!(out, "ERROR {}", e)?;
                outcome.aborted = Some(e);
                break;
            }
        };

        outcome.processed += 1;
        match allocator.allocate(request.size_kb, request.label) {
            Ok(allocation) => {
                outcome.allocated += 1;
                writeln!(out, "[ALLOCATED] {}", allocation)?;
            }
            Err(e @ Error::OutOfMemory { .. }) => {
                outcome.failed += 1;
                writeln!(out, "[FAILED] {}", e)?;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        processed = outcome.processed,
        allocated = outcome.allocated,
        failed = outcome.failed,
        "Run finished"
    );
    Ok(outcome)
}

/// Replay the requests stored in the file at `path`.
///
/// An unreadable file is reported on `out` and leaves the allocator
/// untouched.
pub fn run_file<P, W>(allocator: &mut BuddyAllocator, path: P, out: &mut W) -> Result<RunOutcome>
where
    P: AsRef<Path>,
    W: Write,
{
    let path = path.as_ref();
    writeln!(out, "Reading allocation requests from: {}", path.display())?;

    match RequestReader::open(path) {
        Ok(reader) => run(allocator, reader, out),
        Err(e) => {
            error!(path = %path.display(), "Cannot open request file: {}", e);
            writeln!(out, "ERROR {}", e)?;
            Ok(RunOutcome {
                aborted: Some(e),
                ..RunOutcome::default()
            })
        }
    }
}
