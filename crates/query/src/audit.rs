//! Best-effort audit writes.

use std::panic::{AssertUnwindSafe, catch_unwind};

use promptgate_core::{AuditError, AuditSink};
use tracing::warn;

/// Run one write against `sink`, logging and swallowing its errors and panics.
pub(crate) fn record(
    sink: &dyn AuditSink,
    what: &str,
    write: impl FnOnce(&dyn AuditSink) -> Result<(), AuditError>,
) {
    match catch_unwind(AssertUnwindSafe(|| write(sink))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(record = what, error = %e, "Audit write failed"),
        Err(_) => warn!(record = what, "Audit sink panicked"),
    }
}
