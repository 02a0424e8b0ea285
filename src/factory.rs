//! Structured error construction.
//!
//! [`build_error`] is the only place a [`StructuredError`] is created. It is
//! total: any code, registered or not, yields a fully populated record.
//! History recording is the handler's job, see
//! [`ErrorHandler::create_error`](crate::ErrorHandler::create_error).

use crate::core_types::{Metadata, StructuredError};
use crate::registry;

/// Build a structured error for `code`.
///
/// Unregistered codes take the `UNKNOWN_ERROR` definition but keep their own
/// code string, so logs still show what the call site asked for.
pub fn build_error(
    code: &str,
    cause: Option<anyhow::Error>,
    metadata: Option<Metadata>,
) -> StructuredError {
    let entry = registry::lookup(code);
    StructuredError::from_entry(code, entry, cause, metadata)
}
