//! Error taxonomy for the reconciliation pipeline.

use crate::pipeline::ReconcileMode;
use loresmith_store::{CompletionError, StoreError};
use thiserror::Error;

/// Errors that abort a reconciliation operation.
///
/// None of these are retried automatically; the pipeline surfaces them with
/// the raw model output retained for operator inspection.
#[derive(Debug, Error)]
pub enum LoreError {
    /// No JSON-like fragment could be recovered from the model output.
    #[error("no JSON fragment found in model output")]
    ExtractionEmpty,
    /// The recovered fragment is not valid JSON.
    #[error("extracted fragment is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The payload has the wrong container type for the active mode.
    #[error("{mode} mode expects a JSON {expected}, got {found}")]
    InvalidShape {
        mode: ReconcileMode,
        expected: &'static str,
        found: &'static str,
    },
    /// A payload element could not be decoded into an entry.
    #[error("payload element {index} is not a usable entry: {message}")]
    EntryDecode { index: usize, message: String },
    /// The requested target uid is absent from the fetched book.
    #[error("entry {0} not found in the selected book")]
    TargetNotFound(u32),
    /// Remote store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Completion service failure.
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),
    /// A prompt template could not be loaded.
    #[error("prompt template error: {0}")]
    Template(String),
    /// A submit precondition was not met; the operation never started.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Another submission is already in flight on this pipeline.
    #[error("an operation is already in flight")]
    Busy,
    /// A sequential append aborted part-way; earlier creates are not rolled back.
    #[error("append aborted after {created} created entries: {source}")]
    AppendFailed {
        created: usize,
        #[source]
        source: StoreError,
    },
}
