//! Reconciliation core for loresmith.
//!
//! This crate turns unconstrained model output into validated lorebook
//! mutations: extraction of a JSON fragment from noisy text, container-shape
//! validation per mode, merge under field protection, defaulting of newly
//! generated entries, and sequenced application against the remote store.

pub mod apply;
pub mod defaults;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod reconcile;

/// Pipeline error taxonomy.
pub use error::LoreError;
/// JSON fragment recovery from free-text model output.
pub use extract::extract_json;
/// Mode controller facade and request/report types.
pub use pipeline::{
    AppliedChange, LorePipeline, PipelinePhase, ReconcileFailure, ReconcileMode, ReconcileReport,
    SubmitParams,
};
/// Prompt template loading and rendering.
pub use prompt::PromptSet;
