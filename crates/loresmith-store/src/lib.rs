//! Lorebook data model and remote service contracts for loresmith.
//!
//! This crate owns the entry/book schema, the store and completion service
//! traits, their HTTP implementations, and the file-backed preset store.

pub mod error;
pub mod http;
pub mod model;
pub mod presets;
pub mod remote;

/// Store, completion, and preset error types.
pub use error::{CompletionError, PresetError, StoreError};
/// HTTP client implementations of the remote contracts.
pub use http::{HttpCompletionClient, HttpLorebookStore};
/// Lorebook entry and book models.
pub use model::{BookInfo, BookSettings, EntryKind, LoreEntry, Preset};
/// File-backed preset persistence.
pub use presets::FilePresetStore;
/// Remote service traits consumed by the reconciliation core.
pub use remote::{CompletionProvider, CompletionRequest, LorebookStore};
