//! Remote service contracts consumed by the reconciliation core.

use crate::error::{CompletionError, StoreError};
use crate::model::{BookInfo, BookSettings, LoreEntry};
use async_trait::async_trait;

/// Free-text completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fully assembled prompt.
    pub prompt: String,
    /// Generation budget for the response.
    pub max_tokens: u32,
}

/// Lorebook store abstraction.
///
/// The contract is narrow on purpose: there is no partial-update primitive,
/// so edits to a single entry are expressed as a full `replace_entries`.
#[async_trait]
pub trait LorebookStore: Send + Sync {
    /// List all books known to the store.
    async fn list_books(&self) -> Result<Vec<BookInfo>, StoreError>;

    /// Fetch the global activation settings.
    async fn settings(&self) -> Result<BookSettings, StoreError>;

    /// Replace the global activation settings.
    async fn set_settings(&self, settings: &BookSettings) -> Result<(), StoreError>;

    /// Fetch all entries of a book.
    async fn entries(&self, book: &str) -> Result<Vec<LoreEntry>, StoreError>;

    /// Overwrite all entries of a book. There is no partial update.
    async fn replace_entries(&self, book: &str, entries: &[LoreEntry]) -> Result<(), StoreError>;

    /// Create one entry; the store assigns and returns the uid.
    async fn create_entry(&self, book: &str, entry: &LoreEntry) -> Result<u32, StoreError>;

    /// Delete a whole book.
    async fn delete_book(&self, book: &str) -> Result<(), StoreError>;

    /// Delete entries of a book by uid.
    async fn delete_entries(&self, book: &str, uids: &[u32]) -> Result<(), StoreError>;
}

/// Free-text completion service abstraction. Single result, no streaming.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request one completion for an assembled prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
