//! Sequenced application of reconciled mutations against the store.

use crate::error::LoreError;
use log::{info, warn};
use loresmith_store::{LoreEntry, LorebookStore};

/// Overwrite a book with the reconciled entry set. One replace call per
/// operation; the store has no partial update, so even a single-entry patch
/// travels as the whole book.
pub async fn replace_book(
    store: &dyn LorebookStore,
    book: &str,
    entries: &[LoreEntry],
) -> Result<(), LoreError> {
    warn!(
        "replacing book contents (book={book}, entries={})",
        entries.len()
    );
    store.replace_entries(book, entries).await?;
    Ok(())
}

/// Create generated entries one by one, in array order.
///
/// Creates are sequential and awaited; the first failure aborts the
/// remainder and reports how many entries were already created. Nothing is
/// rolled back.
pub async fn append_entries(
    store: &dyn LorebookStore,
    book: &str,
    entries: &[LoreEntry],
) -> Result<Vec<u32>, LoreError> {
    let mut created = Vec::with_capacity(entries.len());
    for entry in entries {
        match store.create_entry(book, entry).await {
            Ok(uid) => created.push(uid),
            Err(err) => {
                warn!(
                    "append aborted (book={book}, created={}, remaining={})",
                    created.len(),
                    entries.len() - created.len()
                );
                return Err(LoreError::AppendFailed {
                    created: created.len(),
                    source: err,
                });
            }
        }
    }
    info!("appended entries (book={book}, created={})", created.len());
    Ok(created)
}
