use async_trait::async_trait;
use loresmith_store::{BookInfo, BookSettings, LoreEntry, LorebookStore, StoreError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct StoreState {
    books: BTreeMap<String, Vec<LoreEntry>>,
    settings: BookSettings,
    next_uid: u32,
    creates_seen: usize,
    fail_create_at: Option<usize>,
}

/// In-memory lorebook store for tests.
///
/// Assigns uids sequentially on create, like the real backend. A create
/// failure can be injected at the n-th call (1-based) to exercise partial
/// appends.
#[derive(Debug, Clone, Default)]
pub struct MemoryLorebookStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryLorebookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a book with entries, assigning uids to any entry without one.
    pub fn with_book(self, book: impl Into<String>, entries: Vec<LoreEntry>) -> Self {
        {
            let mut state = self.state.lock();
            let mut entries = entries;
            for entry in &mut entries {
                match entry.uid {
                    Some(uid) => state.next_uid = state.next_uid.max(uid + 1),
                    None => {
                        entry.uid = Some(state.next_uid);
                        state.next_uid += 1;
                    }
                }
            }
            state.books.insert(book.into(), entries);
        }
        self
    }

    /// Make the n-th create call (1-based) fail.
    pub fn fail_create_at(self, call: usize) -> Self {
        self.state.lock().fail_create_at = Some(call);
        self
    }

    /// Current entries of a book, for assertions.
    pub fn book(&self, book: &str) -> Vec<LoreEntry> {
        self.state.lock().books.get(book).cloned().unwrap_or_default()
    }

    /// Currently enabled book files, for assertions.
    pub fn enabled(&self) -> Vec<String> {
        self.state.lock().settings.enabled.clone()
    }

    fn missing(book: &str) -> StoreError {
        StoreError::Api {
            status: 404,
            message: format!("no such book: {book}"),
        }
    }
}

#[async_trait]
impl LorebookStore for MemoryLorebookStore {
    async fn list_books(&self) -> Result<Vec<BookInfo>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .books
            .keys()
            .map(|file_name| BookInfo {
                name: file_name.clone(),
                file_name: file_name.clone(),
            })
            .collect())
    }

    async fn settings(&self) -> Result<BookSettings, StoreError> {
        Ok(self.state.lock().settings.clone())
    }

    async fn set_settings(&self, settings: &BookSettings) -> Result<(), StoreError> {
        self.state.lock().settings = settings.clone();
        Ok(())
    }

    async fn entries(&self, book: &str) -> Result<Vec<LoreEntry>, StoreError> {
        let state = self.state.lock();
        state.books.get(book).cloned().ok_or_else(|| Self::missing(book))
    }

    async fn replace_entries(&self, book: &str, entries: &[LoreEntry]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.books.contains_key(book) {
            return Err(Self::missing(book));
        }
        state.books.insert(book.to_string(), entries.to_vec());
        Ok(())
    }

    async fn create_entry(&self, book: &str, entry: &LoreEntry) -> Result<u32, StoreError> {
        let mut state = self.state.lock();
        state.creates_seen += 1;
        if state.fail_create_at == Some(state.creates_seen) {
            return Err(StoreError::Api {
                status: 500,
                message: "injected create failure".to_string(),
            });
        }
        if !state.books.contains_key(book) {
            return Err(Self::missing(book));
        }
        let uid = state.next_uid;
        state.next_uid += 1;
        let mut stored = entry.clone();
        stored.uid = Some(uid);
        if let Some(entries) = state.books.get_mut(book) {
            entries.push(stored);
        }
        Ok(uid)
    }

    async fn delete_book(&self, book: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.books.remove(book).map(|_| ()).ok_or_else(|| Self::missing(book))
    }

    async fn delete_entries(&self, book: &str, uids: &[u32]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let Some(entries) = state.books.get_mut(book) else {
            return Err(Self::missing(book));
        };
        entries.retain(|entry| entry.uid.is_none_or(|uid| !uids.contains(&uid)));
        Ok(())
    }
}
