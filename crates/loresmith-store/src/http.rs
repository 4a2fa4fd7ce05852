//! HTTP implementations of the store and completion contracts.

use crate::error::{CompletionError, StoreError};
use crate::model::{BookInfo, BookSettings, LoreEntry};
use crate::remote::{CompletionProvider, CompletionRequest, LorebookStore};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Lorebook store backed by a JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpLorebookStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpLorebookStore {
    /// Create a client for the given base URL with an optional bearer token.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEntry {
    uid: u32,
}

#[derive(Debug, Serialize)]
struct DeleteEntriesBody<'a> {
    uids: &'a [u32],
}

#[async_trait]
impl LorebookStore for HttpLorebookStore {
    async fn list_books(&self) -> Result<Vec<BookInfo>, StoreError> {
        let request = self.authed(self.client.get(self.url("/api/lorebooks")));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn settings(&self) -> Result<BookSettings, StoreError> {
        let request = self.authed(self.client.get(self.url("/api/lorebooks/settings")));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn set_settings(&self, settings: &BookSettings) -> Result<(), StoreError> {
        let request = self
            .authed(self.client.put(self.url("/api/lorebooks/settings")))
            .json(settings);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn entries(&self, book: &str) -> Result<Vec<LoreEntry>, StoreError> {
        let request = self.authed(
            self.client
                .get(self.url(&format!("/api/lorebooks/{book}/entries"))),
        );
        let response = Self::check(request.send().await?).await?;
        let entries: Vec<LoreEntry> = response.json().await?;
        debug!("fetched entries (book={book}, count={})", entries.len());
        Ok(entries)
    }

    async fn replace_entries(&self, book: &str, entries: &[LoreEntry]) -> Result<(), StoreError> {
        debug!("replacing entries (book={book}, count={})", entries.len());
        let request = self
            .authed(
                self.client
                    .put(self.url(&format!("/api/lorebooks/{book}/entries"))),
            )
            .json(entries);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn create_entry(&self, book: &str, entry: &LoreEntry) -> Result<u32, StoreError> {
        let request = self
            .authed(
                self.client
                    .post(self.url(&format!("/api/lorebooks/{book}/entries"))),
            )
            .json(entry);
        let response = Self::check(request.send().await?).await?;
        let created: CreatedEntry = response.json().await?;
        debug!("created entry (book={book}, uid={})", created.uid);
        Ok(created.uid)
    }

    async fn delete_book(&self, book: &str) -> Result<(), StoreError> {
        let request = self.authed(self.client.delete(self.url(&format!("/api/lorebooks/{book}"))));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn delete_entries(&self, book: &str, uids: &[u32]) -> Result<(), StoreError> {
        let request = self
            .authed(
                self.client
                    .post(self.url(&format!("/api/lorebooks/{book}/entries/delete"))),
            )
            .json(&DeleteEntriesBody { uids });
        Self::check(request.send().await?).await?;
        Ok(())
    }
}

/// Completion client backed by a JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    text: String,
}

impl HttpCompletionClient {
    /// Create a client for the given base URL with an optional bearer token.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        debug!(
            "requesting completion (prompt_len={}, max_tokens={})",
            request.prompt.len(),
            request.max_tokens
        );
        let mut builder = self
            .client
            .post(format!("{}/api/completion", self.base_url))
            .json(&CompletionBody {
                prompt: &request.prompt,
                max_tokens: request.max_tokens,
            });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let reply: CompletionReply = response.json().await?;
        Ok(reply.text)
    }
}
