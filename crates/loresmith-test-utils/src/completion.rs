use async_trait::async_trait;
use loresmith_store::{CompletionError, CompletionProvider, CompletionRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// Completion provider that always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedCompletion {
    response: String,
}

impl FixedCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for FixedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Ok(self.response.clone())
    }
}

/// Completion provider that records every request it sees.
#[derive(Debug, Clone)]
pub struct RecordingCompletion {
    response: String,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl RecordingCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Prompt of the most recent request, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.requests.lock().last().map(|req| req.prompt.clone())
    }

    /// Token budget of the most recent request, if any.
    pub fn last_max_tokens(&self) -> Option<u32> {
        self.requests.lock().last().map(|req| req.max_tokens)
    }
}

#[async_trait]
impl CompletionProvider for RecordingCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().push(request.clone());
        Ok(self.response.clone())
    }
}

/// Completion provider that answers each call with the next scripted text.
///
/// Calls past the end of the script fail.
#[derive(Debug, Clone)]
pub struct ScriptedCompletion {
    responses: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<String>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.responses
            .lock()
            .pop()
            .ok_or_else(|| CompletionError::Api {
                status: 500,
                message: "script exhausted".to_string(),
            })
    }
}

/// Completion provider that parks each call until the test releases it.
///
/// Lets a test hold an operation in flight and observe concurrent behavior.
#[derive(Debug, Clone)]
pub struct GatedCompletion {
    response: String,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    /// Wait until a completion call is parked inside the provider.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked completion call return.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl CompletionProvider for GatedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.response.clone())
    }
}

/// Completion provider that always fails.
#[derive(Debug, Clone)]
pub struct FailingCompletion {
    message: String,
}

impl FailingCompletion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Api {
            status: 503,
            message: self.message.clone(),
        })
    }
}
