//! Mode controller: strategy selection, precondition gating, and the
//! end-to-end reconciliation flow.
//!
//! One `submit` drives a single operation through its phases. The only
//! suspension points are the two network calls (completion, store write);
//! there are no retries, no timeouts, and no cancellation. A pipeline
//! rejects re-entrant submission while a phase is active, but imposes no
//! cross-pipeline lock: independent operations each capture their own
//! snapshot and the last completed write wins.

use crate::apply;
use crate::defaults::apply_defaults;
use crate::error::LoreError;
use crate::extract::extract_json;
use crate::prompt::PromptSet;
use crate::reconcile::{decode_book, decode_element, merge_entry, validate_shape};
use log::{debug, error, info};
use loresmith_config::LoresmithConfig;
use loresmith_store::{CompletionProvider, CompletionRequest, LoreEntry, LorebookStore};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Which reconciliation strategy governs a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Patch one entry; protected fields are restored after the merge.
    EntryPatch,
    /// Replace the whole book with the model's array, verbatim.
    BookPatch,
    /// Append newly generated entries (open-ended worldbuilding).
    WorldGenerator,
    /// Append newly generated entries (narrative design).
    StoryDesigner,
}

/// Expected JSON container for a mode's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Object,
    Array,
}

impl PayloadShape {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadShape::Object => "object",
            PayloadShape::Array => "array",
        }
    }
}

impl ReconcileMode {
    /// Container shape the validator requires for this mode.
    pub fn expected_shape(self) -> PayloadShape {
        match self {
            ReconcileMode::EntryPatch => PayloadShape::Object,
            ReconcileMode::BookPatch
            | ReconcileMode::WorldGenerator
            | ReconcileMode::StoryDesigner => PayloadShape::Array,
        }
    }

    /// Whether this mode creates new entries instead of replacing the book.
    pub fn is_append(self) -> bool {
        matches!(self, ReconcileMode::WorldGenerator | ReconcileMode::StoryDesigner)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileMode::EntryPatch => "entry-patch",
            ReconcileMode::BookPatch => "book-patch",
            ReconcileMode::WorldGenerator => "world-generator",
            ReconcileMode::StoryDesigner => "story-designer",
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of one pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    AwaitingCompletion,
    Reconciling,
    Applying,
    Done,
    Failed,
}

impl PipelinePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::AwaitingCompletion => "awaiting-completion",
            PipelinePhase::Reconciling => "reconciling",
            PipelinePhase::Applying => "applying",
            PipelinePhase::Done => "done",
            PipelinePhase::Failed => "failed",
        }
    }

    fn is_active(self) -> bool {
        matches!(
            self,
            PipelinePhase::AwaitingCompletion | PipelinePhase::Reconciling | PipelinePhase::Applying
        )
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied parameters for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitParams {
    pub mode: ReconcileMode,
    /// Book file identifier to reconcile against.
    pub book: String,
    /// Target entry uid; required by entry-patch mode only.
    pub target_uid: Option<u32>,
    /// Free-text user instruction embedded in the prompt.
    pub instruction: String,
}

/// Immutable request value carried through one operation.
///
/// Captures the book snapshot at request time; there is no shared mutable
/// session state between operations.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub mode: ReconcileMode,
    pub book: String,
    pub target_uid: Option<u32>,
    pub instruction: String,
    pub snapshot: Vec<LoreEntry>,
}

/// What a successful operation changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedChange {
    /// The book was replaced with this many entries.
    Replaced { entries: usize },
    /// New entries were created with these store-assigned uids.
    Created { uids: Vec<u32> },
}

/// Successful operation report.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub mode: ReconcileMode,
    pub book: String,
    pub change: AppliedChange,
    /// Raw completion text, retained for inspection.
    pub raw_response: String,
    /// The JSON fragment that was recovered and applied.
    pub extracted: String,
}

/// Failed operation report.
///
/// The raw model output and best-effort extracted fragment are retained so
/// ambiguous extraction failures stay debuggable; partially applied appends
/// report a count and are not rolled back.
#[derive(Debug)]
pub struct ReconcileFailure {
    /// Phase the operation was in when it failed.
    pub phase: PipelinePhase,
    pub error: LoreError,
    pub raw_response: Option<String>,
    pub extracted: Option<String>,
    /// Entries created before an append aborted.
    pub created: usize,
}

impl ReconcileFailure {
    fn new(
        phase: PipelinePhase,
        error: LoreError,
        raw_response: Option<String>,
        extracted: Option<String>,
    ) -> Self {
        let created = match &error {
            LoreError::AppendFailed { created, .. } => *created,
            _ => 0,
        };
        Self {
            phase,
            error,
            raw_response,
            extracted,
            created,
        }
    }

    fn bare(phase: PipelinePhase, error: LoreError) -> Self {
        Self::new(phase, error, None, None)
    }
}

impl fmt::Display for ReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reconciliation failed during {}: {}", self.phase, self.error)
    }
}

impl std::error::Error for ReconcileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Mode controller driving reconciliation operations end to end.
pub struct LorePipeline {
    store: Arc<dyn LorebookStore>,
    completion: Arc<dyn CompletionProvider>,
    prompts: PromptSet,
    patch_max_tokens: u32,
    generate_max_tokens: u32,
    phase: Mutex<PipelinePhase>,
}

impl LorePipeline {
    /// Build a pipeline over the given services, configured from `config`.
    pub fn new(
        store: Arc<dyn LorebookStore>,
        completion: Arc<dyn CompletionProvider>,
        config: &LoresmithConfig,
    ) -> Self {
        Self {
            store,
            completion,
            prompts: PromptSet::new(config.prompts.dir.clone()),
            patch_max_tokens: config.completion.patch_max_tokens,
            generate_max_tokens: config.completion.generate_max_tokens,
            phase: Mutex::new(PipelinePhase::Idle),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> PipelinePhase {
        *self.phase.lock()
    }

    /// Run one reconciliation operation end to end.
    pub async fn submit(&self, params: SubmitParams) -> Result<ReconcileReport, ReconcileFailure> {
        self.begin(&params)?;
        match self.run(params).await {
            Ok(report) => {
                self.set_phase(PipelinePhase::Done);
                info!(
                    "reconciliation done (mode={}, book={})",
                    report.mode, report.book
                );
                Ok(report)
            }
            Err(failure) => {
                self.set_phase(PipelinePhase::Failed);
                error!("{failure}");
                Err(failure)
            }
        }
    }

    /// Replace one entry's content without involving the model.
    pub async fn set_entry_content(
        &self,
        book: &str,
        uid: u32,
        content: &str,
    ) -> Result<usize, LoreError> {
        let mut entries = self.store.entries(book).await?;
        let Some(entry) = entries.iter_mut().find(|entry| entry.uid == Some(uid)) else {
            return Err(LoreError::TargetNotFound(uid));
        };
        entry.content = content.to_string();
        apply::replace_book(self.store.as_ref(), book, &entries).await?;
        Ok(entries.len())
    }

    /// Gate preconditions and claim the pipeline for one operation.
    fn begin(&self, params: &SubmitParams) -> Result<(), ReconcileFailure> {
        let mut phase = self.phase.lock();
        if phase.is_active() {
            return Err(ReconcileFailure::bare(*phase, LoreError::Busy));
        }
        if let Err(error) = check_preconditions(params) {
            *phase = PipelinePhase::Idle;
            return Err(ReconcileFailure::bare(PipelinePhase::Idle, error));
        }
        *phase = PipelinePhase::AwaitingCompletion;
        debug!(
            "submitted (mode={}, book={}, target_uid={:?})",
            params.mode, params.book, params.target_uid
        );
        Ok(())
    }

    fn set_phase(&self, next: PipelinePhase) {
        let mut phase = self.phase.lock();
        debug!("phase {} -> {next}", *phase);
        *phase = next;
    }

    async fn run(&self, params: SubmitParams) -> Result<ReconcileReport, ReconcileFailure> {
        let awaiting = PipelinePhase::AwaitingCompletion;

        // Snapshot the book; the request value is immutable from here on.
        let snapshot = self
            .store
            .entries(&params.book)
            .await
            .map_err(|err| ReconcileFailure::bare(awaiting, err.into()))?;
        let request = ReconcileRequest {
            mode: params.mode,
            book: params.book,
            target_uid: params.target_uid,
            instruction: params.instruction,
            snapshot,
        };

        let book_json = serde_json::to_string_pretty(&request.snapshot)
            .map_err(|err| ReconcileFailure::bare(awaiting, err.into()))?;

        // Entry-patch resolves its target before spending tokens.
        let target_index = match request.mode {
            ReconcileMode::EntryPatch => {
                let uid = request.target_uid.unwrap_or_default();
                let index = request
                    .snapshot
                    .iter()
                    .position(|entry| entry.uid == Some(uid))
                    .ok_or_else(|| {
                        ReconcileFailure::bare(awaiting, LoreError::TargetNotFound(uid))
                    })?;
                Some(index)
            }
            _ => None,
        };

        let prompt = match request.mode {
            ReconcileMode::EntryPatch => {
                let index = target_index.unwrap_or_default();
                let target_json = serde_json::to_string_pretty(&request.snapshot[index])
                    .map_err(|err| ReconcileFailure::bare(awaiting, err.into()))?;
                self.prompts
                    .entry_patch_prompt(&book_json, &target_json, &request.instruction)
            }
            ReconcileMode::BookPatch => {
                self.prompts.book_patch_prompt(&book_json, &request.instruction)
            }
            ReconcileMode::WorldGenerator => self
                .prompts
                .generator_prompt(&book_json, &request.instruction)
                .map_err(|err| ReconcileFailure::bare(awaiting, err))?,
            ReconcileMode::StoryDesigner => self
                .prompts
                .designer_prompt(&book_json, &request.instruction)
                .map_err(|err| ReconcileFailure::bare(awaiting, err))?,
        };

        let max_tokens = if request.mode.is_append() {
            self.generate_max_tokens
        } else {
            self.patch_max_tokens
        };
        let raw = self
            .completion
            .complete(&CompletionRequest { prompt, max_tokens })
            .await
            .map_err(|err| ReconcileFailure::bare(awaiting, err.into()))?;

        // Always proceed to reconciling, regardless of text quality.
        self.set_phase(PipelinePhase::Reconciling);
        let reconciling = PipelinePhase::Reconciling;

        let extracted = extract_json(&raw).ok_or_else(|| {
            ReconcileFailure::new(reconciling, LoreError::ExtractionEmpty, Some(raw.clone()), None)
        })?;
        let payload: serde_json::Value = serde_json::from_str(&extracted).map_err(|err| {
            ReconcileFailure::new(
                reconciling,
                err.into(),
                Some(raw.clone()),
                Some(extracted.clone()),
            )
        })?;
        validate_shape(request.mode, &payload).map_err(|err| {
            ReconcileFailure::new(
                reconciling,
                err,
                Some(raw.clone()),
                Some(extracted.clone()),
            )
        })?;

        let change = match request.mode {
            ReconcileMode::EntryPatch => {
                let index = target_index.unwrap_or_default();
                let patch = payload.as_object().cloned().unwrap_or_default();
                let merged = merge_entry(&request.snapshot[index], &patch).map_err(|err| {
                    ReconcileFailure::new(
                        reconciling,
                        LoreError::EntryDecode {
                            index,
                            message: err.to_string(),
                        },
                        Some(raw.clone()),
                        Some(extracted.clone()),
                    )
                })?;
                let mut entries = request.snapshot.clone();
                entries[index] = merged;
                self.set_phase(PipelinePhase::Applying);
                apply::replace_book(self.store.as_ref(), &request.book, &entries)
                    .await
                    .map_err(|err| {
                        ReconcileFailure::new(
                            PipelinePhase::Applying,
                            err,
                            Some(raw.clone()),
                            Some(extracted.clone()),
                        )
                    })?;
                AppliedChange::Replaced {
                    entries: entries.len(),
                }
            }
            ReconcileMode::BookPatch => {
                let elements = payload.as_array().cloned().unwrap_or_default();
                let entries = decode_book(&elements).map_err(|err| {
                    ReconcileFailure::new(
                        reconciling,
                        err,
                        Some(raw.clone()),
                        Some(extracted.clone()),
                    )
                })?;
                self.set_phase(PipelinePhase::Applying);
                apply::replace_book(self.store.as_ref(), &request.book, &entries)
                    .await
                    .map_err(|err| {
                        ReconcileFailure::new(
                            PipelinePhase::Applying,
                            err,
                            Some(raw.clone()),
                            Some(extracted.clone()),
                        )
                    })?;
                AppliedChange::Replaced {
                    entries: entries.len(),
                }
            }
            ReconcileMode::WorldGenerator | ReconcileMode::StoryDesigner => {
                let elements = payload.as_array().cloned().unwrap_or_default();
                let mut generated = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let mut entry = decode_element(index, element).map_err(|err| {
                        ReconcileFailure::new(
                            reconciling,
                            err,
                            Some(raw.clone()),
                            Some(extracted.clone()),
                        )
                    })?;
                    apply_defaults(&mut entry);
                    generated.push(entry);
                }
                self.set_phase(PipelinePhase::Applying);
                let uids = apply::append_entries(self.store.as_ref(), &request.book, &generated)
                    .await
                    .map_err(|err| {
                        ReconcileFailure::new(
                            PipelinePhase::Applying,
                            err,
                            Some(raw.clone()),
                            Some(extracted.clone()),
                        )
                    })?;
                AppliedChange::Created { uids }
            }
        };

        Ok(ReconcileReport {
            mode: request.mode,
            book: request.book,
            change,
            raw_response: raw,
            extracted,
        })
    }
}

/// Submit-time gating: a book is always required, entry-patch needs its
/// target, and every mode needs a non-empty instruction.
fn check_preconditions(params: &SubmitParams) -> Result<(), LoreError> {
    if params.book.trim().is_empty() {
        return Err(LoreError::Precondition("no book selected".to_string()));
    }
    if params.mode == ReconcileMode::EntryPatch && params.target_uid.is_none() {
        return Err(LoreError::Precondition(
            "entry-patch mode requires a target uid".to_string(),
        ));
    }
    if params.instruction.trim().is_empty() {
        return Err(LoreError::Precondition("instruction is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{PayloadShape, PipelinePhase, ReconcileMode, SubmitParams, check_preconditions};
    use crate::error::LoreError;
    use pretty_assertions::assert_eq;

    #[test]
    fn mode_shapes_match_strategies() {
        assert_eq!(ReconcileMode::EntryPatch.expected_shape(), PayloadShape::Object);
        assert_eq!(ReconcileMode::BookPatch.expected_shape(), PayloadShape::Array);
        assert_eq!(ReconcileMode::WorldGenerator.expected_shape(), PayloadShape::Array);
        assert_eq!(ReconcileMode::StoryDesigner.expected_shape(), PayloadShape::Array);
        assert!(!ReconcileMode::EntryPatch.is_append());
        assert!(!ReconcileMode::BookPatch.is_append());
        assert!(ReconcileMode::WorldGenerator.is_append());
        assert!(ReconcileMode::StoryDesigner.is_append());
    }

    #[test]
    fn preconditions_gate_each_mode() {
        let params = SubmitParams {
            mode: ReconcileMode::EntryPatch,
            book: "atlas".to_string(),
            target_uid: None,
            instruction: "darker".to_string(),
        };
        assert!(matches!(
            check_preconditions(&params),
            Err(LoreError::Precondition(_))
        ));

        let params = SubmitParams {
            mode: ReconcileMode::WorldGenerator,
            book: "atlas".to_string(),
            target_uid: None,
            instruction: "   ".to_string(),
        };
        assert!(matches!(
            check_preconditions(&params),
            Err(LoreError::Precondition(_))
        ));

        let params = SubmitParams {
            mode: ReconcileMode::BookPatch,
            book: String::new(),
            target_uid: None,
            instruction: "tidy up".to_string(),
        };
        assert!(matches!(
            check_preconditions(&params),
            Err(LoreError::Precondition(_))
        ));

        let params = SubmitParams {
            mode: ReconcileMode::StoryDesigner,
            book: "atlas".to_string(),
            target_uid: None,
            instruction: "a heist".to_string(),
        };
        assert!(check_preconditions(&params).is_ok());
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(PipelinePhase::AwaitingCompletion.as_str(), "awaiting-completion");
        assert_eq!(PipelinePhase::Reconciling.to_string(), "reconciling");
    }
}
