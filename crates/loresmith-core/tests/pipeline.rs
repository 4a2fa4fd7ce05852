//! End-to-end pipeline tests with an in-memory store and mock completions.

use loresmith_config::LoresmithConfig;
use loresmith_core::{
    AppliedChange, LoreError, LorePipeline, PipelinePhase, ReconcileMode, SubmitParams,
};
use loresmith_store::{CompletionProvider, EntryKind, LoreEntry, LorebookStore};
use loresmith_test_utils::{
    FailingCompletion, FixedCompletion, GatedCompletion, MemoryLorebookStore, RecordingCompletion,
    ScriptedCompletion,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn entry(uid: u32, kind: EntryKind, comment: &str, content: &str) -> LoreEntry {
    LoreEntry {
        uid: Some(uid),
        kind: Some(kind),
        comment: comment.to_string(),
        content: content.to_string(),
        ..LoreEntry::default()
    }
}

fn seeded_store() -> MemoryLorebookStore {
    MemoryLorebookStore::new().with_book(
        "atlas",
        vec![
            entry(1, EntryKind::Constant, "The Citadel", "A fortress of glass."),
            entry(2, EntryKind::Selective, "The Warrens", "Tunnels under the city."),
        ],
    )
}

fn pipeline(
    store: &MemoryLorebookStore,
    completion: impl CompletionProvider + 'static,
) -> LorePipeline {
    let store: Arc<dyn LorebookStore> = Arc::new(store.clone());
    LorePipeline::new(store, Arc::new(completion), &LoresmithConfig::default())
}

fn params(mode: ReconcileMode, target_uid: Option<u32>, instruction: &str) -> SubmitParams {
    SubmitParams {
        mode,
        book: "atlas".to_string(),
        target_uid,
        instruction: instruction.to_string(),
    }
}

/// An entry patch replaces the target's data fields but never its identity,
/// even when the model tries to rewrite `uid` and `type`.
#[tokio::test]
async fn entry_patch_keeps_protected_fields() {
    let store = seeded_store();
    let completion = FixedCompletion::new(
        "```json\n{\"uid\": 99, \"type\": \"vectorized\", \"comment\": \"The Shattered Citadel\", \
         \"content\": \"A ruin of glass.\"}\n```",
    );
    let pipeline = pipeline(&store, completion);

    let report = pipeline
        .submit(params(ReconcileMode::EntryPatch, Some(1), "make it a ruin"))
        .await
        .expect("submit");

    assert_eq!(report.change, AppliedChange::Replaced { entries: 2 });
    assert_eq!(pipeline.phase(), PipelinePhase::Done);

    let book = store.book("atlas");
    assert_eq!(book.len(), 2);
    assert_eq!(book[0].uid, Some(1));
    assert_eq!(book[0].kind, Some(EntryKind::Constant));
    assert_eq!(book[0].comment, "The Shattered Citadel");
    assert_eq!(book[0].content, "A ruin of glass.");
    // The sibling entry travels through the replace untouched.
    assert_eq!(book[1], entry(2, EntryKind::Selective, "The Warrens", "Tunnels under the city."));
}

/// A book patch replaces the whole book with the model's array, verbatim.
#[tokio::test]
async fn book_patch_replaces_whole_book() {
    let store = seeded_store();
    let completion = FixedCompletion::new(
        "```json\n[{\"uid\": 1, \"type\": \"constant\", \"comment\": \"The Citadel\", \
         \"content\": \"Rebuilt.\"}]\n```",
    );
    let pipeline = pipeline(&store, completion);

    let report = pipeline
        .submit(params(ReconcileMode::BookPatch, None, "drop the warrens"))
        .await
        .expect("submit");

    assert_eq!(report.change, AppliedChange::Replaced { entries: 1 });
    let book = store.book("atlas");
    assert_eq!(book.len(), 1);
    assert_eq!(book[0].content, "Rebuilt.");
}

/// Generation appends entries in array order, with store-assigned uids and
/// the defaulting table filled in.
#[tokio::test]
async fn generator_appends_in_order_with_defaults() {
    let store = seeded_store();
    let completion = FixedCompletion::new(
        "```json\n[\
         {\"comment\": \"A\", \"content\": \"first\", \"key\": [\"a\"]},\
         {\"comment\": \"B\", \"content\": \"second\", \"position\": \"At Depth\"},\
         {\"comment\": \"C\", \"content\": \"third\"}\
         ]\n```",
    );
    let pipeline = pipeline(&store, completion);

    let report = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "three regions"))
        .await
        .expect("submit");

    let AppliedChange::Created { uids } = report.change else {
        panic!("expected created uids");
    };
    assert_eq!(uids.len(), 3);
    assert!(uids[0] < uids[1] && uids[1] < uids[2]);

    let book = store.book("atlas");
    assert_eq!(book.len(), 5);
    let created = &book[2..];
    assert_eq!(
        created.iter().map(|e| e.comment.as_str()).collect::<Vec<_>>(),
        vec!["A", "B", "C"]
    );
    assert_eq!(created[0].uid, Some(uids[0]));
    // Model-provided fields win over defaults; absent fields are filled in.
    assert_eq!(created[0].fields["key"], json!(["a"]));
    assert_eq!(created[0].fields["probability"], json!(100));
    assert_eq!(created[0].fields["position"], json!(4));
    // Named positions are mapped to their store codes.
    assert_eq!(created[1].fields["position"], json!(2));
}

/// The first failed create aborts the append; earlier creates stay applied
/// and the failure reports how many landed.
#[tokio::test]
async fn aborted_append_reports_created_count() {
    let store = seeded_store().fail_create_at(2);
    let completion = FixedCompletion::new(
        "```json\n[{\"comment\": \"A\"}, {\"comment\": \"B\"}, {\"comment\": \"C\"}]\n```",
    );
    let pipeline = pipeline(&store, completion);

    let failure = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "three regions"))
        .await
        .expect_err("append should abort");

    assert_eq!(failure.phase, PipelinePhase::Applying);
    assert_eq!(failure.created, 1);
    assert!(matches!(failure.error, LoreError::AppendFailed { created: 1, .. }));
    assert_eq!(pipeline.phase(), PipelinePhase::Failed);

    let book = store.book("atlas");
    assert_eq!(book.len(), 3);
    assert_eq!(book[2].comment, "A");
}

/// Two generation runs assign non-overlapping uids; re-running a request is
/// a new append, not an upsert.
#[tokio::test]
async fn repeated_generation_creates_independent_entries() {
    let store = seeded_store();
    let completion = ScriptedCompletion::new(vec![
        "```json\n[{\"comment\": \"A\"}]\n```".to_string(),
        "```json\n[{\"comment\": \"A\"}]\n```".to_string(),
    ]);
    let pipeline = pipeline(&store, completion);

    let first = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "a region"))
        .await
        .expect("first submit");
    let second = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "a region"))
        .await
        .expect("second submit");

    let (AppliedChange::Created { uids: first }, AppliedChange::Created { uids: second }) =
        (first.change, second.change)
    else {
        panic!("expected created uids");
    };
    assert_ne!(first, second);
    assert_eq!(store.book("atlas").len(), 4);
}

/// Output with no recoverable JSON fails with the raw text retained.
#[tokio::test]
async fn empty_extraction_retains_raw_output() {
    let store = seeded_store();
    let completion = FixedCompletion::new("I cannot help with that request.");
    let pipeline = pipeline(&store, completion);

    let failure = pipeline
        .submit(params(ReconcileMode::BookPatch, None, "tidy up"))
        .await
        .expect_err("extraction should fail");

    assert_eq!(failure.phase, PipelinePhase::Reconciling);
    assert!(matches!(failure.error, LoreError::ExtractionEmpty));
    assert_eq!(
        failure.raw_response.as_deref(),
        Some("I cannot help with that request.")
    );
    assert_eq!(failure.extracted, None);
    // Nothing was written.
    assert_eq!(store.book("atlas").len(), 2);
}

/// Prose-wrapped JSON without a fence is still recovered and applied.
#[tokio::test]
async fn prose_wrapped_object_is_recovered() {
    let store = seeded_store();
    let completion = FixedCompletion::new(
        "Sure! Here is the updated entry: {\"comment\": \"The Citadel\", \
         \"content\": \"Gleaming.\"} Hope that helps.",
    );
    let pipeline = pipeline(&store, completion);

    let report = pipeline
        .submit(params(ReconcileMode::EntryPatch, Some(1), "polish it"))
        .await
        .expect("submit");

    assert_eq!(report.extracted, "{\"comment\": \"The Citadel\", \"content\": \"Gleaming.\"}");
    assert_eq!(store.book("atlas")[0].content, "Gleaming.");
}

/// A fragment that parses but has the wrong container shape for the mode
/// is rejected before anything is applied.
#[tokio::test]
async fn shape_mismatch_is_rejected() {
    let store = seeded_store();
    let completion = FixedCompletion::new("```json\n[{\"comment\": \"A\"}]\n```");
    let pipeline = pipeline(&store, completion);

    let failure = pipeline
        .submit(params(ReconcileMode::EntryPatch, Some(1), "patch it"))
        .await
        .expect_err("shape should mismatch");

    assert!(matches!(
        failure.error,
        LoreError::InvalidShape {
            mode: ReconcileMode::EntryPatch,
            expected: "object",
            found: "array",
        }
    ));
    assert_eq!(failure.extracted.as_deref(), Some("[{\"comment\": \"A\"}]"));
    assert_eq!(store.book("atlas")[0].content, "A fortress of glass.");
}

/// A fragment that is not valid JSON fails with both raw and extracted
/// text retained for inspection.
#[tokio::test]
async fn invalid_json_retains_extracted_fragment() {
    let store = seeded_store();
    let completion = FixedCompletion::new("```json\n{\"comment\": \"broken\"\n```");
    let pipeline = pipeline(&store, completion);

    let failure = pipeline
        .submit(params(ReconcileMode::EntryPatch, Some(1), "patch it"))
        .await
        .expect_err("parse should fail");

    assert!(matches!(failure.error, LoreError::Parse(_)));
    assert!(failure.raw_response.is_some());
    assert_eq!(failure.extracted.as_deref(), Some("{\"comment\": \"broken\""));
}

/// Patching a uid that is not in the book fails before any tokens are spent.
#[tokio::test]
async fn missing_target_fails_before_completion() {
    let store = seeded_store();
    let completion = RecordingCompletion::new("```json\n{}\n```");
    let requests = completion.requests.clone();
    let pipeline = pipeline(&store, completion);

    let failure = pipeline
        .submit(params(ReconcileMode::EntryPatch, Some(42), "patch it"))
        .await
        .expect_err("target should be missing");

    assert!(matches!(failure.error, LoreError::TargetNotFound(42)));
    assert_eq!(pipeline.phase(), PipelinePhase::Failed);
    assert!(requests.lock().is_empty());
}

/// While an operation is in flight, a second submit on the same pipeline
/// is rejected as busy; the first operation still runs to completion.
#[tokio::test]
async fn in_flight_operation_rejects_second_submit() {
    let store = seeded_store();
    let completion = GatedCompletion::new("```json\n[]\n```");
    let gate = completion.clone();
    let pipeline = Arc::new(pipeline(&store, completion));

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(
            async move { pipeline.submit(params(ReconcileMode::BookPatch, None, "tidy up")).await },
        )
    };
    gate.entered().await;
    assert_eq!(pipeline.phase(), PipelinePhase::AwaitingCompletion);

    let failure = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "more regions"))
        .await
        .expect_err("second submit while busy");
    assert!(matches!(failure.error, LoreError::Busy));
    assert_eq!(failure.phase, PipelinePhase::AwaitingCompletion);

    gate.release();
    let report = first.await.expect("join").expect("first submit");
    assert_eq!(report.change, AppliedChange::Replaced { entries: 0 });
    assert_eq!(pipeline.phase(), PipelinePhase::Done);
}

/// Preconditions reject bad submissions without starting an operation.
#[tokio::test]
async fn precondition_failures_leave_pipeline_idle() {
    let store = seeded_store();
    let pipeline = pipeline(&store, FixedCompletion::new("```json\n[]\n```"));

    let failure = pipeline
        .submit(params(ReconcileMode::EntryPatch, None, "patch it"))
        .await
        .expect_err("missing target uid");
    assert!(matches!(failure.error, LoreError::Precondition(_)));
    assert_eq!(pipeline.phase(), PipelinePhase::Idle);

    let failure = pipeline
        .submit(params(ReconcileMode::WorldGenerator, None, "   "))
        .await
        .expect_err("empty instruction");
    assert!(matches!(failure.error, LoreError::Precondition(_)));
    assert_eq!(pipeline.phase(), PipelinePhase::Idle);
}

/// Patch modes and generation modes use their own token budgets, and the
/// prompt carries the book snapshot plus the instruction.
#[tokio::test]
async fn token_budgets_follow_the_mode() {
    let store = seeded_store();
    let completion = RecordingCompletion::new("```json\n[]\n```");
    let recorder = completion.clone();
    let pipeline = pipeline(&store, completion);

    pipeline
        .submit(params(ReconcileMode::BookPatch, None, "tidy up"))
        .await
        .expect("book patch");
    assert_eq!(recorder.last_max_tokens(), Some(4096));
    let prompt = recorder.last_prompt().expect("prompt");
    assert!(prompt.contains("The Citadel"));
    assert!(prompt.contains("tidy up"));

    pipeline
        .submit(params(ReconcileMode::StoryDesigner, None, "a heist"))
        .await
        .expect("designer");
    assert_eq!(recorder.last_max_tokens(), Some(8192));
    let prompt = recorder.last_prompt().expect("prompt");
    assert!(prompt.contains("a heist"));
    assert!(!prompt.contains("{{user_request}}"));
}

/// A completion service failure surfaces as a remote error with the phase
/// it happened in.
#[tokio::test]
async fn completion_failure_is_a_remote_error() {
    let store = seeded_store();
    let pipeline = pipeline(&store, FailingCompletion::new("model overloaded"));

    let failure = pipeline
        .submit(params(ReconcileMode::BookPatch, None, "tidy up"))
        .await
        .expect_err("completion should fail");

    assert_eq!(failure.phase, PipelinePhase::AwaitingCompletion);
    assert!(matches!(failure.error, LoreError::Completion(_)));
    assert_eq!(pipeline.phase(), PipelinePhase::Failed);
}

/// Manual content edits bypass the model and replace the book directly.
#[tokio::test]
async fn manual_content_edit_replaces_entry() {
    let store = seeded_store();
    let pipeline = pipeline(&store, FixedCompletion::new("unused"));

    let count = pipeline
        .set_entry_content("atlas", 2, "Collapsed after the flood.")
        .await
        .expect("edit");
    assert_eq!(count, 2);
    assert_eq!(store.book("atlas")[1].content, "Collapsed after the flood.");

    let err = pipeline
        .set_entry_content("atlas", 42, "nope")
        .await
        .expect_err("missing uid");
    assert!(matches!(err, LoreError::TargetNotFound(42)));
}
