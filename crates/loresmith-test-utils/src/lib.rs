//! Test helpers shared across Loresmith crates.

pub mod completion;
pub mod store;

pub use completion::{
    FailingCompletion, FixedCompletion, GatedCompletion, RecordingCompletion, ScriptedCompletion,
};
pub use store::MemoryLorebookStore;
