//! Batteries-included entry point for embedding loresmith.
//!
//! Pulls the config, store, and reconciliation crates together under one
//! dependency so an embedder can build a pipeline without naming each
//! member crate.

pub use loresmith_config as config;
pub use loresmith_core as core;
pub use loresmith_store as store;

/// Wire up env_logger when the `logging` feature is on; otherwise a no-op.
///
/// Call once at startup. Embedders that manage their own `log` backend
/// should leave the feature off and skip this.
#[inline]
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
