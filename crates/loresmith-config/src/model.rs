//! Configuration schema for loresmith.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the loresmith SDK and CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoresmithConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub presets: PresetConfig,
}

impl LoresmithConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> LoresmithConfigBuilder {
        LoresmithConfigBuilder::new()
    }
}

/// Builder for assembling a `LoresmithConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct LoresmithConfigBuilder {
    config: LoresmithConfig,
}

impl LoresmithConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: LoresmithConfig::default(),
        }
    }

    /// Replace the store configuration.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Replace the completion configuration.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.config.completion = completion;
        self
    }

    /// Replace the prompt template configuration.
    pub fn prompts(mut self, prompts: PromptConfig) -> Self {
        self.config.prompts = prompts;
        self
    }

    /// Replace the preset storage configuration.
    pub fn presets(mut self, presets: PresetConfig) -> Self {
        self.config.presets = presets;
        self
    }

    /// Finalize and return the built `LoresmithConfig`.
    pub fn build(self) -> LoresmithConfig {
        self.config
    }
}

/// Remote store endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL for the lorebook store and completion service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

/// Token budgets per reconciliation strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Budget for patch-mode completions.
    #[serde(default = "default_patch_max_tokens")]
    pub patch_max_tokens: u32,
    /// Budget for generation-mode completions.
    #[serde(default = "default_generate_max_tokens")]
    pub generate_max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            patch_max_tokens: default_patch_max_tokens(),
            generate_max_tokens: default_generate_max_tokens(),
        }
    }
}

fn default_patch_max_tokens() -> u32 {
    4096
}

fn default_generate_max_tokens() -> u32 {
    8192
}

/// Prompt template overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptConfig {
    /// Directory holding template overrides; embedded templates otherwise.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Preset storage location.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PresetConfig {
    /// Path of the preset JSON file; a per-user default otherwise.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::LoresmithConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_applied() {
        let config = LoresmithConfig::default();
        assert_eq!(config.store.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.completion.patch_max_tokens, 4096);
        assert_eq!(config.completion.generate_max_tokens, 8192);
        assert_eq!(config.prompts.dir, None);
    }

    #[test]
    fn builder_overrides_sections() {
        let config = LoresmithConfig::builder()
            .completion(super::CompletionConfig {
                patch_max_tokens: 1024,
                generate_max_tokens: 2048,
            })
            .build();
        assert_eq!(config.completion.patch_max_tokens, 1024);
        assert_eq!(config.store.base_url, "http://127.0.0.1:8000");
    }
}
