//! Prompt assembly for each reconciliation mode.
//!
//! Patch prompts are built in code; generation prompts come from external
//! template files with straight string-replace substitution. The two
//! templates use different token syntaxes (square brackets vs double
//! braces) and callers must match each file's exact tokens.

use crate::error::LoreError;
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Template filename for open-ended world generation.
pub const GENERATOR_TEMPLATE_FILE: &str = "world-generator.txt";
/// Template filename for narrative-design generation.
pub const DESIGNER_TEMPLATE_FILE: &str = "story-designer.txt";

const EMBEDDED_GENERATOR: &str = include_str!("../templates/world-generator.txt");
const EMBEDDED_DESIGNER: &str = include_str!("../templates/story-designer.txt");

const PATCH_HEADER: &str = "\
You are a lorebook JSON data engineer.
Core rules:
1. Output absolutely no explanations, comments, or conversation.
2. Your output must be a single clean, complete, well-formed JSON object or array.
3. Wrap your output in a ```json ... ``` code block.
4. Escape newlines inside JSON string values as \\n.
5. Never modify any entry's `uid` or `type` fields. Only data fields such as `comment`, `content`, and `key` may change.";

/// Prompt templates with optional per-file overrides from a directory.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    overrides: Option<PathBuf>,
}

impl PromptSet {
    /// Create a prompt set; files present in `overrides` shadow the embedded
    /// templates one by one.
    pub fn new(overrides: Option<PathBuf>) -> Self {
        Self { overrides }
    }

    /// Prompt for patching a single entry, with the whole book as context.
    pub fn entry_patch_prompt(
        &self,
        book_json: &str,
        target_json: &str,
        instruction: &str,
    ) -> String {
        format!(
            "{PATCH_HEADER}\n\n\
**Task:** modify the \"entry to modify\" JSON object below according to the user request.\n\n\
**Full book contents (context only, do not output this):**\n\
```json\n{book_json}\n```\n\n\
**Entry to modify:**\n\
```json\n{target_json}\n```\n\n\
**User request:**\n\
\"{instruction}\"\n\n\
**Your output (a single JSON object wrapped in ```json ... ```):**"
        )
    }

    /// Prompt for rewriting the whole book.
    pub fn book_patch_prompt(&self, book_json: &str, instruction: &str) -> String {
        format!(
            "{PATCH_HEADER}\n\n\
**Task:** modify the \"full book contents\" JSON array below according to the user request.\n\n\
**Full book contents:**\n\
```json\n{book_json}\n```\n\n\
**User request:**\n\
\"{instruction}\"\n\n\
**Your output (a single JSON array wrapped in ```json ... ```):**"
        )
    }

    /// Prompt for open-ended world generation (bracket tokens).
    pub fn generator_prompt(
        &self,
        book_json: &str,
        instruction: &str,
    ) -> Result<String, LoreError> {
        let template = self.template(GENERATOR_TEMPLATE_FILE, EMBEDDED_GENERATOR)?;
        Ok(template
            .replacen("[CURRENT_WORLD_BOOK_CONTENT]", book_json, 1)
            .replacen("[USER_REQUEST]", instruction, 1))
    }

    /// Prompt for narrative-design generation (double-brace tokens).
    pub fn designer_prompt(&self, book_json: &str, instruction: &str) -> Result<String, LoreError> {
        let template = self.template(DESIGNER_TEMPLATE_FILE, EMBEDDED_DESIGNER)?;
        Ok(template
            .replacen("{{world_book_entries}}", book_json, 1)
            .replacen("{{user_request}}", instruction, 1))
    }

    fn template(&self, file: &str, embedded: &'static str) -> Result<String, LoreError> {
        if let Some(dir) = &self.overrides {
            let path = dir.join(file);
            if path.is_file() {
                debug!("using template override {}", path.display());
                return fs::read_to_string(&path)
                    .map_err(|err| LoreError::Template(format!("{}: {err}", path.display())));
            }
        }
        Ok(embedded.to_string())
    }
}
