//! JSON fragment recovery from free-text model output.

use regex::Regex;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("static fence pattern"));

/// Recover a JSON candidate from noisy model output.
///
/// Preference order: the interior of a ```json fenced block, then the span
/// from the first `{` to the last `}`, then the first `[` to the last `]`.
/// Returns `None` when no candidate can be formed. This is a lossy heuristic
/// tuned for conversational wrapping around valid JSON, not for adversarial
/// input; the caller must treat `None` as a first-class outcome.
pub fn extract_json(raw: &str) -> Option<String> {
    if let Some(captures) = JSON_FENCE.captures(raw) {
        let interior = captures.get(1).map_or("", |m| m.as_str()).trim();
        if interior.is_empty() {
            return None;
        }
        return Some(interior.to_string());
    }
    slice_between(raw, '{', '}').or_else(|| slice_between(raw, '[', ']'))
}

/// Inclusive span between the first `open` and the last `close`.
fn slice_between(raw: &str, open: char, close: char) -> Option<String> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    Some(raw[start..=end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::extract_json;
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_block_wins_over_narration() {
        let raw = "Sure! Here is the result:\n```json\n{\"a\":1}\n```\nHope that helps.";
        assert_eq!(extract_json(raw), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn fence_interior_is_exact_across_lines() {
        let raw = "```json\n[\n  {\"uid\": 1},\n  {\"uid\": 2}\n]\n```";
        assert_eq!(
            extract_json(raw),
            Some("[\n  {\"uid\": 1},\n  {\"uid\": 2}\n]".to_string())
        );
    }

    #[test]
    fn brace_fallback_strips_surrounding_text() {
        let raw = "Here you go: {\"a\":1} thanks";
        assert_eq!(extract_json(raw), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn bracket_fallback_when_no_braces() {
        let raw = "blah [1,2,3] blah";
        assert_eq!(extract_json(raw), Some("[1,2,3]".to_string()));
    }

    #[test]
    fn braces_preferred_over_brackets() {
        let raw = "list [1,2] and object {\"a\":1}";
        assert_eq!(extract_json(raw), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn no_delimiters_yields_none() {
        assert_eq!(extract_json("I could not produce any output, sorry."), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn empty_fence_yields_none() {
        assert_eq!(extract_json("```json\n```"), None);
    }

    #[test]
    fn reversed_braces_fall_through_to_brackets() {
        assert_eq!(extract_json("} nope { but [2] works"), Some("[2]".to_string()));
    }
}
