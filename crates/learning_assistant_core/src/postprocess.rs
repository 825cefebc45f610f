//! crates/learning_assistant_core/src/postprocess.rs
//!
//! Deterministic cleanup applied to generated text before it is stored.

use crate::domain::OutputMode;

/// Characters that end a sentence, including the full-width forms used in
/// Chinese output.
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Normalizes raw backend output.
///
/// The text is always trimmed. In `TruncationRepair` mode everything after the
/// last sentence terminator is dropped; text without any terminator is kept
/// as-is so the result is never emptier than the trimmed input.
pub fn normalize(raw: &str, mode: OutputMode) -> String {
    let trimmed = raw.trim();
    match mode {
        OutputMode::PassThrough => trimmed.to_string(),
        OutputMode::TruncationRepair => match trimmed.rfind(SENTENCE_TERMINATORS) {
            Some(idx) => {
                // `idx` is the byte offset of the terminator; keep it whole.
                let end = idx + trimmed[idx..].chars().next().map_or(1, char::len_utf8);
                trimmed[..end].to_string()
            }
            None => trimmed.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_drops_trailing_fragment() {
        assert_eq!(
            normalize(" Hello world. Incomplete frag", OutputMode::TruncationRepair),
            "Hello world."
        );
    }

    #[test]
    fn pass_through_only_trims() {
        assert_eq!(
            normalize("Well-formed paragraph.\n", OutputMode::PassThrough),
            "Well-formed paragraph."
        );
        assert_eq!(
            normalize("Ends without a stop", OutputMode::PassThrough),
            "Ends without a stop"
        );
    }

    #[test]
    fn text_without_terminator_is_kept() {
        assert_eq!(
            normalize("no terminator here", OutputMode::TruncationRepair),
            "no terminator here"
        );
    }

    #[test]
    fn repair_keeps_the_last_terminator_of_any_kind() {
        assert_eq!(
            normalize("Really? Yes! And then", OutputMode::TruncationRepair),
            "Really? Yes!"
        );
        assert_eq!(
            normalize("第一週：基礎。第二週：進", OutputMode::TruncationRepair),
            "第一週：基礎。"
        );
    }

    #[test]
    fn complete_text_is_unchanged_by_repair() {
        assert_eq!(
            normalize("Step 1. Step 2.", OutputMode::TruncationRepair),
            "Step 1. Step 2."
        );
    }
}
