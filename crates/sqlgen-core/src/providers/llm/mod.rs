use crate::model::GenerationParams;
use async_trait::async_trait;

pub mod http;

pub use http::HttpModelClient;

/// Input budget for the model collaborator, approximated in characters so
/// tokenizer internals stay out of this crate.
pub const MAX_PROMPT_CHARS: usize = 8192;

/// The model inference collaborator: consumes a single prompt string and
/// returns a continuation text. One loaded model instance is assumed; the
/// orchestrator serializes calls.
#[async_trait]
pub trait SqlModel: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String>;
    fn model_name(&self) -> &str;
}

/// Truncate an over-budget prompt from the front. The question and the
/// SELECT opener sit at the end of every prompt, so the tail must survive.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> &str {
    if prompt.len() <= max_chars {
        return prompt;
    }
    let mut start = prompt.len() - max_chars;
    while !prompt.is_char_boundary(start) {
        start += 1;
    }
    &prompt[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompt_untouched() {
        assert_eq!(truncate_prompt("SELECT", 100), "SELECT");
    }

    #[test]
    fn long_prompt_keeps_tail() {
        let prompt = format!("{}-- Question: q\nSELECT", "x".repeat(500));
        let out = truncate_prompt(&prompt, 40);
        assert_eq!(out.len(), 40);
        assert!(out.ends_with("-- Question: q\nSELECT"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let prompt = format!("{}é fin", "é".repeat(100));
        let out = truncate_prompt(&prompt, 7);
        assert!(out.len() <= 7);
        assert!(out.ends_with(" fin"));
    }
}
