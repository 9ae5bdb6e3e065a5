//! Sentence summarization seam.

pub mod chat;

use async_trait::async_trait;

use crate::error::Result;

pub use chat::ChatSummarizer;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Compress an ordered, non-empty word list into one sentence built only from those words.
    async fn summarize(&self, words: &[String]) -> Result<String>;
}

/// Instruction sent with every utterance.
pub fn build_prompt(words: &[String]) -> String {
    format!(
        "You are provided with a list of words generated by interpreting American Sign Language \
         (ASL) into English text. Your task is to summarize these words into a single, coherent \
         sentence. Please only use the words provided in the list and do not add any additional \
         information or context. The sentence should be simple, understandable, and concise.\n\n\
         Respond only with the sentence. Do not include any other words, explanations, or code.\n\n\
         Here is the list of words: {}",
        words.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_words_in_order() {
        let words = vec!["HELLO".to_string(), "MY".to_string(), "NAME".to_string()];
        let prompt = build_prompt(&words);
        assert!(prompt.ends_with("Here is the list of words: HELLO MY NAME"));
        assert!(prompt.contains("single, coherent"));
        assert!(prompt.contains("Respond only with the sentence"));
    }
}
