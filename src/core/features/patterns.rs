//! Features read from the punctuation-retaining text variant.

use crate::core::features::basic::count_words;
use crate::table::ChatMessage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Next-turn repair initiators: short clarification requests at the start of a turn.
static NTRI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:what\?+|sorry|excuse me|huh\??|who\?+|pardon\?+|say.*again\??|what'?s that|what is that)",
    )
    .unwrap()
});

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9 ]+").unwrap());

/// Number of question marks.
pub fn num_question_naive(message: &ChatMessage) -> f64 {
    message
        .message_lower_with_punc
        .chars()
        .filter(|&c| c == '?')
        .count() as f64
}

/// 1 when the message opens with a clarification request, else 0.
pub fn classify_ntri(message: &ChatMessage) -> f64 {
    if NTRI_REGEX.is_match(&message.message_lower_with_punc) {
        1.0
    } else {
        0.0
    }
}

/// Word type-to-token ratio: distinct words over total words.
pub fn word_ttr(message: &ChatMessage) -> f64 {
    let text = NON_WORD.replace_all(&message.message_lower_with_punc, "");
    let total = count_words(&text);
    if total == 0 {
        return 0.0;
    }
    let unique: HashSet<&str> = text.split_whitespace().collect();
    unique.len() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(punc: &str) -> ChatMessage {
        ChatMessage {
            conversation_num: "1".into(),
            speaker_nickname: "a".into(),
            message: crate::core::preprocess::preprocess_text(punc),
            message_lower_with_punc: punc.to_lowercase(),
        }
    }

    #[test]
    fn test_num_question_naive() {
        assert_eq!(num_question_naive(&msg("what?? really?")), 3.0);
        assert_eq!(num_question_naive(&msg("")), 0.0);
    }

    #[test]
    fn test_classify_ntri() {
        assert_eq!(classify_ntri(&msg("what?")), 1.0);
        assert_eq!(classify_ntri(&msg("Sorry, I missed that")), 1.0);
        assert_eq!(classify_ntri(&msg("can you say that again?")), 0.0);
        assert_eq!(classify_ntri(&msg("say that again?")), 1.0);
        assert_eq!(classify_ntri(&msg("what is that thing")), 1.0);
        assert_eq!(classify_ntri(&msg("i agree")), 0.0);
        assert_eq!(classify_ntri(&msg("")), 0.0);
    }

    #[test]
    fn test_word_ttr() {
        assert_eq!(word_ttr(&msg("the cat saw the dog")), 0.8);
        assert_eq!(word_ttr(&msg("!!!")), 0.0);
        assert_eq!(word_ttr(&msg("hello, hello")), 0.5);
    }
}
