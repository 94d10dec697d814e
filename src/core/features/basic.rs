//! Basic count features.

use crate::table::ChatMessage;

/// Number of whitespace-delimited tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of characters (Unicode scalar values).
pub fn count_characters(text: &str) -> usize {
    text.chars().count()
}

pub fn num_words(message: &ChatMessage) -> f64 {
    count_words(&message.message) as f64
}

pub fn num_chars(message: &ChatMessage) -> f64 {
    count_characters(&message.message) as f64
}
