//! Information-exchange features.
//!
//! Info-exchange volume of a message is its word count minus its first-person
//! singular pronouns. Z-scores standardize that volume either across every message
//! of the input or within one conversation.

use crate::core::features::basic::count_words;
use crate::core::features::lexical::first_person_singular_count;
use crate::table::ChatMessage;
use statrs::statistics::Statistics;

/// Standard deviations below this are treated as zero variance.
const MIN_STD_DEV: f64 = 1e-12;

/// Words that carry content beyond self-reference.
pub fn info_exchange_wordcount(message: &ChatMessage) -> f64 {
    let words = count_words(&message.message);
    words.saturating_sub(first_person_singular_count(message)) as f64
}

/// Population z-scores of `values`.
///
/// Fewer than two values or zero variance yield all zeros.
pub fn zscores(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![0.0; values.len()];
    }

    let mean = Statistics::mean(values);
    let std_dev = Statistics::population_std_dev(values);
    if !std_dev.is_finite() || std_dev < MIN_STD_DEV {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std_dev).collect()
}

/// Direction of info exchange over a conversation.
///
/// Pearson correlation between message position and the within-conversation z-score:
/// positive when later messages carry more content. 0 for fewer than two messages or
/// constant volume.
pub fn zscore_trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let positions: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let z_positions = zscores(&positions);
    let z_values = zscores(values);

    let r = z_positions
        .iter()
        .zip(&z_values)
        .map(|(p, v)| p * v)
        .sum::<f64>()
        / n as f64;

    r.clamp(-1.0, 1.0)
}

/// Conversation-level trend of info-exchange volume.
pub fn info_exchange_zscore_trend(messages: &[&ChatMessage]) -> f64 {
    let volumes: Vec<f64> = messages.iter().map(|m| info_exchange_wordcount(m)).collect();
    zscore_trend(&volumes)
}
