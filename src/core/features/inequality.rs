//! Participation inequality across speakers.

use crate::core::features::basic::{count_characters, count_words};
use crate::table::ChatMessage;

/// Gini coefficient of a set of non-negative volumes.
///
/// Formula: `Σ_i Σ_j |x_i - x_j| / (2 n² μ)`
///
/// 0 means perfectly equal participation; with one active speaker among `n` the value
/// is `(n - 1) / n`. A single value, an empty slice or an all-zero slice gives 0.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return 0.0;
    }

    // Sorted form: Σ_i (2i - n - 1) x_(i), 1-based, over ascending values
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * (i + 1) as f64 - n as f64 - 1.0) * x)
        .sum();

    (weighted / (n as f64 * n as f64 * mean)).clamp(0.0, 1.0)
}

/// Sum `volume` per speaker, in first-appearance order of speakers.
pub fn speaker_totals<F>(messages: &[&ChatMessage], volume: F) -> Vec<f64>
where
    F: Fn(&ChatMessage) -> f64,
{
    let mut speakers: Vec<&str> = Vec::new();
    let mut totals: Vec<f64> = Vec::new();

    for message in messages {
        let value = volume(*message);
        match speakers
            .iter()
            .position(|s| *s == message.speaker_nickname)
        {
            Some(idx) => totals[idx] += value,
            None => {
                speakers.push(&message.speaker_nickname);
                totals.push(value);
            }
        }
    }

    totals
}

pub fn gini_num_words(messages: &[&ChatMessage]) -> f64 {
    gini_coefficient(&speaker_totals(messages, |m| count_words(&m.message) as f64))
}

pub fn gini_num_chars(messages: &[&ChatMessage]) -> f64 {
    gini_coefficient(&speaker_totals(messages, |m| {
        count_characters(&m.message) as f64
    }))
}

pub fn gini_num_messages(messages: &[&ChatMessage]) -> f64 {
    gini_coefficient(&speaker_totals(messages, |_| 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(speaker: &str, text: &str) -> ChatMessage {
        ChatMessage {
            conversation_num: "1".into(),
            speaker_nickname: speaker.into(),
            message: text.into(),
            message_lower_with_punc: text.into(),
        }
    }

    #[test]
    fn test_single_speaker_is_zero() {
        assert_eq!(gini_coefficient(&[42.0]), 0.0);
        assert_eq!(gini_coefficient(&[]), 0.0);
    }

    #[test]
    fn test_equal_volume_is_zero() {
        assert_eq!(gini_coefficient(&[5.0, 5.0]), 0.0);
        assert_eq!(gini_coefficient(&[3.0, 3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_all_zero_is_zero() {
        assert_eq!(gini_coefficient(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_maximal_inequality_approaches_one() {
        let mut values = vec![0.0; 99];
        values.push(100.0);
        let g = gini_coefficient(&values);
        assert!((g - 0.99).abs() < 1e-9);

        assert!((gini_coefficient(&[0.0, 10.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_matches_pairwise_definition() {
        let values = [1.0, 4.0, 9.0, 2.0];
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let pairwise: f64 = values
            .iter()
            .flat_map(|a| values.iter().map(move |b| (a - b).abs()))
            .sum();
        let expected = pairwise / (2.0 * n * n * mean);
        assert!((gini_coefficient(&values) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_order_invariant() {
        let a = gini_coefficient(&[1.0, 7.0, 3.0]);
        let b = gini_coefficient(&[7.0, 3.0, 1.0]);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_speaker_totals() {
        let messages = vec![
            msg("ann", "one two"),
            msg("bob", "three"),
            msg("ann", "four five six"),
        ];
        let refs: Vec<&ChatMessage> = messages.iter().collect();
        assert_eq!(speaker_totals(&refs, |m| count_words(&m.message) as f64), vec![5.0, 1.0]);
        assert!((gini_num_messages(&refs) - 0.5 * (1.0 / 3.0)).abs() < 1e-12);
    }
}
