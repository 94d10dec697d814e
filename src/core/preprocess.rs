//! Text and column preprocessing.
//!
//! Produces the two text variants every feature reads from and guarantees the
//! grouping columns exist before any feature is computed.

use crate::error::FeaturizeError;
use crate::table::{ChatMessage, RawTable};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const CONVERSATION_NUM: &str = "conversation_num";
pub const SPEAKER_NICKNAME: &str = "speaker_nickname";
pub const MESSAGE_LOWER_WITH_PUNC: &str = "message_lower_with_punc";

const BATCH_NUM: &str = "batch_num";
const ROUND_NUM: &str = "round_num";

static NON_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").unwrap());

/// Output of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct PreprocessedChats {
    /// Input columns (cleaned names, normalized text column) plus `message_lower_with_punc`
    pub table: RawTable,
    /// Typed per-row records, in table order
    pub messages: Vec<ChatMessage>,
}

/// Lowercase the text, keeping punctuation.
pub fn preprocess_text_lowercase_but_retain_punctuation(text: &str) -> String {
    text.to_lowercase()
}

/// Fully normalize a message: lowercase, drop everything outside `[a-z0-9 ]`, collapse
/// whitespace. Applying it twice gives the same result as applying it once.
pub fn preprocess_text(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let stripped = NON_ALPHANUMERIC.replace_all(&spaced, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean column names and derive `conversation_num` from batch/round columns if needed.
pub fn preprocess_conversation_columns(mut table: RawTable) -> RawTable {
    for header in &mut table.headers {
        *header = NON_IDENTIFIER.replace_all(header, "").into_owned();
    }

    if !table.has_column(CONVERSATION_NUM)
        && table.has_column(BATCH_NUM)
        && table.has_column(ROUND_NUM)
    {
        let conversation_nums = number_batch_rounds(&table);
        table.insert_column(0, CONVERSATION_NUM, conversation_nums);
    }

    table
}

/// Assign a group number to every (batch, round) pair, in sorted key order.
fn number_batch_rounds(table: &RawTable) -> Vec<String> {
    let batches = table.column(BATCH_NUM).unwrap_or_default();
    let rounds = table.column(ROUND_NUM).unwrap_or_default();

    let keys: Vec<(&str, &str)> = batches.into_iter().zip(rounds).collect();
    let mut distinct: Vec<(&str, &str)> = keys
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    distinct.sort_by(|a, b| compare_keys(a.0, b.0).then_with(|| compare_keys(a.1, b.1)));

    keys.iter()
        .map(|key| {
            distinct
                .iter()
                .position(|d| d == key)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Numeric keys sort numerically, everything else lexicographically after them.
fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Fail fast if any grouping or text column is missing, naming all of them.
pub fn assert_key_columns_present(
    table: &RawTable,
    text_column: &str,
) -> Result<(), FeaturizeError> {
    let missing: Vec<String> = [CONVERSATION_NUM, SPEAKER_NICKNAME, text_column]
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FeaturizeError::MissingColumns(missing))
    }
}

/// Run the full preprocessing stage on a raw input table.
pub fn preprocess_chat_data(
    table: RawTable,
    text_column: &str,
) -> Result<PreprocessedChats, FeaturizeError> {
    let mut table = preprocess_conversation_columns(table);
    assert_key_columns_present(&table, text_column)?;

    let conv_idx = table.column_index(CONVERSATION_NUM).unwrap_or_default();
    let speaker_idx = table.column_index(SPEAKER_NICKNAME).unwrap_or_default();
    let text_idx = table.column_index(text_column).unwrap_or_default();

    table.map_column(conv_idx, |v| fill_missing(v, "0"));
    table.map_column(speaker_idx, |v| fill_missing(v, "0"));

    let with_punc: Vec<String> = table
        .rows
        .iter()
        .map(|r| preprocess_text_lowercase_but_retain_punctuation(&r[text_idx]))
        .collect();

    table.map_column(text_idx, preprocess_text);

    let messages = table
        .rows
        .iter()
        .zip(&with_punc)
        .map(|(row, punc)| ChatMessage {
            conversation_num: row[conv_idx].clone(),
            speaker_nickname: row[speaker_idx].clone(),
            message: row[text_idx].clone(),
            message_lower_with_punc: punc.clone(),
        })
        .collect();

    table.push_column(MESSAGE_LOWER_WITH_PUNC, with_punc);

    Ok(PreprocessedChats { table, messages })
}

pub(crate) fn fill_missing(value: &str, fill: &str) -> String {
    if value.trim().is_empty() {
        fill.to_string()
    } else {
        value.to_string()
    }
}
