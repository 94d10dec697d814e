//! End-to-end featurization of one chat transcript.
//!
//! [`FeatureBuilder`] walks a fixed sequence of [`Stage`]s. Any stage failure stops
//! the run; outputs are only replaced once both tables are written.

use crate::config::Config;
use crate::core::chat_level::{ChatLevelFeaturesCalculator, ChatLevelTable};
use crate::core::conversation_level::{
    ConversationLevelFeaturesCalculator, ConversationLevelTable,
};
use crate::core::features::FeatureRegistry;
use crate::core::grouping::ConversationIndex;
use crate::core::preprocess::{
    fill_missing, preprocess_chat_data, preprocess_conversation_columns, CONVERSATION_NUM,
    SPEAKER_NICKNAME,
};
use crate::error::FeaturizeError;
use crate::report::{create_shared_log, RunLog, SharedRunLog};
use crate::table::{read_table, write_tables_atomically, RawTable};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    Preprocess,
    DeriveConversationSkeleton,
    ComputeChatFeatures,
    ComputeConversationFeatures,
    MergeOriginalConversationColumns,
    Save,
    Done,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Preprocess => "preprocess",
            Stage::DeriveConversationSkeleton => "derive_conversation_skeleton",
            Stage::ComputeChatFeatures => "compute_chat_features",
            Stage::ComputeConversationFeatures => "compute_conversation_features",
            Stage::MergeOriginalConversationColumns => "merge_original_conversation_columns",
            Stage::Save => "save",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Both output tables of a run.
#[derive(Debug, Clone)]
pub struct FeaturizedTables {
    pub chat: ChatLevelTable,
    pub conversation: ConversationLevelTable,
}

/// Orchestrates one featurization run.
pub struct FeatureBuilder {
    input_file_path: PathBuf,
    output_file_path_chat_level: PathBuf,
    output_file_path_conv_level: PathBuf,
    config: Config,
    registry: FeatureRegistry,
    log: SharedRunLog,
    stage: Stage,
}

impl FeatureBuilder {
    pub fn new(
        input_file_path: impl Into<PathBuf>,
        output_file_path_chat_level: impl Into<PathBuf>,
        output_file_path_conv_level: impl Into<PathBuf>,
        config: Config,
    ) -> Self {
        Self {
            input_file_path: input_file_path.into(),
            output_file_path_chat_level: output_file_path_chat_level.into(),
            output_file_path_conv_level: output_file_path_conv_level.into(),
            config,
            registry: FeatureRegistry::standard(),
            log: create_shared_log(),
            stage: Stage::Init,
        }
    }

    /// Replace the feature registry.
    pub fn with_registry(mut self, registry: FeatureRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Record into an existing run log.
    pub fn with_log(mut self, log: SharedRunLog) -> Self {
        self.log = log;
        self
    }

    /// Last stage entered.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn log(&self) -> &SharedRunLog {
        &self.log
    }

    /// Read the input, compute both tables and write them.
    pub fn featurize(&mut self) -> Result<FeaturizedTables, FeaturizeError> {
        info!(
            run_id = %self.log.run_id(),
            input = %self.input_file_path.display(),
            "starting featurization"
        );

        let raw = read_table(&self.input_file_path)?;
        let tables = self.featurize_table(raw)?;

        self.enter(Stage::Save);
        let chat = tables.chat.to_raw_table();
        let conversation = tables.conversation.to_raw_table();
        write_tables_atomically(&[
            (self.output_file_path_chat_level.as_path(), &chat),
            (self.output_file_path_conv_level.as_path(), &conversation),
        ])?;
        info!(
            chat_output = %self.output_file_path_chat_level.display(),
            conversation_output = %self.output_file_path_conv_level.display(),
            "outputs written"
        );

        self.enter(Stage::Done);
        Ok(tables)
    }

    /// Run every in-memory stage on an already loaded input table.
    pub fn featurize_table(&mut self, raw: RawTable) -> Result<FeaturizedTables, FeaturizeError> {
        let original = raw.clone();
        let parallel = self.config.parallel;

        self.enter(Stage::Preprocess);
        let chats = preprocess_chat_data(raw, &self.config.text_column)?;
        debug!(rows = chats.messages.len(), "preprocessed input");

        self.enter(Stage::DeriveConversationSkeleton);
        let index = ConversationIndex::build(&chats.messages);
        debug!(conversations = index.len(), "conversation skeleton derived");

        self.enter(Stage::ComputeChatFeatures);
        let chat = ChatLevelFeaturesCalculator::new(&self.registry)
            .with_parallel(parallel)
            .with_log(self.log.clone())
            .calculate_chat_level_features(chats, &index)?;

        self.enter(Stage::ComputeConversationFeatures);
        let mut conversation = ConversationLevelFeaturesCalculator::new(&self.registry)
            .with_parallel(parallel)
            .with_log(self.log.clone())
            .calculate_conversation_level_features(&chat, &index)?;

        self.enter(Stage::MergeOriginalConversationColumns);
        merge_original_conversation_columns(
            &mut conversation,
            original,
            &self.config.text_column,
            &self.log,
        );

        Ok(FeaturizedTables { chat, conversation })
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage, "stages only move forward");
        self.stage = stage;
        info!(stage = %stage, "entering stage");
    }
}

/// Left-join conversation metadata from the original input onto the conversation table.
///
/// Text and speaker columns are dropped; every other column is taken from the first row
/// of each conversation. Values that change within a conversation are reported.
pub fn merge_original_conversation_columns(
    conversation: &mut ConversationLevelTable,
    original: RawTable,
    text_column: &str,
    log: &RunLog,
) {
    let mut original = preprocess_conversation_columns(original);
    let Some(key_idx) = original.column_index(CONVERSATION_NUM) else {
        return;
    };
    original.map_column(key_idx, |v| fill_missing(v, "0"));
    original.drop_columns(&[SPEAKER_NICKNAME, text_column]);

    let Some(key_idx) = original.column_index(CONVERSATION_NUM) else {
        return;
    };
    let headers: Vec<String> = original
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut first_rows: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut reported: HashSet<(&str, usize)> = HashSet::new();
    for row in &original.rows {
        let key = row[key_idx].as_str();
        let values: Vec<&str> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_idx)
            .map(|(_, v)| v.as_str())
            .collect();

        match first_rows.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(values);
            }
            Entry::Occupied(first) => {
                for (column, (kept, seen)) in first.get().iter().zip(&values).enumerate() {
                    if kept != seen && reported.insert((key, column)) {
                        warn!(
                            column = %headers[column],
                            conversation_num = key,
                            "metadata value varies within conversation, keeping first"
                        );
                        log.record_non_invariant_value();
                    }
                }
            }
        }
    }

    let rows: Vec<Vec<String>> = conversation
        .conversation_nums
        .iter()
        .map(|key| match first_rows.get(key.as_str()) {
            Some(values) => values.iter().map(|v| v.to_string()).collect(),
            None => vec![String::new(); headers.len()],
        })
        .collect();

    log.record_metadata_columns(headers.len() as u64);
    debug!(columns = headers.len(), "merged original conversation columns");
    conversation.attach_metadata(headers, rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    fn builder() -> FeatureBuilder {
        FeatureBuilder::new("in.csv", "chat.csv", "conv.csv", Config::default())
    }

    const SAMPLE: &str = "conversation_num,speaker_nickname,message,condition,score\n\
                          A,ann,Hello there team,treatment,7\n\
                          A,bob,What? I missed that,treatment,7\n\
                          B,cat,ok,control,3\n\
                          A,ann,I think we should plan the next step carefully,treatment,7\n";

    #[test]
    fn test_featurize_table_walks_stages() {
        let mut builder = builder();
        assert_eq!(builder.stage(), Stage::Init);

        let tables = builder.featurize_table(parse_table(SAMPLE).unwrap()).unwrap();
        assert_eq!(builder.stage(), Stage::MergeOriginalConversationColumns);
        assert_eq!(tables.chat.len(), 4);
        assert_eq!(tables.conversation.len(), 2);
    }

    #[test]
    fn test_metadata_merged_back() {
        let mut builder = builder();
        let tables = builder.featurize_table(parse_table(SAMPLE).unwrap()).unwrap();
        let raw = tables.conversation.to_raw_table();

        assert_eq!(raw.column("condition").unwrap(), vec!["treatment", "control"]);
        assert_eq!(raw.column("score").unwrap(), vec!["7", "3"]);
        assert!(!raw.has_column("message"));
        assert!(!raw.has_column("speaker_nickname"));
        assert_eq!(builder.log().stats().metadata_columns_merged, 2);
    }

    #[test]
    fn test_non_invariant_metadata_keeps_first_value() {
        let csv = "conversation_num,speaker_nickname,message,score\n\
                   1,a,hi,5\n\
                   1,b,hello,6\n\
                   1,a,bye,7\n";
        let mut builder = builder();
        let tables = builder.featurize_table(parse_table(csv).unwrap()).unwrap();

        let raw = tables.conversation.to_raw_table();
        assert_eq!(raw.column("score").unwrap(), vec!["5"]);
        assert_eq!(builder.log().stats().non_invariant_values, 1);
    }

    #[test]
    fn test_missing_columns_stop_at_preprocess() {
        let mut builder = builder();
        let err = builder
            .featurize_table(parse_table("speaker_nickname,text\na,hi\n").unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            FeaturizeError::MissingColumns(ref missing)
                if missing == &["conversation_num", "message"]
        ));
        assert_eq!(builder.stage(), Stage::Preprocess);
    }

    #[test]
    fn test_batch_round_conversations() {
        let csv = "batch_num,round_num,speaker_nickname,message\n\
                   1,2,a,hi\n\
                   1,1,b,hey\n\
                   1,2,c,yo\n";
        let mut builder = builder();
        let tables = builder.featurize_table(parse_table(csv).unwrap()).unwrap();

        assert_eq!(tables.conversation.conversation_nums, vec!["1", "0"]);
        let raw = tables.conversation.to_raw_table();
        assert_eq!(raw.column("round_num").unwrap(), vec!["2", "1"]);
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = FeatureRegistry::standard();
        registry.contextual.clear();
        registry.conversation.truncate(2);
        let mut builder = builder().with_registry(registry);

        let tables = builder.featurize_table(parse_table(SAMPLE).unwrap()).unwrap();

        assert!(tables.chat.feature("info_exchange_zscore_chats").is_none());
        assert!(tables.conversation.feature("num_speakers").is_some());
        assert!(tables.conversation.feature("gini_coefficient_sum_num_words").is_none());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(
            Stage::MergeOriginalConversationColumns.to_string(),
            "merge_original_conversation_columns"
        );
        assert!(Stage::Preprocess < Stage::Save);
    }
}
