//! Conversation-level feature calculation.
//!
//! One output row per conversation, in first-appearance order. Columns are the
//! registry's aggregations of every chat-level feature followed by the
//! conversation-specific features, optionally followed by merged-back metadata.

use crate::core::chat_level::ChatLevelTable;
use crate::core::features::{Aggregation, FeatureRegistry};
use crate::core::grouping::{ConversationGroup, ConversationIndex};
use crate::core::preprocess::CONVERSATION_NUM;
use crate::error::FeaturizeError;
use crate::report::SharedRunLog;
use crate::table::{format_value, FeatureColumn, RawTable};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Suffix for computed columns whose name clashes with a metadata column.
const COMPUTED_SUFFIX: &str = "_x";
/// Suffix for metadata columns whose name clashes with a computed column.
const ORIGINAL_SUFFIX: &str = "_y";

/// One row per conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationLevelTable {
    /// Conversation keys in first-appearance order
    pub conversation_nums: Vec<String>,
    /// Aggregates then conversation-specific features
    pub features: Vec<FeatureColumn>,
    /// Merged-back metadata column names
    pub metadata_headers: Vec<String>,
    /// Metadata values, one row per conversation (empty until merged)
    pub metadata_rows: Vec<Vec<String>>,
}

impl ConversationLevelTable {
    pub fn len(&self) -> usize {
        self.conversation_nums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation_nums.is_empty()
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureColumn> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Attach metadata columns. `rows` must be aligned with `conversation_nums`.
    pub fn attach_metadata(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>) {
        debug_assert_eq!(rows.len(), self.len());
        self.metadata_headers = headers;
        self.metadata_rows = rows;
    }

    /// Column names of the rendered table, with collisions suffixed.
    pub fn column_names(&self) -> Vec<String> {
        let computed: HashSet<&str> = std::iter::once(CONVERSATION_NUM)
            .chain(self.features.iter().map(|f| f.name.as_str()))
            .collect();
        let original: HashSet<&str> = self.metadata_headers.iter().map(String::as_str).collect();

        let mut names = vec![CONVERSATION_NUM.to_string()];
        for feature in &self.features {
            if original.contains(feature.name.as_str()) {
                names.push(format!("{}{COMPUTED_SUFFIX}", feature.name));
            } else {
                names.push(feature.name.clone());
            }
        }
        for header in &self.metadata_headers {
            if computed.contains(header.as_str()) {
                names.push(format!("{header}{ORIGINAL_SUFFIX}"));
            } else {
                names.push(header.clone());
            }
        }
        names
    }

    /// Render the full table for output.
    pub fn to_raw_table(&self) -> RawTable {
        let rows = self
            .conversation_nums
            .iter()
            .enumerate()
            .map(|(i, conversation_num)| {
                let width = 1 + self.features.len() + self.metadata_headers.len();
                let mut row = Vec::with_capacity(width);
                row.push(conversation_num.clone());
                row.extend(self.features.iter().map(|f| format_value(f.values[i])));
                match self.metadata_rows.get(i) {
                    Some(metadata) => row.extend(metadata.iter().cloned()),
                    None => row.extend(self.metadata_headers.iter().map(|_| String::new())),
                }
                row
            })
            .collect();

        RawTable {
            headers: self.column_names(),
            rows,
        }
    }
}

/// Applies the conversation-level part of a [`FeatureRegistry`].
pub struct ConversationLevelFeaturesCalculator<'a> {
    registry: &'a FeatureRegistry,
    parallel: bool,
    log: Option<SharedRunLog>,
}

impl<'a> ConversationLevelFeaturesCalculator<'a> {
    pub fn new(registry: &'a FeatureRegistry) -> Self {
        Self {
            registry,
            parallel: true,
            log: None,
        }
    }

    /// Enable or disable parallel computation across conversations.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_log(mut self, log: SharedRunLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Aggregate chat-level features and compute conversation features.
    pub fn calculate_conversation_level_features(
        &self,
        chats: &ChatLevelTable,
        index: &ConversationIndex,
    ) -> Result<ConversationLevelTable, FeaturizeError> {
        let plan = self.aggregation_plan(chats)?;

        let mut names: Vec<String> = plan
            .iter()
            .map(|(column, aggregation)| aggregation.column_name(&chats.features[*column].name))
            .collect();
        names.extend(self.registry.conversation.iter().map(|f| f.name.to_string()));

        let compute = |group: &ConversationGroup| self.compute_row(group, chats, &plan);
        let rows: Vec<Vec<f64>> = if self.parallel {
            index.groups().par_iter().map(compute).collect()
        } else {
            index.groups().iter().map(compute).collect()
        };

        let mut features: Vec<FeatureColumn> = names
            .into_iter()
            .map(|name| FeatureColumn::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            for (column, value) in features.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        for column in &features {
            if let Some(row) = column.values.iter().position(|v| !v.is_finite()) {
                return Err(FeaturizeError::FeatureContract {
                    feature: column.name.clone(),
                    row,
                });
            }
        }

        debug!(
            conversations = index.len(),
            columns = features.len(),
            "conversation-level features computed"
        );

        Ok(ConversationLevelTable {
            conversation_nums: index
                .conversation_nums()
                .into_iter()
                .map(str::to_string)
                .collect(),
            features,
            metadata_headers: Vec::new(),
            metadata_rows: Vec::new(),
        })
    }

    /// Resolve every (chat column, aggregation) pair the registry declares.
    fn aggregation_plan(
        &self,
        chats: &ChatLevelTable,
    ) -> Result<Vec<(usize, Aggregation)>, FeaturizeError> {
        let declared = self
            .registry
            .chat
            .iter()
            .map(|f| (f.name.as_str(), f.aggregations))
            .chain(
                self.registry
                    .contextual
                    .iter()
                    .map(|f| (f.name, f.aggregations)),
            );

        let mut plan = Vec::new();
        for (name, aggregations) in declared {
            let column = chats
                .features
                .iter()
                .position(|f| f.name == name)
                .ok_or_else(|| FeaturizeError::FeatureContract {
                    feature: name.to_string(),
                    row: 0,
                })?;
            plan.extend(aggregations.iter().map(|a| (column, *a)));
        }
        Ok(plan)
    }

    fn compute_row(
        &self,
        group: &ConversationGroup,
        chats: &ChatLevelTable,
        plan: &[(usize, Aggregation)],
    ) -> Vec<f64> {
        let mut values: Vec<f64> = plan
            .iter()
            .map(|(column, aggregation)| {
                aggregation.apply(&group.select(&chats.features[*column].values))
            })
            .collect();

        let messages = group.messages(&chats.messages);
        values.extend(self.registry.conversation.iter().map(|f| (f.compute)(&messages)));

        if let Some(log) = &self.log {
            log.record_conversation(values.len() as u64);
        }
        values
    }
}
