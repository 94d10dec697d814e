//! Chat-level feature calculation.
//!
//! Two passes over the preprocessed messages:
//! 1. row-wise: every registered chat feature applied to every message record;
//! 2. contextual: conversation-relative features, computed per scope from the message
//!    records themselves (never from columns produced by pass 1).
//!
//! Either pass fails as a whole if any feature yields a non-finite value.

use crate::core::features::{ContextScope, ContextualChatFeature, FeatureRegistry};
use crate::core::grouping::{ConversationGroup, ConversationIndex};
use crate::core::preprocess::PreprocessedChats;
use crate::error::FeaturizeError;
use crate::report::SharedRunLog;
use crate::table::{ChatMessage, FeatureColumn, RawTable};
use rayon::prelude::*;
use tracing::debug;

/// Message table augmented with chat-level feature columns.
#[derive(Debug, Clone)]
pub struct ChatLevelTable {
    /// Preprocessed input columns, in input row order
    pub base: RawTable,
    /// Typed records for each row
    pub messages: Vec<ChatMessage>,
    /// Feature columns in registry order
    pub features: Vec<FeatureColumn>,
}

impl ChatLevelTable {
    /// Number of message rows.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a feature column by name.
    pub fn feature(&self, name: &str) -> Option<&FeatureColumn> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Render the full table for output.
    pub fn to_raw_table(&self) -> RawTable {
        let mut table = self.base.clone();
        for feature in &self.features {
            table.push_column(feature.name.clone(), feature.rendered());
        }
        table
    }
}

/// Applies the chat-level part of a [`FeatureRegistry`] to a message table.
pub struct ChatLevelFeaturesCalculator<'a> {
    registry: &'a FeatureRegistry,
    parallel: bool,
    log: Option<SharedRunLog>,
}

impl<'a> ChatLevelFeaturesCalculator<'a> {
    pub fn new(registry: &'a FeatureRegistry) -> Self {
        Self {
            registry,
            parallel: true,
            log: None,
        }
    }

    /// Enable or disable parallel computation across messages.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Record progress into a run log.
    pub fn with_log(mut self, log: SharedRunLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Compute every chat-level feature.
    pub fn calculate_chat_level_features(
        &self,
        chats: PreprocessedChats,
        index: &ConversationIndex,
    ) -> Result<ChatLevelTable, FeaturizeError> {
        let PreprocessedChats { table, messages } = chats;

        let mut features = self.row_wise_features(&messages)?;
        debug!(
            columns = features.len(),
            rows = messages.len(),
            "row-wise chat features computed"
        );

        for feature in &self.registry.contextual {
            features.push(self.contextual_feature(feature, &messages, index)?);
        }

        Ok(ChatLevelTable {
            base: table,
            messages,
            features,
        })
    }

    fn row_wise_features(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Vec<FeatureColumn>, FeaturizeError> {
        let rows: Vec<Vec<f64>> = if self.parallel {
            messages.par_iter().map(|m| self.compute_row(m)).collect()
        } else {
            messages.iter().map(|m| self.compute_row(m)).collect()
        };

        let mut columns: Vec<FeatureColumn> = self
            .registry
            .chat
            .iter()
            .map(|f| FeatureColumn::new(f.name.clone(), Vec::with_capacity(rows.len())))
            .collect();

        for row in rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        for column in &columns {
            ensure_finite(column)?;
        }

        Ok(columns)
    }

    fn compute_row(&self, message: &ChatMessage) -> Vec<f64> {
        let values: Vec<f64> = self
            .registry
            .chat
            .iter()
            .map(|f| f.compute(message))
            .collect();
        if let Some(log) = &self.log {
            log.record_message(values.len() as u64);
        }
        values
    }

    fn contextual_feature(
        &self,
        feature: &ContextualChatFeature,
        messages: &[ChatMessage],
        index: &ConversationIndex,
    ) -> Result<FeatureColumn, FeaturizeError> {
        let raw: Vec<f64> = messages.iter().map(feature.source).collect();

        let values = match feature.scope {
            ContextScope::AllChats => (feature.transform)(&raw),
            ContextScope::Conversation => {
                let transform = |group: &ConversationGroup| {
                    (feature.transform)(&group.select(&raw))
                };
                let per_group: Vec<Vec<f64>> = if self.parallel {
                    index.groups().par_iter().map(transform).collect()
                } else {
                    index.groups().iter().map(transform).collect()
                };

                let mut values = vec![f64::NAN; raw.len()];
                for (group, group_values) in index.groups().iter().zip(per_group) {
                    if group_values.len() != group.len() {
                        return Err(FeaturizeError::FeatureContract {
                            feature: feature.name.to_string(),
                            row: group.rows.first().copied().unwrap_or_default(),
                        });
                    }
                    for (&row, value) in group.rows.iter().zip(group_values) {
                        values[row] = value;
                    }
                }
                values
            }
        };

        if values.len() != messages.len() {
            return Err(FeaturizeError::FeatureContract {
                feature: feature.name.to_string(),
                row: values.len().min(messages.len()),
            });
        }

        let column = FeatureColumn::new(feature.name, values);
        ensure_finite(&column)?;

        if let Some(log) = &self.log {
            log.record_chat_values(column.values.len() as u64);
        }
        debug!(
            feature = feature.name,
            scope = ?feature.scope,
            "contextual chat feature computed"
        );

        Ok(column)
    }
}

fn ensure_finite(column: &FeatureColumn) -> Result<(), FeaturizeError> {
    match column.values.iter().position(|v| !v.is_finite()) {
        Some(row) => Err(FeaturizeError::FeatureContract {
            feature: column.name.clone(),
            row,
        }),
        None => Ok(()),
    }
}
