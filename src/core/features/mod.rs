//! Feature function library and the registry that declares what gets computed.
//!
//! Three kinds of features exist:
//! - row-wise chat features, computed from one message record;
//! - contextual chat features, computed per message from the records of its
//!   conversation (or of the whole input);
//! - conversation features, computed from the ordered messages of one conversation.
//!
//! Every chat feature declares the aggregations applied to it at conversation level,
//! so the conversation table layout is fixed by the registry rather than inferred.

pub mod basic;
pub mod inequality;
pub mod info_exchange;
pub mod lexical;
pub mod patterns;

use crate::table::ChatMessage;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

pub use lexical::LexiconCategory;

/// How a chat-level column is summarized per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Average,
    Max,
    Min,
    /// Sample standard deviation
    Stdev,
}

impl Aggregation {
    pub fn prefix(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Average => "average",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Stdev => "stdev",
        }
    }

    /// Name of the aggregated column for `feature`.
    pub fn column_name(&self, feature: &str) -> String {
        format!("{}_{}", self.prefix(), feature)
    }

    /// Apply the aggregation. Undefined results (empty input, stdev of one value) are 0.
    pub fn apply(&self, values: &[f64]) -> f64 {
        let result = match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Average => Statistics::mean(values),
            Aggregation::Max => Statistics::max(values),
            Aggregation::Min => Statistics::min(values),
            Aggregation::Stdev => Statistics::std_dev(values),
        };
        if result.is_finite() {
            result
        } else {
            0.0
        }
    }
}

const COUNT_AGGREGATIONS: &[Aggregation] = &[
    Aggregation::Sum,
    Aggregation::Average,
    Aggregation::Max,
    Aggregation::Min,
    Aggregation::Stdev,
];
const TOTAL_AGGREGATIONS: &[Aggregation] = &[Aggregation::Sum, Aggregation::Average];
const RATIO_AGGREGATIONS: &[Aggregation] = &[Aggregation::Average];
const EXTREMA_AGGREGATIONS: &[Aggregation] = &[Aggregation::Max, Aggregation::Min];

type RowFn = Box<dyn Fn(&ChatMessage) -> f64 + Send + Sync>;

/// A row-wise chat feature.
pub struct ChatFeature {
    pub name: String,
    pub aggregations: &'static [Aggregation],
    compute: RowFn,
}

impl ChatFeature {
    pub fn new<F>(name: impl Into<String>, aggregations: &'static [Aggregation], compute: F) -> Self
    where
        F: Fn(&ChatMessage) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            aggregations,
            compute: Box::new(compute),
        }
    }

    pub fn compute(&self, message: &ChatMessage) -> f64 {
        (self.compute)(message)
    }
}

impl std::fmt::Debug for ChatFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatFeature")
            .field("name", &self.name)
            .field("aggregations", &self.aggregations)
            .finish()
    }
}

/// Which messages a contextual feature is standardized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    AllChats,
    Conversation,
}

/// A per-message feature that depends on sibling messages.
///
/// `source` maps each message to a raw value; `transform` turns the raw values of one
/// scope into the output values, one per message and in the same order.
#[derive(Clone, Copy)]
pub struct ContextualChatFeature {
    pub name: &'static str,
    pub scope: ContextScope,
    pub aggregations: &'static [Aggregation],
    pub source: fn(&ChatMessage) -> f64,
    pub transform: fn(&[f64]) -> Vec<f64>,
}

impl std::fmt::Debug for ContextualChatFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextualChatFeature")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("aggregations", &self.aggregations)
            .finish()
    }
}

/// A feature computed once per conversation from its ordered messages.
#[derive(Clone, Copy)]
pub struct ConversationFeature {
    pub name: &'static str,
    pub compute: fn(&[&ChatMessage]) -> f64,
}

impl std::fmt::Debug for ConversationFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationFeature")
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered declaration of every feature the pipeline computes.
#[derive(Debug)]
pub struct FeatureRegistry {
    pub chat: Vec<ChatFeature>,
    pub contextual: Vec<ContextualChatFeature>,
    pub conversation: Vec<ConversationFeature>,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeatureRegistry {
    /// The full feature set.
    pub fn standard() -> Self {
        let mut chat = vec![
            ChatFeature::new("num_words", COUNT_AGGREGATIONS, basic::num_words),
            ChatFeature::new("num_chars", COUNT_AGGREGATIONS, basic::num_chars),
            ChatFeature::new(
                "info_exchange_wordcount",
                TOTAL_AGGREGATIONS,
                info_exchange::info_exchange_wordcount,
            ),
            ChatFeature::new(
                "num_question_naive",
                TOTAL_AGGREGATIONS,
                patterns::num_question_naive,
            ),
            ChatFeature::new("NTRI", TOTAL_AGGREGATIONS, patterns::classify_ntri),
            ChatFeature::new("word_TTR", RATIO_AGGREGATIONS, patterns::word_ttr),
            ChatFeature::new(
                "first_pronouns_proportion",
                RATIO_AGGREGATIONS,
                lexical::first_pronouns_proportion,
            ),
        ];

        for category in LexiconCategory::RATIO_FEATURES {
            chat.push(ChatFeature::new(
                category.column_name(),
                RATIO_AGGREGATIONS,
                move |m: &ChatMessage| lexical::lexicon_ratio(&m.message, category),
            ));
        }

        let contextual = vec![
            ContextualChatFeature {
                name: "info_exchange_zscore_chats",
                scope: ContextScope::AllChats,
                aggregations: RATIO_AGGREGATIONS,
                source: info_exchange::info_exchange_wordcount,
                transform: info_exchange::zscores,
            },
            ContextualChatFeature {
                name: "info_exchange_zscore_conversation",
                scope: ContextScope::Conversation,
                aggregations: EXTREMA_AGGREGATIONS,
                source: info_exchange::info_exchange_wordcount,
                transform: info_exchange::zscores,
            },
        ];

        let conversation = vec![
            ConversationFeature {
                name: "num_messages",
                compute: count_messages,
            },
            ConversationFeature {
                name: "num_speakers",
                compute: count_speakers,
            },
            ConversationFeature {
                name: "gini_coefficient_sum_num_words",
                compute: inequality::gini_num_words,
            },
            ConversationFeature {
                name: "gini_coefficient_sum_num_chars",
                compute: inequality::gini_num_chars,
            },
            ConversationFeature {
                name: "gini_coefficient_sum_num_messages",
                compute: inequality::gini_num_messages,
            },
            ConversationFeature {
                name: "info_exchange_zscore_trend",
                compute: info_exchange::info_exchange_zscore_trend,
            },
        ];

        Self {
            chat,
            contextual,
            conversation,
        }
    }

    /// Names of all chat-level feature columns, in output order.
    pub fn chat_column_names(&self) -> Vec<String> {
        self.chat
            .iter()
            .map(|f| f.name.clone())
            .chain(self.contextual.iter().map(|f| f.name.to_string()))
            .collect()
    }

    /// Flat description of every feature, for listing.
    pub fn describe(&self) -> Vec<FeatureDescriptor> {
        let chat = self.chat.iter().map(|f| FeatureDescriptor {
            name: f.name.clone(),
            level: FeatureLevel::Chat,
            context: None,
            aggregations: f.aggregations.to_vec(),
        });
        let contextual = self.contextual.iter().map(|f| FeatureDescriptor {
            name: f.name.to_string(),
            level: FeatureLevel::Chat,
            context: Some(f.scope),
            aggregations: f.aggregations.to_vec(),
        });
        let conversation = self.conversation.iter().map(|f| FeatureDescriptor {
            name: f.name.to_string(),
            level: FeatureLevel::Conversation,
            context: None,
            aggregations: Vec::new(),
        });
        chat.chain(contextual).chain(conversation).collect()
    }
}

/// Granularity of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    Chat,
    Conversation,
}

/// Serializable summary of a registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub name: String,
    pub level: FeatureLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextScope>,
    pub aggregations: Vec<Aggregation>,
}

fn count_messages(messages: &[&ChatMessage]) -> f64 {
    messages.len() as f64
}

fn count_speakers(messages: &[&ChatMessage]) -> f64 {
    let mut speakers: Vec<&str> = messages.iter().map(|m| m.speaker_nickname.as_str()).collect();
    speakers.sort_unstable();
    speakers.dedup();
    speakers.len() as f64
}
