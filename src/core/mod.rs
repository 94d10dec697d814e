//! Core functionality for the conversation featurizer.
//!
//! This module contains:
//! - Preprocessing of raw chat tables into typed message records
//! - Conversation grouping (the skeleton of the conversation-level table)
//! - The feature library and registry
//! - Chat-level and conversation-level calculators
//! - The builder that runs the whole pipeline

pub mod builder;
pub mod chat_level;
pub mod conversation_level;
pub mod features;
pub mod grouping;
pub mod preprocess;

// Re-export commonly used types
pub use builder::{merge_original_conversation_columns, FeatureBuilder, FeaturizedTables, Stage};
pub use chat_level::{ChatLevelFeaturesCalculator, ChatLevelTable};
pub use conversation_level::{ConversationLevelFeaturesCalculator, ConversationLevelTable};
pub use features::{
    Aggregation, ChatFeature, ContextScope, ContextualChatFeature, ConversationFeature,
    FeatureDescriptor, FeatureLevel, FeatureRegistry,
};
pub use grouping::{ConversationGroup, ConversationIndex};
pub use preprocess::{preprocess_chat_data, PreprocessedChats};
