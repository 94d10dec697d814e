//! Conversation Featurizer - conversational feature extraction for research.
//!
//! Turns a chat transcript (one row per message) into two feature tables: one row per
//! message and one row per conversation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Conversation Featurizer                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐                │
//! │  │ Preprocess │──▶│ Chat-level │──▶│ Conv-level │──▶ metadata    │
//! │  │  (text)    │   │ (per row)  │   │ (per conv) │    merge-back  │
//! │  └────────────┘   └────────────┘   └────────────┘                │
//! │         │                                 │                      │
//! │         ▼                                 ▼                      │
//! │  ┌────────────┐                    ┌────────────┐                │
//! │  │  Run log   │                    │ Two CSVs   │                │
//! │  └────────────┘                    └────────────┘                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use convo_featurizer::{Config, FeatureBuilder};
//!
//! let mut builder = FeatureBuilder::new(
//!     "chats.csv",
//!     "output/chats_chat_level.csv",
//!     "output/chats_conversation_level.csv",
//!     Config::default(),
//! );
//! builder.featurize().expect("featurization failed");
//! println!("{}", builder.log().summary());
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod table;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    ChatLevelTable, ConversationLevelTable, FeatureBuilder, FeatureRegistry, FeaturizedTables,
    Stage,
};
pub use error::FeaturizeError;
pub use report::{RunLog, RunStats, SharedRunLog};
pub use table::{ChatMessage, RawTable};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
