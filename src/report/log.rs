//! Run log for a featurization run.
//!
//! Counts what the pipeline processed so a run can be audited after the fact.
//! Counters are atomic because feature passes record from worker threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Statistics for the current run.
#[derive(Debug)]
pub struct RunLog {
    /// Identifier attached to every log line of this run
    run_id: Uuid,
    /// Number of message rows featurized
    messages_processed: AtomicU64,
    /// Number of conversations featurized
    conversations_processed: AtomicU64,
    /// Number of chat-level feature values computed
    chat_values_computed: AtomicU64,
    /// Number of conversation-level feature values computed
    conversation_values_computed: AtomicU64,
    /// Number of metadata columns merged back onto conversations
    metadata_columns_merged: AtomicU64,
    /// Metadata cells that differed within a conversation (first value kept)
    non_invariant_values: AtomicU64,
    /// Run start time
    started_at: DateTime<Utc>,
}

impl RunLog {
    /// Create a new run log.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            messages_processed: AtomicU64::new(0),
            conversations_processed: AtomicU64::new(0),
            chat_values_computed: AtomicU64::new(0),
            conversation_values_computed: AtomicU64::new(0),
            metadata_columns_merged: AtomicU64::new(0),
            non_invariant_values: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record one featurized message and the number of values computed for it.
    pub fn record_message(&self, values: u64) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.chat_values_computed.fetch_add(values, Ordering::Relaxed);
    }

    /// Record chat-level values computed outside the row-wise pass.
    pub fn record_chat_values(&self, count: u64) {
        self.chat_values_computed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one featurized conversation and the number of values computed for it.
    pub fn record_conversation(&self, values: u64) {
        self.conversations_processed.fetch_add(1, Ordering::Relaxed);
        self.conversation_values_computed
            .fetch_add(values, Ordering::Relaxed);
    }

    /// Record merged metadata columns.
    pub fn record_metadata_columns(&self, count: u64) {
        self.metadata_columns_merged
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record a metadata cell that was not constant within its conversation.
    pub fn record_non_invariant_value(&self) {
        self.non_invariant_values.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            run_id: self.run_id,
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            conversations_processed: self.conversations_processed.load(Ordering::Relaxed),
            chat_values_computed: self.chat_values_computed.load(Ordering::Relaxed),
            conversation_values_computed: self.conversation_values_computed.load(Ordering::Relaxed),
            metadata_columns_merged: self.metadata_columns_merged.load(Ordering::Relaxed),
            non_invariant_values: self.non_invariant_values.load(Ordering::Relaxed),
            started_at: self.started_at,
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics ({}):\n\
             - Messages featurized: {}\n\
             - Conversations featurized: {}\n\
             - Chat-level values computed: {}\n\
             - Conversation-level values computed: {}\n\
             - Metadata columns merged: {}\n\
             - Non-invariant metadata cells (first value kept): {}\n\
             - Elapsed: {} ms",
            stats.run_id,
            stats.messages_processed,
            stats.conversations_processed,
            stats.chat_values_computed,
            stats.conversation_values_computed,
            stats.metadata_columns_merged,
            stats.non_invariant_values,
            stats.elapsed_ms
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.messages_processed.store(0, Ordering::Relaxed);
        self.conversations_processed.store(0, Ordering::Relaxed);
        self.chat_values_computed.store(0, Ordering::Relaxed);
        self.conversation_values_computed.store(0, Ordering::Relaxed);
        self.metadata_columns_merged.store(0, Ordering::Relaxed);
        self.non_invariant_values.store(0, Ordering::Relaxed);
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub messages_processed: u64,
    pub conversations_processed: u64,
    pub chat_values_computed: u64,
    pub conversation_values_computed: u64,
    pub metadata_columns_merged: u64,
    pub non_invariant_values: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}
