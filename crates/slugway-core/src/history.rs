use crate::correlation::CorrelationId;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const PAGES_TABLE: &str = "pages";
pub const REDIRECT_TABLE: &str = "sys_redirect";

/// The kind of write an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Insert,
    Update,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Insert => "insert",
            HistoryAction::Update => "update",
        }
    }
}

/// One audit record, keyed by table, record id and correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub table: String,
    pub record_uid: u64,
    pub action: HistoryAction,
    /// The written row (inserts) or the changed fields (updates).
    pub payload: serde_json::Value,
    pub correlation_id: CorrelationId,
    /// Unix seconds.
    pub tstamp: i64,
    /// Backend user that triggered the write, `0` for none.
    pub actor: u32,
}

/// Append-only audit log.
#[async_trait]
pub trait RecordHistory: Send + Sync + 'static {
    async fn add_record(&self, entry: HistoryEntry) -> Result<()>;

    /// All entries tagged with `correlation_id`, oldest first.
    async fn find_by_correlation(&self, correlation_id: &CorrelationId)
        -> Result<Vec<HistoryEntry>>;
}
