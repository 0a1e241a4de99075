//! Persistence seams consumed by the table core: durable table snapshots for
//! recovery and the external balance store. Both have an in-memory backend
//! for dev/test and a Postgres backend behind the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Chips;
use crate::table::{PlayerId, TableId, TableSnapshot};

pub mod memory;
pub mod retry;
pub mod sea_orm;

pub use memory::{InMemoryBalanceStore, InMemorySnapshotStore};
pub use retry::credit_with_retry;
pub use self::sea_orm::{SeaOrmBalanceStore, SeaOrmSnapshotStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebitOutcome {
    Ok,
    Insufficient,
}

/// External wallet. The core debits a buy-in when a seat is taken and credits
/// the remaining stack when the seat is given up.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn debit(&self, player_id: &str, amount: Chips) -> Result<DebitOutcome, StoreError>;
    async fn credit(&self, player_id: &str, amount: Chips) -> Result<(), StoreError>;
    async fn balance(&self, player_id: &str) -> Result<Chips, StoreError>;
}

/// A credit that exhausted its retries and needs manual follow-up.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationEntry {
    pub player_id: PlayerId,
    pub amount: Chips,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Durable per-table snapshots written at stable points, plus the ledger of
/// settlement failures.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &TableSnapshot) -> Result<(), StoreError>;
    async fn load_all(&self) -> Result<Vec<TableSnapshot>, StoreError>;
    async fn delete(&self, table_id: &TableId) -> Result<(), StoreError>;
    async fn record_reconciliation(&self, entry: ReconciliationEntry) -> Result<(), StoreError>;
}
