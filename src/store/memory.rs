use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::engine::Chips;
use crate::table::{TableId, TableSnapshot};

use super::{BalanceStore, DebitOutcome, ReconciliationEntry, SnapshotStore, StoreError};

/// Dev/test wallet: every player starts with the configured balance on first
/// contact.
pub struct InMemoryBalanceStore {
    balances: DashMap<String, Chips>,
    starting_balance: Chips,
}

impl InMemoryBalanceStore {
    pub fn new(starting_balance: Chips) -> Self {
        Self {
            balances: DashMap::new(),
            starting_balance,
        }
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn debit(&self, player_id: &str, amount: Chips) -> Result<DebitOutcome, StoreError> {
        let mut entry = self
            .balances
            .entry(player_id.to_string())
            .or_insert(self.starting_balance);
        if *entry < amount {
            return Ok(DebitOutcome::Insufficient);
        }
        *entry -= amount;
        Ok(DebitOutcome::Ok)
    }

    async fn credit(&self, player_id: &str, amount: Chips) -> Result<(), StoreError> {
        let mut entry = self
            .balances
            .entry(player_id.to_string())
            .or_insert(self.starting_balance);
        *entry += amount;
        Ok(())
    }

    async fn balance(&self, player_id: &str) -> Result<Chips, StoreError> {
        Ok(*self
            .balances
            .entry(player_id.to_string())
            .or_insert(self.starting_balance))
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: DashMap<TableId, TableSnapshot>,
    reconciliation: Mutex<Vec<ReconciliationEntry>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconciliation_entries(&self) -> Vec<ReconciliationEntry> {
        self.reconciliation.lock().clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &TableSnapshot) -> Result<(), StoreError> {
        self.snapshots
            .insert(snapshot.table_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<TableSnapshot>, StoreError> {
        Ok(self.snapshots.iter().map(|e| e.value().clone()).collect())
    }

    async fn delete(&self, table_id: &TableId) -> Result<(), StoreError> {
        self.snapshots.remove(table_id);
        Ok(())
    }

    async fn record_reconciliation(&self, entry: ReconciliationEntry) -> Result<(), StoreError> {
        self.reconciliation.lock().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn debit_respects_the_balance() {
        let store = InMemoryBalanceStore::new(100);
        assert_eq!(store.debit("p", 60).await.unwrap(), DebitOutcome::Ok);
        assert_eq!(
            store.debit("p", 60).await.unwrap(),
            DebitOutcome::Insufficient
        );
        store.credit("p", 20).await.unwrap();
        assert_eq!(store.balance("p").await.unwrap(), 60);
    }
}
