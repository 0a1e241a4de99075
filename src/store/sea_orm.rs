use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};

use crate::db::entity::{balances, reconciliation_entries, table_snapshots};
use crate::engine::Chips;
use crate::table::{TableId, TableSnapshot};

use super::{BalanceStore, DebitOutcome, ReconciliationEntry, SnapshotStore, StoreError};

fn db_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

pub struct SeaOrmBalanceStore {
    connection: DatabaseConnection,
}

impl SeaOrmBalanceStore {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BalanceStore for SeaOrmBalanceStore {
    async fn debit(&self, player_id: &str, amount: Chips) -> Result<DebitOutcome, StoreError> {
        let txn = self.connection.begin().await.map_err(db_err)?;
        let row = balances::Entity::find_by_id(player_id.to_string())
            .one(&txn)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            txn.rollback().await.map_err(db_err)?;
            return Ok(DebitOutcome::Insufficient);
        };
        let amount = i64::try_from(amount).map_err(|_| db_err("amount out of range"))?;
        if row.chips < amount {
            txn.rollback().await.map_err(db_err)?;
            return Ok(DebitOutcome::Insufficient);
        }
        let remaining = row.chips - amount;
        let mut active: balances::ActiveModel = row.into();
        active.chips = Set(remaining);
        active.updated_at = Set(Utc::now());
        balances::Entity::update(active)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(DebitOutcome::Ok)
    }

    async fn credit(&self, player_id: &str, amount: Chips) -> Result<(), StoreError> {
        let amount = i64::try_from(amount).map_err(|_| db_err("amount out of range"))?;
        let txn = self.connection.begin().await.map_err(db_err)?;
        let row = balances::Entity::find_by_id(player_id.to_string())
            .one(&txn)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => {
                let chips = row.chips + amount;
                let mut active: balances::ActiveModel = row.into();
                active.chips = Set(chips);
                active.updated_at = Set(Utc::now());
                balances::Entity::update(active)
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;
            }
            None => {
                let active = balances::ActiveModel {
                    player_id: Set(player_id.to_string()),
                    chips: Set(amount),
                    updated_at: Set(Utc::now()),
                };
                balances::Entity::insert(active)
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;
            }
        }
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn balance(&self, player_id: &str) -> Result<Chips, StoreError> {
        let row = balances::Entity::find_by_id(player_id.to_string())
            .one(&self.connection)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.chips.max(0) as Chips).unwrap_or(0))
    }
}

pub struct SeaOrmSnapshotStore {
    connection: DatabaseConnection,
}

impl SeaOrmSnapshotStore {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SnapshotStore for SeaOrmSnapshotStore {
    async fn save(&self, snapshot: &TableSnapshot) -> Result<(), StoreError> {
        let data = serde_json::to_value(snapshot).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let active = table_snapshots::ActiveModel {
            table_id: Set(snapshot.table_id.clone()),
            data: Set(data),
            updated_at: Set(Utc::now()),
        };
        table_snapshots::Entity::insert(active)
            .on_conflict(
                OnConflict::column(table_snapshots::Column::TableId)
                    .update_columns([
                        table_snapshots::Column::Data,
                        table_snapshots::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.connection)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<TableSnapshot>, StoreError> {
        let rows = table_snapshots::Entity::find()
            .all(&self.connection)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row.data).map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }

    async fn delete(&self, table_id: &TableId) -> Result<(), StoreError> {
        table_snapshots::Entity::delete_many()
            .filter(table_snapshots::Column::TableId.eq(table_id.clone()))
            .exec(&self.connection)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_reconciliation(&self, entry: ReconciliationEntry) -> Result<(), StoreError> {
        let amount = i64::try_from(entry.amount).map_err(|_| db_err("amount out of range"))?;
        let active = reconciliation_entries::ActiveModel {
            id: NotSet,
            player_id: Set(entry.player_id),
            amount: Set(amount),
            reason: Set(entry.reason),
            created_at: Set(entry.created_at),
        };
        reconciliation_entries::Entity::insert(active)
            .exec(&self.connection)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
