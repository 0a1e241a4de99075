//! Table registry: allocates 6-hex table ids, owns the routing map from
//! table id to worker inbox, and restores tables from snapshots on boot.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::{ServerDefaults, TableConfig, TABLE_ID_RETRIES, TABLE_INBOX_CAPACITY};
use crate::engine::Chips;
use crate::server::dto::TableSummary;
use crate::store::{BalanceStore, SnapshotStore};

use super::commands::TableCommand;
use super::state::Table;
use super::view::AdminTableView;
use super::worker::{TableWorker, WorkerDeps};
use super::{PlayerId, TableId};

const LOG_TARGET: &str = "holdem_server::table::registry";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("could not allocate a table id")]
    IdExhausted,
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Clone, Debug, Default)]
pub struct CreateTableOptions {
    pub small_blind: Option<Chips>,
    pub big_blind: Option<Chips>,
    pub buy_in: Option<Chips>,
}

#[derive(Clone)]
pub struct TableHandle {
    pub table_id: TableId,
    pub sender: mpsc::Sender<TableCommand>,
}

#[derive(Clone)]
struct TableMeta {
    sender: mpsc::Sender<TableCommand>,
    config: TableConfig,
}

pub struct TableDirectory {
    tables: DashMap<TableId, TableMeta>,
    defaults: ServerDefaults,
    snapshots: Arc<dyn SnapshotStore>,
    balances: Arc<dyn BalanceStore>,
}

impl TableDirectory {
    pub fn new(
        defaults: ServerDefaults,
        snapshots: Arc<dyn SnapshotStore>,
        balances: Arc<dyn BalanceStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tables: DashMap::new(),
            defaults,
            snapshots,
            balances,
        })
    }

    pub fn create_table(
        self: &Arc<Self>,
        creator: &PlayerId,
        options: CreateTableOptions,
    ) -> Result<TableId, RegistryError> {
        let config = self.build_config(options)?;

        for _ in 0..TABLE_ID_RETRIES {
            let id = generate_table_id();
            let (tx, rx) = mpsc::channel(TABLE_INBOX_CAPACITY);
            match self.tables.entry(id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(TableMeta {
                        sender: tx,
                        config: config.clone(),
                    });
                }
            }
            let table = Table::new(id.clone(), creator.clone(), config);
            info!(
                target: LOG_TARGET,
                table_id = %id,
                creator = %creator,
                "table created"
            );
            self.spawn_worker(table, rx);
            return Ok(id);
        }
        Err(RegistryError::IdExhausted)
    }

    fn build_config(&self, options: CreateTableOptions) -> Result<TableConfig, RegistryError> {
        let mut config = self.defaults.table.clone();
        if let Some(bb) = options.big_blind {
            if bb == 0 || bb > self.defaults.max_big_blind {
                return Err(RegistryError::InvalidConfig(format!(
                    "big blind must be between 1 and {}",
                    self.defaults.max_big_blind
                )));
            }
            config.stakes.big_blind = bb;
            config.stakes.small_blind = (bb / 2).max(1);
        }
        if let Some(sb) = options.small_blind {
            if sb == 0 || sb > config.stakes.big_blind {
                return Err(RegistryError::InvalidConfig(
                    "small blind must be between 1 and the big blind".to_string(),
                ));
            }
            config.stakes.small_blind = sb;
        }
        if let Some(buy_in) = options.buy_in {
            if buy_in < config.stakes.big_blind * 10 || buy_in > self.defaults.max_buy_in {
                return Err(RegistryError::InvalidConfig(format!(
                    "buy-in must be between {} and {}",
                    config.stakes.big_blind * 10,
                    self.defaults.max_buy_in
                )));
            }
            config.buy_in = buy_in;
        } else if config.buy_in < config.stakes.big_blind * 10 {
            config.buy_in = config.stakes.big_blind * 100;
        }
        Ok(config)
    }

    pub fn find(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.get(table_id).map(|entry| TableHandle {
            table_id: table_id.to_string(),
            sender: entry.value().sender.clone(),
        })
    }

    pub fn config_of(&self, table_id: &str) -> Option<TableConfig> {
        self.tables.get(table_id).map(|e| e.value().config.clone())
    }

    pub fn remove(&self, table_id: &str) {
        self.tables.remove(table_id);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.iter().map(|e| e.key().clone()).collect()
    }

    /// Sanitized inspection of one table, for the admin surface.
    pub async fn inspect(&self, table_id: &str) -> Option<AdminTableView> {
        let handle = self.find(table_id)?;
        let (reply, rx) = oneshot::channel();
        handle
            .sender
            .send(TableCommand::Inspect { reply })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Joinable-table listing for the lobby.
    pub async fn list_summaries(&self) -> Vec<TableSummary> {
        let entries: Vec<(TableId, TableConfig)> = self
            .tables
            .iter()
            .map(|e| (e.key().clone(), e.value().config.clone()))
            .collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for (table_id, config) in entries {
            let Some(view) = self.inspect(&table_id).await else {
                continue;
            };
            summaries.push(TableSummary {
                table_id,
                phase: view.state.phase,
                occupied: view.state.seats.iter().filter(|s| s.is_some()).count(),
                max_seats: config.max_seats,
                small_blind: config.stakes.small_blind,
                big_blind: config.stakes.big_blind,
                buy_in: config.buy_in,
            });
        }
        summaries
    }

    /// Bring every snapshotted table back to life. Called once at boot,
    /// before the listener starts accepting connections.
    pub async fn restore_all(self: &Arc<Self>) -> usize {
        let snapshots = match self.snapshots.load_all().await {
            Ok(s) => s,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    error = %err,
                    "could not load table snapshots; starting empty"
                );
                return 0;
            }
        };
        let mut restored = 0;
        for snapshot in snapshots {
            let table = snapshot.into_table();
            let (tx, rx) = mpsc::channel(TABLE_INBOX_CAPACITY);
            match self.tables.entry(table.id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(TableMeta {
                        sender: tx,
                        config: table.config.clone(),
                    });
                }
            }
            info!(
                target: LOG_TARGET,
                table_id = %table.id,
                phase = ?table.phase,
                hand_no = table.hand_no,
                "restoring table from snapshot"
            );
            self.spawn_worker(table, rx);
            restored += 1;
        }
        restored
    }

    fn spawn_worker(self: &Arc<Self>, table: Table, inbox: mpsc::Receiver<TableCommand>) {
        let deps = WorkerDeps {
            snapshots: Arc::clone(&self.snapshots),
            balances: Arc::clone(&self.balances),
            persistence_budget: self.defaults.persistence_budget,
        };
        let worker = TableWorker::new(table, inbox, Arc::clone(self), deps);
        tokio::spawn(worker.run());
    }

    pub fn defaults(&self) -> &ServerDefaults {
        &self.defaults
    }
}

fn generate_table_id() -> TableId {
    let mut bytes = [0u8; 3];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
