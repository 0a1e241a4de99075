pub mod balances;
pub mod reconciliation_entries;
pub mod table_snapshots;
