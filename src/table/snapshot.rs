use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::Table;
use super::TableId;

/// Durable image of a table, written at stable points (end of street, end of
/// hand, seating changes) and sufficient to resume the table after a restart.
/// Contains hole cards and the deck, so it must never reach a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub table_id: TableId,
    pub saved_at: DateTime<Utc>,
    pub table: Table,
}

impl TableSnapshot {
    pub fn capture(table: &Table) -> Self {
        Self {
            table_id: table.id.clone(),
            saved_at: Utc::now(),
            table: table.clone(),
        }
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}
