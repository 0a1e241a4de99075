use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::types::{Chips, TableStakes};

/// Upper bound on seats at any table.
pub const MAX_SEATS: u8 = 8;

/// How many consecutive hands a broke seat is kept before it is removed.
pub const MAX_BROKE_HANDS: u8 = 2;

/// Retained entries in the per-table action log ring.
pub const ACTION_LOG_CAPACITY: usize = 256;

/// Retained entries in the per-table hand-result ring.
pub const HAND_RESULT_CAPACITY: usize = 32;

/// Capacity of a table's command inbox.
pub const TABLE_INBOX_CAPACITY: usize = 128;

/// Capacity of a session's outbound buffer. A subscriber that falls this far
/// behind is dropped rather than allowed to block the table.
pub const OUTBOUND_BUFFER_CAPACITY: usize = 64;

/// Retries for table-id generation before giving up on a collision streak.
pub const TABLE_ID_RETRIES: usize = 16;

/// Per-table rules and timing. Tables are created from `ServerDefaults` with
/// optional creator overrides applied within the configured bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub stakes: TableStakes,
    pub buy_in: Chips,
    pub max_seats: u8,
    #[serde(with = "duration_secs")]
    pub turn_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub post_hand_delay: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            stakes: TableStakes {
                small_blind: 5,
                big_blind: 10,
            },
            buy_in: 1_000,
            max_seats: MAX_SEATS,
            turn_timeout: Duration::from_secs(30),
            post_hand_delay: Duration::from_secs(10),
        }
    }
}

impl TableConfig {
    /// Minimum bet on any street equals the big blind.
    pub fn min_bet(&self) -> Chips {
        self.stakes.big_blind
    }
}

/// Server-wide knobs owned by the binary and threaded through bootstrap.
#[derive(Clone, Debug)]
pub struct ServerDefaults {
    pub table: TableConfig,
    /// Ceiling for creator-supplied big blinds.
    pub max_big_blind: Chips,
    /// Ceiling for creator-supplied buy-ins.
    pub max_buy_in: Chips,
    /// Budget for a single snapshot write before the table moves on.
    pub persistence_budget: Duration,
    /// Starting balance granted by the in-memory balance store.
    pub dev_starting_balance: Chips,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            table: TableConfig::default(),
            max_big_blind: 1_000,
            max_buy_in: 1_000_000,
            persistence_budget: Duration::from_secs(5),
            dev_starting_balance: 10_000,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
