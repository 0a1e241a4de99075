use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, warn};

use crate::engine::Chips;

use super::{BalanceStore, ReconciliationEntry, SnapshotStore};

const LOG_TARGET: &str = "holdem_server::store::retry";

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Credit a balance with bounded backoff. When every attempt fails a
/// reconciliation entry is recorded instead; gameplay is never blocked on
/// this path.
pub async fn credit_with_retry(
    balances: Arc<dyn BalanceStore>,
    snapshots: Arc<dyn SnapshotStore>,
    player_id: String,
    amount: Chips,
    reason: String,
) {
    let mut backoff = INITIAL_BACKOFF;
    for attempt in 1..=MAX_ATTEMPTS {
        match balances.credit(&player_id, amount).await {
            Ok(()) => return,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    player_id = %player_id,
                    amount,
                    attempt,
                    error = %err,
                    "balance credit failed"
                );
            }
        }
        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    let entry = ReconciliationEntry {
        player_id: player_id.clone(),
        amount,
        reason,
        created_at: Utc::now(),
    };
    if let Err(err) = snapshots.record_reconciliation(entry).await {
        error!(
            target: LOG_TARGET,
            player_id = %player_id,
            amount,
            error = %err,
            "failed to record reconciliation entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::store::memory::InMemorySnapshotStore;
    use crate::store::{DebitOutcome, StoreError};

    struct FailingBalances {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl BalanceStore for FailingBalances {
        async fn debit(&self, _: &str, _: Chips) -> Result<DebitOutcome, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn credit(&self, _: &str, _: Chips) -> Result<(), StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("down".into()))
        }

        async fn balance(&self, _: &str) -> Result<Chips, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_record_a_reconciliation_entry() {
        let balances = Arc::new(FailingBalances {
            attempts: AtomicU32::new(0),
        });
        let snapshots = Arc::new(InMemorySnapshotStore::new());

        credit_with_retry(
            Arc::clone(&balances) as Arc<dyn BalanceStore>,
            Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
            "alice".into(),
            500,
            "leave settlement".into(),
        )
        .await;

        assert_eq!(balances.attempts.load(Ordering::SeqCst), MAX_ATTEMPTS);
        let entries = snapshots.reconciliation_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player_id, "alice");
        assert_eq!(entries[0].amount, 500);
    }
}
