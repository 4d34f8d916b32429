// Append-only record of platform transactions, per wallet.

use crate::error::Result;
use crate::models::PlatformTransaction;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Appends `tx`. Returns false when a record with the same id exists.
    async fn append(&self, tx: PlatformTransaction) -> Result<bool>;

    /// Every record for `wallet`, oldest first.
    async fn list_for_wallet(&self, wallet: &str) -> Result<Vec<PlatformTransaction>>;
}

#[derive(Default)]
struct LogState {
    ids: HashSet<String>,
    entries: Vec<PlatformTransaction>,
}

#[derive(Default)]
pub struct MemoryTransactionLog {
    state: RwLock<LogState>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, tx: PlatformTransaction) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.ids.insert(tx.id.clone()) {
            return Ok(false);
        }
        state.entries.push(tx);
        Ok(true)
    }

    async fn list_for_wallet(&self, wallet: &str) -> Result<Vec<PlatformTransaction>> {
        let state = self.state.read().await;
        let mut txs: Vec<PlatformTransaction> = state
            .entries
            .iter()
            .filter(|tx| tx.wallet_address == wallet)
            .cloned()
            .collect();
        // Stable sort keeps append order for equal timestamps.
        txs.sort_by_key(|tx| tx.timestamp);
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransactionDetails, TransactionType};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_append_is_idempotent_per_id() {
        let log = MemoryTransactionLog::new();
        let tx = PlatformTransaction::confirmed(
            "alice",
            TransactionType::TokenMint,
            Some("sig".to_string()),
            TransactionDetails::for_mint("mint"),
        );

        assert!(log.append(tx.clone()).await.unwrap());
        assert!(!log.append(tx).await.unwrap());
        assert_eq!(log.list_for_wallet("alice").await.unwrap().len(), 1);
        assert!(log.list_for_wallet("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_chronological() {
        let log = MemoryTransactionLog::new();
        let now = Utc::now();
        for (offset, kind) in [
            (10, TransactionType::TokenSwap),
            (0, TransactionType::TokenMint),
            (5, TransactionType::PoolCreation),
        ] {
            let mut tx = PlatformTransaction::confirmed("alice", kind, None, TransactionDetails::default());
            tx.timestamp = now + Duration::seconds(offset);
            log.append(tx).await.unwrap();
        }

        let kinds: Vec<TransactionType> = log
            .list_for_wallet("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.transaction_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::TokenMint,
                TransactionType::PoolCreation,
                TransactionType::TokenSwap
            ]
        );
    }
}
