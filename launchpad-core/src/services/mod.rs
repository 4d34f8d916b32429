//! Platform services.
//!
//! Every service is an `async_trait` contract with an in-process
//! implementation over the shared [`Ledger`]. Chain access goes through the
//! injected [`BlockchainClient`]; every state change that reaches the chain is
//! reported to the [`TransactionTracker`].

pub mod airdrop;
pub mod ico;
pub mod pool;
pub mod portfolio;
pub mod token;

pub use airdrop::{AirdropService, MemoryAirdropService};
pub use ico::{IcoService, MemoryIcoService};
pub use pool::{LiquidityPoolService, MemoryPoolService};
pub use portfolio::{MemoryPortfolioService, PortfolioService, PortfolioSubscription};
pub use token::{MemoryTokenService, TokenService};

use crate::chain::{submit_and_confirm, BlockchainClient, TransactionRequest};
use crate::config::{FeeSchedule, PlatformConfig, PlatformLimits};
use crate::error::{PlatformError, Result};
use crate::ledger::Ledger;
use crate::models::PlatformTransaction;
use crate::pagination::PaginationParams;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Write path into the transaction log and portfolio views.
#[async_trait]
pub trait TransactionTracker: Send + Sync {
    async fn track_transaction(&self, tx: PlatformTransaction) -> Result<()>;
}

/// Collaborators shared by the chain-facing services.
#[derive(Clone)]
pub struct ServiceContext {
    pub chain: Arc<dyn BlockchainClient>,
    pub ledger: Arc<Ledger>,
    pub tracker: Arc<dyn TransactionTracker>,
    pub limits: PlatformLimits,
    pub fees: FeeSchedule,
    pub retry: RetryPolicy,
}

impl ServiceContext {
    pub fn new(
        chain: Arc<dyn BlockchainClient>,
        ledger: Arc<Ledger>,
        tracker: Arc<dyn TransactionTracker>,
        config: &PlatformConfig,
    ) -> Self {
        Self {
            chain,
            ledger,
            tracker,
            limits: config.limits.clone(),
            fees: config.fees.clone(),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    pub fn page(&self, params: Option<PaginationParams>) -> PaginationParams {
        PaginationParams::normalize(
            params,
            self.limits.default_page_size,
            self.limits.max_page_size,
        )
    }

    pub fn ensure_wallet(&self, address: &str) -> Result<()> {
        if self.chain.validate_address(address) {
            Ok(())
        } else {
            Err(PlatformError::invalid_wallet(address))
        }
    }

    /// Format check plus existence in the ledger.
    pub async fn ensure_known_mint(&self, mint: &str) -> Result<()> {
        if self.chain.validate_address(mint) && self.ledger.contains_mint(mint).await {
            Ok(())
        } else {
            Err(PlatformError::invalid_mint(mint))
        }
    }

    pub async fn submit(&self, request: &TransactionRequest) -> Result<String> {
        submit_and_confirm(self.chain.as_ref(), &self.retry, request).await
    }

    /// Records a committed operation. The operation already happened, so a
    /// tracking failure is logged rather than returned.
    pub async fn track(&self, tx: PlatformTransaction) {
        let id = tx.id.clone();
        if let Err(e) = self.tracker.track_transaction(tx).await {
            error!("Failed to track transaction {}: {}", id, e);
        }
    }
}

/// Rejects negative, zero, NaN and infinite amounts.
pub fn ensure_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlatformError::invalid_amount(format!(
            "{field} must be a positive finite number, got {value}"
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests.

    use super::*;
    use crate::chain::SimulatedChain;
    use crate::tx_log::MemoryTransactionLog;
    use solana_sdk::pubkey::Pubkey;
    use std::time::Duration;

    pub struct Harness {
        pub chain: Arc<SimulatedChain>,
        pub ledger: Arc<Ledger>,
        pub portfolio: Arc<MemoryPortfolioService>,
        pub ctx: ServiceContext,
    }

    pub fn wallet() -> String {
        Pubkey::new_unique().to_string()
    }

    pub fn harness() -> Harness {
        let chain = Arc::new(SimulatedChain::new());
        let ledger = Arc::new(Ledger::new());
        let portfolio = Arc::new(MemoryPortfolioService::new(
            ledger.clone(),
            Arc::new(MemoryTransactionLog::new()),
        ));
        let config = PlatformConfig::default();
        let mut ctx = ServiceContext::new(chain.clone(), ledger.clone(), portfolio.clone(), &config);
        ctx.retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };
        Harness {
            chain,
            ledger,
            portfolio,
            ctx,
        }
    }

    #[test]
    fn test_amount_validation() {
        assert!(ensure_positive("amount", 1.0).is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(ensure_positive("amount", bad).is_err(), "{bad}");
        }
    }
}
