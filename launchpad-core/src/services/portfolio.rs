// Wallet portfolios derived from ledger balances and the transaction log.
//
// Nothing here is stored except the value series used for performance.
// Every tracked transaction recomputes the owner's portfolio and pushes it
// to subscribers and the optional event sink.

use super::TransactionTracker;
use crate::chain::{validate_public_key, NATIVE_MINT};
use crate::config::PlatformLimits;
use crate::error::{ErrorCategory, ErrorCode, PlatformError, Result};
use crate::events::EventSink;
use crate::ledger::{Ledger, LedgerState};
use crate::models::{
    ExportFormat, PlatformTransaction, Portfolio, PortfolioPerformance, PortfolioSummary,
    PortfolioToken, Timeframe, TokenAllocation, TokenMetadata, TokenSource, TransactionType,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::tx_log::TransactionLog;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const RECENT_ACTIVITY: usize = 5;
const MAX_SERIES_POINTS: usize = 10_000;

pub type PortfolioCallback = Arc<dyn Fn(Portfolio) + Send + Sync>;

type Registry = Mutex<HashMap<String, Vec<(u64, PortfolioCallback)>>>;

#[async_trait]
pub trait PortfolioService: Send + Sync {
    async fn get_user_portfolio(&self, wallet: &str) -> Result<Portfolio>;

    /// Recomputes the portfolio and pushes it to subscribers.
    async fn refresh_portfolio(&self, wallet: &str) -> Result<Portfolio>;

    /// Newest first.
    async fn get_transaction_history(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<PlatformTransaction>>;

    fn calculate_portfolio_value(&self, portfolio: &Portfolio) -> f64;

    async fn get_portfolio_performance(
        &self,
        wallet: &str,
        timeframe: Timeframe,
    ) -> Result<PortfolioPerformance>;

    /// Holdings ordered by value, largest first.
    async fn get_token_allocation(&self, wallet: &str) -> Result<Vec<TokenAllocation>>;

    async fn get_portfolio_summary(&self, wallet: &str) -> Result<PortfolioSummary>;

    async fn export_portfolio_data(&self, wallet: &str, format: ExportFormat) -> Result<String>;

    fn subscribe_to_portfolio_updates(
        &self,
        wallet: &str,
        callback: PortfolioCallback,
    ) -> Result<PortfolioSubscription>;
}

/// Handle for a portfolio callback. Dropping it unsubscribes.
pub struct PortfolioSubscription {
    id: u64,
    wallet: String,
    registry: Weak<Registry>,
}

impl PortfolioSubscription {
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for PortfolioSubscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut subscribers = registry.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(callbacks) = subscribers.get_mut(&self.wallet) {
            callbacks.retain(|(id, _)| *id != self.id);
            if callbacks.is_empty() {
                subscribers.remove(&self.wallet);
            }
        }
    }
}

pub struct MemoryPortfolioService {
    ledger: Arc<Ledger>,
    log: Arc<dyn TransactionLog>,
    events: Option<Arc<dyn EventSink>>,
    limits: PlatformLimits,
    value_series: RwLock<HashMap<String, Vec<(DateTime<Utc>, f64)>>>,
    subscribers: Arc<Registry>,
    next_subscription: AtomicU64,
}

fn ensure_wallet(wallet: &str) -> Result<()> {
    if validate_public_key(wallet) {
        Ok(())
    } else {
        Err(PlatformError::invalid_wallet(wallet))
    }
}

fn source_label(source: TokenSource) -> &'static str {
    match source {
        TokenSource::Minted => "minted",
        TokenSource::IcoPurchase => "ico_purchase",
        TokenSource::Airdrop => "airdrop",
        TokenSource::Trading => "trading",
        TokenSource::LiquidityProvision => "liquidity_provision",
    }
}

/// How `wallet` first came to hold `mint`, judged from its own history.
fn provenance(state: &LedgerState, wallet: &str, mint: &str, history: &[PlatformTransaction]) -> TokenSource {
    let account = state.mint(mint);
    if account.is_some_and(|m| m.lp_of_pool.is_some()) {
        return TokenSource::LiquidityProvision;
    }

    for tx in history {
        let details = &tx.details;
        let about_mint = details.token_mint.as_deref() == Some(mint);
        let source = match tx.transaction_type {
            TransactionType::TokenMint if about_mint => Some(TokenSource::Minted),
            TransactionType::IcoPurchase if about_mint => Some(TokenSource::IcoPurchase),
            TransactionType::AirdropExecution
                if about_mint && details.recipient.as_deref() == Some(wallet) =>
            {
                Some(TokenSource::Airdrop)
            }
            TransactionType::TokenSwap
                if details.extra.get("outputToken").and_then(|v| v.as_str()) == Some(mint) =>
            {
                Some(TokenSource::Trading)
            }
            TransactionType::LiquidityRemove => details
                .pool_address
                .as_deref()
                .and_then(|pool| state.pool(pool))
                .filter(|pool| pool.pool.token_a == mint || pool.pool.token_b == mint)
                .map(|_| TokenSource::LiquidityProvision),
            _ => None,
        };
        if let Some(source) = source {
            return source;
        }
    }

    match account {
        Some(m) if m.token.creator == wallet => TokenSource::Minted,
        _ => TokenSource::Trading,
    }
}

/// Token holdings of `wallet` valued in SOL. Native SOL is not listed.
fn compute_portfolio(state: &LedgerState, wallet: &str, history: &[PlatformTransaction]) -> Portfolio {
    let tokens: Vec<PortfolioToken> = state
        .holdings(wallet)
        .into_iter()
        .filter(|(mint, _)| mint != NATIVE_MINT)
        .map(|(mint, balance)| {
            let price = state.price_in_sol(&mint).unwrap_or(0.0);
            let (name, symbol, metadata) = match state.mint(&mint) {
                Some(m) => (m.token.name.clone(), m.token.symbol.clone(), m.token.metadata.clone()),
                None => (String::new(), String::new(), TokenMetadata::default()),
            };
            PortfolioToken {
                source: provenance(state, wallet, &mint, history),
                mint_address: mint,
                name,
                symbol,
                balance,
                value: balance * price,
                metadata,
            }
        })
        .collect();

    Portfolio {
        wallet_address: wallet.to_string(),
        total_value: tokens.iter().map(|t| t.value).sum(),
        tokens,
        last_updated: Utc::now(),
    }
}

fn export_error(e: impl std::fmt::Display) -> PlatformError {
    PlatformError::new(
        ErrorCode::InvalidParameters,
        ErrorCategory::Validation,
        format!("portfolio export failed: {e}"),
        false,
    )
}

fn portfolio_csv(portfolio: &Portfolio) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["mint_address", "name", "symbol", "balance", "value", "source"])
        .map_err(export_error)?;
    for token in &portfolio.tokens {
        writer
            .write_record([
                token.mint_address.as_str(),
                token.name.as_str(),
                token.symbol.as_str(),
                token.balance.to_string().as_str(),
                token.value.to_string().as_str(),
                source_label(token.source),
            ])
            .map_err(export_error)?;
    }
    let bytes = writer.into_inner().map_err(export_error)?;
    String::from_utf8(bytes).map_err(export_error)
}

impl MemoryPortfolioService {
    pub fn new(ledger: Arc<Ledger>, log: Arc<dyn TransactionLog>) -> Self {
        Self {
            ledger,
            log,
            events: None,
            limits: PlatformLimits::default(),
            value_series: RwLock::new(HashMap::new()),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn with_limits(mut self, limits: PlatformLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn subscriber_count(&self, wallet: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(wallet)
            .map_or(0, Vec::len)
    }

    async fn compute(&self, wallet: &str) -> Result<Portfolio> {
        ensure_wallet(wallet)?;
        let history = self.log.list_for_wallet(wallet).await?;
        Ok(self
            .ledger
            .read(|state| compute_portfolio(state, wallet, &history))
            .await)
    }

    /// Appends a value point and drops points no timeframe can reach. The newest
    /// point older than the longest window is kept as that window's baseline.
    async fn record_value(&self, portfolio: &Portfolio) {
        let horizon = portfolio.last_updated - Timeframe::Year.duration();
        let mut series = self.value_series.write().await;
        let points = series.entry(portfolio.wallet_address.clone()).or_default();
        points.push((portfolio.last_updated, portfolio.total_value));

        let expired = points.iter().take_while(|(at, _)| *at < horizon).count();
        if expired > 1 {
            points.drain(..expired - 1);
        }
        if points.len() > MAX_SERIES_POINTS {
            let excess = points.len() - MAX_SERIES_POINTS;
            points.drain(..excess);
        }
    }

    #[cfg(test)]
    async fn series_len(&self, wallet: &str) -> usize {
        self.value_series.read().await.get(wallet).map_or(0, Vec::len)
    }

    async fn notify(&self, portfolio: &Portfolio) {
        let callbacks: Vec<PortfolioCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&portfolio.wallet_address)
            .map(|entries| entries.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        debug!(
            "Portfolio of {} updated, notifying {} subscribers",
            portfolio.wallet_address,
            callbacks.len()
        );
        for callback in callbacks {
            callback(portfolio.clone());
        }
        if let Some(events) = &self.events {
            events.portfolio_updated(portfolio).await;
        }
    }
}

#[async_trait]
impl TransactionTracker for MemoryPortfolioService {
    async fn track_transaction(&self, tx: PlatformTransaction) -> Result<()> {
        let wallet = tx.wallet_address.clone();
        if !self.log.append(tx.clone()).await? {
            warn!("Transaction {} already tracked, ignoring", tx.id);
            return Ok(());
        }
        if let Some(events) = &self.events {
            events.transaction_tracked(&tx).await;
        }
        self.refresh_portfolio(&wallet).await?;
        Ok(())
    }
}

#[async_trait]
impl PortfolioService for MemoryPortfolioService {
    async fn get_user_portfolio(&self, wallet: &str) -> Result<Portfolio> {
        self.compute(wallet).await
    }

    async fn refresh_portfolio(&self, wallet: &str) -> Result<Portfolio> {
        let portfolio = self.compute(wallet).await?;
        self.record_value(&portfolio).await;
        self.notify(&portfolio).await;
        Ok(portfolio)
    }

    async fn get_transaction_history(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<PlatformTransaction>> {
        ensure_wallet(wallet)?;
        let mut txs = self.log.list_for_wallet(wallet).await?;
        txs.reverse();
        let params = PaginationParams::normalize(
            pagination,
            self.limits.default_page_size,
            self.limits.max_page_size,
        );
        Ok(PaginatedResponse::from_items(txs, params))
    }

    fn calculate_portfolio_value(&self, portfolio: &Portfolio) -> f64 {
        portfolio.tokens.iter().map(|t| t.value).sum()
    }

    async fn get_portfolio_performance(
        &self,
        wallet: &str,
        timeframe: Timeframe,
    ) -> Result<PortfolioPerformance> {
        let current = self.compute(wallet).await?;
        let cutoff = current.last_updated - timeframe.duration();

        let previous_value = {
            let series = self.value_series.read().await;
            let points = series.get(wallet).map(Vec::as_slice).unwrap_or_default();
            // Last point at or before the cutoff, else the oldest one we have.
            points
                .iter()
                .rev()
                .find(|(at, _)| *at <= cutoff)
                .or_else(|| points.first())
                .map_or(current.total_value, |(_, value)| *value)
        };

        let change_amount = current.total_value - previous_value;
        let change_percent = if previous_value > 0.0 {
            change_amount / previous_value * 100.0
        } else {
            0.0
        };
        Ok(PortfolioPerformance {
            current_value: current.total_value,
            previous_value,
            change_percent,
            change_amount,
        })
    }

    async fn get_token_allocation(&self, wallet: &str) -> Result<Vec<TokenAllocation>> {
        let portfolio = self.compute(wallet).await?;
        let total = portfolio.total_value;
        let mut allocation: Vec<TokenAllocation> = portfolio
            .tokens
            .into_iter()
            .map(|token| TokenAllocation {
                percentage: if total > 0.0 { token.value / total * 100.0 } else { 0.0 },
                value: token.value,
                token,
            })
            .collect();
        allocation.sort_by(|a, b| b.value.total_cmp(&a.value));
        Ok(allocation)
    }

    async fn get_portfolio_summary(&self, wallet: &str) -> Result<PortfolioSummary> {
        let portfolio = self.compute(wallet).await?;
        let history = self.log.list_for_wallet(wallet).await?;

        let most_valuable_token = portfolio
            .tokens
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
            .cloned();
        let recent_activity = history.iter().rev().take(RECENT_ACTIVITY).cloned().collect();

        Ok(PortfolioSummary {
            total_tokens: portfolio.tokens.len(),
            total_value: portfolio.total_value,
            total_transactions: history.len(),
            most_valuable_token,
            recent_activity,
        })
    }

    async fn export_portfolio_data(&self, wallet: &str, format: ExportFormat) -> Result<String> {
        let portfolio = self.compute(wallet).await?;
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&portfolio)?),
            ExportFormat::Csv => portfolio_csv(&portfolio),
        }
    }

    fn subscribe_to_portfolio_updates(
        &self,
        wallet: &str,
        callback: PortfolioCallback,
    ) -> Result<PortfolioSubscription> {
        ensure_wallet(wallet)?;
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(wallet.to_string())
            .or_default()
            .push((id, callback));

        Ok(PortfolioSubscription {
            id,
            wallet: wallet.to_string(),
            registry: Arc::downgrade(&self.subscribers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MintAccount, Transfer};
    use crate::models::{
        DexProtocol, PoolLiquidity, SlippageGuard, SwapRequest, Token, TransactionDetails,
    };
    use crate::services::testing::{harness, wallet, Harness};
    use crate::services::{LiquidityPoolService, MemoryPoolService};
    use crate::tx_log::MemoryTransactionLog;

    async fn seed_token(h: &Harness, holder: &str, symbol: &str, amount: f64) -> String {
        let mint = wallet();
        let token = Token {
            mint_address: mint.clone(),
            name: format!("{symbol} Token"),
            symbol: symbol.to_string(),
            decimals: 6,
            supply: amount,
            description: String::new(),
            image_url: String::new(),
            creator: holder.to_string(),
            created_at: Utc::now(),
            metadata: TokenMetadata::default(),
        };
        h.ledger
            .write(|s| {
                s.register_mint(MintAccount {
                    token,
                    update_authority: Some(holder.to_string()),
                    lp_of_pool: None,
                })?;
                s.credit(holder, &mint, amount);
                Ok::<_, PlatformError>(())
            })
            .await
            .unwrap();
        mint
    }

    /// Creator holds `mint` and a SOL pool priced at 0.01 SOL per token.
    async fn priced_token(h: &Harness) -> (String, String, String) {
        let creator = wallet();
        let mint = seed_token(h, &creator, "AAA", 10_000.0).await;
        h.ledger.airdrop_native(&creator, 50.0).await;
        let pools = MemoryPoolService::new(h.ctx.clone());
        let pool = pools
            .create_pool(
                &creator,
                &mint,
                NATIVE_MINT,
                PoolLiquidity {
                    token_a_amount: 1_000.0,
                    token_b_amount: 10.0,
                },
                Some(DexProtocol::Raydium),
            )
            .await
            .unwrap();
        (creator, mint, pool)
    }

    #[tokio::test]
    async fn test_portfolio_values_tokens_and_pool_shares() {
        let h = harness();
        let (creator, mint, pool) = priced_token(&h).await;
        let portfolio = h.portfolio.get_user_portfolio(&creator).await.unwrap();

        assert_eq!(portfolio.tokens.len(), 2);
        let token = portfolio.tokens.iter().find(|t| t.mint_address == mint).unwrap();
        assert_eq!(token.balance, 9_000.0);
        assert!((token.value - 90.0).abs() < 1e-9);
        assert_eq!(token.source, TokenSource::Minted);

        let lp_mint = h.ledger.read(|s| s.pool(&pool).unwrap().lp_mint.clone()).await;
        let share = portfolio.tokens.iter().find(|t| t.mint_address == lp_mint).unwrap();
        assert_eq!(share.source, TokenSource::LiquidityProvision);
        // The creator owns the whole pool: 10 SOL + 1000 tokens at 0.01.
        assert!((share.value - 20.0).abs() < 1e-9);

        assert!((portfolio.total_value - 110.0).abs() < 1e-9);
        assert_eq!(h.portfolio.calculate_portfolio_value(&portfolio), portfolio.total_value);
    }

    #[tokio::test]
    async fn test_provenance_follows_history() {
        let h = harness();
        let (_creator, mint, _pool) = priced_token(&h).await;
        let trader = wallet();
        h.ledger.airdrop_native(&trader, 2.0).await;

        MemoryPoolService::new(h.ctx.clone())
            .swap_tokens(
                &trader,
                SwapRequest {
                    input_token: NATIVE_MINT.to_string(),
                    output_token: mint.clone(),
                    amount: 1.0,
                    guard: SlippageGuard::Tolerance(50.0),
                },
            )
            .await
            .unwrap();

        let portfolio = h.portfolio.get_user_portfolio(&trader).await.unwrap();
        assert_eq!(portfolio.tokens.len(), 1);
        assert_eq!(portfolio.tokens[0].source, TokenSource::Trading);

        let receiver = wallet();
        h.ledger
            .write(|s| s.execute_transfers(&[Transfer::new(&trader, &receiver, &mint, 1.0)]))
            .await
            .unwrap();
        h.portfolio
            .track_transaction(PlatformTransaction::confirmed(
                receiver.clone(),
                TransactionType::AirdropExecution,
                Some("sig".to_string()),
                TransactionDetails::for_mint(mint.clone())
                    .with_amount(1.0)
                    .with_recipient(receiver.clone()),
            ))
            .await
            .unwrap();
        let portfolio = h.portfolio.get_user_portfolio(&receiver).await.unwrap();
        assert_eq!(portfolio.tokens[0].source, TokenSource::Airdrop);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paginated() {
        let h = harness();
        let alice = wallet();
        let kinds = [
            TransactionType::TokenMint,
            TransactionType::IcoCreation,
            TransactionType::PoolCreation,
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            let mut tx = PlatformTransaction::confirmed(alice.clone(), kind, None, TransactionDetails::default());
            tx.timestamp = Utc::now() + chrono::Duration::seconds(i as i64);
            h.portfolio.track_transaction(tx).await.unwrap();
        }

        let page = h
            .portfolio
            .get_transaction_history(&alice, Some(PaginationParams::new(1, 2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.has_next);
        assert!(!page.has_prev);
        assert_eq!(page.data[0].transaction_type, TransactionType::PoolCreation);
        assert_eq!(page.data[1].transaction_type, TransactionType::IcoCreation);

        let err = h.portfolio.get_transaction_history("nope", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidWalletAddress);
    }

    #[tokio::test]
    async fn test_tracking_is_idempotent_per_id() {
        let h = harness();
        let alice = wallet();
        let tx = PlatformTransaction::confirmed(alice.clone(), TransactionType::TokenSwap, None, TransactionDetails::default());
        h.portfolio.track_transaction(tx.clone()).await.unwrap();
        h.portfolio.track_transaction(tx).await.unwrap();
        let history = h.portfolio.get_transaction_history(&alice, None).await.unwrap();
        assert_eq!(history.total, 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates_until_dropped() {
        let log = Arc::new(MemoryTransactionLog::new());
        let service = MemoryPortfolioService::new(Arc::new(Ledger::new()), log);
        let alice = wallet();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let first = service
            .subscribe_to_portfolio_updates(
                &alice,
                Arc::new(move |p: Portfolio| sink.lock().unwrap().push(p.wallet_address)),
            )
            .unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        let hits = counter.clone();
        let second = service
            .subscribe_to_portfolio_updates(
                &alice,
                Arc::new(move |_: Portfolio| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(service.subscriber_count(&alice), 2);

        service.refresh_portfolio(&alice).await.unwrap();
        first.unsubscribe();
        service.refresh_portfolio(&alice).await.unwrap();
        drop(second);
        service.refresh_portfolio(&alice).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![alice.clone()]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(service.subscriber_count(&alice), 0);

        assert!(service
            .subscribe_to_portfolio_updates("bad", Arc::new(|_: Portfolio| {}))
            .is_err());
    }

    #[tokio::test]
    async fn test_allocation_summary_and_performance() {
        let h = harness();
        let (creator, mint, _pool) = priced_token(&h).await;
        let other = seed_token(&h, &creator, "BBB", 5.0).await;

        let allocation = h.portfolio.get_token_allocation(&creator).await.unwrap();
        assert_eq!(allocation.len(), 3);
        assert_eq!(allocation[0].token.mint_address, mint);
        assert!((allocation[0].percentage - 90.0 / 110.0 * 100.0).abs() < 1e-9);
        let unpriced = allocation.iter().find(|a| a.token.mint_address == other).unwrap();
        assert_eq!(unpriced.value, 0.0);
        let total: f64 = allocation.iter().map(|a| a.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let summary = h.portfolio.get_portfolio_summary(&creator).await.unwrap();
        assert_eq!(summary.total_tokens, 3);
        assert_eq!(summary.total_transactions, 1);
        assert_eq!(summary.most_valuable_token.unwrap().mint_address, mint);
        assert_eq!(summary.recent_activity.len(), 1);

        // The series starts at the pool creation refresh, so value is flat.
        let perf = h
            .portfolio
            .get_portfolio_performance(&creator, Timeframe::Day)
            .await
            .unwrap();
        assert!((perf.current_value - 110.0).abs() < 1e-9);
        assert!((perf.previous_value - 110.0).abs() < 1e-9);
        assert!(perf.change_amount.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reads_do_not_grow_value_series() {
        let h = harness();
        let (creator, _mint, _pool) = priced_token(&h).await;
        let before = h.portfolio.series_len(&creator).await;
        assert!(before > 0);

        for _ in 0..20 {
            h.portfolio.get_user_portfolio(&creator).await.unwrap();
            h.portfolio.get_token_allocation(&creator).await.unwrap();
            h.portfolio.get_portfolio_summary(&creator).await.unwrap();
            h.portfolio
                .get_portfolio_performance(&creator, Timeframe::Week)
                .await
                .unwrap();
        }
        assert_eq!(h.portfolio.series_len(&creator).await, before);

        h.portfolio.refresh_portfolio(&creator).await.unwrap();
        assert_eq!(h.portfolio.series_len(&creator).await, before + 1);
    }

    #[tokio::test]
    async fn test_export_formats() {
        let h = harness();
        let (creator, mint, _pool) = priced_token(&h).await;

        let csv = h
            .portfolio
            .export_portfolio_data(&creator, ExportFormat::Csv)
            .await
            .unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("mint_address,name,symbol,balance,value,source"));
        assert!(csv.contains(&format!("{mint},AAA Token,AAA,9000,")));
        assert!(csv.contains(",liquidity_provision"));

        let json = h
            .portfolio
            .export_portfolio_data(&creator, ExportFormat::Json)
            .await
            .unwrap();
        let parsed: Portfolio = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.wallet_address, creator);
        assert_eq!(parsed.tokens.len(), 2);
    }
}
