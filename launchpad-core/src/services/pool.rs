// Constant-product liquidity pools.
//
// Reserves live in the ledger next to balances so portfolio valuation can
// read spot prices. Pool shares are a ledger token minted per pool.

use super::{ensure_positive, ServiceContext};
use crate::chain::{derive_address, TransactionRequest, NATIVE_MINT};
use crate::error::{ErrorCode, PlatformError, Result};
use crate::ledger::{LedgerState, MintAccount, PoolAccount, SwapRecord, Transfer, DUST};
use crate::models::{
    DexProtocol, LiquidityPool, PlatformTransaction, PoolLiquidity, PoolStatistics, SlippageGuard,
    SwapQuote, SwapRequest, SwapResult, Timeframe, Token, TokenAmounts, TokenMetadata,
    TransactionDetails, TransactionType,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

#[async_trait]
pub trait LiquidityPoolService: Send + Sync {
    async fn create_pool(
        &self,
        creator: &str,
        token_a: &str,
        token_b: &str,
        liquidity: PoolLiquidity,
        protocol: Option<DexProtocol>,
    ) -> Result<String>;

    async fn add_liquidity(&self, pool: &str, provider: &str, amounts: TokenAmounts) -> Result<String>;

    async fn remove_liquidity(&self, pool: &str, provider: &str, lp_tokens: f64) -> Result<String>;

    async fn get_pool_info(&self, pool: &str) -> Result<LiquidityPool>;

    async fn get_pools_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<LiquidityPool>>;

    async fn get_pools_for_token(
        &self,
        mint: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<LiquidityPool>>;

    /// Side-effect free quote against the best pool for the pair.
    async fn get_swap_quote(
        &self,
        input_token: &str,
        output_token: &str,
        amount: f64,
        slippage_tolerance: Option<f64>,
    ) -> Result<SwapQuote>;

    async fn swap_tokens(&self, trader: &str, request: SwapRequest) -> Result<SwapResult>;

    /// Highest liquidity, then lowest protocol fee, then oldest.
    async fn get_best_pool(&self, token_a: &str, token_b: &str) -> Result<Option<LiquidityPool>>;

    async fn get_pool_statistics(&self, pool: &str, timeframe: Timeframe) -> Result<PoolStatistics>;

    fn get_supported_protocols(&self) -> Vec<DexProtocol>;

    async fn pool_exists(
        &self,
        token_a: &str,
        token_b: &str,
        protocol: Option<DexProtocol>,
    ) -> Result<bool>;
}

/// Result of pushing `amount_in` through a constant-product curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveOutput {
    pub output: f64,
    pub fee: f64,
    /// Output at the pre-trade spot price with no fee.
    pub spot_output: f64,
    pub price_impact: f64,
}

pub fn constant_product_out(
    amount_in: f64,
    reserve_in: f64,
    reserve_out: f64,
    fee_bps: u32,
) -> Result<CurveOutput> {
    if reserve_in <= 0.0 || reserve_out <= 0.0 {
        return Err(PlatformError::validation(
            ErrorCode::InsufficientLiquidity,
            "pool has no liquidity",
        ));
    }
    let fee = amount_in * fee_bps as f64 / 10_000.0;
    let net_in = amount_in - fee;
    let output = reserve_out * net_in / (reserve_in + net_in);
    let spot_output = amount_in * reserve_out / reserve_in;
    let price_impact = if spot_output > 0.0 {
        ((spot_output - output) / spot_output * 100.0).max(0.0)
    } else {
        0.0
    };
    Ok(CurveOutput {
        output,
        fee,
        spot_output,
        price_impact,
    })
}

fn pool_not_found(pool: &str) -> PlatformError {
    PlatformError::validation(ErrorCode::PoolNotFound, format!("pool {pool} not found"))
}

fn symbol_of(state: &LedgerState, mint: &str) -> String {
    if mint == NATIVE_MINT {
        return "SOL".to_string();
    }
    state
        .mint(mint)
        .map(|m| m.token.symbol.clone())
        .unwrap_or_else(|| mint.chars().take(4).collect())
}

/// Pool value in SOL when both sides can be priced, geometric depth otherwise.
fn pool_liquidity(state: &LedgerState, account: &PoolAccount) -> f64 {
    if account.pool.token_a == NATIVE_MINT {
        return 2.0 * account.reserve_a;
    }
    if account.pool.token_b == NATIVE_MINT {
        return 2.0 * account.reserve_b;
    }
    match (
        state.price_in_sol(&account.pool.token_a),
        state.price_in_sol(&account.pool.token_b),
    ) {
        (Some(pa), Some(pb)) => account.reserve_a * pa + account.reserve_b * pb,
        _ => 2.0 * (account.reserve_a * account.reserve_b).sqrt(),
    }
}

fn statistics(account: &PoolAccount, since: DateTime<Utc>, window: Duration) -> PoolStatistics {
    let (mut volume, mut fees, mut transactions) = (0.0, 0.0, 0);
    for swap in account.swaps_since(since) {
        volume += swap.volume;
        fees += swap.fee;
        transactions += 1;
    }
    let depth = 2.0 * account.reserve_b;
    let window_days = window.num_seconds() as f64 / 86_400.0;
    let apy = if depth > 0.0 && window_days > 0.0 {
        fees / depth * (365.0 / window_days) * 100.0
    } else {
        0.0
    };
    PoolStatistics {
        volume,
        fees,
        apy,
        transactions,
    }
}

/// Public view of a pool with its rolling 24h figures.
fn view(state: &LedgerState, account: &PoolAccount, now: DateTime<Utc>) -> LiquidityPool {
    let day = Timeframe::Day.duration();
    let stats = statistics(account, now - day, day);
    LiquidityPool {
        total_liquidity: pool_liquidity(state, account),
        volume_24h: stats.volume,
        fees_24h: stats.fees,
        apy: stats.apy,
        ..account.pool.clone()
    }
}

fn best_of<'a>(state: &'a LedgerState, a: &str, b: &str) -> Option<&'a PoolAccount> {
    state
        .pools()
        .filter(|p| p.matches_pair(a, b))
        .max_by(|x, y| {
            pool_liquidity(state, x)
                .total_cmp(&pool_liquidity(state, y))
                .then_with(|| y.pool.protocol.fee_bps().cmp(&x.pool.protocol.fee_bps()))
                .then_with(|| y.pool.created_at.cmp(&x.pool.created_at))
                .then_with(|| y.pool.address.cmp(&x.pool.address))
        })
}

pub struct MemoryPoolService {
    ctx: ServiceContext,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryPoolService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn pool_lock(&self, pool: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(pool) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(pool.to_string())
            .or_default()
            .clone()
    }

    async fn account(&self, pool: &str) -> Result<PoolAccount> {
        self.ctx
            .ledger
            .read(|state| state.pool(pool).cloned())
            .await
            .ok_or_else(|| pool_not_found(pool))
    }

    fn resolve_tolerance(&self, tolerance: Option<f64>) -> Result<f64> {
        let limits = &self.ctx.limits;
        let tolerance = tolerance.unwrap_or(limits.default_slippage_tolerance);
        if !(tolerance.is_finite() && (0.0..=limits.max_slippage_tolerance).contains(&tolerance)) {
            return Err(PlatformError::invalid_params(format!(
                "slippage tolerance must be between 0 and {}%",
                limits.max_slippage_tolerance
            )));
        }
        Ok(tolerance)
    }

    async fn paginated(
        &self,
        pagination: Option<PaginationParams>,
        keep: impl Fn(&PoolAccount) -> bool + Send + Sync,
    ) -> PaginatedResponse<LiquidityPool> {
        let now = Utc::now();
        let mut pools: Vec<LiquidityPool> = self
            .ctx
            .ledger
            .read(|state| {
                state
                    .pools()
                    .filter(|p| keep(p))
                    .map(|p| view(state, p, now))
                    .collect()
            })
            .await;
        pools.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        PaginatedResponse::from_items(pools, self.ctx.page(pagination))
    }
}

#[async_trait]
impl LiquidityPoolService for MemoryPoolService {
    async fn create_pool(
        &self,
        creator: &str,
        token_a: &str,
        token_b: &str,
        liquidity: PoolLiquidity,
        protocol: Option<DexProtocol>,
    ) -> Result<String> {
        self.ctx.ensure_wallet(creator)?;
        self.ctx.ensure_known_mint(token_a).await?;
        self.ctx.ensure_known_mint(token_b).await?;
        if token_a == token_b {
            return Err(PlatformError::invalid_params("a pool needs two different tokens"));
        }
        ensure_positive("token A amount", liquidity.token_a_amount)?;
        ensure_positive("token B amount", liquidity.token_b_amount)?;

        let min_sol = self.ctx.limits.min_initial_liquidity;
        let sol_side = if token_a == NATIVE_MINT {
            Some(liquidity.token_a_amount)
        } else if token_b == NATIVE_MINT {
            Some(liquidity.token_b_amount)
        } else {
            None
        };
        if let Some(sol) = sol_side {
            if sol < min_sol {
                return Err(PlatformError::validation(
                    ErrorCode::InsufficientLiquidity,
                    format!("initial liquidity must be at least {min_sol} SOL, got {sol}"),
                ));
            }
        }

        let (have_a, have_b) = self
            .ctx
            .ledger
            .read(|s| (s.balance(creator, token_a), s.balance(creator, token_b)))
            .await;
        if have_a + DUST < liquidity.token_a_amount {
            return Err(PlatformError::insufficient_balance(
                creator,
                token_a,
                liquidity.token_a_amount,
                have_a,
            ));
        }
        if have_b + DUST < liquidity.token_b_amount {
            return Err(PlatformError::insufficient_balance(
                creator,
                token_b,
                liquidity.token_b_amount,
                have_b,
            ));
        }

        let protocol = protocol.unwrap_or(DexProtocol::Raydium);
        let nonce = uuid::Uuid::new_v4().to_string();
        let address = derive_address(&[
            b"pool",
            token_a.as_bytes(),
            token_b.as_bytes(),
            protocol.as_str().as_bytes(),
            nonce.as_bytes(),
        ]);
        let lp_mint = derive_address(&[b"lp", address.as_bytes()]);

        let request = TransactionRequest::new(TransactionType::PoolCreation.as_str(), creator)
            .with_account(address.clone())
            .with_account(lp_mint.clone())
            .with_signatures(2);
        let signature = self.ctx.submit(&request).await?;

        let lp_amount = (liquidity.token_a_amount * liquidity.token_b_amount).sqrt();
        let now = Utc::now();

        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[
                    Transfer::new(creator, &address, token_a, liquidity.token_a_amount),
                    Transfer::new(creator, &address, token_b, liquidity.token_b_amount),
                ])?;

                let name = format!("{}-{} LP", symbol_of(state, token_a), symbol_of(state, token_b));
                state.register_mint(MintAccount {
                    token: Token {
                        mint_address: lp_mint.clone(),
                        name: name.clone(),
                        symbol: "LP".to_string(),
                        decimals: 9,
                        supply: 0.0,
                        description: format!("{} pool share", protocol.as_str()),
                        image_url: String::new(),
                        creator: creator.to_string(),
                        created_at: now,
                        metadata: TokenMetadata {
                            name,
                            symbol: "LP".to_string(),
                            ..TokenMetadata::default()
                        },
                    },
                    update_authority: None,
                    lp_of_pool: Some(address.clone()),
                })?;
                state.mint_to(creator, &lp_mint, lp_amount);

                state.insert_pool(PoolAccount {
                    pool: LiquidityPool {
                        address: address.clone(),
                        token_a: token_a.to_string(),
                        token_b: token_b.to_string(),
                        creator: creator.to_string(),
                        total_liquidity: 0.0,
                        volume_24h: 0.0,
                        fees_24h: 0.0,
                        apy: 0.0,
                        protocol,
                        created_at: now,
                    },
                    reserve_a: liquidity.token_a_amount,
                    reserve_b: liquidity.token_b_amount,
                    lp_mint: lp_mint.clone(),
                    lp_supply: lp_amount,
                    swaps: Vec::new(),
                });
                Ok::<_, PlatformError>(())
            })
            .await?;

        info!(
            "Pool {} created on {} by {}: {} / {}",
            address,
            protocol.as_str(),
            creator,
            liquidity.token_a_amount,
            liquidity.token_b_amount
        );

        self.ctx
            .track(PlatformTransaction::confirmed(
                creator,
                TransactionType::PoolCreation,
                Some(signature),
                TransactionDetails::default()
                    .with_pool(address.clone())
                    .with_amount(lp_amount)
                    .with_extra("tokenA", token_a)
                    .with_extra("tokenB", token_b)
                    .with_extra("tokenAAmount", liquidity.token_a_amount)
                    .with_extra("tokenBAmount", liquidity.token_b_amount)
                    .with_extra("protocol", protocol.as_str()),
            ))
            .await;

        Ok(address)
    }

    async fn add_liquidity(&self, pool: &str, provider: &str, amounts: TokenAmounts) -> Result<String> {
        self.ctx.ensure_wallet(provider)?;
        ensure_positive("token A amount", amounts.token_a)?;
        ensure_positive("token B amount", amounts.token_b)?;

        let lock = self.pool_lock(pool).await;
        let _guard = lock.lock().await;
        let account = self.account(pool).await?;

        if account.reserve_a <= 0.0 || account.reserve_b <= 0.0 || account.lp_supply <= 0.0 {
            return Err(PlatformError::validation(
                ErrorCode::InsufficientLiquidity,
                format!("pool {pool} is empty"),
            ));
        }
        // Deposit at the current ratio; the excess on the larger side stays with the provider.
        let ratio = (amounts.token_a / account.reserve_a).min(amounts.token_b / account.reserve_b);
        let deposit_a = ratio * account.reserve_a;
        let deposit_b = ratio * account.reserve_b;
        let lp_amount = ratio * account.lp_supply;

        let (token_a, token_b) = (account.pool.token_a.clone(), account.pool.token_b.clone());
        let (have_a, have_b) = self
            .ctx
            .ledger
            .read(|s| (s.balance(provider, &token_a), s.balance(provider, &token_b)))
            .await;
        if have_a + DUST < deposit_a {
            return Err(PlatformError::insufficient_balance(provider, &token_a, deposit_a, have_a));
        }
        if have_b + DUST < deposit_b {
            return Err(PlatformError::insufficient_balance(provider, &token_b, deposit_b, have_b));
        }

        let request = TransactionRequest::new(TransactionType::LiquidityAdd.as_str(), provider)
            .with_account(pool.to_string())
            .with_account(account.lp_mint.clone());
        let signature = self.ctx.submit(&request).await?;

        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[
                    Transfer::new(provider, pool, &token_a, deposit_a),
                    Transfer::new(provider, pool, &token_b, deposit_b),
                ])?;
                state.mint_to(provider, &account.lp_mint, lp_amount);
                let stored = state.pool_mut(pool).ok_or_else(|| pool_not_found(pool))?;
                stored.reserve_a += deposit_a;
                stored.reserve_b += deposit_b;
                stored.lp_supply += lp_amount;
                Ok::<_, PlatformError>(())
            })
            .await?;

        debug!("{} added {} / {} to pool {}", provider, deposit_a, deposit_b, pool);

        self.ctx
            .track(PlatformTransaction::confirmed(
                provider,
                TransactionType::LiquidityAdd,
                Some(signature.clone()),
                TransactionDetails::for_mint(account.lp_mint.clone())
                    .with_pool(pool)
                    .with_amount(lp_amount)
                    .with_extra("tokenAAmount", deposit_a)
                    .with_extra("tokenBAmount", deposit_b),
            ))
            .await;

        Ok(signature)
    }

    async fn remove_liquidity(&self, pool: &str, provider: &str, lp_tokens: f64) -> Result<String> {
        self.ctx.ensure_wallet(provider)?;
        ensure_positive("LP token amount", lp_tokens)?;

        let lock = self.pool_lock(pool).await;
        let _guard = lock.lock().await;
        let account = self.account(pool).await?;

        if lp_tokens > account.lp_supply + DUST {
            return Err(PlatformError::validation(
                ErrorCode::InsufficientLiquidity,
                format!(
                    "pool {pool} has {} shares outstanding, {} requested",
                    account.lp_supply, lp_tokens
                ),
            ));
        }
        let held = self.ctx.ledger.balance(provider, &account.lp_mint).await;
        if held + DUST < lp_tokens {
            return Err(PlatformError::insufficient_balance(
                provider,
                &account.lp_mint,
                lp_tokens,
                held,
            ));
        }

        let share = (lp_tokens / account.lp_supply).min(1.0);
        let out_a = share * account.reserve_a;
        let out_b = share * account.reserve_b;

        let request = TransactionRequest::new(TransactionType::LiquidityRemove.as_str(), provider)
            .with_account(pool.to_string())
            .with_account(account.lp_mint.clone());
        let signature = self.ctx.submit(&request).await?;

        self.ctx
            .ledger
            .write(|state| {
                state.burn(provider, &account.lp_mint, lp_tokens)?;
                state.execute_transfers(&[
                    Transfer::new(pool, provider, &account.pool.token_a, out_a),
                    Transfer::new(pool, provider, &account.pool.token_b, out_b),
                ])?;
                let stored = state.pool_mut(pool).ok_or_else(|| pool_not_found(pool))?;
                stored.reserve_a = (stored.reserve_a - out_a).max(0.0);
                stored.reserve_b = (stored.reserve_b - out_b).max(0.0);
                stored.lp_supply = (stored.lp_supply - lp_tokens).max(0.0);
                Ok::<_, PlatformError>(())
            })
            .await?;

        debug!("{} withdrew {} / {} from pool {}", provider, out_a, out_b, pool);

        self.ctx
            .track(PlatformTransaction::confirmed(
                provider,
                TransactionType::LiquidityRemove,
                Some(signature.clone()),
                TransactionDetails::for_mint(account.lp_mint.clone())
                    .with_pool(pool)
                    .with_amount(lp_tokens)
                    .with_extra("tokenAAmount", out_a)
                    .with_extra("tokenBAmount", out_b),
            ))
            .await;

        Ok(signature)
    }

    async fn get_pool_info(&self, pool: &str) -> Result<LiquidityPool> {
        let now = Utc::now();
        self.ctx
            .ledger
            .read(|state| state.pool(pool).map(|p| view(state, p, now)))
            .await
            .ok_or_else(|| pool_not_found(pool))
    }

    async fn get_pools_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<LiquidityPool>> {
        self.ctx.ensure_wallet(wallet)?;
        Ok(self.paginated(pagination, |p| p.pool.creator == wallet).await)
    }

    async fn get_pools_for_token(
        &self,
        mint: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<LiquidityPool>> {
        if !self.ctx.chain.validate_address(mint) {
            return Err(PlatformError::invalid_mint(mint));
        }
        Ok(self
            .paginated(pagination, |p| p.pool.token_a == mint || p.pool.token_b == mint)
            .await)
    }

    async fn get_swap_quote(
        &self,
        input_token: &str,
        output_token: &str,
        amount: f64,
        slippage_tolerance: Option<f64>,
    ) -> Result<SwapQuote> {
        ensure_positive("swap amount", amount)?;
        let tolerance = self.resolve_tolerance(slippage_tolerance)?;

        let (reserves, fee_bps) = self
            .ctx
            .ledger
            .read(|state| {
                best_of(state, input_token, output_token)
                    .and_then(|p| Some((p.oriented_reserves(input_token)?, p.pool.protocol.fee_bps())))
            })
            .await
            .ok_or_else(|| {
                pool_not_found(&format!("{input_token}/{output_token}"))
            })?;

        let curve = constant_product_out(amount, reserves.0, reserves.1, fee_bps)?;
        Ok(SwapQuote {
            output_amount: curve.output,
            price_impact: curve.price_impact,
            minimum_received: curve.output * (1.0 - tolerance / 100.0),
            fee: curve.fee,
        })
    }

    async fn swap_tokens(&self, trader: &str, request: SwapRequest) -> Result<SwapResult> {
        self.ctx.ensure_wallet(trader)?;
        ensure_positive("swap amount", request.amount)?;
        match request.guard {
            SlippageGuard::Tolerance(t) => {
                self.resolve_tolerance(Some(t))?;
            }
            SlippageGuard::MinimumReceived(min) => {
                if !(min.is_finite() && min >= 0.0) {
                    return Err(PlatformError::invalid_amount("minimum received must be non-negative"));
                }
            }
        }
        let input = request.input_token.as_str();
        let output = request.output_token.as_str();

        let pool_address = self
            .ctx
            .ledger
            .read(|state| best_of(state, input, output).map(|p| p.pool.address.clone()))
            .await
            .ok_or_else(|| pool_not_found(&format!("{input}/{output}")))?;

        let lock = self.pool_lock(&pool_address).await;
        let _guard = lock.lock().await;
        let account = self.account(&pool_address).await?;

        let (reserve_in, reserve_out) = account
            .oriented_reserves(input)
            .ok_or_else(|| pool_not_found(&pool_address))?;
        let curve = constant_product_out(request.amount, reserve_in, reserve_out, account.pool.protocol.fee_bps())?;

        let floor = match request.guard {
            SlippageGuard::Tolerance(t) => curve.spot_output * (1.0 - t / 100.0),
            SlippageGuard::MinimumReceived(min) => min,
        };
        if curve.output < floor {
            return Err(PlatformError::validation(
                ErrorCode::SlippageExceeded,
                format!("swap would return {}, below the floor of {}", curve.output, floor),
            ));
        }

        let have = self.ctx.ledger.balance(trader, input).await;
        if have + DUST < request.amount {
            return Err(PlatformError::insufficient_balance(trader, input, request.amount, have));
        }

        let tx = TransactionRequest::new(TransactionType::TokenSwap.as_str(), trader)
            .with_account(pool_address.clone());
        let signature = self.ctx.submit(&tx).await?;

        let input_is_a = input == account.pool.token_a;
        let (volume, fee_in_b) = if input_is_a {
            (curve.output, curve.fee * account.spot_price())
        } else {
            (request.amount, curve.fee)
        };

        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[
                    Transfer::new(trader, &pool_address, input, request.amount),
                    Transfer::new(&pool_address, trader, output, curve.output),
                ])?;
                let stored = state
                    .pool_mut(&pool_address)
                    .ok_or_else(|| pool_not_found(&pool_address))?;
                if input_is_a {
                    stored.reserve_a += request.amount;
                    stored.reserve_b -= curve.output;
                } else {
                    stored.reserve_b += request.amount;
                    stored.reserve_a -= curve.output;
                }
                stored.swaps.push(SwapRecord {
                    timestamp: Utc::now(),
                    trader: trader.to_string(),
                    input_token: input.to_string(),
                    amount_in: request.amount,
                    amount_out: curve.output,
                    volume,
                    fee: fee_in_b,
                });
                Ok::<_, PlatformError>(())
            })
            .await?;

        info!(
            "{} swapped {} {} for {} {} in pool {}",
            trader, request.amount, input, curve.output, output, pool_address
        );

        self.ctx
            .track(PlatformTransaction::confirmed(
                trader,
                TransactionType::TokenSwap,
                Some(signature.clone()),
                TransactionDetails::for_mint(input)
                    .with_amount(request.amount)
                    .with_pool(pool_address.clone())
                    .with_extra("outputToken", output)
                    .with_extra("outputAmount", curve.output)
                    .with_extra("priceImpact", curve.price_impact),
            ))
            .await;

        Ok(SwapResult {
            signature,
            output_amount: curve.output,
            price_impact: curve.price_impact,
        })
    }

    async fn get_best_pool(&self, token_a: &str, token_b: &str) -> Result<Option<LiquidityPool>> {
        let now = Utc::now();
        Ok(self
            .ctx
            .ledger
            .read(|state| best_of(state, token_a, token_b).map(|p| view(state, p, now)))
            .await)
    }

    async fn get_pool_statistics(&self, pool: &str, timeframe: Timeframe) -> Result<PoolStatistics> {
        let account = self.account(pool).await?;
        let window = timeframe.duration();
        Ok(statistics(&account, Utc::now() - window, window))
    }

    fn get_supported_protocols(&self) -> Vec<DexProtocol> {
        DexProtocol::ALL.to_vec()
    }

    async fn pool_exists(
        &self,
        token_a: &str,
        token_b: &str,
        protocol: Option<DexProtocol>,
    ) -> Result<bool> {
        Ok(self
            .ctx
            .ledger
            .read(|state| {
                state.pools().any(|p| {
                    p.matches_pair(token_a, token_b)
                        && protocol.map_or(true, |wanted| p.pool.protocol == wanted)
                })
            })
            .await)
    }
}
