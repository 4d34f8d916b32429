// Simulated on-chain state: mints, token balances and pool reserves.
//
// All mutation happens under one write lock through `Ledger::write`, so a
// closure passed there sees and changes a consistent snapshot. Methods on
// `LedgerState` validate before they mutate.

use crate::chain::NATIVE_MINT;
use crate::error::{PlatformError, Result};
use crate::models::{LiquidityPool, Token};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Balances below this are treated as empty.
pub const DUST: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct MintAccount {
    pub token: Token,
    /// `None` once the update authority has been revoked.
    pub update_authority: Option<String>,
    /// Set for pool share mints.
    pub lp_of_pool: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecord {
    pub timestamp: DateTime<Utc>,
    pub trader: String,
    pub input_token: String,
    pub amount_in: f64,
    pub amount_out: f64,
    /// Trade size in token B units.
    pub volume: f64,
    /// Fee in token B units.
    pub fee: f64,
}

#[derive(Debug, Clone)]
pub struct PoolAccount {
    pub pool: LiquidityPool,
    pub reserve_a: f64,
    pub reserve_b: f64,
    pub lp_mint: String,
    pub lp_supply: f64,
    pub swaps: Vec<SwapRecord>,
}

impl PoolAccount {
    /// Token B per token A at current reserves.
    pub fn spot_price(&self) -> f64 {
        if self.reserve_a <= 0.0 {
            0.0
        } else {
            self.reserve_b / self.reserve_a
        }
    }

    /// Reserves ordered as (`input`, `output`) for a trade selling `input`.
    pub fn oriented_reserves(&self, input: &str) -> Option<(f64, f64)> {
        if input == self.pool.token_a {
            Some((self.reserve_a, self.reserve_b))
        } else if input == self.pool.token_b {
            Some((self.reserve_b, self.reserve_a))
        } else {
            None
        }
    }

    pub fn matches_pair(&self, x: &str, y: &str) -> bool {
        (self.pool.token_a == x && self.pool.token_b == y)
            || (self.pool.token_a == y && self.pool.token_b == x)
    }

    pub fn swaps_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &SwapRecord> {
        self.swaps.iter().filter(move |s| s.timestamp >= since)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub mint: String,
    pub amount: f64,
}

impl Transfer {
    pub fn new(from: &str, to: &str, mint: &str, amount: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            mint: mint.to_string(),
            amount,
        }
    }
}

#[derive(Debug, Default)]
pub struct LedgerState {
    mints: HashMap<String, MintAccount>,
    balances: HashMap<(String, String), f64>,
    pools: HashMap<String, PoolAccount>,
}

impl LedgerState {
    pub fn mint(&self, mint: &str) -> Option<&MintAccount> {
        self.mints.get(mint)
    }

    pub fn mint_mut(&mut self, mint: &str) -> Option<&mut MintAccount> {
        self.mints.get_mut(mint)
    }

    pub fn contains_mint(&self, mint: &str) -> bool {
        mint == NATIVE_MINT || self.mints.contains_key(mint)
    }

    pub fn register_mint(&mut self, account: MintAccount) -> Result<()> {
        let key = account.token.mint_address.clone();
        if self.contains_mint(&key) {
            return Err(PlatformError::invalid_mint(&key));
        }
        self.mints.insert(key, account);
        Ok(())
    }

    pub fn mints(&self) -> impl Iterator<Item = &MintAccount> {
        self.mints.values()
    }

    pub fn balance(&self, wallet: &str, mint: &str) -> f64 {
        self.balances
            .get(&(wallet.to_string(), mint.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn credit(&mut self, wallet: &str, mint: &str, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        *self
            .balances
            .entry((wallet.to_string(), mint.to_string()))
            .or_insert(0.0) += amount;
    }

    /// Removes up to `amount` and returns what was actually taken. A shortfall
    /// within `DUST` empties the balance instead of failing.
    pub fn debit(&mut self, wallet: &str, mint: &str, amount: f64) -> Result<f64> {
        let available = self.balance(wallet, mint);
        if available + DUST < amount {
            return Err(PlatformError::insufficient_balance(wallet, mint, amount, available));
        }
        let taken = amount.min(available);
        let remaining = available - taken;
        let key = (wallet.to_string(), mint.to_string());
        if remaining < DUST {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(taken)
    }

    /// Applies every transfer or none of them.
    pub fn execute_transfers(&mut self, transfers: &[Transfer]) -> Result<()> {
        let mut needed: HashMap<(&str, &str), f64> = HashMap::new();
        for t in transfers {
            if !(t.amount.is_finite() && t.amount >= 0.0) {
                return Err(PlatformError::invalid_amount(format!(
                    "transfer amount must be non-negative, got {}",
                    t.amount
                )));
            }
            *needed.entry((t.from.as_str(), t.mint.as_str())).or_insert(0.0) += t.amount;
        }
        for ((wallet, mint), amount) in &needed {
            let available = self.balance(wallet, mint);
            if available + DUST < *amount {
                return Err(PlatformError::insufficient_balance(wallet, mint, *amount, available));
            }
        }
        for t in transfers {
            let moved = self.debit(&t.from, &t.mint, t.amount)?;
            self.credit(&t.to, &t.mint, moved);
        }
        Ok(())
    }

    /// Credits `amount` and grows the recorded supply.
    pub fn mint_to(&mut self, wallet: &str, mint: &str, amount: f64) {
        if let Some(account) = self.mints.get_mut(mint) {
            account.token.supply += amount;
        }
        self.credit(wallet, mint, amount);
    }

    pub fn burn(&mut self, wallet: &str, mint: &str, amount: f64) -> Result<()> {
        let burned = self.debit(wallet, mint, amount)?;
        if let Some(account) = self.mints.get_mut(mint) {
            account.token.supply = (account.token.supply - burned).max(0.0);
        }
        Ok(())
    }

    /// Non-dust holdings of `wallet`, sorted by mint.
    pub fn holdings(&self, wallet: &str) -> Vec<(String, f64)> {
        let mut held: Vec<(String, f64)> = self
            .balances
            .iter()
            .filter(|((owner, _), amount)| owner == wallet && **amount >= DUST)
            .map(|((_, mint), amount)| (mint.clone(), *amount))
            .collect();
        held.sort_by(|a, b| a.0.cmp(&b.0));
        held
    }

    pub fn pool(&self, address: &str) -> Option<&PoolAccount> {
        self.pools.get(address)
    }

    pub fn pool_mut(&mut self, address: &str) -> Option<&mut PoolAccount> {
        self.pools.get_mut(address)
    }

    pub fn insert_pool(&mut self, account: PoolAccount) {
        self.pools.insert(account.pool.address.clone(), account);
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolAccount> {
        self.pools.values()
    }

    /// Price of one unit of `mint` in SOL, if it can be derived.
    ///
    /// SOL is 1. Other tokens take the spot price of their deepest SOL pool.
    /// Pool share tokens are valued by the underlying reserves.
    pub fn price_in_sol(&self, mint: &str) -> Option<f64> {
        if mint == NATIVE_MINT {
            return Some(1.0);
        }
        if let Some(pool_address) = self.mints.get(mint).and_then(|m| m.lp_of_pool.as_deref()) {
            let pool = self.pools.get(pool_address)?;
            if pool.lp_supply <= 0.0 {
                return Some(0.0);
            }
            let value_a = pool.reserve_a * self.spot_price_in_sol(&pool.pool.token_a)?;
            let value_b = pool.reserve_b * self.spot_price_in_sol(&pool.pool.token_b)?;
            return Some((value_a + value_b) / pool.lp_supply);
        }
        self.spot_price_in_sol(mint)
    }

    fn spot_price_in_sol(&self, mint: &str) -> Option<f64> {
        if mint == NATIVE_MINT {
            return Some(1.0);
        }
        self.pools
            .values()
            .filter(|p| p.matches_pair(mint, NATIVE_MINT) && p.reserve_a > 0.0 && p.reserve_b > 0.0)
            .map(|p| {
                let (token_reserve, sol_reserve) = if p.pool.token_a == mint {
                    (p.reserve_a, p.reserve_b)
                } else {
                    (p.reserve_b, p.reserve_a)
                };
                (sol_reserve, sol_reserve / token_reserve)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, price)| price)
    }
}

/// Shared handle to the simulated chain state.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn write<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    pub async fn balance(&self, wallet: &str, mint: &str) -> f64 {
        self.read(|s| s.balance(wallet, mint)).await
    }

    /// Funds a wallet directly; stands in for an external deposit or faucet.
    pub async fn airdrop_native(&self, wallet: &str, sol: f64) {
        self.write(|s| s.credit(wallet, NATIVE_MINT, sol)).await
    }

    pub async fn token(&self, mint: &str) -> Option<Token> {
        self.read(|s| s.mint(mint).map(|m| m.token.clone())).await
    }

    pub async fn contains_mint(&self, mint: &str) -> bool {
        self.read(|s| s.contains_mint(mint)).await
    }

    pub async fn price_in_sol(&self, mint: &str) -> Option<f64> {
        self.read(|s| s.price_in_sol(mint)).await
    }
}
