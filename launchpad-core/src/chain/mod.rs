//! Blockchain client collaborator.
//!
//! Services depend on the chain only through [`BlockchainClient`]: address
//! validation, fee estimation, submission and confirmation. Signing and
//! instruction building belong to the external wallet/provider.

pub mod simulated;

pub use simulated::SimulatedChain;

use crate::error::{ErrorCode, PlatformError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::debug;

/// Wrapped SOL mint; used as the ledger key for native SOL balances.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Description of a transaction the platform wants landed on chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    /// Instruction name, e.g. `token_mint` or `ico_finalize`.
    pub instruction: &'static str,
    pub fee_payer: String,
    /// Accounts touched by the transaction, fee payer excluded.
    pub accounts: Vec<String>,
    pub signatures_required: usize,
}

impl TransactionRequest {
    pub fn new(instruction: &'static str, fee_payer: impl Into<String>) -> Self {
        Self {
            instruction,
            fee_payer: fee_payer.into(),
            accounts: Vec::new(),
            signatures_required: 1,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.accounts.push(account.into());
        self
    }

    pub fn with_signatures(mut self, signatures: usize) -> Self {
        self.signatures_required = signatures.max(1);
        self
    }
}

#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Format check only; says nothing about the account existing.
    fn validate_address(&self, address: &str) -> bool;

    /// Network fee for `request`, in lamports.
    async fn estimate_fee(&self, request: &TransactionRequest) -> Result<u64>;

    /// Submits the transaction and returns its signature.
    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<String>;

    async fn wait_for_confirmation(&self, signature: &str, commitment: Commitment) -> Result<()>;
}

/// Submits `request` and waits for `confirmed` commitment.
///
/// Each step is bounded by the policy timeout and retried under the policy.
pub async fn submit_and_confirm(
    chain: &dyn BlockchainClient,
    policy: &RetryPolicy,
    request: &TransactionRequest,
) -> Result<String> {
    let signature = policy
        .run(|| async move {
            tokio::time::timeout(policy.timeout, chain.submit_transaction(request))
                .await
                .map_err(|_| {
                    PlatformError::network(format!(
                        "{} submission timed out after {}ms",
                        request.instruction,
                        policy.timeout.as_millis()
                    ))
                })?
        })
        .await?;

    let sig = signature.as_str();
    policy
        .run(|| async move {
            tokio::time::timeout(
                policy.timeout,
                chain.wait_for_confirmation(sig, Commitment::Confirmed),
            )
            .await
            .map_err(|_| {
                PlatformError::blockchain(
                    ErrorCode::TransactionConfirmationFailed,
                    format!("confirmation of {sig} timed out"),
                    true,
                )
            })?
        })
        .await?;

    debug!("{} confirmed: {}", request.instruction, signature);
    Ok(signature)
}

/// Accepts base58 strings that decode to a 32-byte public key.
pub fn validate_public_key(address: &str) -> bool {
    Pubkey::from_str(address).is_ok()
}

/// Explains why `address` is rejected, or `None` when it is valid.
pub fn address_rejection_reason(address: &str) -> Option<String> {
    if address.trim().is_empty() {
        return Some("address is empty".to_string());
    }
    if address.trim() != address {
        return Some("address contains surrounding whitespace".to_string());
    }
    match Pubkey::from_str(address) {
        Ok(_) => None,
        Err(e) => Some(format!("not a valid public key: {e}")),
    }
}

/// Deterministic program-style address derived from `seeds`.
pub fn derive_address(seeds: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(b"launchpad-derived-address");
    let bytes: [u8; 32] = hasher.finalize().into();
    Pubkey::new_from_array(bytes).to_string()
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
