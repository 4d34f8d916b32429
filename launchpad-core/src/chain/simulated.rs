// In-process chain used by the memory services and tests.

use super::{validate_public_key, BlockchainClient, Commitment, TransactionRequest};
use crate::error::{ErrorCode, PlatformError, Result};
use async_trait::async_trait;
use solana_sdk::signature::Signature;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

const DEFAULT_LAMPORTS_PER_SIGNATURE: u64 = 5_000;

#[derive(Debug, Default)]
struct ChainState {
    landed: HashSet<String>,
    rejected_accounts: HashSet<String>,
    pending_network_failures: u32,
}

/// Lands every well-formed transaction immediately.
///
/// Failures can be injected per account (permanent) or as a number of
/// upcoming network errors (transient).
#[derive(Debug)]
pub struct SimulatedChain {
    lamports_per_signature: u64,
    state: Mutex<ChainState>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::with_fee(DEFAULT_LAMPORTS_PER_SIGNATURE)
    }

    pub fn with_fee(lamports_per_signature: u64) -> Self {
        Self {
            lamports_per_signature,
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn lamports_per_signature(&self) -> u64 {
        self.lamports_per_signature
    }

    /// Any transaction touching `account` fails without retry.
    pub fn reject_account(&self, account: &str) {
        self.lock().rejected_accounts.insert(account.to_string());
    }

    pub fn allow_account(&self, account: &str) {
        self.lock().rejected_accounts.remove(account);
    }

    /// The next `count` submissions fail with a retryable network error.
    pub fn fail_next_submissions(&self, count: u32) {
        self.lock().pending_network_failures = count;
    }

    pub fn is_landed(&self, signature: &str) -> bool {
        self.lock().landed.contains(signature)
    }

    pub fn submitted_count(&self) -> usize {
        self.lock().landed.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChainState> {
        // State is plain data, a poisoned lock still holds a usable value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlockchainClient for SimulatedChain {
    fn validate_address(&self, address: &str) -> bool {
        validate_public_key(address)
    }

    async fn estimate_fee(&self, request: &TransactionRequest) -> Result<u64> {
        if !validate_public_key(&request.fee_payer) {
            return Err(PlatformError::blockchain(
                ErrorCode::FeeEstimationFailed,
                format!("cannot estimate fee for payer {}", request.fee_payer),
                false,
            ));
        }
        Ok(self.lamports_per_signature * request.signatures_required.max(1) as u64)
    }

    async fn submit_transaction(&self, request: &TransactionRequest) -> Result<String> {
        let mut state = self.lock();

        if state.pending_network_failures > 0 {
            state.pending_network_failures -= 1;
            return Err(PlatformError::network("rpc node unavailable"));
        }

        let touched = std::iter::once(&request.fee_payer).chain(request.accounts.iter());
        for account in touched {
            if state.rejected_accounts.contains(account) {
                return Err(PlatformError::transaction_failed(format!(
                    "{} rejected: account {} cannot receive this instruction",
                    request.instruction,
                    account
                )));
            }
        }

        let signature = Signature::new_unique().to_string();
        state.landed.insert(signature.clone());
        debug!("Landed {} as {}", request.instruction, signature);
        Ok(signature)
    }

    async fn wait_for_confirmation(&self, signature: &str, _commitment: Commitment) -> Result<()> {
        if self.is_landed(signature) {
            Ok(())
        } else {
            Err(PlatformError::blockchain(
                ErrorCode::TransactionConfirmationFailed,
                format!("signature {signature} not found"),
                false,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use solana_sdk::pubkey::Pubkey;

    fn request() -> TransactionRequest {
        TransactionRequest::new(TransactionType::TokenSwap.as_str(), Pubkey::new_unique().to_string())
    }

    #[tokio::test]
    async fn test_fee_scales_with_signatures() {
        let chain = SimulatedChain::new();
        let req = request().with_signatures(3);
        assert_eq!(chain.estimate_fee(&req).await.unwrap(), 15_000);
    }

    #[tokio::test]
    async fn test_rejected_account_fails_permanently() {
        let chain = SimulatedChain::new();
        let recipient = Pubkey::new_unique().to_string();
        chain.reject_account(&recipient);

        let err = chain
            .submit_transaction(&request().with_account(recipient.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionFailed);
        assert!(!err.retryable);

        chain.allow_account(&recipient);
        let sig = chain
            .submit_transaction(&request().with_account(recipient))
            .await
            .unwrap();
        chain.wait_for_confirmation(&sig, Commitment::Confirmed).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_network_failures_are_transient() {
        let chain = SimulatedChain::new();
        chain.fail_next_submissions(1);

        let err = chain.submit_transaction(&request()).await.unwrap_err();
        assert!(err.retryable);
        assert!(chain.submit_transaction(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_signature_is_not_confirmed() {
        let chain = SimulatedChain::new();
        let err = chain
            .wait_for_confirmation("missing", Commitment::Finalized)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionConfirmationFailed);
    }
}
