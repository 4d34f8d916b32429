// Airdrop campaigns: batched transfers with per-recipient outcomes.

use super::ServiceContext;
use crate::chain::{address_rejection_reason, derive_address, lamports_to_sol, TransactionRequest};
use crate::csv_import::{self, RecipientImport};
use crate::error::{ErrorCode, PlatformError, Result};
use crate::ledger::{Transfer, DUST};
use crate::models::{
    Airdrop, AirdropParams, AirdropRecipient, AirdropStatus, InvalidAddress, PlatformTransaction,
    RecipientStatus, RecipientValidation, TransactionDetails, TransactionType,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[async_trait]
pub trait AirdropService: Send + Sync {
    async fn create_airdrop(&self, creator: &str, params: AirdropParams) -> Result<String>;

    /// Sends every pending transfer. Returns the signatures that landed.
    async fn execute_airdrop(&self, id: &str, caller: &str) -> Result<Vec<String>>;

    /// Re-sends transfers that failed. Recipients already paid are skipped.
    async fn retry_failed_transfers(&self, id: &str, caller: &str) -> Result<Vec<String>>;

    async fn get_airdrop_status(&self, id: &str) -> Result<Airdrop>;

    async fn get_airdrops_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Airdrop>>;

    /// Airdrops in which `wallet` is a recipient.
    async fn get_airdrop_history(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Airdrop>>;

    fn validate_recipients(&self, addresses: &[String]) -> RecipientValidation;

    /// Network fees for `recipient_count` transfers plus the platform fee, in SOL.
    async fn estimate_airdrop_cost(&self, recipient_count: usize) -> Result<f64>;

    /// Removes a campaign that has not started executing.
    async fn cancel_airdrop(&self, id: &str, caller: &str) -> Result<bool>;

    fn import_recipients_from_csv(&self, csv: &str) -> RecipientImport;
}

type AirdropEntry = Arc<Mutex<Airdrop>>;

pub struct MemoryAirdropService {
    ctx: ServiceContext,
    airdrops: RwLock<HashMap<String, AirdropEntry>>,
}

impl MemoryAirdropService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            airdrops: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, id: &str) -> Result<AirdropEntry> {
        self.airdrops.read().await.get(id).cloned().ok_or_else(|| {
            PlatformError::validation(ErrorCode::AirdropNotFound, format!("airdrop {id} not found"))
        })
    }

    async fn snapshot(&self) -> Vec<Airdrop> {
        let entries: Vec<AirdropEntry> = self.airdrops.read().await.values().cloned().collect();
        let mut airdrops = Vec::with_capacity(entries.len());
        for entry in entries {
            airdrops.push(entry.lock().await.clone());
        }
        airdrops.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        airdrops
    }

    fn ensure_creator(airdrop: &Airdrop, caller: &str) -> Result<()> {
        if airdrop.creator == caller {
            Ok(())
        } else {
            Err(PlatformError::unauthorized(format!(
                "only the creator can manage airdrop {}",
                airdrop.id
            )))
        }
    }

    fn validate_params(&self, params: &AirdropParams) -> Result<()> {
        let limits = &self.ctx.limits;
        if params.recipients.is_empty() {
            return Err(PlatformError::validation(
                ErrorCode::InvalidRecipients,
                "airdrop needs at least one recipient",
            ));
        }
        if params.recipients.len() > limits.max_airdrop_recipients {
            return Err(PlatformError::validation(
                ErrorCode::InvalidRecipients,
                format!(
                    "{} recipients exceeds the limit of {}",
                    params.recipients.len(),
                    limits.max_airdrop_recipients
                ),
            ));
        }

        let addresses: Vec<String> = params.recipients.iter().map(|r| r.address.clone()).collect();
        let validation = self.validate_recipients(&addresses);
        if !validation.invalid.is_empty() {
            let listed: Vec<String> = validation
                .invalid
                .iter()
                .map(|i| format!("{} ({})", i.address, i.reason))
                .collect();
            return Err(PlatformError::validation(
                ErrorCode::InvalidRecipients,
                format!("invalid recipient addresses: {}", listed.join(", ")),
            ));
        }

        for recipient in &params.recipients {
            if !(recipient.amount.is_finite() && recipient.amount >= limits.min_airdrop_amount) {
                return Err(PlatformError::invalid_amount(format!(
                    "amount for {} must be at least {}, got {}",
                    recipient.address, limits.min_airdrop_amount, recipient.amount
                )));
            }
        }

        let sum: f64 = params.recipients.iter().map(|r| r.amount).sum();
        if (sum - params.total_amount).abs() > 1e-6 * sum.max(1.0) {
            return Err(PlatformError::invalid_amount(format!(
                "total amount {} does not match the recipient sum {}",
                params.total_amount, sum
            )));
        }
        Ok(())
    }

    async fn transfer_one(&self, creator: &str, mint: &str, recipient: &AirdropRecipient) -> Result<String> {
        let request = TransactionRequest::new(TransactionType::AirdropExecution.as_str(), creator)
            .with_account(recipient.address.clone());
        let signature = self.ctx.submit(&request).await?;
        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[Transfer::new(
                    creator,
                    &recipient.address,
                    mint,
                    recipient.amount,
                )])
            })
            .await?;
        Ok(signature)
    }

    /// Sends the transfers for `indices`: batches in sequence, transfers within
    /// a batch concurrently.
    async fn run_transfers(&self, airdrop: &Airdrop, indices: &[usize]) -> Vec<(usize, Result<String>)> {
        let batch_size = self.ctx.limits.max_airdrop_batch_size.max(1);
        let mut outcomes = Vec::with_capacity(indices.len());

        for batch in indices.chunks(batch_size) {
            let results = join_all(batch.iter().map(|&i| {
                self.transfer_one(&airdrop.creator, &airdrop.token_mint, &airdrop.recipients[i])
            }))
            .await;
            outcomes.extend(batch.iter().copied().zip(results));
        }
        outcomes
    }

    /// Records outcomes on the airdrop and reports the successful transfers.
    async fn apply_outcomes(
        &self,
        airdrop: &mut Airdrop,
        outcomes: Vec<(usize, Result<String>)>,
    ) -> Vec<String> {
        let mut signatures = Vec::new();
        let mut delivered = Vec::new();

        for (i, outcome) in outcomes {
            let recipient = &mut airdrop.recipients[i];
            match outcome {
                Ok(signature) => {
                    recipient.status = RecipientStatus::Success;
                    recipient.transaction_signature = Some(signature.clone());
                    recipient.error_message = None;
                    delivered.push((recipient.address.clone(), recipient.amount, signature.clone()));
                    signatures.push(signature);
                }
                Err(e) => {
                    warn!("Airdrop {} transfer to {} failed: {}", airdrop.id, recipient.address, e);
                    recipient.status = RecipientStatus::Failed;
                    recipient.error_message = Some(e.to_string());
                }
            }
        }
        airdrop.transaction_signatures.extend(signatures.iter().cloned());

        if !delivered.is_empty() {
            let total: f64 = delivered.iter().map(|(_, amount, _)| amount).sum();
            self.ctx
                .track(PlatformTransaction::confirmed(
                    airdrop.creator.clone(),
                    TransactionType::AirdropExecution,
                    signatures.first().cloned(),
                    TransactionDetails::for_mint(airdrop.token_mint.clone())
                        .with_amount(total)
                        .with_extra("airdropId", airdrop.id.clone())
                        .with_extra("recipientCount", delivered.len()),
                ))
                .await;

            for (address, amount, signature) in delivered {
                self.ctx
                    .track(PlatformTransaction::confirmed(
                        address.clone(),
                        TransactionType::AirdropExecution,
                        Some(signature),
                        TransactionDetails::for_mint(airdrop.token_mint.clone())
                            .with_amount(amount)
                            .with_recipient(address)
                            .with_extra("airdropId", airdrop.id.clone()),
                    ))
                    .await;
            }
        }

        signatures
    }
}

#[async_trait]
impl AirdropService for MemoryAirdropService {
    async fn create_airdrop(&self, creator: &str, params: AirdropParams) -> Result<String> {
        self.ctx.ensure_wallet(creator)?;
        self.ctx.ensure_known_mint(&params.token_mint).await?;
        self.validate_params(&params)?;

        let airdrop = Airdrop {
            id: uuid::Uuid::new_v4().to_string(),
            token_mint: params.token_mint.clone(),
            creator: creator.to_string(),
            total_amount: params.total_amount,
            recipients: params
                .recipients
                .into_iter()
                .map(|r| AirdropRecipient {
                    address: r.address,
                    amount: r.amount,
                    status: RecipientStatus::Pending,
                    transaction_signature: None,
                    error_message: None,
                })
                .collect(),
            status: AirdropStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
            transaction_signatures: Vec::new(),
        };
        let id = airdrop.id.clone();
        let recipient_count = airdrop.recipients.len();

        self.airdrops
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(airdrop)));

        info!(
            "Airdrop {} created by {} for {} recipients",
            id, creator, recipient_count
        );

        self.ctx
            .track(PlatformTransaction::confirmed(
                creator,
                TransactionType::AirdropCreation,
                None,
                TransactionDetails::for_mint(params.token_mint)
                    .with_amount(params.total_amount)
                    .with_extra("airdropId", id.clone())
                    .with_extra("recipientCount", recipient_count),
            ))
            .await;

        Ok(id)
    }

    async fn execute_airdrop(&self, id: &str, caller: &str) -> Result<Vec<String>> {
        let entry = self.entry(id).await?;
        let mut airdrop = entry.lock().await;
        Self::ensure_creator(&airdrop, caller)?;

        if airdrop.status != AirdropStatus::Pending {
            return Err(PlatformError::validation(
                ErrorCode::AirdropAlreadyExecuted,
                format!("airdrop {id} is already {:?}", airdrop.status),
            ));
        }

        let available = self.ctx.ledger.balance(&airdrop.creator, &airdrop.token_mint).await;
        if available + DUST < airdrop.total_amount {
            return Err(PlatformError::insufficient_balance(
                &airdrop.creator,
                &airdrop.token_mint,
                airdrop.total_amount,
                available,
            ));
        }

        airdrop.status = AirdropStatus::Processing;
        info!("Executing airdrop {} ({} recipients)", id, airdrop.recipients.len());

        let indices: Vec<usize> = (0..airdrop.recipients.len()).collect();
        let outcomes = self.run_transfers(&airdrop, &indices).await;
        let signatures = self.apply_outcomes(&mut airdrop, outcomes).await;

        airdrop.status = if signatures.is_empty() {
            AirdropStatus::Failed
        } else {
            AirdropStatus::Completed
        };
        airdrop.executed_at = Some(Utc::now());

        info!(
            "Airdrop {} finished as {:?}: {}/{} transfers landed",
            id,
            airdrop.status,
            signatures.len(),
            airdrop.recipients.len()
        );
        Ok(signatures)
    }

    async fn retry_failed_transfers(&self, id: &str, caller: &str) -> Result<Vec<String>> {
        let entry = self.entry(id).await?;
        let mut airdrop = entry.lock().await;
        Self::ensure_creator(&airdrop, caller)?;

        let failed: Vec<usize> = airdrop
            .recipients
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == RecipientStatus::Failed)
            .map(|(i, _)| i)
            .collect();
        if failed.is_empty() {
            return Ok(Vec::new());
        }

        info!("Retrying {} failed transfers for airdrop {}", failed.len(), id);
        let outcomes = self.run_transfers(&airdrop, &failed).await;
        Ok(self.apply_outcomes(&mut airdrop, outcomes).await)
    }

    async fn get_airdrop_status(&self, id: &str) -> Result<Airdrop> {
        let entry = self.entry(id).await?;
        let airdrop = entry.lock().await.clone();
        Ok(airdrop)
    }

    async fn get_airdrops_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Airdrop>> {
        self.ctx.ensure_wallet(wallet)?;
        let airdrops: Vec<Airdrop> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|a| a.creator == wallet)
            .collect();
        Ok(PaginatedResponse::from_items(airdrops, self.ctx.page(pagination)))
    }

    async fn get_airdrop_history(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Airdrop>> {
        self.ctx.ensure_wallet(wallet)?;
        let airdrops: Vec<Airdrop> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|a| a.recipients.iter().any(|r| r.address == wallet))
            .collect();
        Ok(PaginatedResponse::from_items(airdrops, self.ctx.page(pagination)))
    }

    fn validate_recipients(&self, addresses: &[String]) -> RecipientValidation {
        let mut validation = RecipientValidation::default();
        for address in addresses {
            if self.ctx.chain.validate_address(address) {
                validation.valid.push(address.clone());
            } else {
                let reason = address_rejection_reason(address)
                    .unwrap_or_else(|| "rejected by the blockchain client".to_string());
                validation.invalid.push(InvalidAddress {
                    address: address.clone(),
                    reason,
                });
            }
        }
        validation
    }

    async fn estimate_airdrop_cost(&self, recipient_count: usize) -> Result<f64> {
        let payer = derive_address(&[b"airdrop-fee-estimate"]);
        let request = TransactionRequest::new(TransactionType::AirdropExecution.as_str(), payer);
        let per_transfer = self.ctx.chain.estimate_fee(&request).await?;
        Ok(lamports_to_sol(per_transfer) * recipient_count as f64 + self.ctx.fees.airdrop_execution)
    }

    async fn cancel_airdrop(&self, id: &str, caller: &str) -> Result<bool> {
        let entry = self.entry(id).await?;
        let airdrop = entry.lock().await;
        Self::ensure_creator(&airdrop, caller)?;

        if airdrop.status != AirdropStatus::Pending {
            return Ok(false);
        }
        self.airdrops.write().await.remove(id);
        info!("Airdrop {} cancelled by {}", id, caller);
        Ok(true)
    }

    fn import_recipients_from_csv(&self, csv: &str) -> RecipientImport {
        csv_import::import_recipients_from_csv(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MintAccount;
    use crate::models::{RecipientInput, Token, TokenMetadata};
    use crate::services::testing::{harness, wallet, Harness};
    use crate::services::PortfolioService;
    use std::collections::HashSet;

    async fn seed_token(h: &Harness, creator: &str, supply: f64) -> String {
        let mint = wallet();
        let token = Token {
            mint_address: mint.clone(),
            name: "Drop".to_string(),
            symbol: "DRP".to_string(),
            decimals: 6,
            supply,
            description: String::new(),
            image_url: String::new(),
            creator: creator.to_string(),
            created_at: Utc::now(),
            metadata: TokenMetadata::default(),
        };
        h.ledger
            .write(|s| {
                s.register_mint(MintAccount {
                    token,
                    update_authority: None,
                    lp_of_pool: None,
                })?;
                s.credit(creator, &mint, supply);
                Ok::<_, PlatformError>(())
            })
            .await
            .unwrap();
        mint
    }

    fn params(mint: &str, recipients: &[String], amount: f64) -> AirdropParams {
        AirdropParams {
            token_mint: mint.to_string(),
            recipients: recipients
                .iter()
                .map(|address| RecipientInput {
                    address: address.clone(),
                    amount,
                })
                .collect(),
            total_amount: amount * recipients.len() as f64,
        }
    }

    #[tokio::test]
    async fn test_invalid_recipient_creates_nothing() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 1_000.0).await;
        let recipients = vec![wallet(), "BAD".to_string()];

        let err = service
            .create_airdrop(&creator, params(&mint, &recipients, 10.0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRecipients);
        assert!(err.message.contains("BAD"));
        assert_eq!(service.get_airdrops_by_creator(&creator, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_amount_rules() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 1_000.0).await;
        let recipients = vec![wallet(), wallet()];

        let err = service
            .create_airdrop(&creator, params(&mint, &recipients, 0.5))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);

        let mut p = params(&mint, &recipients, 10.0);
        p.total_amount = 25.0;
        assert_eq!(service.create_airdrop(&creator, p).await.unwrap_err().code, ErrorCode::InvalidAmount);

        let err = service.create_airdrop(&creator, params(&mint, &[], 10.0)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRecipients);
    }

    #[tokio::test]
    async fn test_execute_in_batches() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 1_000.0).await;
        let recipients: Vec<String> = (0..30).map(|_| wallet()).collect();

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 10.0))
            .await
            .unwrap();
        h.chain.fail_next_submissions(1);
        let signatures = service.execute_airdrop(&id, &creator).await.unwrap();

        assert_eq!(signatures.len(), 30);
        let airdrop = service.get_airdrop_status(&id).await.unwrap();
        assert_eq!(airdrop.status, AirdropStatus::Completed);
        assert!(airdrop.executed_at.is_some());
        assert!(airdrop.recipients.iter().all(|r| r.status == RecipientStatus::Success));
        assert_eq!(h.ledger.balance(&creator, &mint).await, 700.0);
        assert_eq!(h.ledger.balance(&recipients[29], &mint).await, 10.0);

        let history = service.get_airdrop_history(&recipients[0], None).await.unwrap();
        assert_eq!(history.total, 1);
        let txs = h.portfolio.get_transaction_history(&recipients[0], None).await.unwrap();
        assert_eq!(txs.data[0].transaction_type, TransactionType::AirdropExecution);

        let err = service.execute_airdrop(&id, &creator).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AirdropAlreadyExecuted);
    }

    #[tokio::test]
    async fn test_retry_never_pays_twice() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 1_000.0).await;
        let recipients: Vec<String> = (0..4).map(|_| wallet()).collect();
        h.chain.reject_account(&recipients[2]);

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 5.0))
            .await
            .unwrap();
        let first = service.execute_airdrop(&id, &creator).await.unwrap();
        assert_eq!(first.len(), 3);

        let airdrop = service.get_airdrop_status(&id).await.unwrap();
        assert_eq!(airdrop.status, AirdropStatus::Completed);
        assert_eq!(airdrop.recipients[2].status, RecipientStatus::Failed);
        assert!(airdrop.recipients[2].error_message.is_some());

        // Still rejected: nothing new lands.
        assert!(service.retry_failed_transfers(&id, &creator).await.unwrap().is_empty());

        h.chain.allow_account(&recipients[2]);
        let retried = service.retry_failed_transfers(&id, &creator).await.unwrap();
        assert_eq!(retried.len(), 1);
        assert!(service.retry_failed_transfers(&id, &creator).await.unwrap().is_empty());

        let airdrop = service.get_airdrop_status(&id).await.unwrap();
        assert_eq!(airdrop.status, AirdropStatus::Completed);
        assert_eq!(airdrop.transaction_signatures.len(), 4);
        let unique: HashSet<&String> = airdrop.transaction_signatures.iter().collect();
        assert_eq!(unique.len(), 4);
        for recipient in &recipients {
            assert_eq!(h.ledger.balance(recipient, &mint).await, 5.0);
        }
        assert_eq!(h.ledger.balance(&creator, &mint).await, 980.0);
    }

    #[tokio::test]
    async fn test_all_failed_marks_airdrop_failed() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 100.0).await;
        let recipients = vec![wallet()];
        h.chain.reject_account(&recipients[0]);

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 5.0))
            .await
            .unwrap();
        assert!(service.execute_airdrop(&id, &creator).await.unwrap().is_empty());
        assert_eq!(service.get_airdrop_status(&id).await.unwrap().status, AirdropStatus::Failed);
    }

    #[tokio::test]
    async fn test_execute_preconditions() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 10.0).await;
        let recipients = vec![wallet(), wallet()];

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 6.0))
            .await
            .unwrap();

        let err = service.execute_airdrop(&id, &wallet()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnauthorizedAccess);

        let err = service.execute_airdrop(&id, &creator).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientBalance);
        assert_eq!(service.get_airdrop_status(&id).await.unwrap().status, AirdropStatus::Pending);

        let err = service.execute_airdrop("missing", &creator).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AirdropNotFound);
    }

    #[tokio::test]
    async fn test_cancel_only_while_pending() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let creator = wallet();
        let mint = seed_token(&h, &creator, 100.0).await;
        let recipients = vec![wallet()];

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 5.0))
            .await
            .unwrap();
        assert!(service.cancel_airdrop(&id, &creator).await.unwrap());
        let err = service.get_airdrop_status(&id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AirdropNotFound);

        let id = service
            .create_airdrop(&creator, params(&mint, &recipients, 5.0))
            .await
            .unwrap();
        service.execute_airdrop(&id, &creator).await.unwrap();
        assert!(!service.cancel_airdrop(&id, &creator).await.unwrap());
    }

    #[tokio::test]
    async fn test_validate_recipients_partitions_input() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let good = wallet();
        let input = vec![
            good.clone(),
            "BAD".to_string(),
            good.clone(),
            String::new(),
            wallet(),
        ];

        let result = service.validate_recipients(&input);
        assert_eq!(result.valid.len() + result.invalid.len(), input.len());
        assert_eq!(result.valid.len(), 3);
        assert_eq!(result.invalid[0].address, "BAD");
        assert_eq!(result.invalid[1].reason, "address is empty");
        for address in &input {
            let in_valid = result.valid.contains(address);
            let in_invalid = result.invalid.iter().any(|i| &i.address == address);
            assert!(in_valid != in_invalid);
        }
    }

    #[tokio::test]
    async fn test_cost_estimate() {
        let h = harness();
        let service = MemoryAirdropService::new(h.ctx.clone());
        let cost = service.estimate_airdrop_cost(10).await.unwrap();
        assert!((cost - (10.0 * 0.000005 + 0.05)).abs() < 1e-12);
        assert_eq!(h.chain.submitted_count(), 0);
    }
}
