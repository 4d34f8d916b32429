// ICO campaigns: creation, purchases, finalization and cancellation.
//
// Each campaign sits behind its own mutex, held from the validity checks
// through submission and commit, so concurrent purchases cannot oversell.

use super::{ensure_positive, ServiceContext};
use crate::chain::{derive_address, TransactionRequest, NATIVE_MINT};
use crate::error::{ErrorCode, PlatformError, Result};
use crate::ledger::{Transfer, DUST};
use crate::models::{
    Ico, IcoParams, IcoParticipant, IcoProgress, IcoStatus, PlatformTransaction,
    TransactionDetails, TransactionType,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

#[async_trait]
pub trait IcoService: Send + Sync {
    /// Opens a campaign and escrows the tokens for sale. Returns the
    /// campaign's contract address, which identifies it everywhere else.
    async fn create_ico(&self, creator: &str, params: IcoParams) -> Result<String>;

    async fn purchase_tokens(&self, ico: &str, buyer: &str, amount: f64) -> Result<String>;

    async fn get_active_icos(
        &self,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>>;

    async fn get_ico_details(&self, ico: &str) -> Result<Ico>;

    async fn get_icos_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>>;

    /// Campaigns `wallet` bought into.
    async fn get_ico_participation(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>>;

    /// Pays out raised SOL and unsold tokens to the creator.
    async fn finalize_ico(&self, ico: &str, caller: &str) -> Result<String>;

    /// Returns escrowed tokens to the creator. Only before the first sale.
    async fn cancel_ico(&self, ico: &str, caller: &str) -> Result<String>;

    async fn is_ico_active(&self, ico: &str) -> Result<bool>;

    async fn get_ico_progress(&self, ico: &str) -> Result<IcoProgress>;
}

type IcoEntry = Arc<Mutex<Ico>>;

pub struct MemoryIcoService {
    ctx: ServiceContext,
    icos: RwLock<HashMap<String, IcoEntry>>,
}

impl MemoryIcoService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            icos: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, ico: &str) -> Result<IcoEntry> {
        self.icos.read().await.get(ico).cloned().ok_or_else(|| {
            PlatformError::validation(ErrorCode::IcoNotFound, format!("ICO {ico} not found"))
        })
    }

    async fn snapshot(&self) -> Vec<Ico> {
        let entries: Vec<IcoEntry> = self.icos.read().await.values().cloned().collect();
        let mut icos = Vec::with_capacity(entries.len());
        for entry in entries {
            icos.push(entry.lock().await.clone());
        }
        icos
    }

    fn validate_params(&self, params: &IcoParams) -> Result<()> {
        let limits = &self.ctx.limits;
        if !(params.price_per_token.is_finite() && params.price_per_token >= limits.min_token_price) {
            return Err(PlatformError::invalid_amount(format!(
                "price per token must be at least {}",
                limits.min_token_price
            )));
        }
        ensure_positive("tokens for sale", params.tokens_for_sale)?;
        if !(params.funding_goal.is_finite() && params.funding_goal >= 0.0) {
            return Err(PlatformError::invalid_amount("funding goal must be non-negative"));
        }
        if params.start_time >= params.end_time {
            return Err(PlatformError::invalid_params("ICO must start before it ends"));
        }
        let duration = (params.end_time - params.start_time).num_seconds();
        if duration < limits.min_ico_duration || duration > limits.max_ico_duration {
            return Err(PlatformError::invalid_params(format!(
                "ICO duration must be between {}s and {}s, got {}s",
                limits.min_ico_duration, limits.max_ico_duration, duration
            )));
        }
        Ok(())
    }

    fn ensure_creator(ico: &Ico, caller: &str) -> Result<()> {
        if ico.creator == caller {
            Ok(())
        } else {
            Err(PlatformError::unauthorized(format!(
                "only the creator can manage ICO {}",
                ico.contract_address
            )))
        }
    }

    fn ensure_active(ico: &Ico) -> Result<()> {
        if ico.status == IcoStatus::Active {
            Ok(())
        } else {
            Err(PlatformError::validation(
                ErrorCode::IcoNotActive,
                format!("ICO {} is {:?}", ico.contract_address, ico.status),
            ))
        }
    }

    /// Moves everything left in escrow to the creator.
    async fn release_escrow(&self, ico: &Ico) -> Result<()> {
        self.ctx
            .ledger
            .write(|state| {
                let sol = state.balance(&ico.contract_address, NATIVE_MINT);
                let tokens = state.balance(&ico.contract_address, &ico.token_mint);
                state.execute_transfers(&[
                    Transfer::new(&ico.contract_address, &ico.creator, NATIVE_MINT, sol),
                    Transfer::new(&ico.contract_address, &ico.creator, &ico.token_mint, tokens),
                ])
            })
            .await
    }
}

#[async_trait]
impl IcoService for MemoryIcoService {
    async fn create_ico(&self, creator: &str, params: IcoParams) -> Result<String> {
        self.ctx.ensure_wallet(creator)?;
        self.ctx.ensure_known_mint(&params.token_mint).await?;
        self.validate_params(&params)?;

        let available = self.ctx.ledger.balance(creator, &params.token_mint).await;
        if available + DUST < params.tokens_for_sale {
            return Err(PlatformError::insufficient_balance(
                creator,
                &params.token_mint,
                params.tokens_for_sale,
                available,
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let contract_address = derive_address(&[
            b"ico",
            params.token_mint.as_bytes(),
            creator.as_bytes(),
            id.as_bytes(),
        ]);

        let request = TransactionRequest::new(TransactionType::IcoCreation.as_str(), creator)
            .with_account(contract_address.clone())
            .with_account(params.token_mint.clone());
        let signature = self.ctx.submit(&request).await?;

        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[Transfer::new(
                    creator,
                    &contract_address,
                    &params.token_mint,
                    params.tokens_for_sale,
                )])
            })
            .await?;

        let ico = Ico {
            id,
            contract_address: contract_address.clone(),
            token_mint: params.token_mint.clone(),
            creator: creator.to_string(),
            price_per_token: params.price_per_token,
            tokens_for_sale: params.tokens_for_sale,
            tokens_sold: 0.0,
            start_time: params.start_time,
            end_time: params.end_time,
            funding_goal: params.funding_goal,
            funds_raised: 0.0,
            status: IcoStatus::Active,
            participants: Vec::new(),
        };
        self.icos
            .write()
            .await
            .insert(contract_address.clone(), Arc::new(Mutex::new(ico)));

        info!(
            "ICO {} opened for {} tokens of {} at {} SOL",
            contract_address, params.tokens_for_sale, params.token_mint, params.price_per_token
        );

        self.ctx
            .track(PlatformTransaction::confirmed(
                creator,
                TransactionType::IcoCreation,
                Some(signature),
                TransactionDetails::for_mint(params.token_mint)
                    .with_amount(params.tokens_for_sale)
                    .with_price(params.price_per_token)
                    .with_extra("icoAddress", contract_address.clone()),
            ))
            .await;

        Ok(contract_address)
    }

    async fn purchase_tokens(&self, ico: &str, buyer: &str, amount: f64) -> Result<String> {
        self.ctx.ensure_wallet(buyer)?;
        let entry = self.entry(ico).await?;
        ensure_positive("purchase amount", amount)?;

        let mut campaign = entry.lock().await;

        if !campaign.is_open_at(Utc::now()) {
            return Err(PlatformError::validation(
                ErrorCode::IcoNotActive,
                format!("ICO {ico} is not accepting purchases"),
            ));
        }
        if amount > campaign.tokens_remaining() {
            return Err(PlatformError::validation(
                ErrorCode::IcoSoldOut,
                format!(
                    "only {} tokens remain, requested {}",
                    campaign.tokens_remaining(),
                    amount
                ),
            ));
        }
        let cost = amount * campaign.price_per_token;
        let available = self.ctx.ledger.balance(buyer, NATIVE_MINT).await;
        if available + DUST < cost {
            return Err(PlatformError::insufficient_balance(buyer, NATIVE_MINT, cost, available));
        }

        let request = TransactionRequest::new(TransactionType::IcoPurchase.as_str(), buyer)
            .with_account(campaign.contract_address.clone())
            .with_account(campaign.token_mint.clone());
        let signature = self.ctx.submit(&request).await?;

        self.ctx
            .ledger
            .write(|state| {
                state.execute_transfers(&[
                    Transfer::new(buyer, &campaign.contract_address, NATIVE_MINT, cost),
                    Transfer::new(&campaign.contract_address, buyer, &campaign.token_mint, amount),
                ])
            })
            .await?;

        let now = Utc::now();
        campaign.tokens_sold = (campaign.tokens_sold + amount).min(campaign.tokens_for_sale);
        campaign.funds_raised += cost;
        campaign.participants.push(IcoParticipant {
            wallet_address: buyer.to_string(),
            tokens_purchased: amount,
            amount_paid: cost,
            transaction_signature: signature.clone(),
            timestamp: now,
        });

        info!(
            "{} bought {} tokens from ICO {} ({}/{} sold)",
            buyer, amount, ico, campaign.tokens_sold, campaign.tokens_for_sale
        );

        let details = TransactionDetails::for_mint(campaign.token_mint.clone())
            .with_amount(amount)
            .with_price(campaign.price_per_token)
            .with_extra("icoAddress", campaign.contract_address.clone())
            .with_extra("cost", cost);
        drop(campaign);

        self.ctx
            .track(PlatformTransaction::confirmed(
                buyer,
                TransactionType::IcoPurchase,
                Some(signature.clone()),
                details,
            ))
            .await;

        Ok(signature)
    }

    async fn get_active_icos(
        &self,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>> {
        let now = Utc::now();
        let mut icos: Vec<Ico> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|ico| ico.status == IcoStatus::Active && now < ico.end_time)
            .collect();
        icos.sort_by(|a, b| a.end_time.cmp(&b.end_time));
        Ok(PaginatedResponse::from_items(icos, self.ctx.page(pagination)))
    }

    async fn get_ico_details(&self, ico: &str) -> Result<Ico> {
        let entry = self.entry(ico).await?;
        let details = entry.lock().await.clone();
        Ok(details)
    }

    async fn get_icos_by_creator(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>> {
        self.ctx.ensure_wallet(wallet)?;
        let mut icos: Vec<Ico> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|ico| ico.creator == wallet)
            .collect();
        icos.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(PaginatedResponse::from_items(icos, self.ctx.page(pagination)))
    }

    async fn get_ico_participation(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Ico>> {
        self.ctx.ensure_wallet(wallet)?;
        let mut icos: Vec<Ico> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|ico| ico.participants.iter().any(|p| p.wallet_address == wallet))
            .collect();
        icos.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(PaginatedResponse::from_items(icos, self.ctx.page(pagination)))
    }

    async fn finalize_ico(&self, ico: &str, caller: &str) -> Result<String> {
        let entry = self.entry(ico).await?;
        let mut campaign = entry.lock().await;
        Self::ensure_creator(&campaign, caller)?;
        Self::ensure_active(&campaign)?;

        let ended = Utc::now() >= campaign.end_time;
        let sold_out = campaign.tokens_remaining() <= DUST;
        if !ended && !sold_out {
            return Err(PlatformError::invalid_params(format!(
                "ICO {ico} can be finalized once it has ended or sold out"
            )));
        }

        let request = TransactionRequest::new("ico_finalize", caller)
            .with_account(campaign.contract_address.clone());
        let signature = self.ctx.submit(&request).await?;

        self.release_escrow(&campaign).await?;
        campaign.status = IcoStatus::Completed;

        info!(
            "ICO {} finalized: {} SOL raised, {} tokens unsold",
            ico,
            campaign.funds_raised,
            campaign.tokens_remaining()
        );
        Ok(signature)
    }

    async fn cancel_ico(&self, ico: &str, caller: &str) -> Result<String> {
        let entry = self.entry(ico).await?;
        let mut campaign = entry.lock().await;
        Self::ensure_creator(&campaign, caller)?;
        Self::ensure_active(&campaign)?;

        if campaign.tokens_sold > 0.0 {
            return Err(PlatformError::invalid_params(format!(
                "ICO {ico} already sold {} tokens and can no longer be cancelled",
                campaign.tokens_sold
            )));
        }

        let request = TransactionRequest::new("ico_cancel", caller)
            .with_account(campaign.contract_address.clone());
        let signature = self.ctx.submit(&request).await?;

        self.release_escrow(&campaign).await?;
        campaign.status = IcoStatus::Cancelled;

        info!("ICO {} cancelled by {}", ico, caller);
        Ok(signature)
    }

    async fn is_ico_active(&self, ico: &str) -> Result<bool> {
        let entry = self.entry(ico).await?;
        let active = entry.lock().await.is_open_at(Utc::now());
        Ok(active)
    }

    async fn get_ico_progress(&self, ico: &str) -> Result<IcoProgress> {
        let entry = self.entry(ico).await?;
        let progress = entry.lock().await.progress_at(Utc::now());
        Ok(progress)
    }
}
