// Token minting and metadata management.

use super::{ensure_positive, ServiceContext};
use crate::chain::TransactionRequest;
use crate::error::{PlatformError, Result};
use crate::ledger::MintAccount;
use crate::models::{
    Creator, MintTokenParams, PlatformTransaction, Token, TokenMetadata, TokenMetadataUpdate,
    TransactionDetails, TransactionType,
};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::storage::{build_token_metadata_json, ContentBlob, ContentStorage};
use async_trait::async_trait;
use chrono::Utc;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait TokenService: Send + Sync {
    /// Mints a new token with uploaded metadata and returns its mint address.
    async fn mint_token(&self, creator: &str, params: MintTokenParams) -> Result<String>;

    /// Tokens created by `wallet`, newest first.
    async fn get_tokens_by_owner(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Token>>;

    async fn get_token(&self, mint: &str) -> Result<Token>;

    async fn get_token_metadata(&self, mint: &str) -> Result<TokenMetadata>;

    /// Returns false when `caller` does not hold the update authority.
    async fn update_token_metadata(
        &self,
        mint: &str,
        caller: &str,
        update: TokenMetadataUpdate,
    ) -> Result<bool>;

    /// Permanently gives up the update authority.
    async fn revoke_update_authority(&self, mint: &str, caller: &str) -> Result<bool>;

    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<f64>;

    /// Format check only.
    fn validate_token_mint(&self, mint: &str) -> bool;
}

pub struct MemoryTokenService {
    ctx: ServiceContext,
    storage: Arc<dyn ContentStorage>,
}

impl MemoryTokenService {
    pub fn new(ctx: ServiceContext, storage: Arc<dyn ContentStorage>) -> Self {
        Self { ctx, storage }
    }

    fn validate_name_symbol(&self, name: Option<&str>, symbol: Option<&str>) -> Result<()> {
        let limits = &self.ctx.limits;
        if let Some(name) = name {
            let len = name.trim().chars().count();
            if len == 0 || len > limits.max_token_name_len {
                return Err(PlatformError::invalid_params(format!(
                    "token name must be 1-{} characters",
                    limits.max_token_name_len
                )));
            }
        }
        if let Some(symbol) = symbol {
            let len = symbol.trim().chars().count();
            if len == 0 || len > limits.max_token_symbol_len {
                return Err(PlatformError::invalid_params(format!(
                    "token symbol must be 1-{} characters",
                    limits.max_token_symbol_len
                )));
            }
        }
        Ok(())
    }

    fn validate_mint_params(&self, params: &MintTokenParams) -> Result<()> {
        self.validate_name_symbol(Some(&params.name), Some(&params.symbol))?;
        if params.decimals > self.ctx.limits.max_token_decimals {
            return Err(PlatformError::invalid_params(format!(
                "decimals must be at most {}",
                self.ctx.limits.max_token_decimals
            )));
        }
        ensure_positive("supply", params.supply)
    }

    async fn fresh_mint_address(&self) -> String {
        loop {
            let candidate = Keypair::new().pubkey().to_string();
            if !self.ctx.ledger.contains_mint(&candidate).await {
                return candidate;
            }
        }
    }

    fn ensure_mint_format(&self, mint: &str) -> Result<()> {
        if self.validate_token_mint(mint) {
            Ok(())
        } else {
            Err(PlatformError::invalid_mint(mint))
        }
    }
}

#[async_trait]
impl TokenService for MemoryTokenService {
    async fn mint_token(&self, creator: &str, params: MintTokenParams) -> Result<String> {
        self.ctx.ensure_wallet(creator)?;
        self.validate_mint_params(&params)?;

        let image = self
            .storage
            .store(ContentBlob {
                name: params.image.file_name.clone(),
                content_type: params.image.content_type.clone(),
                bytes: params.image.bytes.clone(),
            })
            .await?;

        let document = build_token_metadata_json(
            &params.name,
            &params.symbol,
            &params.description,
            &image.url,
            &params.image.content_type,
            creator,
        );
        let metadata_doc = self
            .storage
            .store(ContentBlob {
                name: "metadata.json".to_string(),
                content_type: "application/json".to_string(),
                bytes: serde_json::to_vec(&document)?,
            })
            .await?;

        let mint = self.fresh_mint_address().await;
        let request = TransactionRequest::new(TransactionType::TokenMint.as_str(), creator)
            .with_account(mint.clone())
            .with_signatures(2);
        let signature = self.ctx.submit(&request).await?;

        let token = Token {
            mint_address: mint.clone(),
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            decimals: params.decimals,
            supply: params.supply,
            description: params.description.clone(),
            image_url: image.url,
            creator: creator.to_string(),
            created_at: Utc::now(),
            metadata: TokenMetadata {
                name: params.name.clone(),
                symbol: params.symbol.clone(),
                uri: metadata_doc.url,
                seller_fee_basis_points: 0,
                creators: Some(vec![Creator {
                    address: creator.to_string(),
                    verified: true,
                    share: 100,
                }]),
                collection: None,
                uses: None,
            },
        };

        self.ctx
            .ledger
            .write(|state| {
                state.register_mint(MintAccount {
                    token,
                    update_authority: Some(creator.to_string()),
                    lp_of_pool: None,
                })?;
                state.credit(creator, &mint, params.supply);
                Ok::<_, PlatformError>(())
            })
            .await?;

        info!(
            "Minted {} ({}) supply {} for {}",
            params.symbol, mint, params.supply, creator
        );

        self.ctx
            .track(PlatformTransaction::confirmed(
                creator,
                TransactionType::TokenMint,
                Some(signature),
                TransactionDetails::for_mint(mint.clone())
                    .with_amount(params.supply)
                    .with_extra("name", params.name)
                    .with_extra("symbol", params.symbol),
            ))
            .await;

        Ok(mint)
    }

    async fn get_tokens_by_owner(
        &self,
        wallet: &str,
        pagination: Option<PaginationParams>,
    ) -> Result<PaginatedResponse<Token>> {
        self.ctx.ensure_wallet(wallet)?;
        let mut tokens: Vec<Token> = self
            .ctx
            .ledger
            .read(|state| {
                state
                    .mints()
                    .filter(|m| m.lp_of_pool.is_none() && m.token.creator == wallet)
                    .map(|m| m.token.clone())
                    .collect()
            })
            .await;
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PaginatedResponse::from_items(tokens, self.ctx.page(pagination)))
    }

    async fn get_token(&self, mint: &str) -> Result<Token> {
        self.ensure_mint_format(mint)?;
        self.ctx
            .ledger
            .token(mint)
            .await
            .ok_or_else(|| PlatformError::invalid_mint(mint))
    }

    async fn get_token_metadata(&self, mint: &str) -> Result<TokenMetadata> {
        Ok(self.get_token(mint).await?.metadata)
    }

    async fn update_token_metadata(
        &self,
        mint: &str,
        caller: &str,
        update: TokenMetadataUpdate,
    ) -> Result<bool> {
        self.ensure_mint_format(mint)?;
        self.ctx.ensure_wallet(caller)?;
        self.validate_name_symbol(update.name.as_deref(), update.symbol.as_deref())?;

        let updated = self
            .ctx
            .ledger
            .write(|state| {
                let account = state
                    .mint_mut(mint)
                    .ok_or_else(|| PlatformError::invalid_mint(mint))?;
                if account.update_authority.as_deref() != Some(caller) {
                    return Ok(false);
                }
                if let Some(name) = &update.name {
                    account.token.name = name.clone();
                }
                if let Some(symbol) = &update.symbol {
                    account.token.symbol = symbol.clone();
                }
                account.token.metadata.apply(update);
                Ok::<_, PlatformError>(true)
            })
            .await?;

        if updated {
            info!("Updated metadata for {}", mint);
        } else {
            warn!("Metadata update for {} refused for {}", mint, caller);
        }
        Ok(updated)
    }

    async fn revoke_update_authority(&self, mint: &str, caller: &str) -> Result<bool> {
        self.ensure_mint_format(mint)?;
        self.ctx.ensure_wallet(caller)?;

        let revoked = self
            .ctx
            .ledger
            .write(|state| {
                let account = state
                    .mint_mut(mint)
                    .ok_or_else(|| PlatformError::invalid_mint(mint))?;
                if account.update_authority.as_deref() != Some(caller) {
                    return Ok(false);
                }
                account.update_authority = None;
                Ok::<_, PlatformError>(true)
            })
            .await?;

        if revoked {
            info!("Update authority for {} revoked", mint);
        }
        Ok(revoked)
    }

    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<f64> {
        self.ctx.ensure_wallet(wallet)?;
        self.ensure_mint_format(mint)?;
        Ok(self.ctx.ledger.balance(wallet, mint).await)
    }

    fn validate_token_mint(&self, mint: &str) -> bool {
        self.ctx.chain.validate_address(mint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::ImageFile;
    use crate::services::testing::{harness, wallet, Harness};
    use crate::services::PortfolioService;
    use crate::storage::MemoryContentStorage;

    fn params(name: &str, symbol: &str) -> MintTokenParams {
        MintTokenParams {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: 6,
            supply: 1_000_000.0,
            description: "community token".to_string(),
            image: ImageFile {
                file_name: "logo.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            },
        }
    }

    fn service(h: &Harness) -> (MemoryTokenService, Arc<MemoryContentStorage>) {
        let storage = Arc::new(MemoryContentStorage::new("https://gateway.test/ipfs"));
        (MemoryTokenService::new(h.ctx.clone(), storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_mint_token_registers_and_credits_creator() {
        let h = harness();
        let (tokens, storage) = service(&h);
        let creator = wallet();

        let mint = tokens.mint_token(&creator, params("Moon", "MOON")).await.unwrap();

        assert!(tokens.validate_token_mint(&mint));
        assert_eq!(tokens.get_token_balance(&creator, &mint).await.unwrap(), 1_000_000.0);

        let metadata = tokens.get_token_metadata(&mint).await.unwrap();
        assert_eq!(metadata.name, "Moon");
        assert!(metadata.uri.starts_with("https://gateway.test/ipfs/"));
        assert_eq!(metadata.creators.unwrap()[0].share, 100);

        // Image and metadata document.
        assert_eq!(storage.len().await, 2);
        let cid = metadata.uri.rsplit('/').next().unwrap();
        let doc: serde_json::Value =
            serde_json::from_slice(&storage.get(cid).await.unwrap().bytes).unwrap();
        assert_eq!(doc["symbol"], "MOON");
        assert_eq!(doc["properties"]["creators"][0]["address"], creator.as_str());

        let history = h.portfolio.get_transaction_history(&creator, None).await.unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(history.data[0].transaction_type, TransactionType::TokenMint);
        assert!(history.data[0].signature.is_some());
    }

    #[tokio::test]
    async fn test_mint_validation() {
        let h = harness();
        let (tokens, storage) = service(&h);
        let creator = wallet();

        let long_name = "x".repeat(33);
        let err = tokens.mint_token(&creator, params(&long_name, "X")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameters);

        let err = tokens.mint_token(&creator, params("Name", "")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameters);

        let err = tokens
            .mint_token(&creator, params("Name", "TOOLONGSYM"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameters);

        let mut p = params("Name", "SYM");
        p.decimals = 10;
        assert_eq!(tokens.mint_token(&creator, p).await.unwrap_err().code, ErrorCode::InvalidParameters);

        let mut p = params("Name", "SYM");
        p.supply = 0.0;
        assert_eq!(tokens.mint_token(&creator, p).await.unwrap_err().code, ErrorCode::InvalidAmount);

        let err = tokens.mint_token("not-a-wallet", params("Name", "SYM")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidWalletAddress);

        // Nothing reached storage.
        assert_eq!(storage.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_upload_mints_nothing() {
        let h = harness();
        let (tokens, _storage) = service(&h);
        let creator = wallet();
        let mut p = params("Moon", "MOON");
        p.image.bytes.clear();

        let err = tokens.mint_token(&creator, p).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageUploadFailed);
        assert_eq!(tokens.get_tokens_by_owner(&creator, None).await.unwrap().total, 0);
        assert_eq!(h.chain.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_tokens_by_owner_newest_first() {
        let h = harness();
        let (tokens, _storage) = service(&h);
        let creator = wallet();

        let first = tokens.mint_token(&creator, params("First", "ONE")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = tokens.mint_token(&creator, params("Second", "TWO")).await.unwrap();
        tokens.mint_token(&wallet(), params("Other", "OTH")).await.unwrap();

        let page = tokens.get_tokens_by_owner(&creator, None).await.unwrap();
        let mints: Vec<&str> = page.data.iter().map(|t| t.mint_address.as_str()).collect();
        assert_eq!(mints, vec![second.as_str(), first.as_str()]);
    }

    #[tokio::test]
    async fn test_metadata_authority_and_revocation() {
        let h = harness();
        let (tokens, _storage) = service(&h);
        let creator = wallet();
        let mint = tokens.mint_token(&creator, params("Moon", "MOON")).await.unwrap();

        let update = TokenMetadataUpdate {
            name: Some("Moon v2".to_string()),
            ..TokenMetadataUpdate::default()
        };
        assert!(!tokens
            .update_token_metadata(&mint, &wallet(), update.clone())
            .await
            .unwrap());
        assert!(tokens
            .update_token_metadata(&mint, &creator, update.clone())
            .await
            .unwrap());
        assert_eq!(tokens.get_token(&mint).await.unwrap().name, "Moon v2");

        assert!(!tokens.revoke_update_authority(&mint, &wallet()).await.unwrap());
        assert!(tokens.revoke_update_authority(&mint, &creator).await.unwrap());
        assert!(!tokens.update_token_metadata(&mint, &creator, update).await.unwrap());
        assert!(!tokens.revoke_update_authority(&mint, &creator).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_mint() {
        let h = harness();
        let (tokens, _storage) = service(&h);

        let err = tokens.get_token_metadata("BAD").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTokenMint);
        let err = tokens.get_token_metadata(&wallet()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTokenMint);
        assert!(!tokens.validate_token_mint("BAD"));
    }
}
