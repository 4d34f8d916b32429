use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub mint_address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub supply: f64,
    pub description: String,
    pub image_url: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub metadata: TokenMetadata,
}

/// On-chain metadata record. Name and symbol are duplicated from [`Token`]
/// so the record matches the metadata account layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
    pub collection: Option<Collection>,
    pub uses: Option<Uses>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub address: String,
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub verified: bool,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uses {
    pub use_method: String,
    pub remaining: u64,
    pub total: u64,
}

/// Partial metadata update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadataUpdate {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
    pub seller_fee_basis_points: Option<u16>,
    pub creators: Option<Vec<Creator>>,
    pub collection: Option<Collection>,
    pub uses: Option<Uses>,
}

impl TokenMetadata {
    pub fn apply(&mut self, update: TokenMetadataUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(symbol) = update.symbol {
            self.symbol = symbol;
        }
        if let Some(uri) = update.uri {
            self.uri = uri;
        }
        if let Some(bps) = update.seller_fee_basis_points {
            self.seller_fee_basis_points = bps;
        }
        if update.creators.is_some() {
            self.creators = update.creators;
        }
        if update.collection.is_some() {
            self.collection = update.collection;
        }
        if update.uses.is_some() {
            self.uses = update.uses;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MintTokenParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub supply: f64,
    pub description: String,
    pub image: ImageFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcoStatus {
    Active,
    Completed,
    Cancelled,
}

impl IcoStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            IcoStatus::Active => false,
            IcoStatus::Completed | IcoStatus::Cancelled => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ico {
    pub id: String,
    pub contract_address: String,
    pub token_mint: String,
    pub creator: String,
    pub price_per_token: f64,
    pub tokens_for_sale: f64,
    pub tokens_sold: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub funding_goal: f64,
    pub funds_raised: f64,
    pub status: IcoStatus,
    pub participants: Vec<IcoParticipant>,
}

impl Ico {
    /// True while the campaign accepts purchases at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == IcoStatus::Active && now >= self.start_time && now < self.end_time
    }

    pub fn tokens_remaining(&self) -> f64 {
        (self.tokens_for_sale - self.tokens_sold).max(0.0)
    }

    pub fn progress_at(&self, now: DateTime<Utc>) -> IcoProgress {
        let percentage_sold = if self.tokens_for_sale > 0.0 {
            self.tokens_sold / self.tokens_for_sale * 100.0
        } else {
            0.0
        };
        let time_remaining = (self.end_time - now).num_seconds().max(0);

        let mut wallets: Vec<&str> = self
            .participants
            .iter()
            .map(|p| p.wallet_address.as_str())
            .collect();
        wallets.sort_unstable();
        wallets.dedup();

        IcoProgress {
            tokens_remaining: self.tokens_remaining(),
            percentage_sold,
            time_remaining,
            participant_count: wallets.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcoParticipant {
    pub wallet_address: String,
    pub tokens_purchased: f64,
    pub amount_paid: f64,
    pub transaction_signature: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcoParams {
    pub token_mint: String,
    pub price_per_token: f64,
    pub tokens_for_sale: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub funding_goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcoProgress {
    pub tokens_remaining: f64,
    pub percentage_sold: f64,
    /// Seconds until `end_time`, zero once it has passed.
    pub time_remaining: i64,
    pub participant_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirdropStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AirdropStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            AirdropStatus::Pending | AirdropStatus::Processing => false,
            AirdropStatus::Completed | AirdropStatus::Failed => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropRecipient {
    pub address: String,
    pub amount: f64,
    pub status: RecipientStatus,
    pub transaction_signature: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airdrop {
    pub id: String,
    pub token_mint: String,
    pub creator: String,
    pub total_amount: f64,
    pub recipients: Vec<AirdropRecipient>,
    pub status: AirdropStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub transaction_signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientInput {
    pub address: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropParams {
    pub token_mint: String,
    pub recipients: Vec<RecipientInput>,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidAddress {
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientValidation {
    pub valid: Vec<String>,
    pub invalid: Vec<InvalidAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DexProtocol {
    Raydium,
    Orca,
    Jupiter,
}

impl DexProtocol {
    pub const ALL: [DexProtocol; 3] = [DexProtocol::Raydium, DexProtocol::Orca, DexProtocol::Jupiter];

    /// Swap fee charged on the input side, in basis points.
    pub fn fee_bps(&self) -> u32 {
        match self {
            DexProtocol::Raydium => 25,
            DexProtocol::Orca => 30,
            DexProtocol::Jupiter => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DexProtocol::Raydium => "raydium",
            DexProtocol::Orca => "orca",
            DexProtocol::Jupiter => "jupiter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPool {
    pub address: String,
    pub token_a: String,
    pub token_b: String,
    pub creator: String,
    pub total_liquidity: f64,
    pub volume_24h: f64,
    pub fees_24h: f64,
    pub apy: f64,
    pub protocol: DexProtocol,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolLiquidity {
    pub token_a_amount: f64,
    pub token_b_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmounts {
    pub token_a: f64,
    pub token_b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub output_amount: f64,
    /// Percentage shortfall against the spot-price output.
    pub price_impact: f64,
    pub minimum_received: f64,
    pub fee: f64,
}

/// Floor a swap must clear before it is allowed to execute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SlippageGuard {
    /// Maximum shortfall against the spot-price output, in percent.
    Tolerance(f64),
    /// Absolute minimum output amount, typically a quote's `minimum_received`.
    MinimumReceived(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub input_token: String,
    pub output_token: String,
    pub amount: f64,
    pub guard: SlippageGuard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    pub signature: String,
    pub output_amount: f64,
    pub price_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatistics {
    pub volume: f64,
    pub fees: f64,
    pub apy: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl Timeframe {
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::Day => Duration::hours(24),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
            Timeframe::Year => Duration::days(365),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Minted,
    IcoPurchase,
    Airdrop,
    Trading,
    LiquidityProvision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioToken {
    pub mint_address: String,
    pub name: String,
    pub symbol: String,
    pub balance: f64,
    pub value: f64,
    pub source: TokenSource,
    pub metadata: TokenMetadata,
}

/// Derived view of a wallet. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub wallet_address: String,
    pub tokens: Vec<PortfolioToken>,
    pub total_value: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPerformance {
    pub current_value: f64,
    pub previous_value: f64,
    pub change_percent: f64,
    pub change_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAllocation {
    pub token: PortfolioToken,
    pub percentage: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_tokens: usize,
    pub total_value: f64,
    pub total_transactions: usize,
    pub most_valuable_token: Option<PortfolioToken>,
    pub recent_activity: Vec<PlatformTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TokenMint,
    IcoCreation,
    IcoPurchase,
    AirdropCreation,
    AirdropExecution,
    PoolCreation,
    LiquidityAdd,
    LiquidityRemove,
    TokenSwap,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TokenMint => "token_mint",
            TransactionType::IcoCreation => "ico_creation",
            TransactionType::IcoPurchase => "ico_purchase",
            TransactionType::AirdropCreation => "airdrop_creation",
            TransactionType::AirdropExecution => "airdrop_execution",
            TransactionType::PoolCreation => "pool_creation",
            TransactionType::LiquidityAdd => "liquidity_add",
            TransactionType::LiquidityRemove => "liquidity_remove",
            TransactionType::TokenSwap => "token_swap",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "token_mint" => TransactionType::TokenMint,
            "ico_creation" => TransactionType::IcoCreation,
            "ico_purchase" => TransactionType::IcoPurchase,
            "airdrop_creation" => TransactionType::AirdropCreation,
            "airdrop_execution" => TransactionType::AirdropExecution,
            "pool_creation" => TransactionType::PoolCreation,
            "liquidity_add" => TransactionType::LiquidityAdd,
            "liquidity_remove" => TransactionType::LiquidityRemove,
            "token_swap" => TransactionType::TokenSwap,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "confirmed" => Some(TransactionStatus::Confirmed),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// Operation-specific details. Well-known keys are typed, anything else
/// lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TransactionDetails {
    pub fn for_mint(mint: impl Into<String>) -> Self {
        Self {
            token_mint: Some(mint.into()),
            ..Self::default()
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool_address = Some(pool.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTransaction {
    pub id: String,
    pub wallet_address: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// `None` for records that never touched the chain.
    pub signature: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    pub details: TransactionDetails,
}

impl PlatformTransaction {
    pub fn confirmed(
        wallet_address: impl Into<String>,
        transaction_type: TransactionType,
        signature: Option<String>,
        details: TransactionDetails,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_address: wallet_address.into(),
            transaction_type,
            signature,
            timestamp: Utc::now(),
            status: TransactionStatus::Confirmed,
            details,
        }
    }
}
