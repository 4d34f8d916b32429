use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use launchpad_core::{
    chain::SimulatedChain,
    config::{FeeSchedule, PlatformConfig},
    csv_import::RecipientImport,
    db::{create_pool, run_migrations, PgTransactionLog},
    error::{ErrorCategory, ErrorCode, PlatformError},
    events::{EventSink, RedisPublisher},
    ledger::Ledger,
    models::{
        Airdrop, DexProtocol, ExportFormat, Ico, IcoProgress, LiquidityPool, PlatformTransaction,
        Portfolio, PortfolioPerformance, PortfolioSummary, PoolStatistics, RecipientValidation,
        SwapQuote, Timeframe, Token, TokenAllocation, TokenMetadata,
    },
    pagination::{PaginatedResponse, PaginationParams},
    services::{
        AirdropService, IcoService, LiquidityPoolService, MemoryAirdropService, MemoryIcoService,
        MemoryPoolService, MemoryPortfolioService, MemoryTokenService, PortfolioService,
        PortfolioSubscription, ServiceContext, TokenService,
    },
    storage::{storage_from_config, ContentStorage},
    tx_log::{MemoryTransactionLog, TransactionLog},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct ApiError(PlatformError);

impl From<PlatformError> for ApiError {
    fn from(e: PlatformError) -> Self {
        Self(e)
    }
}

fn status_for(e: &PlatformError) -> StatusCode {
    match e.code {
        ErrorCode::IcoNotFound | ErrorCode::AirdropNotFound | ErrorCode::PoolNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::UnauthorizedAccess => StatusCode::FORBIDDEN,
        _ if e.is(ErrorCategory::Validation) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.0.code.as_str(),
            "message": self.0.message,
            "retryable": self.0.retryable,
        });
        (status_for(&self.0), Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn event_payload<T: Serialize>(topic: &str, wallet: &str, payload: &T) -> String {
    json!({
        "topic": topic,
        "wallet": wallet,
        "payload": payload,
    })
    .to_string()
}

/// Fans tracked events out to websocket clients and, when configured, Redis.
struct GatewaySink {
    events_tx: broadcast::Sender<String>,
    redis: Option<RedisPublisher>,
}

#[async_trait]
impl EventSink for GatewaySink {
    async fn transaction_tracked(&self, tx: &PlatformTransaction) {
        // No receivers is fine.
        let _ = self
            .events_tx
            .send(event_payload("transaction", &tx.wallet_address, tx));
        if let Some(redis) = &self.redis {
            redis.transaction_tracked(tx).await;
        }
    }

    async fn portfolio_updated(&self, portfolio: &Portfolio) {
        if let Some(redis) = &self.redis {
            redis.portfolio_updated(portfolio).await;
        }
    }
}

/// Read facade over a ledger shared with whatever settles platform
/// transactions; the gateway itself exposes no write routes.
#[derive(Clone)]
struct AppState {
    tokens: Arc<dyn TokenService>,
    icos: Arc<dyn IcoService>,
    airdrops: Arc<dyn AirdropService>,
    pools: Arc<dyn LiquidityPoolService>,
    portfolio: Arc<dyn PortfolioService>,
    fees: FeeSchedule,
    default_page_size: usize,
    events_tx: broadcast::Sender<String>,
}

impl AppState {
    fn build(
        config: &PlatformConfig,
        ledger: Arc<Ledger>,
        log: Arc<dyn TransactionLog>,
        events_tx: broadcast::Sender<String>,
        redis: Option<RedisPublisher>,
    ) -> Self {
        let sink = Arc::new(GatewaySink {
            events_tx: events_tx.clone(),
            redis,
        });
        let portfolio = Arc::new(
            MemoryPortfolioService::new(ledger.clone(), log)
                .with_limits(config.limits.clone())
                .with_events(sink),
        );
        let ctx = ServiceContext::new(
            Arc::new(SimulatedChain::new()),
            ledger,
            portfolio.clone(),
            config,
        );
        let storage: Arc<dyn ContentStorage> = Arc::from(storage_from_config(&config.storage));

        Self {
            tokens: Arc::new(MemoryTokenService::new(ctx.clone(), storage)),
            icos: Arc::new(MemoryIcoService::new(ctx.clone())),
            airdrops: Arc::new(MemoryAirdropService::new(ctx.clone())),
            pools: Arc::new(MemoryPoolService::new(ctx)),
            portfolio,
            fees: config.fees.clone(),
            default_page_size: config.limits.default_page_size,
            events_tx,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

impl PageQuery {
    fn params(&self, default_limit: usize) -> Option<PaginationParams> {
        if self.page.is_none() && self.limit.is_none() {
            return None;
        }
        Some(PaginationParams::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TimeframeQuery {
    timeframe: Option<Timeframe>,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<ExportFormat>,
}

#[derive(Debug, Deserialize)]
struct QuoteQuery {
    input: String,
    output: String,
    amount: f64,
    slippage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PairQuery {
    token_a: String,
    token_b: String,
    protocol: Option<DexProtocol>,
}

#[derive(Debug, Deserialize)]
struct EstimateQuery {
    recipients: usize,
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    recipients: Vec<String>,
}

async fn health() -> &'static str {
    "ok"
}

async fn fees_handler(State(state): State<AppState>) -> Json<FeeSchedule> {
    Json(state.fees)
}

async fn protocols_handler(State(state): State<AppState>) -> Json<Vec<DexProtocol>> {
    Json(state.pools.get_supported_protocols())
}

async fn token_handler(State(state): State<AppState>, Path(mint): Path<String>) -> ApiResult<Token> {
    Ok(Json(state.tokens.get_token(&mint).await?))
}

async fn token_metadata_handler(
    State(state): State<AppState>,
    Path(mint): Path<String>,
) -> ApiResult<TokenMetadata> {
    Ok(Json(state.tokens.get_token_metadata(&mint).await?))
}

async fn token_balance_handler(
    State(state): State<AppState>,
    Path((mint, wallet)): Path<(String, String)>,
) -> ApiResult<JsonValue> {
    let balance = state.tokens.get_token_balance(&wallet, &mint).await?;
    Ok(Json(json!({ "mint": mint, "wallet": wallet, "balance": balance })))
}

async fn token_pools_handler(
    State(state): State<AppState>,
    Path(mint): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<LiquidityPool>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.pools.get_pools_for_token(&mint, page).await?))
}

async fn active_icos_handler(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Ico>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.icos.get_active_icos(page).await?))
}

async fn ico_handler(State(state): State<AppState>, Path(ico): Path<String>) -> ApiResult<Ico> {
    Ok(Json(state.icos.get_ico_details(&ico).await?))
}

async fn ico_progress_handler(
    State(state): State<AppState>,
    Path(ico): Path<String>,
) -> ApiResult<IcoProgress> {
    Ok(Json(state.icos.get_ico_progress(&ico).await?))
}

async fn airdrop_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Airdrop> {
    Ok(Json(state.airdrops.get_airdrop_status(&id).await?))
}

async fn pool_handler(
    State(state): State<AppState>,
    Path(pool): Path<String>,
) -> ApiResult<LiquidityPool> {
    Ok(Json(state.pools.get_pool_info(&pool).await?))
}

async fn pool_stats_handler(
    State(state): State<AppState>,
    Path(pool): Path<String>,
    Query(q): Query<TimeframeQuery>,
) -> ApiResult<PoolStatistics> {
    let timeframe = q.timeframe.unwrap_or(Timeframe::Day);
    Ok(Json(state.pools.get_pool_statistics(&pool, timeframe).await?))
}

async fn quote_handler(
    State(state): State<AppState>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<SwapQuote> {
    let quote = state
        .pools
        .get_swap_quote(&q.input, &q.output, q.amount, q.slippage)
        .await?;
    Ok(Json(quote))
}

async fn best_pool_handler(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> ApiResult<JsonValue> {
    let best = state.pools.get_best_pool(&q.token_a, &q.token_b).await?;
    let exists = state
        .pools
        .pool_exists(&q.token_a, &q.token_b, q.protocol)
        .await?;
    Ok(Json(json!({ "exists": exists, "pool": best })))
}

async fn validate_recipients_handler(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Json<RecipientValidation> {
    Json(state.airdrops.validate_recipients(&req.recipients))
}

async fn import_recipients_handler(State(state): State<AppState>, body: String) -> Json<RecipientImport> {
    Json(state.airdrops.import_recipients_from_csv(&body))
}

async fn estimate_handler(
    State(state): State<AppState>,
    Query(q): Query<EstimateQuery>,
) -> ApiResult<JsonValue> {
    let cost = state.airdrops.estimate_airdrop_cost(q.recipients).await?;
    Ok(Json(json!({ "recipients": q.recipients, "estimatedCostSol": cost })))
}

async fn wallet_tokens_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Token>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.tokens.get_tokens_by_owner(&wallet, page).await?))
}

async fn wallet_icos_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Ico>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.icos.get_icos_by_creator(&wallet, page).await?))
}

async fn wallet_participation_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Ico>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.icos.get_ico_participation(&wallet, page).await?))
}

async fn wallet_airdrops_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Airdrop>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.airdrops.get_airdrops_by_creator(&wallet, page).await?))
}

async fn wallet_received_airdrops_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Airdrop>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.airdrops.get_airdrop_history(&wallet, page).await?))
}

async fn wallet_pools_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<LiquidityPool>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.pools.get_pools_by_creator(&wallet, page).await?))
}

async fn portfolio_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Portfolio> {
    Ok(Json(state.portfolio.get_user_portfolio(&wallet).await?))
}

async fn portfolio_summary_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<PortfolioSummary> {
    Ok(Json(state.portfolio.get_portfolio_summary(&wallet).await?))
}

async fn portfolio_allocation_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Vec<TokenAllocation>> {
    Ok(Json(state.portfolio.get_token_allocation(&wallet).await?))
}

async fn portfolio_performance_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<TimeframeQuery>,
) -> ApiResult<PortfolioPerformance> {
    let timeframe = q.timeframe.unwrap_or(Timeframe::Day);
    Ok(Json(
        state
            .portfolio
            .get_portfolio_performance(&wallet, timeframe)
            .await?,
    ))
}

async fn wallet_transactions_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<PlatformTransaction>> {
    let page = q.params(state.default_page_size);
    Ok(Json(state.portfolio.get_transaction_history(&wallet, page).await?))
}

async fn portfolio_export_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(q): Query<ExportQuery>,
) -> std::result::Result<Response, ApiError> {
    let format = q.format.unwrap_or(ExportFormat::Json);
    let body = state.portfolio.export_portfolio_data(&wallet, format).await?;
    let content_type = match format {
        ExportFormat::Csv => "text/csv",
        ExportFormat::Json => "application/json",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Wallet named by a `{"type":"subscribe","wallet":"..."}` message.
fn parse_subscribe(text: &str) -> Option<String> {
    let v: JsonValue = serde_json::from_str(text).ok()?;
    if v.get("type").and_then(|t| t.as_str()) != Some("subscribe") {
        return None;
    }
    v.get("wallet").and_then(|w| w.as_str()).map(str::to_string)
}

/// Broadcast events reach a socket only after it subscribed to their wallet.
fn is_for_wallet(payload: &str, subscribed: Option<&str>) -> bool {
    let Some(subscribed) = subscribed else {
        return false;
    };
    serde_json::from_str::<JsonValue>(payload)
        .ok()
        .and_then(|v| v.get("wallet").and_then(|w| w.as_str()).map(str::to_string))
        .as_deref()
        == Some(subscribed)
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    // Protocol:
    // - Client sends: {"type":"subscribe","wallet":"..."}
    // - Server pushes: {"topic":"portfolio"|"transaction","wallet":"...","payload":{...}}
    let mut rx = state.events_tx.subscribe();
    let (portfolio_tx, mut portfolio_rx) = mpsc::unbounded_channel::<String>();

    // Held for the lifetime of the connection; replaced on resubscribe.
    let mut subscription: Option<PortfolioSubscription> = None;

    loop {
        tokio::select! {
            recv = socket.recv() => {
                let Some(Ok(msg)) = recv else { break; };
                let Message::Text(txt) = msg else { continue; };
                let Some(wallet) = parse_subscribe(&txt) else { continue; };

                let tx = portfolio_tx.clone();
                let reply = match state.portfolio.subscribe_to_portfolio_updates(
                    &wallet,
                    Arc::new(move |portfolio: Portfolio| {
                        let _ = tx.send(event_payload("portfolio", &portfolio.wallet_address, &portfolio));
                    }),
                ) {
                    Ok(sub) => {
                        subscription = Some(sub);
                        json!({ "type": "subscribed", "wallet": wallet })
                    }
                    Err(e) => json!({ "type": "error", "code": e.code.as_str(), "message": e.message }),
                };
                if socket.send(Message::Text(reply.to_string())).await.is_err() {
                    break;
                }
            }
            Some(payload) = portfolio_rx.recv() => {
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            evt = rx.recv() => {
                let Ok(payload) = evt else { continue; };
                let wallet = subscription.as_ref().map(PortfolioSubscription::wallet);
                if !is_for_wallet(&payload, wallet) {
                    continue;
                }
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/fees", get(fees_handler))
        .route("/api/protocols", get(protocols_handler))
        .route("/api/tokens/:mint", get(token_handler))
        .route("/api/tokens/:mint/metadata", get(token_metadata_handler))
        .route("/api/tokens/:mint/balances/:wallet", get(token_balance_handler))
        .route("/api/tokens/:mint/pools", get(token_pools_handler))
        .route("/api/icos", get(active_icos_handler))
        .route("/api/icos/:ico", get(ico_handler))
        .route("/api/icos/:ico/progress", get(ico_progress_handler))
        .route("/api/airdrops/:id", get(airdrop_handler))
        .route("/api/pools/:pool", get(pool_handler))
        .route("/api/pools/:pool/stats", get(pool_stats_handler))
        .route("/api/swap/quote", get(quote_handler))
        .route("/api/swap/best-pool", get(best_pool_handler))
        .route("/api/recipients/validate", post(validate_recipients_handler))
        .route("/api/recipients/import", post(import_recipients_handler))
        .route("/api/recipients/estimate", get(estimate_handler))
        .route("/api/wallets/:wallet/tokens", get(wallet_tokens_handler))
        .route("/api/wallets/:wallet/icos", get(wallet_icos_handler))
        .route("/api/wallets/:wallet/ico-participation", get(wallet_participation_handler))
        .route("/api/wallets/:wallet/airdrops", get(wallet_airdrops_handler))
        .route("/api/wallets/:wallet/airdrops/received", get(wallet_received_airdrops_handler))
        .route("/api/wallets/:wallet/pools", get(wallet_pools_handler))
        .route("/api/wallets/:wallet/portfolio", get(portfolio_handler))
        .route("/api/wallets/:wallet/portfolio/summary", get(portfolio_summary_handler))
        .route("/api/wallets/:wallet/portfolio/allocation", get(portfolio_allocation_handler))
        .route("/api/wallets/:wallet/portfolio/performance", get(portfolio_performance_handler))
        .route("/api/wallets/:wallet/portfolio/export", get(portfolio_export_handler))
        .route("/api/wallets/:wallet/transactions", get(wallet_transactions_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = PlatformConfig::from_env()?;

    let log: Arc<dyn TransactionLog> = match &config.db {
        Some(db) => {
            let pool = create_pool(&db.url, db.max_connections).await?;
            run_migrations(&pool).await?;
            Arc::new(PgTransactionLog::new(pool))
        }
        None => {
            warn!("No database configured, transaction history is kept in memory");
            Arc::new(MemoryTransactionLog::new())
        }
    };

    let redis = match &config.redis {
        Some(redis) => Some(RedisPublisher::connect(redis).await?),
        None => None,
    };

    let (events_tx, _events_rx) = broadcast::channel::<String>(10_000);
    let ledger = Arc::new(Ledger::new());
    let state = AppState::build(&config, ledger, log, events_tx, redis);
    let app = router(state);

    let addr: SocketAddr = config.api.bind_addr.parse()?;
    info!(
        "Starting {} gateway on {}",
        config.runtime.environment, addr
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use launchpad_core::ledger::MintAccount;
    use solana_sdk::pubkey::Pubkey;
    use tower::ServiceExt;

    fn app_over(ledger: Arc<Ledger>) -> Router {
        let config = PlatformConfig::default();
        let (events_tx, _) = broadcast::channel(16);
        router(AppState::build(
            &config,
            ledger,
            Arc::new(MemoryTransactionLog::new()),
            events_tx,
            None,
        ))
    }

    fn app() -> Router {
        app_over(Arc::new(Ledger::new()))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_serves_reads_from_shared_ledger() {
        let ledger = Arc::new(Ledger::new());
        let mint = Pubkey::new_unique().to_string();
        let holder = Pubkey::new_unique().to_string();
        let token: Token = serde_json::from_value(json!({
            "mintAddress": mint,
            "name": "Shared",
            "symbol": "SHR",
            "decimals": 6,
            "supply": 50.0,
            "description": "",
            "imageUrl": "",
            "creator": holder,
            "createdAt": "2024-06-01T00:00:00Z",
            "metadata": { "name": "Shared", "symbol": "SHR", "uri": "", "sellerFeeBasisPoints": 0 },
        }))
        .unwrap();
        ledger
            .write(|s| {
                s.register_mint(MintAccount {
                    token,
                    update_authority: Some(holder.clone()),
                    lp_of_pool: None,
                })?;
                s.credit(&holder, &mint, 50.0);
                Ok::<_, PlatformError>(())
            })
            .await
            .unwrap();

        let (status, body) = send(app_over(ledger.clone()), get_req(&format!("/api/tokens/{mint}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "SHR");

        let uri = format!("/api/tokens/{mint}/balances/{holder}");
        let (status, body) = send(app_over(ledger), get_req(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 50.0);
    }

    #[test]
    fn test_socket_events_need_a_subscription() {
        let payload = event_payload("transaction", "alice", &json!({ "id": "t1" }));
        assert!(!is_for_wallet(&payload, None));
        assert!(!is_for_wallet(&payload, Some("bob")));
        assert!(is_for_wallet(&payload, Some("alice")));
    }

    #[tokio::test]
    async fn test_fees_and_protocols() {
        let (status, body) = send(app(), get_req("/api/fees")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_creation"], 0.3);
        assert_eq!(body["pool_creation"], 0.2);

        let (_, body) = send(app(), get_req("/api/protocols")).await;
        assert_eq!(body, json!(["raydium", "orca", "jupiter"]));
    }

    #[tokio::test]
    async fn test_errors_map_to_status_and_code() {
        let (status, body) = send(app(), get_req("/api/airdrops/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "AIRDROP_NOT_FOUND");
        assert_eq!(body["retryable"], false);

        let (status, body) = send(app(), get_req("/api/wallets/not-a-wallet/portfolio")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_WALLET_ADDRESS");

        let uri = format!(
            "/api/swap/quote?input={}&output={}&amount=1",
            Pubkey::new_unique(),
            Pubkey::new_unique()
        );
        let (status, body) = send(app(), get_req(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "POOL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_recipient_helpers() {
        let good = Pubkey::new_unique().to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/api/recipients/validate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "recipients": [good, "bogus"] }).to_string()))
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], json!([good]));
        assert_eq!(body["invalid"][0]["address"], "bogus");

        let csv = format!("address,amount\n{good},5\nbogus,1\n");
        let request = Request::builder()
            .method("POST")
            .uri("/api/recipients/import")
            .body(Body::from(csv))
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recipients"][0]["address"], good);
        assert_eq!(body["errors"][0]["row"], 3);

        let (status, body) = send(app(), get_req("/api/recipients/estimate?recipients=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["estimatedCostSol"].as_f64().unwrap() > 0.05);
    }

    #[tokio::test]
    async fn test_empty_wallet_views() {
        let wallet = Pubkey::new_unique().to_string();

        let (status, body) = send(app(), get_req(&format!("/api/wallets/{wallet}/portfolio"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["walletAddress"], wallet);
        assert_eq!(body["tokens"], json!([]));

        let uri = format!("/api/wallets/{wallet}/transactions?page=2&limit=5");
        let (status, body) = send(app(), get_req(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["hasPrev"], true);
        assert_eq!(body["hasNext"], false);

        let response = app()
            .oneshot(get_req(&format!("/api/wallets/{wallet}/portfolio/export?format=csv")))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    }

    #[test]
    fn test_parse_subscribe() {
        assert_eq!(
            parse_subscribe(r#"{"type":"subscribe","wallet":"abc"}"#),
            Some("abc".to_string())
        );
        assert_eq!(parse_subscribe(r#"{"type":"ping"}"#), None);
        assert_eq!(parse_subscribe("not json"), None);
    }

    #[tokio::test]
    async fn test_transaction_events_reach_broadcast() {
        let (events_tx, mut rx) = broadcast::channel(16);
        let sink = GatewaySink {
            events_tx,
            redis: None,
        };
        let wallet = Pubkey::new_unique().to_string();
        let tx = PlatformTransaction::confirmed(
            wallet.clone(),
            launchpad_core::models::TransactionType::TokenSwap,
            None,
            Default::default(),
        );
        sink.transaction_tracked(&tx).await;

        let payload: JsonValue = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(payload["topic"], "transaction");
        assert_eq!(payload["wallet"], wallet);
        assert_eq!(payload["payload"]["type"], "token_swap");
    }
}
