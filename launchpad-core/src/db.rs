use crate::error::{ErrorCode, PlatformError, Result};
use crate::models::{PlatformTransaction, TransactionDetails, TransactionStatus, TransactionType};
use crate::tx_log::TransactionLog;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};

 pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
     let pool = PgPoolOptions::new()
         .max_connections(max_connections)
         .connect(database_url)
         .await?;
     Ok(pool)
 }

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    // Embedded from the workspace-level `migrations` directory.
    sqlx::migrate!("../migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    wallet_address: String,
    tx_type: String,
    signature: Option<String>,
    timestamp: DateTime<Utc>,
    status: String,
    details: Json<TransactionDetails>,
}

impl TryFrom<TransactionRow> for PlatformTransaction {
    type Error = PlatformError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let corrupt = |field: &str, value: &str| {
            PlatformError::integration(
                ErrorCode::InvalidParameters,
                format!("stored transaction {} has unknown {field} {value:?}", row.id),
                false,
            )
        };
        let transaction_type =
            TransactionType::parse(&row.tx_type).ok_or_else(|| corrupt("type", &row.tx_type))?;
        let status = TransactionStatus::parse(&row.status).ok_or_else(|| corrupt("status", &row.status))?;

        Ok(PlatformTransaction {
            id: row.id,
            wallet_address: row.wallet_address,
            transaction_type,
            signature: row.signature,
            timestamp: row.timestamp,
            status,
            details: row.details.0,
        })
    }
}

/// Transaction log persisted in Postgres.
#[derive(Clone)]
pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn append(&self, tx: PlatformTransaction) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO platform_transactions (
                id,
                wallet_address,
                tx_type,
                signature,
                timestamp,
                status,
                details
            ) VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.wallet_address)
        .bind(tx.transaction_type.as_str())
        .bind(&tx.signature)
        .bind(tx.timestamp)
        .bind(tx.status.as_str())
        .bind(Json(&tx.details))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_wallet(&self, wallet: &str) -> Result<Vec<PlatformTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                id,
                wallet_address,
                tx_type,
                signature,
                timestamp,
                status,
                details
            FROM platform_transactions
            WHERE wallet_address = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(wallet)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PlatformTransaction::try_from).collect()
    }
}
