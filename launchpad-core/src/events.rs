// Redis streams publishing for transaction and portfolio events
use crate::config::RedisConfig;
use crate::models::{PlatformTransaction, Portfolio};
use anyhow::Result;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use serde_json::json;
use tracing::{info, warn};

/// Receives platform events after they are committed. Delivery is best effort.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn transaction_tracked(&self, tx: &PlatformTransaction);
    async fn portfolio_updated(&self, portfolio: &Portfolio);
}

pub struct RedisPublisher {
    client: ConnectionManager,
    key_prefix: String,
    max_stream_len: u64,
}

/// `redis://` URL for the configured host, database and optional password.
pub fn connection_url(config: &RedisConfig) -> String {
    if config.password.is_empty() {
        format!("redis://{}:{}/{}", config.host, config.port, config.db)
    } else {
        format!(
            "redis://:{}@{}:{}/{}",
            config.password, config.host, config.port, config.db
        )
    }
}

impl RedisPublisher {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(connection_url(config))?;
        let manager = ConnectionManager::new(client).await?;

        info!("Publishing events to Redis at {}:{}", config.host, config.port);

        Ok(Self {
            client: manager,
            key_prefix: config.stream_key_prefix.clone(),
            max_stream_len: config.max_stream_len,
        })
    }

    pub fn transaction_stream_key(&self, wallet: &str) -> String {
        format!("{}transactions:{}", self.key_prefix, wallet)
    }

    pub fn portfolio_stream_key(&self, wallet: &str) -> String {
        format!("{}portfolio:{}", self.key_prefix, wallet)
    }

    /// Publish a tracked platform transaction to the wallet's stream
    pub async fn publish_transaction(&self, tx: &PlatformTransaction) -> Result<()> {
        let stream_key = self.transaction_stream_key(&tx.wallet_address);
        let payload = serde_json::to_string(tx)?;
        self.append(&stream_key, payload).await
    }

    /// Publish a recomputed portfolio snapshot
    pub async fn publish_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        let stream_key = self.portfolio_stream_key(&portfolio.wallet_address);
        let payload = json!({
            "walletAddress": portfolio.wallet_address,
            "totalValue": portfolio.total_value,
            "tokenCount": portfolio.tokens.len(),
            "lastUpdated": portfolio.last_updated.timestamp(),
        });
        self.append(&stream_key, payload.to_string()).await
    }

    async fn append(&self, stream_key: &str, payload: String) -> Result<()> {
        let _: String = redis::cmd("XADD")
            .arg(stream_key)
            .arg("*")
            .arg("data")
            .arg(payload)
            .query_async(&mut self.client.clone())
            .await?;

        // Trim stream if too large
        let _: () = redis::cmd("XTRIM")
            .arg(stream_key)
            .arg("MAXLEN")
            .arg(self.max_stream_len)
            .query_async(&mut self.client.clone())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EventSink for RedisPublisher {
    async fn transaction_tracked(&self, tx: &PlatformTransaction) {
        if let Err(e) = self.publish_transaction(tx).await {
            warn!("Failed to publish transaction {}: {}", tx.id, e);
        }
    }

    async fn portfolio_updated(&self, portfolio: &Portfolio) {
        if let Err(e) = self.publish_portfolio(portfolio).await {
            warn!("Failed to publish portfolio for {}: {}", portfolio.wallet_address, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(password: &str) -> RedisConfig {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            db: 2,
            password: password.to_string(),
            stream_key_prefix: "launchpad:".to_string(),
            max_stream_len: 1_000,
        }
    }

    #[test]
    fn test_connection_url() {
        assert_eq!(connection_url(&config("")), "redis://localhost:6379/2");
        assert_eq!(connection_url(&config("hunter2")), "redis://:hunter2@localhost:6379/2");
    }
}
