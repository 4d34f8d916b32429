 use anyhow::Result;
 use serde::{Deserialize, Serialize};
 use serde_with::{serde_as, DurationMilliSeconds};
 use std::time::Duration;

 #[derive(Debug, Deserialize, Clone)]
 pub struct RuntimeConfig {
     pub environment: String,
 }

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
        }
    }
}

 #[derive(Debug, Deserialize, Clone)]
 pub struct ApiConfig {
     pub bind_addr: String,
 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
        }
    }
}

 #[derive(Debug, Deserialize, Clone)]
 pub struct DbConfig {
     pub url: String,
     pub max_connections: u32,
 }

 #[derive(Debug, Deserialize, Clone)]
 pub struct RedisConfig {
     pub host: String,
     pub port: u16,
     pub db: u8,
     pub password: String,
     pub stream_key_prefix: String,
     pub max_stream_len: u64,
 }

/// Content storage for token images and metadata documents.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Lighthouse API key; the in-memory store is used when absent.
    pub lighthouse_api_key: Option<String>,
    pub upload_url: String,
    pub gateway_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lighthouse_api_key: None,
            upload_url: "https://node.lighthouse.storage/api/v0/add".to_string(),
            gateway_url: "https://gateway.lighthouse.storage/ipfs".to_string(),
        }
    }
}

/// Retry and timeout policy applied to every chain call.
#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base_delay_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub transaction_timeout_ms: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: Duration::from_millis(1_000),
            transaction_timeout_ms: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlatformLimits {
    pub max_airdrop_batch_size: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub default_token_decimals: u8,
    pub max_token_name_len: usize,
    pub max_token_symbol_len: usize,
    pub max_token_decimals: u8,
    /// Seconds.
    pub min_ico_duration: i64,
    /// Seconds.
    pub max_ico_duration: i64,
    pub min_token_price: f64,
    pub min_airdrop_amount: f64,
    pub max_airdrop_recipients: usize,
    /// Floor on the SOL side of a new pool.
    pub min_initial_liquidity: f64,
    /// Percent.
    pub default_slippage_tolerance: f64,
    /// Percent.
    pub max_slippage_tolerance: f64,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self {
            max_airdrop_batch_size: 25,
            default_page_size: 20,
            max_page_size: 100,
            default_token_decimals: 6,
            max_token_name_len: 32,
            max_token_symbol_len: 8,
            max_token_decimals: 9,
            min_ico_duration: 3_600,
            max_ico_duration: 2_592_000,
            min_token_price: 0.000_001,
            min_airdrop_amount: 1.0,
            max_airdrop_recipients: 10_000,
            min_initial_liquidity: 0.1,
            default_slippage_tolerance: 0.5,
            max_slippage_tolerance: 50.0,
        }
    }
}

/// Platform fees in SOL.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FeeSchedule {
    pub token_creation: f64,
    pub ico_creation: f64,
    pub airdrop_execution: f64,
    pub pool_creation: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            token_creation: 0.3,
            ico_creation: 0.1,
            airdrop_execution: 0.05,
            pool_creation: 0.2,
        }
    }
}

 #[derive(Debug, Deserialize, Clone, Default)]
 pub struct PlatformConfig {
     #[serde(default)]
     pub runtime: RuntimeConfig,
     #[serde(default)]
     pub api: ApiConfig,
     #[serde(default)]
     pub db: Option<DbConfig>,
     #[serde(default)]
     pub redis: Option<RedisConfig>,
     #[serde(default)]
     pub storage: StorageConfig,
     #[serde(default)]
     pub retry: RetryConfig,
     #[serde(default)]
     pub limits: PlatformLimits,
     #[serde(default)]
     pub fees: FeeSchedule,
 }

 impl PlatformConfig {
     pub fn from_env() -> Result<Self> {
        // Load base config from `config/default.(toml|yaml|json)` relative to the
        // current working directory, then override with `LAUNCHPAD__...`
        // environment variables.
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("LAUNCHPAD").separator("__"))
            .build()?;

        settings.try_deserialize().map_err(Into::into)
     }
 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform_constants() {
        let config = PlatformConfig::default();
        assert_eq!(config.limits.max_airdrop_batch_size, 25);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.transaction_timeout_ms, Duration::from_secs(30));
        assert_eq!(config.limits.max_token_name_len, 32);
        assert_eq!(config.limits.max_token_symbol_len, 8);
        assert_eq!(config.fees.pool_creation, 0.2);
        assert!(config.db.is_none());
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [retry]
                base_delay_ms = 250

                [limits]
                max_airdrop_batch_size = 10
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: PlatformConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.retry.base_delay_ms, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.limits.max_airdrop_batch_size, 10);
        assert_eq!(config.limits.max_page_size, 100);
        assert_eq!(config.runtime.environment, "development");
    }
}
