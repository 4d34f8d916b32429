pub mod chain;
pub mod config;
pub mod csv_import;
pub mod db;
pub mod error;
pub mod events;
pub mod ledger;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod services;
pub mod storage;
pub mod tx_log;

pub use error::{ErrorCategory, ErrorCode, PlatformError, Result};
