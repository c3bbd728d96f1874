//! Engine configuration
//!
//! One configuration object covers all symbols; engines are spawned per
//! entry in `symbols`. Loadable from a JSON file, with defaults matching
//! production settings.

use crate::fee::FeeSchedule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tradable symbols; one engine is spawned per entry
    pub symbols: Vec<String>,

    /// Validation upper bounds
    pub max_order_quantity: Decimal,
    pub max_order_price: Decimal,

    /// Fee rates (multipliers on trade notional)
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,

    /// Market-data batching window for the broadcast aggregator
    pub broadcast_window_ms: u64,
    /// Publisher tick sampling the book dirty flag
    pub md_publish_interval_ms: u64,

    /// Persistence batching: drain up to size or wait up to interval
    pub persistence_batch_size: usize,
    pub persistence_batch_interval_ms: u64,
    pub persistence_queue_capacity: usize,

    /// Snapshot cadence and retention
    pub snapshot_interval_secs: u64,
    pub snapshots_to_keep: usize,

    /// Per-symbol in-memory trade ring size
    pub trade_history_cap: usize,

    /// Default N for depth queries and broadcasts
    pub depth_levels_default: usize,

    /// Per-subscriber outbound queue capacity
    pub subscriber_queue_capacity: usize,

    /// Root directory for journals and snapshots
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTC-USDT".to_string(),
                "ETH-USDT".to_string(),
                "SOL-USDT".to_string(),
            ],
            max_order_quantity: Decimal::from(1_000_000),
            max_order_price: Decimal::from(10_000_000),
            maker_fee_rate: Decimal::new(1, 3), // 0.1%
            taker_fee_rate: Decimal::new(2, 3), // 0.2%
            broadcast_window_ms: 5,
            md_publish_interval_ms: 50,
            persistence_batch_size: 100,
            persistence_batch_interval_ms: 25,
            persistence_queue_capacity: 10_000,
            snapshot_interval_secs: 60,
            snapshots_to_keep: 10,
            trade_history_cap: 10_000,
            depth_levels_default: 10,
            subscriber_queue_capacity: 1_000,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Fee schedule derived from the configured rates
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(self.maker_fee_rate, self.taker_fee_rate)
    }

    /// Journal directory for one symbol
    pub fn journal_dir(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(symbol.to_lowercase()).join("journal")
    }

    /// Snapshot directory for one symbol
    pub fn snapshot_dir(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(symbol.to_lowercase()).join("snapshots")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.broadcast_window_ms, 5);
        assert_eq!(config.persistence_batch_size, 100);
        assert_eq!(config.trade_history_cap, 10_000);
        assert!(config.symbols.contains(&"BTC-USDT".to_string()));
    }

    #[test]
    fn test_fee_schedule() {
        let config = EngineConfig::default();
        let fees = config.fee_schedule();
        assert_eq!(fees.maker_rate, Decimal::new(1, 3));
        assert_eq!(fees.taker_rate, Decimal::new(2, 3));
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"symbols": ["BTC-USDT"], "broadcast_window_ms": 10}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.symbols, vec!["BTC-USDT".to_string()]);
        assert_eq!(config.broadcast_window_ms, 10);
        // Untouched fields keep defaults
        assert_eq!(config.persistence_batch_size, 100);
    }

    #[test]
    fn test_data_layout() {
        let config = EngineConfig::default();
        assert_eq!(
            config.journal_dir("BTC-USDT"),
            PathBuf::from("data/btc-usdt/journal")
        );
        assert_eq!(
            config.snapshot_dir("BTC-USDT"),
            PathBuf::from("data/btc-usdt/snapshots")
        );
    }
}
