use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// PostgreSQL connection URL. Without it the engine runs on the in-memory store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Fixed fee debited from the source of every transfer. Zero disables it.
    #[serde(default = "default_transfer_fee")]
    pub transfer_fee: Decimal,
    /// Let single-account debits take a balance below zero
    #[serde(default)]
    pub allow_negative_balance: bool,
}

fn default_transfer_fee() -> Decimal {
    Decimal::TWO
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transfer_fee: default_transfer_fee(),
            allow_negative_balance: false,
        }
    }
}

/// Outbox relay worker settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RelayConfig {
    pub scan_interval_ms: u64,
    /// Maximum notifications published per scan
    pub batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            batch_size: 100,
        }
    }
}

impl RelayConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BASE: &str = r#"
log_level: info
log_dir: ./logs
log_file: ledger.log
use_json: false
rotation: daily
"#;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_yaml(BASE).unwrap();
        assert_eq!(config.postgres_url, None);
        assert_eq!(config.ledger.transfer_fee, dec!(2));
        assert!(!config.ledger.allow_negative_balance);
        assert_eq!(config.relay, RelayConfig::default());
    }

    #[test]
    fn test_ledger_section() {
        let yaml = format!(
            "{}postgres_url: postgresql://localhost/ledger\nledger:\n  transfer_fee: \"0.75\"\n  allow_negative_balance: true\nrelay:\n  scan_interval_ms: 250\n  batch_size: 5\n",
            BASE
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.postgres_url.as_deref(),
            Some("postgresql://localhost/ledger")
        );
        assert_eq!(config.ledger.transfer_fee, dec!(0.75));
        assert!(config.ledger.allow_negative_balance);
        assert_eq!(config.relay.scan_interval(), Duration::from_millis(250));
        assert_eq!(config.relay.batch_size, 5);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load("does-not-exist").is_err());
    }
}
