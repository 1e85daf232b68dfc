use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::fs;
use std::str::FromStr;
use whorl_types::serde_utils::{pubkey_serde, pubkey_vec_serde};
use whorl_types::{WhorlError, DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS};

use crate::{SdkError, SdkResult};

/// Whirlpool-compatible program used when no config file is supplied
pub const DEFAULT_PROGRAM_ID: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

/// Quoter configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoterConfig {
    /// Program that owns the pool and tick-array accounts
    #[serde(with = "pubkey_serde")]
    pub program_id: Pubkey,

    /// Slippage applied to swap thresholds when the caller gives none (basis points)
    pub default_slippage_bps: u16,

    /// Cache lifetime per account kind
    pub retention: RetentionPolicy,

    /// Quote tokens and tick spacings searched by the price functions
    pub prices: PriceConfig,

    /// Liquidity requirements for a pool to be used as a price source
    pub thresholds: ThresholdConfig,
}

/// How long a cached account may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxAge {
    /// Always refetch
    Zero,
    /// Always reuse a cached value
    Infinite,
    /// Reuse values younger than this many seconds
    Seconds(u64),
}

/// Default freshness for each account kind, passed to the fetcher at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetentionPolicy {
    pub pool: MaxAge,
    pub position: MaxAge,
    pub tick_array: MaxAge,
    /// Mint decimals never change
    pub mint: MaxAge,
}

/// Search space for price discovery
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PriceConfig {
    /// The first token is the one every price is expressed in; the rest are
    /// fallbacks that are themselves priced against the first
    #[serde(with = "pubkey_vec_serde")]
    pub quote_tokens: Vec<Pubkey>,

    /// Only pools with one of these tick spacings are considered
    pub tick_spacings: Vec<u16>,
}

/// Filters applied to candidate price pools
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThresholdConfig {
    /// Pools with less active liquidity are ignored
    pub min_liquidity: u64,

    /// Quote-token amount a pool must be able to deliver; zero disables the check
    pub amount_out: u64,

    /// Largest accepted ratio of spot price to execution price for `amount_out`
    pub price_impact_threshold: Decimal,
}

impl QuoterConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> SdkResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("Failed to read config file {}: {}", path, e)))?;

        let config: QuoterConfig = toml::from_str(&content).map_err(|e| {
            WhorlError::parse_error(&format!("Failed to parse config file {}: {}", path, e), None)
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> SdkResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WhorlError::parse_error(&format!("Failed to serialize config: {}", e), None))?;
        fs::write(path, content)
            .map_err(|e| SdkError::Config(format!("Failed to write config file {}: {}", path, e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.default_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(WhorlError::invalid_parameter(
                "default_slippage_bps",
                &self.default_slippage_bps.to_string(),
                &format!("at most {}", MAX_SLIPPAGE_BPS),
            )
            .into());
        }

        self.prices.validate()?;
        self.thresholds.validate()?;

        Ok(())
    }
}

impl PriceConfig {
    fn validate(&self) -> SdkResult<()> {
        if self.quote_tokens.is_empty() {
            return Err(WhorlError::invalid_parameter("quote_tokens", "empty", "at least one quote token").into());
        }

        if self.tick_spacings.is_empty() {
            return Err(WhorlError::invalid_parameter("tick_spacings", "empty", "at least one tick spacing").into());
        }

        if self.tick_spacings.contains(&0) {
            return Err(WhorlError::invalid_parameter("tick_spacings", "0", "non-zero tick spacings").into());
        }

        Ok(())
    }
}

impl ThresholdConfig {
    fn validate(&self) -> SdkResult<()> {
        if self.price_impact_threshold < Decimal::ONE {
            return Err(WhorlError::invalid_parameter(
                "price_impact_threshold",
                &self.price_impact_threshold.to_string(),
                "at least 1.0",
            )
            .into());
        }
        Ok(())
    }
}

impl Default for QuoterConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            retention: RetentionPolicy::default(),
            prices: PriceConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            pool: MaxAge::Seconds(5),
            position: MaxAge::Seconds(5),
            tick_array: MaxAge::Seconds(5),
            mint: MaxAge::Infinite,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            quote_tokens: Vec::new(),
            tick_spacings: vec![1, 2, 4, 8, 16, 64, 96, 128, 256, 32896],
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_liquidity: 1_000,
            amount_out: 0,
            // 5%
            price_impact_threshold: Decimal::new(105, 2),
        }
    }
}

fn default_program_id() -> Pubkey {
    Pubkey::from_str(DEFAULT_PROGRAM_ID).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> QuoterConfig {
        let mut config = QuoterConfig::default();
        config.prices.quote_tokens = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        config
    }

    #[test]
    fn test_default_program_id_parses() {
        assert_ne!(default_program_id(), Pubkey::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = sample_config();
        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: QuoterConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_hand_written_config() {
        let content = r#"
            program_id = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc"
            default_slippage_bps = 50

            [retention]
            pool = "zero"
            position = { seconds = 30 }
            tick_array = { seconds = 10 }
            mint = "infinite"

            [prices]
            quote_tokens = ["EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"]
            tick_spacings = [64]

            [thresholds]
            min_liquidity = 5000
            amount_out = 1000000
            price_impact_threshold = "1.02"
        "#;
        let config: QuoterConfig = toml::from_str(content).unwrap();
        assert_eq!(config.retention.pool, MaxAge::Zero);
        assert_eq!(config.retention.position, MaxAge::Seconds(30));
        assert_eq!(config.retention.mint, MaxAge::Infinite);
        assert_eq!(config.thresholds.price_impact_threshold, Decimal::new(102, 2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());

        config.default_slippage_bps = MAX_SLIPPAGE_BPS + 1;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.prices.quote_tokens.clear();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.thresholds.price_impact_threshold = Decimal::new(9, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_and_save() {
        let path = std::env::temp_dir().join(format!("whorl-config-{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let config = sample_config();
        config.save(&path).unwrap();
        assert_eq!(QuoterConfig::load(&path).unwrap(), config);
        let _ = fs::remove_file(&path);
        assert!(matches!(QuoterConfig::load(&path), Err(SdkError::Config(_))));
    }
}
