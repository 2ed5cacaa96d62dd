//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::market::pipeline::FetchConfig;
use crate::market::types::Outcome;
use crate::market::MarketFilter;
use crate::strategy::MomentumParams;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Manifold Credentials ===
    /// API key used for bet placement. Only required for live betting.
    #[serde(default)]
    pub manifold_api_key: Option<String>,

    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub manifold_api_url: String,

    // === Persistence ===
    /// Markets snapshot collection file.
    #[serde(default = "default_markets_db_path")]
    pub markets_db_path: PathBuf,

    /// Bets-placed collection file.
    #[serde(default = "default_bets_db_path")]
    pub bets_db_path: PathBuf,

    // === Market Fetching ===
    /// Total number of markets to request across all pages.
    #[serde(default = "default_fetch_total")]
    pub fetch_total: usize,

    /// Markets per search request.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Markets at or below this liquidity are dropped.
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,

    /// Required market currency token.
    #[serde(default = "default_market_token")]
    pub market_token: String,

    // === Momentum Strategy ===
    /// Previously recorded probability must be below this.
    #[serde(default = "default_prior_max")]
    pub prior_probability_max: f64,

    /// Current probability must be strictly above this.
    #[serde(default = "default_band_low")]
    pub band_low: f64,

    /// Current probability must be strictly below this.
    #[serde(default = "default_band_high")]
    pub band_high: f64,

    /// Mana staked per bet.
    #[serde(default = "default_bet_amount")]
    pub bet_amount: Decimal,

    /// Cap on historical plus new bets.
    #[serde(default = "default_max_total_bets")]
    pub max_total_bets: usize,

    // === Operation Modes ===
    /// Log bets instead of placing them.
    #[serde(default)]
    pub dry_run: bool,

    /// HTTP request timeout.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Write Prometheus text exposition here at exit.
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.manifold.markets/v0".to_string()
}

fn default_markets_db_path() -> PathBuf {
    PathBuf::from("persistence/markets_db.json")
}

fn default_bets_db_path() -> PathBuf {
    PathBuf::from("persistence/yes_momentum_bets_db.json")
}

fn default_fetch_total() -> usize {
    30_000
}

fn default_page_size() -> usize {
    1_000
}

fn default_min_liquidity() -> f64 {
    600.0
}

fn default_market_token() -> String {
    "MANA".to_string()
}

fn default_prior_max() -> f64 {
    0.94
}

fn default_band_low() -> f64 {
    0.94
}

fn default_band_high() -> f64 {
    0.975
}

fn default_bet_amount() -> Decimal {
    Decimal::new(5, 0)
}

fn default_max_total_bets() -> usize {
    200
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifold_api_key: None,
            manifold_api_url: default_api_url(),
            markets_db_path: default_markets_db_path(),
            bets_db_path: default_bets_db_path(),
            fetch_total: default_fetch_total(),
            page_size: default_page_size(),
            min_liquidity: default_min_liquidity(),
            market_token: default_market_token(),
            prior_probability_max: default_prior_max(),
            band_low: default_band_low(),
            band_high: default_band_high(),
            bet_amount: default_bet_amount(),
            max_total_bets: default_max_total_bets(),
            dry_run: false,
            http_timeout_ms: default_http_timeout_ms(),
            metrics_textfile: None,
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load and validate in one step.
    pub fn from_env() -> crate::Result<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Logging filter directive; `verbose` switches the crate to debug.
    pub fn log_directive(&self) -> String {
        if self.verbose {
            "manifold_momentum=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.manifold_api_url)
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }

        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(self.band_low) || !in_unit(self.band_high) || self.band_low >= self.band_high
        {
            return Err(ConfigError::InvalidBand {
                low: self.band_low,
                high: self.band_high,
            });
        }

        if self.bet_amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidBetAmount(self.bet_amount));
        }

        Ok(())
    }

    /// Whether an API key is present.
    pub fn has_api_key(&self) -> bool {
        self.manifold_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Pagination settings for the fetch pipeline.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            total: self.fetch_total,
            page_size: self.page_size,
            filter: MarketFilter {
                min_liquidity: self.min_liquidity,
                token: self.market_token.clone(),
            },
        }
    }

    /// Thresholds for the momentum strategy.
    pub fn momentum_params(&self) -> MomentumParams {
        MomentumParams {
            prior_max: self.prior_probability_max,
            band_low: self.band_low,
            band_high: self.band_high,
            stake: self.bet_amount,
            outcome: Outcome::Yes,
            max_total_bets: self.max_total_bets,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_bet_amount(), Decimal::new(5, 0));
        assert_eq!(default_max_total_bets(), 200);
        assert_eq!(default_min_liquidity(), 600.0);
        assert_eq!(default_market_token(), "MANA");
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let config = Config {
            page_size: 0,
            ..Config::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::ZeroPageSize));
    }

    #[test]
    fn validate_rejects_inverted_band() {
        let config = Config {
            band_low: 0.98,
            band_high: 0.95,
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBand { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_url() {
        let config = Config {
            manifold_api_url: "not a url".to_string(),
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn validate_rejects_non_positive_stake() {
        let config = Config {
            bet_amount: Decimal::ZERO,
            ..Config::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBetAmount(Decimal::ZERO))
        );
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = Config {
            manifold_api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(!config.has_api_key());

        let config = Config {
            manifold_api_key: Some("abc".to_string()),
            ..Config::default()
        };
        assert!(config.has_api_key());
    }

    #[test]
    fn verbose_overrides_log_level() {
        let config = Config {
            rust_log: "warn".to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_directive(), "warn");

        let config = Config {
            verbose: true,
            ..config
        };
        assert_eq!(config.log_directive(), "manifold_momentum=debug,info");
    }

    #[test]
    fn momentum_params_follow_config() {
        let config = Config {
            dry_run: true,
            max_total_bets: 10,
            ..Config::default()
        };
        let params = config.momentum_params();
        assert!(params.dry_run);
        assert_eq!(params.max_total_bets, 10);
        assert_eq!(params.outcome, Outcome::Yes);
    }
}
