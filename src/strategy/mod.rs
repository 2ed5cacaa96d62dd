//! YES-momentum strategy.
//!
//! This module handles:
//! - Selecting markets whose probability moved from below the prior
//!   threshold into the target band
//! - Placing and recording bets up to a global cap

pub mod detector;
pub mod executor;

use rust_decimal::Decimal;

use crate::market::Outcome;

pub use detector::{bet_contract_ids, select_candidates, Candidates, FilterReport};
pub use executor::{place_momentum_bets, run_momentum, BetRun, MomentumSummary};

/// Thresholds and sizing for the momentum strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParams {
    /// Previously recorded probability must be strictly below this.
    pub prior_max: f64,
    /// Current probability must be strictly above this.
    pub band_low: f64,
    /// Current probability must be strictly below this.
    pub band_high: f64,
    /// Amount staked per bet.
    pub stake: Decimal,
    /// Outcome bought.
    pub outcome: Outcome,
    /// Historical plus new bets never exceed this.
    pub max_total_bets: usize,
    /// Log bets instead of placing them.
    pub dry_run: bool,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            prior_max: 0.94,
            band_low: 0.94,
            band_high: 0.975,
            stake: Decimal::new(5, 0),
            outcome: Outcome::Yes,
            max_total_bets: 200,
            dry_run: false,
        }
    }
}

impl MomentumParams {
    /// Whether a current probability lies strictly inside the band.
    pub fn in_band(&self, probability: f64) -> bool {
        self.band_low < probability && probability < self.band_high
    }
}
