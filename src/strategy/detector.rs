//! Momentum candidate selection.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument};

use super::MomentumParams;
use crate::market::Market;
use crate::store::Collection;

/// Field of a bet document naming its market.
pub const BET_CONTRACT_FIELD: &str = "contractId";

/// Surviving market count after each filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Markets fetched.
    pub fetched: usize,
    /// Also present in the snapshot.
    pub tracked: usize,
    /// Snapshot probability below the prior threshold.
    pub prior_below: usize,
    /// Current probability inside the band.
    pub in_band: usize,
    /// Not yet bet on.
    pub not_bet_on: usize,
}

/// Markets that passed every filter, with the context needed to bet.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    /// Markets to bet on, in fetch order.
    pub markets: Vec<Market>,
    /// Stage counts.
    pub report: FilterReport,
    /// Distinct markets already bet on.
    pub already_bet: usize,
}

/// Snapshot probability by market id. `None` when the stored probability is
/// missing or not a number.
pub fn prior_probabilities(snapshot: &Collection) -> HashMap<String, Option<f64>> {
    snapshot
        .all()
        .filter_map(|doc| {
            let id = doc.get("id")?.as_str()?;
            let probability = doc.get("probability").and_then(|p| p.as_f64());
            Some((id.to_string(), probability))
        })
        .collect()
}

/// Market ids present in the bets log.
pub fn bet_contract_ids(bets: &Collection) -> HashSet<String> {
    bets.values_of(BET_CONTRACT_FIELD)
        .filter_map(|id| id.as_str())
        .map(str::to_string)
        .collect()
}

/// Apply the four-stage momentum filter to freshly fetched markets.
#[instrument(skip_all, fields(fetched = markets.len()))]
pub fn select_candidates(
    markets: Vec<Market>,
    snapshot: &Collection,
    bets: &Collection,
    params: &MomentumParams,
) -> Candidates {
    let mut report = FilterReport {
        fetched: markets.len(),
        ..FilterReport::default()
    };
    info!("Length fetched, before filtering: {}", report.fetched);

    let priors = prior_probabilities(snapshot);
    let markets: Vec<Market> = markets
        .into_iter()
        .filter(|m| priors.contains_key(&m.id))
        .collect();
    report.tracked = markets.len();
    info!("Already tracked in markets snapshot: {}", report.tracked);

    let markets: Vec<Market> = markets
        .into_iter()
        .filter(|m| matches!(priors.get(&m.id), Some(Some(p)) if *p < params.prior_max))
        .collect();
    report.prior_below = markets.len();
    info!("Tracked below {}: {}", params.prior_max, report.prior_below);

    let markets: Vec<Market> = markets
        .into_iter()
        .filter(|m| params.in_band(m.probability.unwrap_or(0.0)))
        .collect();
    report.in_band = markets.len();
    info!(
        "Current probability between {} and {}: {}",
        params.band_low, params.band_high, report.in_band
    );

    let bet_ids = bet_contract_ids(bets);
    let markets: Vec<Market> = markets
        .into_iter()
        .filter(|m| !bet_ids.contains(&m.id))
        .collect();
    report.not_bet_on = markets.len();
    info!("Not bet on yet: {}", report.not_bet_on);

    debug!(?report, already_bet = bet_ids.len(), "Momentum filter complete");

    Candidates {
        markets,
        report,
        already_bet: bet_ids.len(),
    }
}
