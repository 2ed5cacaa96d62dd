//! Momentum bet placement.

use serde_json::Value;
use tracing::{info, instrument, warn};

use super::detector::{select_candidates, Candidates, FilterReport, BET_CONTRACT_FIELD};
use super::MomentumParams;
use crate::error::{BotError, TradingError};
use crate::market::pipeline::{fetch_open_markets, FetchConfig};
use crate::market::MarketApi;
use crate::metrics;
use crate::store::Collection;

/// Result of one betting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetRun {
    /// Bets placed and recorded.
    pub placed: usize,
    /// Bets that would have been placed in dry-run mode.
    pub simulated: usize,
    /// Bet requests that failed.
    pub failed: usize,
    /// Whether the cap stopped the pass early.
    pub cap_reached: bool,
}

/// Result of a full momentum run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MomentumSummary {
    /// Filter stage counts.
    pub report: FilterReport,
    /// Distinct markets bet on before this run.
    pub already_bet: usize,
    /// Betting outcome.
    pub bets: BetRun,
}

/// Bet on each candidate until historical plus new bets reach the cap.
///
/// Successful bets are appended to `bets` immediately, as returned by the
/// API, with `contractId` filled in when the response lacks it. A failed
/// request is logged and skipped; a missing credential aborts the pass.
#[instrument(skip_all, fields(candidates = candidates.markets.len(), dry_run = params.dry_run))]
pub async fn place_momentum_bets<A: MarketApi + ?Sized>(
    api: &A,
    candidates: &Candidates,
    bets: &mut Collection,
    params: &MomentumParams,
) -> Result<BetRun, BotError> {
    let mut run = BetRun::default();

    for market in &candidates.markets {
        let counted = run.placed + run.simulated;
        if candidates.already_bet + counted >= params.max_total_bets {
            info!(cap = params.max_total_bets, "Bet cap reached");
            run.cap_reached = true;
            break;
        }
        if market.id.is_empty() {
            continue;
        }

        if params.dry_run {
            info!(
                market_id = %market.id,
                probability = ?market.probability,
                "[DRY RUN] Would bet {} on {}", params.stake, params.outcome
            );
            run.simulated += 1;
            continue;
        }

        match api.place_bet(&market.id, params.outcome, params.stake).await {
            Ok(mut bet) => {
                bet.entry(BET_CONTRACT_FIELD)
                    .or_insert_with(|| Value::from(market.id.as_str()));
                let bet_id = bet.get("betId").cloned();
                bets.insert(bet)?;
                metrics::inc_bets_placed();
                info!(market_id = %market.id, bet_id = ?bet_id, "Placed bet");
                run.placed += 1;
            }
            Err(TradingError::MissingCredential) => {
                return Err(TradingError::MissingCredential.into());
            }
            Err(e) => {
                metrics::inc_bets_failed();
                warn!(market_id = %market.id, error = %e, "Failed to place bet!");
                run.failed += 1;
            }
        }
    }

    Ok(run)
}

/// Fetch markets, select momentum candidates and bet on them.
#[instrument(skip_all)]
pub async fn run_momentum<A: MarketApi + ?Sized>(
    api: &A,
    snapshot: &Collection,
    bets: &mut Collection,
    fetch: &FetchConfig,
    params: &MomentumParams,
) -> Result<MomentumSummary, BotError> {
    let markets = fetch_open_markets(api, fetch).await;
    if markets.is_empty() {
        warn!("Failed to fetch markets");
        return Ok(MomentumSummary::default());
    }

    let candidates = select_candidates(markets, snapshot, bets, params);
    let run = place_momentum_bets(api, &candidates, bets, params).await?;

    Ok(MomentumSummary {
        report: candidates.report,
        already_bet: candidates.already_bet,
        bets: run,
    })
}
