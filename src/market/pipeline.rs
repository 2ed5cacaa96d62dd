//! Paginated fetch of open markets with client-side filtering.

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::client::{MarketApi, SearchParams};
use super::fields::{filter_fields, MARKET_FIELDS};
use super::types::Market;
use crate::metrics;

/// Business predicate applied to every fetched market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFilter {
    /// Markets must have strictly more liquidity than this.
    pub min_liquidity: f64,
    /// Required currency token.
    pub token: String,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            min_liquidity: 600.0,
            token: "MANA".to_string(),
        }
    }
}

impl MarketFilter {
    /// Liquid, unresolved and denominated in the primary token.
    ///
    /// Missing liquidity counts as zero, missing resolution flag as resolved
    /// and a missing token as no match.
    pub fn accepts(&self, market: &Market) -> bool {
        market.total_liquidity.unwrap_or(0.0) > self.min_liquidity
            && !market.is_resolved.unwrap_or(true)
            && market.token.as_deref() == Some(self.token.as_str())
    }
}

/// Pagination settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Total number of markets requested.
    pub total: usize,
    /// Markets per request, clamped to `total`.
    pub page_size: usize,
    /// Predicate applied after projection.
    pub filter: MarketFilter,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            total: 30_000,
            page_size: 1_000,
            filter: MarketFilter::default(),
        }
    }
}

impl FetchConfig {
    /// Page size actually used.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.min(self.total)
    }

    /// Number of requests issued. A trailing partial page is not requested.
    pub fn page_count(&self) -> usize {
        match self.effective_page_size() {
            0 => 0,
            size => self.total / size,
        }
    }
}

/// Fetch every page, project, decode and filter.
///
/// A page that fails to fetch is logged and contributes nothing.
#[instrument(skip(api))]
pub async fn fetch_open_markets<A: MarketApi + ?Sized>(api: &A, config: &FetchConfig) -> Vec<Market> {
    let page_size = config.effective_page_size();
    let mut fetched = Vec::new();

    for page in 0..config.page_count() {
        let offset = page * page_size;
        info!("Getting markets {} thru {}", offset, offset + page_size - 1);

        let raw = match api.search_markets(&SearchParams::page(page_size, offset)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(offset, error = %e, "Error fetching markets page");
                metrics::inc_pages_failed();
                continue;
            }
        };
        metrics::inc_pages_fetched();

        let kept = decode_page(&raw, &config.filter);
        debug!(offset, received = raw.len(), kept = kept.len(), "Filtered market page");
        metrics::add_markets_kept(kept.len());
        fetched.extend(kept);
    }

    fetched
}

/// Project raw objects to the market allow-list and keep accepted markets.
pub fn decode_page(raw: &[Value], filter: &MarketFilter) -> Vec<Market> {
    filter_fields(raw, MARKET_FIELDS)
        .into_iter()
        .filter_map(|fields| match serde_json::from_value::<Market>(Value::Object(fields)) {
            Ok(market) => Some(market),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable market");
                None
            }
        })
        .filter(|market| filter.accepts(market))
        .collect()
}
