//! Market snapshot collection: fetch open markets and reconcile them into
//! the markets collection.

use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::market::pipeline::{fetch_open_markets, FetchConfig};
use crate::market::MarketApi;
use crate::store::{reconcile, Collection, ReconcileSummary, DEFAULT_UNIQUE_ID_FIELD};

/// Result of one snapshot run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Markets that passed the filter.
    pub fetched: usize,
    /// Reconciliation counts; `None` when nothing was fetched.
    pub reconciled: Option<ReconcileSummary>,
}

/// Fetch open markets and upsert them into `markets`.
///
/// An empty fetch leaves the collection untouched.
#[instrument(skip_all)]
pub async fn save_markets<A: MarketApi + ?Sized>(
    api: &A,
    markets: &mut Collection,
    fetch: &FetchConfig,
) -> Result<SaveSummary, StoreError> {
    let fetched = fetch_open_markets(api, fetch).await;
    if fetched.is_empty() {
        warn!("Failed to fetch markets");
        return Ok(SaveSummary::default());
    }

    let summary = reconcile(markets, &fetched, DEFAULT_UNIQUE_ID_FIELD)?;
    info!(
        fetched = fetched.len(),
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "Saved market snapshot"
    );

    Ok(SaveSummary {
        fetched: fetched.len(),
        reconciled: Some(summary),
    })
}
