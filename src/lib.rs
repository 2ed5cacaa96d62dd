//! Manifold Markets snapshot collector and YES-momentum bot.
//!
//! The collector periodically pulls open binary markets from the Manifold
//! API and upserts a filtered subset into a local JSON document store. The
//! momentum bot compares a fresh fetch against that snapshot and bets YES on
//! markets that crossed into a high-probability band.
//!
//! # Strategy
//!
//! ```text
//! snapshot probability:  0.90  (< 0.94)
//! current probability:   0.96  (0.94 < p < 0.975)
//! not bet on before      -> bet 5 on YES
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Manifold client, types and paginated fetching
//! - [`store`]: Document collection and reconciliation
//! - [`collector`]: Snapshot run (fetch + reconcile)
//! - [`strategy`]: Momentum candidate selection and betting
//! - [`metrics`]: Prometheus metrics

pub mod collector;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod store;
pub mod strategy;

pub use config::Config;
pub use error::{BotError, Result};
