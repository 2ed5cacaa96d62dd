//! Market module for Manifold binary markets.
//!
//! This module handles:
//! - Market and bet types
//! - Field projection of raw API objects
//! - Manifold REST API client
//! - Paginated, filtered market fetching
//! - Mock client for testing

pub mod client;
pub mod fields;
pub mod mock;
pub mod pipeline;
pub mod types;

pub use client::{ManifoldClient, MarketApi, SearchParams};
pub use fields::{filter_fields, MARKET_FIELDS};
pub use mock::{MockBetCall, MockConfig, MockManifoldClient};
pub use pipeline::{fetch_open_markets, FetchConfig, MarketFilter};
pub use types::{Market, Outcome};
