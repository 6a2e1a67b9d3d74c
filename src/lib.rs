//! Scraper for the goszakupki public procurement registry.
//!
//! The registry only exposes its data through a paginated HTML search form
//! that refuses to enumerate more than [`RESULT_CEILING`] results per query.
//! The crawler walks placement dates one day at a time and bisects the price
//! filter until every (day, price interval) query fits under that ceiling,
//! then follows each unseen result row to its detail and outcome pages and
//! emits one JSON record per registry number.

pub mod crawl;
mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod planner;
pub mod query;
pub mod record;
pub mod seen;
pub mod sink;

pub use crawl::{CrawlConfig, CrawlStats, Crawler};
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use record::{PurchasePosition, PurchaseRecord, Supplier};
pub use seen::{MemorySeen, SeenIds};
pub use sink::{JsonLinesSink, RecordSink};

/// Rows requested per search result page.
pub const RECORDS_PER_PAGE: usize = 500;
/// Most results the search UI lets a single query paginate through.
pub const RESULT_CEILING: u64 = 4000;
/// Upper bound of the full price range, in rubles.
pub const PRICE_CEILING: u64 = 1_000_000_000_000_000;
/// Hard cap on price-interval bisections per branch. A `u64` interval
/// collapses to a single point well before this.
pub const MAX_SPLIT_DEPTH: u8 = 64;
/// Date format the search form expects.
pub const DATE_FORMAT: &str = "%d.%m.%Y";
