use std::sync::Arc;

use chrono::{Local, NaiveDate};
use zakscrape::{sink, CrawlConfig, Crawler, HttpFetcher, JsonLinesSink, MemorySeen, Result};

const DEFAULT_SEARCH_URL: &str =
    "https://zakupki.gov.ru/epz/order/extendedsearch/results.html?fz44=on&af=on";
const OUT_FILE: &str = "purchases.jsonl";
/// The registry's records start in spring 2013.
const HISTORY_START: (i32, u32, u32) = (2013, 4, 1);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let base_url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SEARCH_URL.to_owned());
    let newest = Local::now().date_naive();
    let (y, m, d) = HISTORY_START;
    let oldest = NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date");

    let seen = MemorySeen::with_ids(sink::previously_emitted_ids(OUT_FILE).await?);
    if !seen.is_empty() {
        tracing::info!(known = seen.len(), "seeded ids from a previous run");
    }

    let crawler = Arc::new(Crawler::new(
        CrawlConfig::new(base_url, newest, oldest),
        Arc::new(HttpFetcher::new()),
        Arc::new(JsonLinesSink::open(OUT_FILE).await?),
        Arc::new(seen),
    ));

    tokio::spawn({
        let crawler = Arc::clone(&crawler);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, finishing current page");
                crawler.stop();
            }
        }
    });

    let started = Local::now();
    let stats = crawler.run().await?;
    tracing::info!(
        elapsed_secs = (Local::now() - started).num_seconds(),
        days = stats.days,
        queries = stats.queries,
        splits = stats.splits,
        truncated = stats.truncated,
        emitted = stats.emitted,
        skipped = stats.skipped,
        failed_details = stats.failed_details,
        abandoned = stats.abandoned,
        "crawl finished"
    );
    Ok(())
}
