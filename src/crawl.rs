//! One logical crawl: walk search pages day by day, bisect overfull price
//! intervals, paginate accepted queries and follow every unseen result row
//! to its detail (and optional outcome) page.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::{spawn_blocking, JoinSet};
use url::Url;

use crate::fetch::Fetcher;
use crate::parse;
use crate::planner::{self, Assessment, PriceInterval};
use crate::query::{self, SearchQuery, PARAM_REG_NUMBER};
use crate::seen::SeenIds;
use crate::sink::RecordSink;
use crate::{Result, MAX_SPLIT_DEPTH, PRICE_CEILING, RECORDS_PER_PAGE, RESULT_CEILING};

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Operator-supplied search URL; the crawler rewrites only the
    /// parameters it owns.
    pub base_url: String,
    /// Most recent placement day to search.
    pub newest: NaiveDate,
    /// Oldest placement day to search, inclusive.
    pub oldest: NaiveDate,
    pub page_size: usize,
    pub result_ceiling: u64,
    pub price_ceiling: u64,
}

impl CrawlConfig {
    pub fn new(base_url: impl Into<String>, newest: NaiveDate, oldest: NaiveDate) -> Self {
        Self {
            base_url: base_url.into(),
            newest,
            oldest,
            page_size: RECORDS_PER_PAGE,
            result_ceiling: RESULT_CEILING,
            price_ceiling: PRICE_CEILING,
        }
    }
}

/// Counters reported at the end of a run. `truncated` above zero means some
/// records were unreachable behind the result ceiling.
#[derive(Debug, Default, Clone)]
pub struct CrawlStats {
    pub days: u64,
    pub queries: u64,
    pub splits: u64,
    pub truncated: u64,
    pub emitted: u64,
    pub skipped: u64,
    pub failed_details: u64,
    pub abandoned: u64,
}

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    seen: Arc<dyn SeenIds>,
    shutdown: AtomicBool,
}

impl Crawler {
    pub fn new(
        config: CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn RecordSink>,
        seen: Arc<dyn SeenIds>,
    ) -> Self {
        Self { config, fetcher, sink, seen, shutdown: AtomicBool::new(false) }
    }

    /// Requests early termination. The crawl winds down at the next day,
    /// queue item, page or detail boundary; the seen-set stays valid, so a
    /// later run resumes safely.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Walks every configured day backward from the newest. Per-day failures
    /// are contained; the run only fails on setup-level errors.
    pub async fn run(&self) -> Result<CrawlStats> {
        let mut stats = CrawlStats::default();
        for day in planner::days_back(self.config.newest, self.config.oldest) {
            if self.stopped() {
                tracing::info!("stop requested, ending crawl");
                break;
            }
            tracing::info!(date = %day, "searching placements");
            stats.days += 1;
            self.crawl_day(day, &mut stats).await;
        }
        Ok(stats)
    }

    /// Drains the day's work queue. Every queue item is one (date, price
    /// interval) query at page 1; splitting pushes two narrower items.
    async fn crawl_day(&self, day: NaiveDate, stats: &mut CrawlStats) {
        let full_range = PriceInterval::new(0, self.config.price_ceiling);
        let mut queue = VecDeque::from([SearchQuery::first_page(day, full_range)]);

        while let Some(q) = queue.pop_front() {
            if self.stopped() {
                return;
            }
            stats.queries += 1;
            if let Err(e) = self.crawl_query(&q, &mut queue, stats).await {
                // Losing a search page loses every record behind it, so the
                // whole branch is abandoned; siblings in the queue go on.
                stats.abandoned += 1;
                tracing::error!(
                    date = %q.date,
                    prices = %q.prices,
                    error = %e,
                    "search failed, abandoning this interval"
                );
            }
        }
    }

    /// Runs one query: assess the reported total on its first page, then
    /// either enqueue the split halves or paginate and process every row.
    async fn crawl_query(
        &self,
        q: &SearchQuery,
        queue: &mut VecDeque<SearchQuery>,
        stats: &mut CrawlStats,
    ) -> Result<()> {
        let mut page = q.page;
        loop {
            if self.stopped() {
                return Ok(());
            }
            let url = q.url_for_page(&self.config.base_url, page, self.config.page_size)?;
            let body = self.fetcher.fetch(&url).await?;
            let listing = {
                let url = url.clone();
                spawn_blocking(move || parse::parse_search_page(&body, &url)).await??
            };

            if page == q.page {
                match planner::assess(q.prices, listing.total, self.config.result_ceiling) {
                    Assessment::Accept => {}
                    Assessment::AcceptTruncated => {
                        stats.truncated += 1;
                        tracing::warn!(
                            date = %q.date,
                            prices = %q.prices,
                            total = listing.total,
                            "unsplittable interval above the result ceiling, \
                             enumerating best effort"
                        );
                    }
                    Assessment::Split { lower, upper } if q.depth < MAX_SPLIT_DEPTH => {
                        stats.splits += 1;
                        tracing::info!(
                            date = %q.date,
                            total = listing.total,
                            lower = %lower,
                            upper = %upper,
                            "result ceiling exceeded, bisecting price interval"
                        );
                        queue.push_back(q.descend(upper));
                        queue.push_back(q.descend(lower));
                        return Ok(());
                    }
                    Assessment::Split { .. } => {
                        stats.truncated += 1;
                        tracing::error!(
                            date = %q.date,
                            prices = %q.prices,
                            depth = q.depth,
                            "split depth limit reached, enumerating best effort"
                        );
                    }
                }
            }

            let row_count = listing.detail_urls.len();
            self.process_rows(listing.detail_urls, stats).await?;
            tracing::debug!(date = %q.date, prices = %q.prices, page, rows = row_count, "page done");

            // A short page means the listing is exhausted. A full page may
            // have more behind it.
            if row_count < self.config.page_size {
                return Ok(());
            }
            page += 1;
        }
    }

    /// Fans the page's rows out into detail fetches, skipping ids already
    /// reserved. All fetches of one page are joined before the next page is
    /// requested.
    async fn process_rows(&self, detail_urls: Vec<String>, stats: &mut CrawlStats) -> Result<()> {
        let mut tasks = JoinSet::new();
        for url in detail_urls {
            if self.stopped() {
                break;
            }
            let id = match query::get_param(&url, PARAM_REG_NUMBER) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!(%url, "result row without a registry number, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "unparseable detail link, skipping");
                    continue;
                }
            };
            // Reserve before fetching: two rows carrying the same number
            // must produce a single detail fetch.
            if !self.seen.reserve(&id) {
                stats.skipped += 1;
                tracing::debug!(%id, "already captured, skipping");
                continue;
            }
            let fetcher = Arc::clone(&self.fetcher);
            let sink = Arc::clone(&self.sink);
            tasks.spawn(async move {
                let outcome = process_detail(fetcher, sink, &url).await;
                (url, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined? {
                (_, Ok(())) => stats.emitted += 1,
                (url, Err(e)) => {
                    stats.failed_details += 1;
                    tracing::warn!(%url, error = %e, "detail page failed");
                }
            }
        }
        Ok(())
    }
}

/// Fetches and assembles one record: detail page, then the outcome page when
/// the detail links one, then the sink. Runs as its own task; any failure is
/// terminal for this record only.
async fn process_detail(
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    url: &str,
) -> Result<()> {
    let body = fetcher.fetch(url).await?;
    let (mut record, supplier_href) = {
        let url = url.to_owned();
        spawn_blocking(move || parse::parse_detail_page(&body, &url)).await??
    };

    if let Some(href) = supplier_href {
        let outcome_url = Url::parse(url)?.join(&href)?.to_string();
        let body = fetcher.fetch(&outcome_url).await?;
        record.suppliers =
            spawn_blocking(move || parse::parse_supplier_page(&body, &outcome_url)).await??;
    }

    sink.emit(record).await
}
