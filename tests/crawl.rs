//! Drives the whole crawl loop against a scripted in-memory registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use zakscrape::{
    query, CrawlConfig, Crawler, Error, Fetcher, MemorySeen, PurchaseRecord, RecordSink, Result,
};

const BASE: &str = "https://registry.test/search.html?fz44=on";

/// Fake registry: totals and rows are keyed by the price interval (and page)
/// the crawler asks for, so the script observes exactly what a real site
/// would.
#[derive(Default)]
struct ScriptedSite {
    totals: HashMap<(u64, u64), u64>,
    rows: HashMap<(u64, u64, u32), Vec<&'static str>>,
    suppliers_for: HashSet<&'static str>,
    failing_details: HashSet<&'static str>,
    failing_searches: HashSet<(u64, u64)>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedSite {
    fn search_response(&self, url: &str) -> Result<String> {
        let param = |key| {
            query::get_param(url, key)
                .unwrap()
                .unwrap_or_else(|| panic!("search url without {key}: {url}"))
        };
        let from: u64 = param("priceFromGeneral").parse().unwrap();
        let to: u64 = param("priceToGeneral").parse().unwrap();
        let page: u32 = param("pageNumber").parse().unwrap();

        if self.failing_searches.contains(&(from, to)) {
            return Err(Error::Fetch { url: url.to_owned(), reason: "scripted outage".into() });
        }

        let total = self.totals.get(&(from, to)).copied().unwrap_or(0);
        let mut rows = String::new();
        for id in self.rows.get(&(from, to, page)).into_iter().flatten() {
            rows.push_str(&format!(
                "<div class=\"registry-entry__form\">\
                 <div class=\"registry-entry__header-mid__number\">\
                 <a href=\"/detail.html?regNumber={id}\">№ {id}</a></div></div>"
            ));
        }
        Ok(format!(
            "<html><body>\
             <div class=\"search-results__total\">Результатов: {total}</div>{rows}\
             </body></html>"
        ))
    }

    fn detail_response(&self, url: &str) -> Result<String> {
        let id = query::get_param(url, "regNumber").unwrap().unwrap();
        if self.failing_details.contains(id.as_str()) {
            return Err(Error::Fetch { url: url.to_owned(), reason: "scripted outage".into() });
        }
        let tab = if self.suppliers_for.contains(id.as_str()) {
            format!(
                "<a class=\"tabsNav__item\" href=\"/outcome.html?regNumber={id}\">\
                 Результаты определения поставщика</a>"
            )
        } else {
            String::new()
        };
        Ok(format!(
            "<html><body>\
             <span class=\"cardMainInfo__purchaseLink\"><a href=\"#\">№ {id}</a></span>{tab}\
             </body></html>"
        ))
    }

    fn outcome_response(&self) -> String {
        "<html><body><div id=\"supplier-def-result-participant-table-1\"><table>\
         <thead><tr><th>Наименование участника</th></tr></thead>\
         <tbody class=\"tableBlock__body\"><tr class=\"tableBlock__row\">\
         <td class=\"tableBlock__col\">ООО Ромашка</td></tr></tbody>\
         </table></div></body></html>"
            .to_owned()
    }

    fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedSite {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_owned());
        if url.contains("/detail.html") {
            self.detail_response(url)
        } else if url.contains("/outcome.html") {
            Ok(self.outcome_response())
        } else {
            self.search_response(url)
        }
    }
}

#[derive(Default)]
struct CollectSink {
    records: Mutex<Vec<PurchaseRecord>>,
}

impl CollectSink {
    fn ids(&self) -> HashSet<String> {
        self.records.lock().unwrap().iter().map(|r| r.id.clone()).collect()
    }
}

#[async_trait]
impl RecordSink for CollectSink {
    async fn emit(&self, record: PurchaseRecord) -> Result<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Single test day, tiny pages and a narrow full price range so scripted
/// intervals stay readable. The result ceiling keeps its production value.
fn config() -> CrawlConfig {
    let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let mut config = CrawlConfig::new(BASE, day, day);
    config.page_size = 3;
    config.price_ceiling = 1000;
    config
}

fn ids_of(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| (*s).to_owned()).collect()
}

#[tokio::test]
async fn over_ceiling_total_splits_instead_of_paginating() {
    let mut site = ScriptedSite::default();
    site.totals.insert((0, 1000), 5000);
    site.rows.insert((0, 1000, 1), vec!["999"]);
    site.totals.insert((0, 500), 2000);
    site.rows.insert((0, 500, 1), vec!["1", "2"]);
    site.totals.insert((501, 1000), 2000);
    site.rows.insert((501, 1000, 1), vec!["3", "4"]);

    let site = Arc::new(site);
    let sink = Arc::new(CollectSink::default());
    let crawler =
        Crawler::new(config(), site.clone(), sink.clone(), Arc::new(MemorySeen::new()));
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.days, 1);
    assert_eq!(stats.splits, 1);
    assert_eq!(stats.queries, 3);
    assert_eq!(stats.truncated, 0);
    assert_eq!(stats.emitted, 4);
    assert_eq!(sink.ids(), ids_of(&["1", "2", "3", "4"]));

    let fetched = site.fetched_urls();
    assert!(fetched
        .iter()
        .any(|u| u.contains("priceFromGeneral=0") && u.contains("priceToGeneral=500")));
    assert!(fetched
        .iter()
        .any(|u| u.contains("priceFromGeneral=501") && u.contains("priceToGeneral=1000")));
    // The overfull listing is neither paginated nor mined for rows.
    assert!(!fetched.iter().any(|u| u.contains("regNumber=999")));
    assert!(!fetched
        .iter()
        .any(|u| u.contains("priceToGeneral=1000")
            && u.contains("priceFromGeneral=0")
            && u.contains("pageNumber=2")));
}

#[tokio::test]
async fn full_page_paginates_and_short_page_stops() {
    let mut site = ScriptedSite::default();
    site.totals.insert((0, 1000), 5);
    site.rows.insert((0, 1000, 1), vec!["a", "b", "c"]);
    // Page 2 is short and repeats "a", which must not be fetched again.
    site.rows.insert((0, 1000, 2), vec!["d", "a"]);
    site.suppliers_for.insert("b");
    site.failing_details.insert("c");

    let site = Arc::new(site);
    let sink = Arc::new(CollectSink::default());
    let crawler =
        Crawler::new(config(), site.clone(), sink.clone(), Arc::new(MemorySeen::new()));
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.emitted, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.failed_details, 1);
    assert_eq!(sink.ids(), ids_of(&["a", "b", "d"]));

    let fetched = site.fetched_urls();
    assert!(fetched.iter().any(|u| u.contains("pageNumber=2")));
    assert!(!fetched.iter().any(|u| u.contains("pageNumber=3")));
    let detail_fetches_of_a =
        fetched.iter().filter(|u| u.contains("regNumber=a") && u.contains("/detail")).count();
    assert_eq!(detail_fetches_of_a, 1);

    let records = sink.records.lock().unwrap();
    let b = records.iter().find(|r| r.id == "b").unwrap();
    let suppliers = b.suppliers.as_ref().unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].name, "ООО Ромашка");
    // Records without an outcome tab never saw an outcome page.
    assert!(records.iter().find(|r| r.id == "a").unwrap().suppliers.is_none());
}

#[tokio::test]
async fn unsplittable_interval_over_the_ceiling_is_enumerated_best_effort() {
    let mut site = ScriptedSite::default();
    site.totals.insert((0, 0), 5000);
    site.rows.insert((0, 0, 1), vec!["z"]);

    let site = Arc::new(site);
    let sink = Arc::new(CollectSink::default());
    // A zero-width full range cannot be bisected.
    let mut config = config();
    config.price_ceiling = 0;
    let crawler = Crawler::new(config, site.clone(), sink.clone(), Arc::new(MemorySeen::new()));
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.splits, 0);
    assert_eq!(stats.truncated, 1);
    assert_eq!(stats.emitted, 1);
    assert_eq!(sink.ids(), ids_of(&["z"]));
}

#[tokio::test]
async fn failed_search_branch_is_abandoned_but_siblings_continue() {
    let mut site = ScriptedSite::default();
    site.totals.insert((0, 1000), 5000);
    site.failing_searches.insert((0, 500));
    site.totals.insert((501, 1000), 10);
    site.rows.insert((501, 1000, 1), vec!["7"]);

    let site = Arc::new(site);
    let sink = Arc::new(CollectSink::default());
    let crawler =
        Crawler::new(config(), site.clone(), sink.clone(), Arc::new(MemorySeen::new()));
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.emitted, 1);
    assert_eq!(sink.ids(), ids_of(&["7"]));
}

#[tokio::test]
async fn preseeded_ids_skip_the_detail_fetch_entirely() {
    let mut site = ScriptedSite::default();
    site.totals.insert((0, 1000), 1);
    site.rows.insert((0, 1000, 1), vec!["42"]);

    let site = Arc::new(site);
    let sink = Arc::new(CollectSink::default());
    let seen = Arc::new(MemorySeen::with_ids(["42".to_owned()]));
    let crawler = Crawler::new(config(), site.clone(), sink.clone(), seen);
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.emitted, 0);
    assert_eq!(stats.skipped, 1);
    assert!(!site.fetched_urls().iter().any(|u| u.contains("/detail.html")));
}

#[tokio::test]
async fn stop_before_run_visits_nothing() {
    let site = Arc::new(ScriptedSite::default());
    let sink = Arc::new(CollectSink::default());
    let crawler =
        Crawler::new(config(), site.clone(), sink.clone(), Arc::new(MemorySeen::new()));
    crawler.stop();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.days, 0);
    assert!(site.fetched_urls().is_empty());
}
