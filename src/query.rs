//! Search URL construction and query-parameter rewriting.
//!
//! The registry's search form is driven entirely by query parameters, so the
//! crawler never builds URLs from scratch. It takes the operator-supplied
//! search URL and rewrites only the parameters it owns, leaving everything
//! else (law filters, sort order, ...) untouched.

use chrono::NaiveDate;
use url::Url;

use crate::planner::PriceInterval;
use crate::{Result, DATE_FORMAT};

/// Lower price bound of the search filter.
pub const PARAM_PRICE_FROM: &str = "priceFromGeneral";
/// Upper price bound of the search filter.
pub const PARAM_PRICE_TO: &str = "priceToGeneral";
/// First day of the placement-date filter.
pub const PARAM_DATE_FROM: &str = "publishDateFrom";
/// Last day of the placement-date filter.
pub const PARAM_DATE_TO: &str = "publishDateTo";
/// One-based page number within a result listing.
pub const PARAM_PAGE_NUMBER: &str = "pageNumber";
/// Rows per result page.
pub const PARAM_PAGE_SIZE: &str = "recordsPerPage";
/// Registry number carried by every result row's detail link.
pub const PARAM_REG_NUMBER: &str = "regNumber";

/// Merges `params` into the query string of `url`, overwriting only the given
/// keys. Existing parameters keep their relative order; new keys are appended
/// in argument order.
pub fn set_params(url: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut parsed = Url::parse(url)?;

    let existing: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut used = vec![false; params.len()];
    let mut merged: Vec<(String, String)> = Vec::with_capacity(existing.len() + params.len());
    for (key, value) in existing {
        match params.iter().position(|(pk, _)| *pk == key) {
            Some(i) => {
                // Repeated occurrences of an overwritten key collapse to one.
                if !used[i] {
                    merged.push((key, params[i].1.to_owned()));
                    used[i] = true;
                }
            }
            None => merged.push((key, value)),
        }
    }
    for (i, (key, value)) in params.iter().enumerate() {
        if !used[i] {
            merged.push(((*key).to_owned(), (*value).to_owned()));
        }
    }

    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(merged.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(parsed.to_string())
}

/// Looks up a single query parameter. `Ok(None)` when the key is absent.
pub fn get_param(url: &str, key: &str) -> Result<Option<String>> {
    let parsed = Url::parse(url)?;
    Ok(parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned()))
}

/// One unit of search work: a single calendar day restricted to a price
/// interval, starting at the given result page.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub date: NaiveDate,
    pub prices: PriceInterval,
    pub page: u32,
    /// How many bisections produced this interval. Guards the work queue
    /// against runaway splitting.
    pub depth: u8,
}

impl SearchQuery {
    /// Full-interval query for one day, first page.
    pub fn first_page(date: NaiveDate, prices: PriceInterval) -> Self {
        Self { date, prices, page: 1, depth: 0 }
    }

    /// Same day, narrowed price interval, page counter reset.
    pub fn descend(&self, prices: PriceInterval) -> Self {
        Self { date: self.date, prices, page: 1, depth: self.depth + 1 }
    }

    /// Renders the search URL for the given page of this query.
    pub fn url_for_page(&self, base: &str, page: u32, page_size: usize) -> Result<String> {
        let date = self.date.format(DATE_FORMAT).to_string();
        let price_from = self.prices.low().to_string();
        let price_to = self.prices.high().to_string();
        let page = page.to_string();
        let page_size = page_size.to_string();
        set_params(
            base,
            &[
                (PARAM_PRICE_FROM, price_from.as_str()),
                (PARAM_PRICE_TO, price_to.as_str()),
                (PARAM_DATE_FROM, date.as_str()),
                (PARAM_DATE_TO, date.as_str()),
                (PARAM_PAGE_NUMBER, page.as_str()),
                (PARAM_PAGE_SIZE, page_size.as_str()),
            ],
        )
    }
}
