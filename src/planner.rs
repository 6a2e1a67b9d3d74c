//! Range partitioning that keeps every search query under the registry's
//! enumeration ceiling.
//!
//! The search UI reports a total result count but refuses to paginate past a
//! fixed ceiling. A query whose count exceeds the ceiling is bisected on its
//! price interval and both halves are searched again, so every record stays
//! reachable through some sufficiently narrow sub-query.

use std::fmt;

use chrono::NaiveDate;

/// Closed price interval in rubles. Integer bounds so repeated halving never
/// drifts across a record's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceInterval {
    low: u64,
    high: u64,
}

impl PriceInterval {
    pub fn new(low: u64, high: u64) -> Self {
        debug_assert!(low <= high);
        Self { low, high }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn width(&self) -> u64 {
        self.high - self.low
    }

    /// Bisects into two disjoint, contiguous halves covering the original
    /// interval exactly. `None` once the interval is a single price point.
    pub fn split(self) -> Option<(Self, Self)> {
        if self.low == self.high {
            return None;
        }
        let mid = self.low + (self.high - self.low) / 2;
        Some((Self::new(self.low, mid), Self::new(mid + 1, self.high)))
    }
}

impl fmt::Display for PriceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.low, self.high)
    }
}

/// What to do with a query after its first result page reported a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Under the ceiling; paginate and extract.
    Accept,
    /// Over the ceiling but the interval is a single price point, so it
    /// cannot be narrowed further. Enumerated best-effort; anything past the
    /// ceiling is silently unreachable and must be flagged to operators.
    AcceptTruncated,
    /// Over the ceiling; search both halves instead of this query.
    Split { lower: PriceInterval, upper: PriceInterval },
}

/// Decides whether a query's reported total fits under the ceiling.
pub fn assess(prices: PriceInterval, total: u64, ceiling: u64) -> Assessment {
    if total <= ceiling {
        return Assessment::Accept;
    }
    match prices.split() {
        Some((lower, upper)) => Assessment::Split { lower, upper },
        None => Assessment::AcceptTruncated,
    }
}

/// Calendar days from `newest` back to `oldest`, inclusive on both ends.
pub fn days_back(newest: NaiveDate, oldest: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(newest), |day| day.pred_opt())
        .take_while(move |day| *day >= oldest)
}
