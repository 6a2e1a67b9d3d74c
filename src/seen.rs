//! Membership tracking for already-captured registry numbers.

use dashmap::DashSet;

/// Capability consulted before any detail page is fetched. Implementations
/// must make `reserve` an atomic check-then-reserve: when two result rows
/// for the same id are discovered concurrently, exactly one caller wins.
pub trait SeenIds: Send + Sync {
    /// Whether the id was already reserved this run or seeded from a
    /// previous one.
    fn contains(&self, id: &str) -> bool;

    /// Reserves the id. `true` means the caller owns it and should proceed
    /// to fetch; `false` means someone already did.
    fn reserve(&self, id: &str) -> bool;
}

/// Process-scoped seen-set. Never pruned during a run.
// TODO: document-store-backed implementation so several runs can share one
// dedup namespace directly instead of re-reading the output file.
#[derive(Debug, Default)]
pub struct MemorySeen {
    ids: DashSet<String>,
}

impl MemorySeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds the set, typically with ids persisted by a previous run.
    pub fn with_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl SeenIds for MemorySeen {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn reserve(&self, id: &str) -> bool {
        self.ids.insert(id.to_owned())
    }
}
