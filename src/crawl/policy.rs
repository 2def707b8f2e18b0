//! Citation-count admission control.

/// What the crawl does with a discovered reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Kept and eligible for expansion.
    Expand,
    /// Kept as a terminal leaf; never expanded.
    Leaf,
    /// Dropped along with its edge.
    Prune,
}

/// Citation threshold applied to every discovered reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdPolicy {
    pub min_citations: u64,
    /// Unknown citation counts fail the threshold.
    pub strict: bool,
    /// Failing references are dropped instead of kept as leaves.
    pub prune_below_threshold: bool,
}

impl ThresholdPolicy {
    /// A known count passes iff it reaches `min_citations`; an unknown count
    /// passes iff the policy is not strict.
    #[must_use]
    pub fn passes(&self, cited_by_count: Option<u64>) -> bool {
        match cited_by_count {
            Some(count) => count >= self.min_citations,
            None => !self.strict,
        }
    }

    #[must_use]
    pub fn admit(&self, cited_by_count: Option<u64>) -> Admission {
        if self.passes(cited_by_count) {
            Admission::Expand
        } else if self.prune_below_threshold {
            Admission::Prune
        } else {
            Admission::Leaf
        }
    }
}
