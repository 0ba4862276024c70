//! Substring filter over cached headers.

use super::model::{EmailHeaderRecord, Uid};

/// Case-insensitive substring query against cached headers.
///
/// An empty or whitespace-only query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    needle: String,
    include_snippets: bool,
}

impl SearchFilter {
    /// Build a filter from the raw query text.
    #[must_use]
    pub fn new(query: &str, include_snippets: bool) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
            include_snippets,
        }
    }

    /// Returns true if the filter narrows nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Returns true if `record` matches the query.
    #[must_use]
    pub fn matches(&self, record: &EmailHeaderRecord) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&self.needle);
        hit(&record.subject)
            || hit(&record.from)
            || (self.include_snippets && record.snippet.as_deref().is_some_and(hit))
    }

    /// Matching records, in display order.
    #[must_use]
    pub fn apply<'a>(&self, records: &'a [EmailHeaderRecord]) -> Vec<&'a EmailHeaderRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// UIDs of the matching records, in display order.
    #[must_use]
    pub fn matching_uids(&self, records: &[EmailHeaderRecord]) -> Vec<Uid> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .map(|r| r.uid)
            .collect()
    }
}
