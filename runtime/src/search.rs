//! Catalog search.
//!
//! Matching is a case-insensitive substring test over an event's title,
//! description, category, venue (or platform), city, event type and
//! organizer name. Results are ranked:
//!
//! 1. title equals the query
//! 2. title starts with the query
//! 3. title contains the query
//! 4. everything else
//!
//! and within a rank by event date, newest first.

use chrono::NaiveDate;
use eventbook_core::event::EventRecord;
use eventbook_core::types::Money;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 50;

/// Category value that means "no category filter".
pub const ALL_CATEGORIES: &str = "All";

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct SearchQuery {
    /// Free text, required
    pub text: String,
    /// Exact category (case-insensitive); `None` or `"All"` disables it
    pub category: Option<String>,
    /// Exact event type (case-insensitive)
    pub event_type: Option<String>,
    /// Earliest event date, inclusive
    pub date_from: Option<NaiveDate>,
    /// Latest event date, inclusive
    pub date_to: Option<NaiveDate>,
    /// Lowest price; free events count as zero
    pub min_price: Option<Money>,
    /// Highest price
    pub max_price: Option<Money>,
    /// Page size, [`DEFAULT_LIMIT`] when absent
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Query for `text` with no filters.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Restrict to one category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn effective_limit(&self) -> usize {
        self.limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_LIMIT)
    }

    fn passes_filters(&self, event: &EventRecord) -> bool {
        let details = &event.details;
        let category_ok = self
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
            .is_none_or(|c| details.category.eq_ignore_ascii_case(c));
        let type_ok = self
            .event_type
            .as_deref()
            .is_none_or(|t| details.event_type.eq_ignore_ascii_case(t));
        let date_ok = self.date_from.is_none_or(|from| details.date >= from)
            && self.date_to.is_none_or(|to| details.date <= to);

        let price = event.pricing.charge().unwrap_or(Money::ZERO);
        let price_ok = self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max);

        category_ok && type_ok && date_ok && price_ok
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// The page, best match first
    pub events: Vec<EventRecord>,
    /// Matches before the limit was applied
    pub total: usize,
    /// Query text as given
    pub query: String,
    /// Category filter as given
    pub category: Option<String>,
    /// Page size used
    pub limit: usize,
}

fn matches_text(event: &EventRecord, needle: &str) -> bool {
    let details = &event.details;
    let [place, city] = details.venue.searchable_text();
    [
        details.title.as_str(),
        details.description.as_str(),
        details.category.as_str(),
        place,
        city,
        details.event_type.as_str(),
        event.organizer.name.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn title_rank(event: &EventRecord, needle: &str) -> u8 {
    let title = event.details.title.to_lowercase();
    if title == needle {
        0
    } else if title.starts_with(needle) {
        1
    } else if title.contains(needle) {
        2
    } else {
        3
    }
}

/// Filter, rank and page `events` for `query`.
///
/// Blank query text matches nothing; callers reject it before searching.
#[must_use]
pub fn search(events: Vec<EventRecord>, query: &SearchQuery) -> SearchResults {
    let needle = query.text.trim().to_lowercase();
    let limit = query.effective_limit();

    let mut matched: Vec<EventRecord> = if needle.is_empty() {
        Vec::new()
    } else {
        events
            .into_iter()
            .filter(|event| matches_text(event, &needle) && query.passes_filters(event))
            .collect()
    };

    matched.sort_by_cached_key(|event| {
        (
            title_rank(event, &needle),
            Reverse((event.details.date, event.details.time)),
        )
    });

    let total = matched.len();
    matched.truncate(limit);

    SearchResults {
        events: matched,
        total,
        query: query.text.clone(),
        category: query.category.clone(),
        limit,
    }
}
