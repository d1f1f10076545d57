//! Request and response types for index store operations.

use search_migrator_shared::Document;

/// Sort direction for search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest value first.
    Asc,
    /// Largest value first.
    Desc,
}

impl SortOrder {
    /// The wire representation used in engine queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One page of search results together with the index-wide match total.
///
/// The total counts every document matching the query, not just the
/// documents returned in `hits`. A caller requesting one hit sorted
/// descending by id therefore sees both the index size and the newest
/// document in a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Matching documents in the requested sort order.
    pub hits: Vec<Document>,
    /// Total number of matching documents across the index.
    pub total: u64,
}

impl SearchPage {
    /// Create an empty page.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The id of the first hit, if any.
    ///
    /// With a descending sort on the id field this is the newest document
    /// visible to the engine.
    pub fn latest_id(&self) -> Option<u64> {
        self.hits.first().map(|doc| doc.id)
    }
}
