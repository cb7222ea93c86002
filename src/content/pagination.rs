//! Paginated listing state and the "load more" accumulator

use serde::Serialize;

use super::post::PostSummary;
use crate::cms::{CmsError, SearchResponse};

/// The posts fetched so far, plus the pointer to the next page
///
/// Treated as a value: every fetched page produces a new state through
/// [`PostPagination::accumulate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostPagination {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

impl PostPagination {
    pub fn new(results: Vec<PostSummary>, next_page: Option<String>) -> Self {
        Self {
            results,
            next_page: next_page.filter(|p| !p.is_empty()),
        }
    }

    /// Map one search response into a page of summaries
    pub fn from_response(response: &SearchResponse) -> Result<Self, CmsError> {
        let results = response
            .results
            .iter()
            .map(PostSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(results, response.next_page.clone()))
    }

    /// Append a freshly fetched page
    ///
    /// Results keep their order, the new page's after the old ones. The
    /// next-page pointer is replaced by the new page's pointer.
    pub fn accumulate(self, page: PostPagination) -> Self {
        let mut results = self.results;
        results.extend(page.results);
        Self::new(results, page.next_page)
    }

    /// Whether the "load more" control is shown
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
