//! "Load more" over a content source

use std::sync::Arc;
use tokio::sync::Mutex;

use super::pagination::PostPagination;
use crate::cms::{CmsError, ContentSource, PreviewContext, Query};

/// A listing that grows one page at a time
///
/// The accumulated state sits behind an async mutex that stays locked for
/// the whole fetch, so overlapping `load_more` calls run one after the
/// other and each one follows the pointer left by the previous.
pub struct PostFeed<S: ContentSource + ?Sized> {
    source: Arc<S>,
    state: Mutex<PostPagination>,
}

impl<S: ContentSource + ?Sized> PostFeed<S> {
    /// Fetch the first page of posts, newest first
    pub async fn open(
        source: Arc<S>,
        document_type: &str,
        per_page: usize,
        preview: &PreviewContext,
    ) -> Result<Self, CmsError> {
        let query = Query::documents(document_type).page_size(per_page);
        let response = source.query(&query, preview).await?;
        let first = PostPagination::from_response(&response)?;
        tracing::debug!(
            "Opened feed with {} posts (more: {})",
            first.len(),
            first.has_more()
        );
        Ok(Self::resume(source, first))
    }

    /// Continue from an already fetched state
    pub fn resume(source: Arc<S>, state: PostPagination) -> Self {
        Self {
            source,
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> PostPagination {
        self.state.lock().await.clone()
    }

    /// Fetch and append the next page
    ///
    /// Returns `false` without fetching when there is no next page. On error
    /// the state is left as it was.
    pub async fn load_more(&self) -> Result<bool, CmsError> {
        let mut state = self.state.lock().await;
        let Some(next_page) = state.next_page.clone() else {
            return Ok(false);
        };

        let response = self.source.fetch_page(&next_page).await?;
        let page = PostPagination::from_response(&response)?;
        tracing::debug!("Loaded {} more posts", page.len());

        if page.next_page.as_deref() == Some(next_page.as_str()) {
            tracing::warn!("Next page points to itself, stopping: {}", next_page);
            let current = std::mem::take(&mut *state);
            *state = current.accumulate(PostPagination::new(page.results, None));
            return Ok(true);
        }

        let current = std::mem::take(&mut *state);
        *state = current.accumulate(page);
        Ok(true)
    }

    /// Load until `pages` pages are accumulated or the listing ends
    pub async fn load_pages(&self, pages: usize) -> Result<PostPagination, CmsError> {
        for _ in 1..pages {
            if !self.load_more().await? {
                break;
            }
        }
        Ok(self.snapshot().await)
    }

    /// Load every remaining page
    pub async fn load_all(&self) -> Result<PostPagination, CmsError> {
        while self.load_more().await? {}
        Ok(self.snapshot().await)
    }

    pub fn into_state(self) -> PostPagination {
        self.state.into_inner()
    }
}
