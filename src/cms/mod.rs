//! Content source - the headless CMS the blog reads its posts from

mod client;
mod document;
mod preview;
mod query;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{search_endpoint, without_access_token, PrismicClient};
pub use document::{ApiInfo, ApiRef, Document, SearchResponse};
pub use preview::PreviewContext;
pub use query::{Direction, Query};

/// Errors raised while talking to the content source
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("request to content source failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content source answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid resource reference {reference:?}: {source}")]
    InvalidUrl {
        reference: String,
        #[source]
        source: url::ParseError,
    },

    #[error("content source exposes no master ref")]
    MissingMasterRef,

    #[error("document {id} has no {field}")]
    MissingField { id: String, field: &'static str },
}

pub type Result<T> = std::result::Result<T, CmsError>;

/// Query and detail access to published (or previewed) documents
///
/// Every call takes the request's [`PreviewContext`] explicitly; there is
/// no ambient session state.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve the ref the request reads at, so later calls skip the lookup
    async fn pin(&self, preview: &PreviewContext) -> Result<PreviewContext> {
        Ok(preview.clone())
    }

    /// Run a predicate query and return one page of results
    async fn query(&self, query: &Query, preview: &PreviewContext) -> Result<SearchResponse>;

    /// Fetch one document by its unique identifier
    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        preview: &PreviewContext,
    ) -> Result<Option<Document>>;

    /// Fetch the page behind a `next_page` pointer of an earlier response
    async fn fetch_page(&self, next_page: &str) -> Result<SearchResponse>;
}
