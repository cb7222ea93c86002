//! In-memory content source for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{CmsError, ContentSource, Direction, Document, PreviewContext, Query, Result, SearchResponse};

const PAGE_PREFIX: &str = "https://memory.test/api/v2/documents/search?cursor=";

/// Ref under which drafts become visible
pub const DRAFT_REF: &str = "draft-ref";

/// Evaluates typed queries over a fixed set of documents
pub struct MemorySource {
    docs: Vec<Document>,
    drafts: Vec<Document>,
    pointers: Mutex<Vec<(Query, bool)>>,
    fetch_delay: Option<Duration>,
    queries: AtomicUsize,
    page_fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs,
            drafts: Vec::new(),
            pointers: Mutex::new(Vec::new()),
            fetch_delay: None,
            queries: AtomicUsize::new(0),
            page_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_draft(mut self, doc: Document) -> Self {
        self.drafts.push(doc);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn page_fetch_count(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn visible(&self, preview: bool) -> impl Iterator<Item = &Document> {
        let drafts: &[Document] = if preview { &self.drafts } else { &[] };
        self.docs.iter().chain(drafts.iter())
    }

    fn run(&self, query: &Query, preview: bool) -> SearchResponse {
        let mut matching: Vec<&Document> = self
            .visible(preview)
            .filter(|d| d.document_type == query.document_type)
            .filter(|d| match (query.published_before, d.first_publication_date) {
                (Some(limit), Some(date)) => date < limit,
                (Some(_), None) => false,
                _ => true,
            })
            .filter(|d| match (query.published_after, d.first_publication_date) {
                (Some(limit), Some(date)) => date > limit,
                (Some(_), None) => false,
                _ => true,
            })
            .filter(|d| query.exclude_uid.is_none() || d.uid != query.exclude_uid)
            .collect();

        matching.sort_by_key(|d| d.first_publication_date);
        if query.direction == Direction::Desc {
            matching.reverse();
        }

        let total = matching.len();
        let total_pages = total.div_ceil(query.page_size);
        let start = (query.page - 1) * query.page_size;
        let results: Vec<Document> = matching
            .into_iter()
            .skip(start)
            .take(query.page_size)
            .cloned()
            .collect();

        let next_page = (query.page < total_pages).then(|| {
            let mut pointers = self.pointers.lock().unwrap();
            pointers.push((query.clone().page(query.page + 1), preview));
            format!("{}{}", PAGE_PREFIX, pointers.len() - 1)
        });

        SearchResponse {
            page: query.page as u32,
            results_per_page: query.page_size as u32,
            results_size: results.len() as u32,
            total_results_size: total as u32,
            total_pages: total_pages as u32,
            next_page,
            prev_page: None,
            results,
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(&self, query: &Query, preview: &PreviewContext) -> Result<SearchResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.run(query, preview.reference() == Some(DRAFT_REF)))
    }

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        preview: &PreviewContext,
    ) -> Result<Option<Document>> {
        Ok(self
            .visible(preview.reference() == Some(DRAFT_REF))
            .find(|d| d.document_type == document_type && d.uid.as_deref() == Some(uid))
            .cloned())
    }

    async fn fetch_page(&self, next_page: &str) -> Result<SearchResponse> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let pointer = next_page
            .strip_prefix(PAGE_PREFIX)
            .and_then(|idx| idx.parse::<usize>().ok())
            .and_then(|idx| self.pointers.lock().unwrap().get(idx).cloned());

        match pointer {
            Some((query, preview)) => Ok(self.run(&query, preview)),
            None => Err(CmsError::Status {
                status: 404,
                url: next_page.to_string(),
            }),
        }
    }
}

/// A published post document with one paragraph of body text
pub fn post_doc(uid: &str, title: &str, published: &str, body: &str) -> Document {
    serde_json::from_value(serde_json::json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "first_publication_date": published,
        "last_publication_date": published,
        "data": {
            "title": title,
            "subtitle": format!("About {}", title),
            "author": "Ana",
            "banner": {"url": format!("https://images.test/{}.png", uid)},
            "content": [{
                "heading": format!("{} heading", title),
                "body": [{"type": "paragraph", "text": body, "spans": []}]
            }]
        }
    }))
    .expect("valid post document")
}
