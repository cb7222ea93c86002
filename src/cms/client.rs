//! HTTP client for the Prismic REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::query::uid_predicate;
use super::{
    ApiInfo, CmsError, ContentSource, Document, PreviewContext, Query, Result, SearchResponse,
};
use crate::config::PrismicConfig;

/// Content source backed by a Prismic repository
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Create a client for the configured API root
    pub fn new(config: &PrismicConfig) -> Result<Self> {
        let endpoint = parse_url(config.endpoint.trim_end_matches('/'))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("spacetravelling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Ref of the currently published content
    pub async fn master_ref(&self) -> Result<String> {
        let info: ApiInfo = self.get_json(self.endpoint.clone()).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or(CmsError::MissingMasterRef)
    }

    /// The preview ref when one is active, the pinned or current master ref otherwise
    async fn resolve_ref(&self, preview: &PreviewContext) -> Result<String> {
        match preview.content_ref() {
            Some(reference) => Ok(reference.to_string()),
            None => self.master_ref().await,
        }
    }

    fn search_url(&self) -> Result<Url> {
        search_endpoint(self.endpoint.as_str())
    }

    async fn search(
        &self,
        params: &[(&str, String)],
        preview: &PreviewContext,
    ) -> Result<SearchResponse> {
        let reference = self.resolve_ref(preview).await?;
        let mut url = self.search_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &reference);
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T> {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        tracing::debug!("GET {}", redact(&url));
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: redact(&url),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn pin(&self, preview: &PreviewContext) -> Result<PreviewContext> {
        if preview.content_ref().is_some() {
            return Ok(preview.clone());
        }
        let master_ref = self.master_ref().await?;
        Ok(preview.clone().at_master_ref(master_ref))
    }

    async fn query(&self, query: &Query, preview: &PreviewContext) -> Result<SearchResponse> {
        self.search(&query.to_params(), preview).await
    }

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        preview: &PreviewContext,
    ) -> Result<Option<Document>> {
        let params = [
            ("q", uid_predicate(document_type, uid)),
            ("pageSize", "1".to_string()),
        ];
        let response = self.search(&params, preview).await?;
        Ok(response.results.into_iter().next())
    }

    async fn fetch_page(&self, next_page: &str) -> Result<SearchResponse> {
        self.get_json(parse_url(next_page)?).await
    }
}

/// The document search URL below an API root
pub fn search_endpoint(api_root: &str) -> Result<Url> {
    parse_url(&format!("{}/documents/search", api_root.trim_end_matches('/')))
}

/// A next-page pointer safe to hand to browsers
///
/// Prismic copies the request's `access_token` into `next_page`; the client
/// adds it back when it follows the pointer.
pub fn without_access_token(next_page: &str) -> String {
    match Url::parse(next_page) {
        Ok(url) => redact(&url),
        Err(_) => next_page.to_string(),
    }
}

fn parse_url(reference: &str) -> Result<Url> {
    Url::parse(reference).map_err(|source| CmsError::InvalidUrl {
        reference: reference.to_string(),
        source,
    })
}

/// URL without the access token, for logs and errors
fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean.to_string()
}
