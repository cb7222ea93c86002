//! HTTP server rendering pages on demand
//!
//! Unlike the static output, served pages honor preview mode and can load
//! more posts without JavaScript.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cms::{search_endpoint, without_access_token, ContentSource, PreviewContext};
use crate::content::{find_neighbors, PostDetail, PostFeed, PostPagination};
use crate::helpers::encode_query_value;
use crate::pages::{PageRenderer, EXIT_PREVIEW_PATH};
use crate::templates::{ListingChunk, LoadMoreData, STYLESHEET};
use crate::Blog;

/// Upper bound for `?pages=N` on the home page
const MAX_PAGES: usize = 20;

/// Server state
struct ServerState {
    pages: PageRenderer,
    source: Arc<dyn ContentSource>,
    /// Search URL that next-page pointers must point to
    search_url: url::Url,
}

impl ServerState {
    fn config(&self) -> &crate::config::SiteConfig {
        self.pages.config()
    }

    /// The request's preview state, with the ref every query reads at
    async fn preview(&self, headers: &HeaderMap) -> Result<PreviewContext, AppError> {
        let cookies: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let preview = PreviewContext::from_cookie_header(
            &cookies.join("; "),
            &self.config().preview.cookie_name,
        );
        Ok(self.source.pin(&preview).await?)
    }

    /// Link the page script uses to fetch the page after `next_page`
    fn chunk_endpoint(next_page: &str) -> String {
        format!(
            "/api/posts?next={}",
            encode_query_value(&without_access_token(next_page))
        )
    }

    /// Whether a client-supplied pointer is a search page of the CMS
    fn is_search_pointer(&self, next_page: &str) -> bool {
        let Ok(url) = url::Url::parse(next_page) else {
            return false;
        };
        url.origin() == self.search_url.origin()
            && url.path() == self.search_url.path()
            && !url.query_pairs().any(|(k, _)| k == "access_token")
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let app = router(blog, blog.content_source()?)?;

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn router(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Router> {
    let search_url = search_endpoint(&blog.config.prismic.endpoint)?;
    let state = Arc::new(ServerState {
        pages: PageRenderer::new(blog.config.clone())?,
        source,
        search_url,
    });

    Ok(Router::new()
        .route("/", get(home_handler))
        .route("/post/:uid", get(post_handler))
        .route("/api/posts", get(posts_api_handler))
        .route(EXIT_PREVIEW_PATH, get(exit_preview_handler))
        .route("/css/style.css", get(stylesheet_handler))
        .fallback_service(ServeDir::new(&blog.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Error response for failed requests
struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Deserialize)]
struct HomeParams {
    pages: Option<usize>,
}

/// Home page with the first `pages` listing pages
async fn home_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HomeParams>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let preview = state.preview(&headers).await?;
    let pages = params.pages.unwrap_or(1).clamp(1, MAX_PAGES);
    let config = state.config();

    let feed = PostFeed::open(
        state.source.clone(),
        &config.prismic.document_type,
        config.per_page,
        &preview,
    )
    .await?;
    let listing = feed.load_pages(pages).await?;

    let load_more = match &listing.next_page {
        Some(next) => LoadMoreData {
            endpoint: Some(ServerState::chunk_endpoint(next)),
            href: (pages < MAX_PAGES).then(|| format!("/?pages={}", pages + 1)),
        },
        None => LoadMoreData::default(),
    };

    Ok(Html(state.pages.home(&listing.results, load_more, &preview)?))
}

/// Post page, or the not-found page for unknown uids
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let preview = state.preview(&headers).await?;
    let document_type = &state.config().prismic.document_type;

    let Some(doc) = state
        .source
        .get_by_uid(document_type, &uid, &preview)
        .await?
    else {
        tracing::debug!("Post not found: {}", uid);
        let html = state.pages.not_found(&preview)?;
        return Ok((StatusCode::NOT_FOUND, Html(html)).into_response());
    };

    let post = PostDetail::try_from(&doc)?;
    let neighbors = find_neighbors(
        state.source.as_ref(),
        document_type,
        post.uid(),
        post.summary.first_publication_date,
        &preview,
    )
    .await?;

    Ok(Html(state.pages.post(&post, &neighbors, &preview)?).into_response())
}

#[derive(Debug, Deserialize)]
struct PostsParams {
    next: String,
}

/// The listing page behind a next-page pointer, for the page script
async fn posts_api_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PostsParams>,
) -> Result<Response, AppError> {
    if !state.is_search_pointer(&params.next) {
        tracing::warn!("Rejected next-page pointer {:?}", params.next);
        return Ok((StatusCode::BAD_REQUEST, "Invalid next page").into_response());
    }

    let feed = PostFeed::resume(
        state.source.clone(),
        PostPagination::new(Vec::new(), Some(params.next)),
    );
    feed.load_more().await?;
    let page = feed.into_state();

    let chunk = ListingChunk {
        posts: page.results.iter().map(|p| state.pages.post_card(p)).collect(),
        next: page.next_page.as_deref().map(ServerState::chunk_endpoint),
    };
    Ok(Json(chunk).into_response())
}

/// Leave preview mode
async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let cookie = format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        state.config().preview.cookie_name
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to("/"))
}

async fn stylesheet_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_doc, MemorySource, DRAFT_REF};
    use crate::config::{PrismicConfig, SiteConfig};
    use tempfile::TempDir;

    struct TestServer {
        base: String,
        client: reqwest::Client,
        _dir: TempDir,
    }

    impl TestServer {
        async fn get(&self, path: &str) -> reqwest::Response {
            self.client
                .get(format!("{}{}", self.base, path))
                .send()
                .await
                .unwrap()
        }

        async fn get_with_cookie(&self, path: &str, cookie: &str) -> reqwest::Response {
            self.client
                .get(format!("{}{}", self.base, path))
                .header(header::COOKIE, cookie)
                .send()
                .await
                .unwrap()
        }
    }

    async fn spawn() -> TestServer {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig {
            per_page: 2,
            prismic: PrismicConfig {
                endpoint: "https://memory.test/api/v2".to_string(),
                ..PrismicConfig::default()
            },
            ..SiteConfig::default()
        };
        let blog = Blog::with_config(dir.path(), config);
        std::fs::create_dir_all(&blog.static_dir).unwrap();
        std::fs::write(blog.static_dir.join("logo.svg"), "<svg/>").unwrap();

        let draft: crate::cms::Document = serde_json::from_value(serde_json::json!({
            "id": "d", "uid": "wip", "type": "posts",
            "data": {"title": "Rascunho", "content": []}
        }))
        .unwrap();
        let source = MemorySource::new(vec![
            post_doc("one", "One", "2021-03-01T10:00:00+0000", "a b c"),
            post_doc("two", "Two", "2021-03-02T10:00:00+0000", "d e f"),
            post_doc("three", "Three", "2021-03-03T10:00:00+0000", "g h i"),
        ])
        .with_draft(draft);

        serve(dir, &blog, Arc::new(source)).await
    }

    async fn serve(dir: TempDir, blog: &Blog, source: Arc<dyn ContentSource>) -> TestServer {
        let app = router(blog, source).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap(),
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_home_first_page() {
        let server = spawn().await;
        let response = server.get("/").await;
        assert_eq!(response.status(), 200);
        let html = response.text().await.unwrap();
        assert!(html.contains("Three"));
        assert!(html.contains("Two"));
        assert!(!html.contains("href=\"/post/one\""));
        assert!(html.contains("href=\"/?pages=2\""));
        assert!(html.contains("data-endpoint=\"/api/posts?next="));
    }

    #[tokio::test]
    async fn test_home_accumulates_pages() {
        let server = spawn().await;
        let html = server.get("/?pages=2").await.text().await.unwrap();
        assert!(html.contains("href=\"/post/one\""));
        assert!(!html.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_post_page_and_not_found() {
        let server = spawn().await;
        let response = server.get("/post/two").await;
        assert_eq!(response.status(), 200);
        let html = response.text().await.unwrap();
        assert!(html.contains("<h1>Two</h1>"));
        assert!(html.contains("href=\"/post/one\""));
        assert!(html.contains("href=\"/post/three\""));

        let response = server.get("/post/missing").await;
        assert_eq!(response.status(), 404);
        assert!(response.text().await.unwrap().contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_preview_cookie_selects_drafts() {
        let server = spawn().await;
        assert_eq!(server.get("/post/wip").await.status(), 404);

        let cookie = format!("io.prismic.preview={}", DRAFT_REF);
        let response = server.get_with_cookie("/post/wip", &cookie).await;
        assert_eq!(response.status(), 200);
        let html = response.text().await.unwrap();
        assert!(html.contains("Rascunho"));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[tokio::test]
    async fn test_exit_preview_clears_cookie() {
        let server = spawn().await;
        let response = server.get(EXIT_PREVIEW_PATH).await;
        assert_eq!(response.status(), 303);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("io.prismic.preview=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_posts_api_follows_pointer() {
        let server = spawn().await;
        let html = server.get("/").await.text().await.unwrap();
        let start = html.find("/api/posts?next=").unwrap();
        let end = start + html[start..].find('"').unwrap();
        let endpoint = &html[start..end];

        let response = server.get(endpoint).await;
        assert_eq!(response.status(), 200);
        let chunk: serde_json::Value = response.json().await.unwrap();
        assert_eq!(chunk["posts"][0]["uid"], "one");
        assert_eq!(chunk["posts"][0]["path"], "/post/one");
        assert!(chunk["next"].is_null());
    }

    #[tokio::test]
    async fn test_posts_api_rejects_foreign_pointer() {
        let server = spawn().await;
        for next in [
            "https://evil.test/api/v2/documents/search?cursor=0",
            "https://memory.test/api/v2/other?cursor=0",
            "https://memory.test/api/v2?cursor=0",
            "https://memory.test/api/v2/documents/search?cursor=0&access_token=x",
            "/api/v2/documents/search?cursor=0",
        ] {
            let path = format!("/api/posts?next={}", encode_query_value(next));
            assert_eq!(server.get(&path).await.status(), 400, "{}", next);
        }
    }

    #[tokio::test]
    async fn test_pointers_never_carry_access_token() {
        use crate::cms::PrismicClient;
        use httpmock::prelude::*;

        let cms = MockServer::start_async().await;
        cms.mock_async(|when, then| {
            when.method(GET).path("/api/v2");
            then.status(200).json_body(serde_json::json!({
                "refs": [{"id": "master", "ref": "m", "isMasterRef": true}]
            }));
        })
        .await;
        let page = |n: u32, uid: &str, next: Option<String>| {
            serde_json::json!({
                "page": n,
                "next_page": next,
                "results": [{
                    "id": uid, "uid": uid, "type": "posts",
                    "first_publication_date": format!("2021-03-0{}T10:00:00+0000", 4 - n),
                    "data": {"title": uid.to_uppercase(), "content": []}
                }]
            })
        };
        let pointer = |n: u32| {
            cms.url(format!(
                "/api/v2/documents/search?ref=m&page={}&pageSize=1&access_token=secret",
                n
            ))
        };
        cms.mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/documents/search")
                .query_param("page", "1")
                .query_param("access_token", "secret");
            then.status(200).json_body(page(1, "first", Some(pointer(2))));
        })
        .await;
        let second = cms
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/documents/search")
                    .query_param("page", "2")
                    .query_param("access_token", "secret");
                then.status(200).json_body(page(2, "second", Some(pointer(3))));
            })
            .await;

        let dir = TempDir::new().unwrap();
        let config = SiteConfig {
            per_page: 1,
            prismic: PrismicConfig {
                endpoint: cms.url("/api/v2"),
                access_token: Some("secret".to_string()),
                ..PrismicConfig::default()
            },
            ..SiteConfig::default()
        };
        let blog = Blog::with_config(dir.path(), config);
        let source = Arc::new(PrismicClient::new(&blog.config.prismic).unwrap());
        let server = serve(dir, &blog, source).await;

        let html = server.get("/").await.text().await.unwrap();
        assert!(html.contains("data-endpoint=\"/api/posts?next="));
        assert!(!html.contains("secret"));

        let start = html.find("/api/posts?next=").unwrap();
        let end = start + html[start..].find('"').unwrap();
        let response = server.get(&html[start..end]).await;
        assert_eq!(response.status(), 200);
        let body = response.text().await.unwrap();
        assert!(body.contains("\"uid\":\"second\""));
        assert!(!body.contains("secret"));
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_static_assets() {
        let server = spawn().await;
        let response = server.get("/css/style.css").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        assert_eq!(server.get("/logo.svg").await.text().await.unwrap(), "<svg/>");
    }
}
