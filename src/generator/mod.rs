//! Generator module - renders the blog into static HTML files

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::cms::{ContentSource, PreviewContext};
use crate::content::{find_neighbors, PostDetail, PostFeed, PostSummary};
use crate::helpers::listing_chunk_path;
use crate::pages::PageRenderer;
use crate::templates::{ListingChunk, LoadMoreData, STYLESHEET};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub posts: usize,
    pub listing_pages: usize,
    pub skipped: usize,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    pages: PageRenderer,
    source: Arc<dyn ContentSource>,
}

impl Generator {
    /// Create a generator reading from the blog's configured CMS
    pub fn new(blog: &Blog) -> Result<Self> {
        let source = blog.content_source()?;
        Self::with_source(blog, source)
    }

    /// Create a generator reading from the given content source
    pub fn with_source(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            pages: PageRenderer::new(blog.config.clone())?,
            source,
        })
    }

    /// Generate the entire site
    ///
    /// Static output only ever shows published content.
    pub async fn generate(&self) -> Result<GenerateStats> {
        let preview = self.source.pin(&PreviewContext::published()).await?;
        let config = &self.blog.config;

        // Ensure public directory exists
        fs::create_dir_all(&self.blog.public_dir)?;

        self.write_file("css/style.css", STYLESHEET)?;
        self.copy_static_assets()?;

        let feed = PostFeed::open(
            self.source.clone(),
            &config.prismic.document_type,
            config.per_page,
            &preview,
        )
        .await?;
        let listing = feed.load_all().await?;
        tracing::info!("Fetched {} posts", listing.len());

        let listing_pages = self.generate_listing(&listing.results)?;

        let mut stats = GenerateStats {
            listing_pages,
            ..GenerateStats::default()
        };
        for summary in &listing.results {
            if self.generate_post(summary, &preview).await? {
                stats.posts += 1;
            } else {
                stats.skipped += 1;
            }
        }

        Ok(stats)
    }

    /// Write the home page and the listing chunks behind "load more"
    fn generate_listing(&self, posts: &[PostSummary]) -> Result<usize> {
        let per_page = self.blog.config.per_page.max(1);
        let chunks: Vec<&[PostSummary]> = posts.chunks(per_page).collect();
        let first: &[PostSummary] = chunks.first().copied().unwrap_or(&[]);

        let load_more = LoadMoreData {
            endpoint: (chunks.len() > 1).then(|| listing_chunk_path(2)),
            href: None,
        };
        let html = self
            .pages
            .home(first, load_more, &PreviewContext::published())?;
        self.write_file("index.html", &html)?;

        for (i, chunk) in chunks.iter().enumerate().skip(1) {
            let page = i + 1;
            let body = ListingChunk {
                posts: chunk.iter().map(|p| self.pages.post_card(p)).collect(),
                next: (page < chunks.len()).then(|| listing_chunk_path(page + 1)),
            };
            let json = serde_json::to_string(&body)?;
            self.write_file(listing_chunk_path(page).trim_start_matches('/'), &json)?;
        }

        Ok(chunks.len().max(1))
    }

    /// Render one post page; `false` when the post could not be rendered
    async fn generate_post(&self, summary: &PostSummary, preview: &PreviewContext) -> Result<bool> {
        if !is_safe_segment(&summary.uid) {
            tracing::warn!("Skipping post with unsafe uid {:?}", summary.uid);
            return Ok(false);
        }

        let document_type = &self.blog.config.prismic.document_type;
        let Some(doc) = self
            .source
            .get_by_uid(document_type, &summary.uid, preview)
            .await?
        else {
            tracing::warn!("Post {} disappeared while generating", summary.uid);
            return Ok(false);
        };

        let post = PostDetail::try_from(&doc)?;
        let neighbors = find_neighbors(
            self.source.as_ref(),
            document_type,
            post.uid(),
            post.summary.first_publication_date,
            preview,
        )
        .await?;

        let html = self.pages.post(&post, &neighbors, preview)?;
        self.write_file(&format!("post/{}/index.html", post.uid()), &html)?;
        Ok(true)
    }

    /// Write a file below the public directory
    fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.blog.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy the static directory (logo, images, ...) into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || is_hidden(path) {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// A uid usable as a directory name
fn is_safe_segment(uid: &str) -> bool {
    !uid.is_empty()
        && !uid.starts_with('.')
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_doc, MemorySource};
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn blog(dir: &TempDir) -> Blog {
        let config = SiteConfig {
            per_page: 2,
            ..SiteConfig::default()
        };
        Blog::with_config(dir.path(), config)
    }

    fn source() -> Arc<dyn ContentSource> {
        Arc::new(MemorySource::new(vec![
            post_doc("one", "One", "2021-03-01T10:00:00+0000", "a b c"),
            post_doc("two", "Two", "2021-03-02T10:00:00+0000", "d e f"),
            post_doc("three", "Three", "2021-03-03T10:00:00+0000", "g h i"),
        ]))
    }

    #[tokio::test]
    async fn test_generate_site() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        fs::create_dir_all(&blog.static_dir).unwrap();
        fs::write(blog.static_dir.join("logo.svg"), "<svg/>").unwrap();

        let generator = Generator::with_source(&blog, source()).unwrap();
        let stats = generator.generate().await.unwrap();
        assert_eq!(
            stats,
            GenerateStats {
                posts: 3,
                listing_pages: 2,
                skipped: 0
            }
        );

        let public = &blog.public_dir;
        assert!(public.join("css/style.css").exists());
        assert!(public.join("logo.svg").exists());

        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Three"));
        assert!(index.contains("Two"));
        assert!(!index.contains(">One<"));
        assert!(index.contains("data-endpoint=\"/api/posts/2.json\""));

        let chunk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(public.join("api/posts/2.json")).unwrap())
                .unwrap();
        assert_eq!(chunk["posts"][0]["uid"], "one");
        assert!(chunk["next"].is_null());

        let post = fs::read_to_string(public.join("post/two/index.html")).unwrap();
        assert!(post.contains("<h1>Two</h1>"));
        assert!(post.contains("href=\"/post/one\""));
        assert!(post.contains("href=\"/post/three\""));

        let newest = fs::read_to_string(public.join("post/three/index.html")).unwrap();
        assert!(!newest.contains("Próximo post"));
    }

    #[tokio::test]
    async fn test_generate_single_page_listing() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::with_config(dir.path(), SiteConfig::default());
        let generator = Generator::with_source(&blog, source()).unwrap();
        let stats = generator.generate().await.unwrap();
        assert_eq!(stats.listing_pages, 1);

        let index = fs::read_to_string(blog.public_dir.join("index.html")).unwrap();
        assert!(!index.contains("Carregar mais posts"));
        assert!(!blog.public_dir.join("api/posts/2.json").exists());
    }

    #[tokio::test]
    async fn test_generate_empty_blog() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator =
            Generator::with_source(&blog, Arc::new(MemorySource::new(Vec::new()))).unwrap();
        let stats = generator.generate().await.unwrap();
        assert_eq!(stats.posts, 0);
        assert!(blog.public_dir.join("index.html").exists());
    }

    #[test]
    fn test_is_safe_segment() {
        assert!(is_safe_segment("como-utilizar-hooks"));
        assert!(!is_safe_segment("../etc"));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment(""));
    }
}
