//! List site content

use anyhow::Result;
use std::sync::Arc;

use crate::cms::{ContentSource, PreviewContext};
use crate::content::{PostFeed, PostSummary};
use crate::helpers::display_date;
use crate::Blog;

/// List every post, newest first
pub async fn run(blog: &Blog, preview: Option<String>) -> Result<()> {
    let preview = preview
        .map(PreviewContext::with_ref)
        .unwrap_or_default();
    let posts = collect(blog, blog.content_source()?, &preview).await?;

    println!("Posts ({}):", posts.len());
    for line in format_lines(blog, &posts) {
        println!("{}", line);
    }

    Ok(())
}

/// Page through the whole listing
async fn collect(
    blog: &Blog,
    source: Arc<dyn ContentSource>,
    preview: &PreviewContext,
) -> Result<Vec<PostSummary>> {
    let preview = source.pin(preview).await?;
    let feed = PostFeed::open(
        source,
        &blog.config.prismic.document_type,
        blog.config.per_page,
        &preview,
    )
    .await?;
    Ok(feed.load_all().await?.results)
}

fn format_lines(blog: &Blog, posts: &[PostSummary]) -> Vec<String> {
    posts
        .iter()
        .map(|post| {
            let date = post
                .first_publication_date
                .map(|d| display_date(&blog.config, &d))
                .unwrap_or_else(|| "draft".to_string());
            format!("  {} - {} [{}]", date, post.title, post.uid)
        })
        .collect()
}
