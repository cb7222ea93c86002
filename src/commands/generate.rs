//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Fetch every post from the CMS and write the static site
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let stats = generator.generate().await?;

    tracing::info!(
        "Generated {} posts and {} listing pages into {:?}",
        stats.posts,
        stats.listing_pages,
        blog.public_dir
    );
    if stats.skipped > 0 {
        tracing::warn!("Skipped {} posts", stats.skipped);
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
