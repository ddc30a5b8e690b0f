//! List site content

use anyhow::Result;

use crate::helpers::post_path;
use crate::Site;

/// Print every post title with its route
pub async fn run(site: &Site) -> Result<()> {
    let source = site.content_source()?;
    let posts = source.fetch_post_summaries().await?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        if post.slug.as_str().is_empty() {
            println!("  {} [no slug]", post.title);
        } else {
            println!(
                "  {} [{}]",
                post.title,
                post_path(&site.config, post.slug.as_str())
            );
        }
    }

    Ok(())
}
