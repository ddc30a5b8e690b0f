//! Generator module - writes the home page and every post page as static HTML

use anyhow::Result;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::comments::CommentFlow;
use crate::content::ContentSource;
use crate::helpers::encode_segment;
use crate::views::Views;
use crate::Site;

/// What a generation pass produced
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub posts: usize,
    /// Slugs the listing returned that no post resolved to
    pub skipped: Vec<String>,
}

/// Static site generator
pub struct Generator {
    site: Site,
    views: Views,
}

impl Generator {
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            views: Views::new(&site.config)?,
        })
    }

    /// Generate the entire site from `source`
    pub async fn generate(&self, source: &dyn ContentSource) -> Result<GenerateReport> {
        fs::create_dir_all(&self.site.public_dir)?;
        self.copy_static_assets()?;

        let summaries = source.fetch_post_summaries().await?;
        tracing::info!("Loaded {} posts", summaries.len());
        self.write_page(Path::new("index.html"), &self.views.render_index(&summaries)?)?;

        let mut report = GenerateReport::default();
        for slug in source.fetch_post_slugs().await? {
            let segment = encode_segment(slug.as_str());
            if segment == "." || segment == ".." {
                tracing::warn!("Skipping unusable slug: {:?}", slug.as_str());
                report.skipped.push(slug.current);
                continue;
            }

            let Some(post) = source.fetch_post_by_slug(slug.as_str()).await? else {
                tracing::warn!("No post for slug: {}", slug.as_str());
                report.skipped.push(slug.current);
                continue;
            };

            let flow = CommentFlow::new(&post.id, self.site.config.comments.acceptance);
            let html = self.views.render_post(&post, &flow)?;
            self.write_page(&Path::new("post").join(&segment).join("index.html"), &html)?;
            report.posts += 1;
        }

        Ok(report)
    }

    fn write_page(&self, relative: &Path, html: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy `static/` into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let source_dir = self.site.base_dir.join("static");
        if !source_dir.is_dir() {
            return Ok(());
        }
        let target_dir = self.site.public_dir.join("static");

        for entry in WalkDir::new(&source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() {
                let relative = path.strip_prefix(&source_dir)?;
                let dest = target_dir.join(relative);

                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }

                fs::copy(path, &dest)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::fixtures::tests::source;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_writes_index_and_posts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("static/img")).unwrap();
        fs::write(tmp.path().join("static/img/logo.png"), b"png").unwrap();

        let site = Site::with_config(tmp.path(), SiteConfig::default());
        let generator = Generator::new(&site).unwrap();
        let report = generator.generate(&source()).await.unwrap();

        assert_eq!(report.posts, 2);
        assert!(report.skipped.is_empty());

        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("My meme"));
        assert!(index.contains("Second"));

        let post = fs::read_to_string(site.public_dir.join("post/my-meme/index.html")).unwrap();
        assert!(post.contains("Intro"));
        assert!(post.contains("first!"));
        assert!(!post.contains("spam"));
        assert!(site.public_dir.join("post/second/index.html").exists());
        assert!(site.public_dir.join("static/img/logo.png").exists());
    }
}
