//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Site;

/// Render every page from the configured content source into the public directory
pub async fn run(site: &Site) -> Result<()> {
    let start = std::time::Instant::now();

    let source = site.content_source()?;
    let generator = Generator::new(site)?;
    let report = generator.generate(source.as_ref()).await?;

    if !report.skipped.is_empty() {
        tracing::warn!("Skipped {} slugs: {:?}", report.skipped.len(), report.skipped);
    }
    tracing::info!(
        "Generated {} posts in {:.2}s",
        report.posts,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
