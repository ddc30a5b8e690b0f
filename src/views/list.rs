//! Home page: one linked tile per post

use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::helpers::{post_path, ImageUrlBuilder};
use crate::templates::PostTileData;

/// Map summaries to tiles, keeping query order
pub fn build_tiles(
    summaries: &[PostSummary],
    config: &SiteConfig,
    images: &ImageUrlBuilder,
) -> Vec<PostTileData> {
    summaries
        .iter()
        .map(|summary| PostTileData {
            id: summary.id.clone(),
            title: summary.title.clone(),
            description: summary.description.clone(),
            href: post_path(config, summary.slug.as_str()),
            image_url: summary.main_image.as_ref().and_then(|i| images.url(i)),
            author_name: summary
                .author
                .as_ref()
                .map(|a| a.name.clone())
                .filter(|name| !name.is_empty()),
        })
        .collect()
}
