//! URL helper functions

use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

use crate::config::SiteConfig;
use crate::content::ImageRef;

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

lazy_static! {
    /// `image-<assetId>-<width>x<height>-<format>`
    static ref IMAGE_REF: Regex =
        Regex::new(r"^image-([A-Za-z0-9]+)-(\d+x\d+)-([a-z0-9]+)$").unwrap();
}

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/drake/") // -> "/blog/post/drake/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Detail route for a slug
pub fn post_path(config: &SiteConfig, slug: &str) -> String {
    url_for(config, &format!("post/{}", encode_segment(slug)))
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Resolves image references to CDN URLs
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.content.project_id, &config.content.dataset)
    }

    /// URL for an image field, `None` when it has no usable asset
    pub fn url(&self, image: &ImageRef) -> Option<String> {
        let asset = image.asset.as_ref()?;
        self.resolve(&asset.id)
    }

    /// URL for a raw asset reference
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let caps = IMAGE_REF.captures(reference)?;
        Some(format!(
            "https://cdn.sanity.io/images/{}/{}/{}-{}.{}",
            self.project_id, self.dataset, &caps[1], &caps[2], &caps[3]
        ))
    }
}
