//! Content module - content store access, document models and rich-text rendering

mod client;
pub mod fixtures;
mod model;
pub mod portable_text;
pub mod queries;

use std::sync::Arc;

pub use client::{ContentError, ContentSource, SanityClient};
pub use fixtures::FixtureSource;
pub use model::{Author, Comment, ImageRef, Post, PostSummary, Reference, Slug};
pub use portable_text::{Block, Node, RichTextRenderer};

use crate::config::ContentConfig;

/// Pick the content source the configuration asks for
///
/// A configured `fixtures` dataset wins over the hosted API.
pub fn open_source(
    config: &ContentConfig,
    base_dir: &std::path::Path,
) -> Result<Arc<dyn ContentSource>, ContentError> {
    match &config.fixtures {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            Ok(Arc::new(FixtureSource::load(path)?))
        }
        None => Ok(Arc::new(SanityClient::new(config)?)),
    }
}
