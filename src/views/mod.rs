//! Page composition: content documents in, HTML out

mod detail;
mod list;

use anyhow::Result;
use tera::Context;

pub use detail::{build_form, build_post};
pub use list::build_tiles;

use crate::comments::CommentFlow;
use crate::config::SiteConfig;
use crate::content::{Post, PostSummary, RichTextRenderer};
use crate::helpers::{post_path, ImageUrlBuilder};
use crate::templates::{ConfigData, TemplateRenderer};

/// Renders the site's pages
pub struct Views {
    config: SiteConfig,
    templates: TemplateRenderer,
    images: ImageUrlBuilder,
    rich_text: RichTextRenderer,
}

impl Views {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let images = ImageUrlBuilder::from_config(config);
        Ok(Self {
            config: config.clone(),
            templates: TemplateRenderer::new(config)?,
            rich_text: RichTextRenderer::new(images.clone()),
            images,
        })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("config", &ConfigData::from_config(&self.config));
        context
    }

    /// Home page
    pub fn render_index(&self, summaries: &[PostSummary]) -> Result<String> {
        let mut context = self.context();
        context.insert(
            "posts",
            &build_tiles(summaries, &self.config, &self.images),
        );
        self.templates.render("index.html", &context)
    }

    /// Post page with the comment form in whatever state `flow` is in
    pub fn render_post(&self, post: &Post, flow: &CommentFlow) -> Result<String> {
        let mut context = self.context();
        context.insert("post", &build_post(post, &self.images, &self.rich_text));
        context.insert("form", &build_form(flow, &self.comment_action(post)));
        self.templates.render("post.html", &context)
    }

    pub fn render_not_found(&self, slug: &str) -> Result<String> {
        let mut context = self.context();
        context.insert("slug", slug);
        self.templates.render("not_found.html", &context)
    }

    /// Where the post page's form submits to
    pub fn comment_action(&self, post: &Post) -> String {
        format!("{}/comment", post_path(&self.config, post.slug.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::CommentDraft;
    use crate::config::AcceptancePolicy;
    use crate::content::fixtures::tests::source;
    use crate::content::ContentSource;

    async fn post() -> Post {
        source().fetch_post_by_slug("my-meme").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_tiles() {
        let views = Views::new(&SiteConfig::default()).unwrap();
        let summaries = source().fetch_post_summaries().await.unwrap();
        let html = views.render_index(&summaries).unwrap();

        assert!(html.contains(r#"href="/post/my-meme""#));
        assert!(html.contains(r#"href="/post/second""#));
        assert!(html.contains("My meme"));
        assert!(html.contains("by Ada"));
    }

    #[tokio::test]
    async fn test_post_page_composition() {
        let views = Views::new(&SiteConfig::default()).unwrap();
        let post = post().await;
        let flow = CommentFlow::new(&post.id, AcceptancePolicy::Status);
        let html = views.render_post(&post, &flow).unwrap();

        assert!(html.contains(r#"<h1 class="text-3xl font-bold my-5">Intro</h1>"#));
        assert!(html.contains(r#"<li class="ml-4 list-disc">a</li>"#));
        assert!(html.contains("3/4/2022, 10:20:30 AM"));
        assert!(html.contains(r#"action="/post/my-meme/comment""#));
        assert!(html.contains(r#"name="_id" value="post-1""#));
        assert!(!html.contains("Thank you for submitting"));

        let first = html.find("first!").unwrap();
        let second = html.find("second!").unwrap();
        assert!(first < second);
        assert!(!html.contains("spam"));
    }

    #[tokio::test]
    async fn test_post_page_escapes_and_keeps_draft() {
        let views = Views::new(&SiteConfig::default()).unwrap();
        let post = post().await;
        let flow = CommentFlow::with_draft(
            CommentDraft {
                post_id: post.id.clone(),
                name: "<b>Mallory</b>".to_string(),
                email: String::new(),
                comment: "hi".to_string(),
            },
            AcceptancePolicy::Status,
        );
        let html = views.render_post(&post, &flow).unwrap();

        assert!(html.contains("&lt;b&gt;Mallory&lt;&#x2F;b&gt;"));
        assert!(!html.contains("<b>Mallory</b>"));
    }

    #[test]
    fn test_not_found_page() {
        let views = Views::new(&SiteConfig::default()).unwrap();
        let html = views.render_not_found("missing").unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("missing"));
    }
}
