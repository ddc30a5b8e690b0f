//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on because
//! comments and post fields are user-submitted; pre-rendered rich text is
//! marked `safe` in the templates that print it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::{local_datetime, url_for};

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/banner.html",
                include_str!("theme/partials/banner.html"),
            ),
            (
                "partials/comment_form.html",
                include_str!("theme/partials/comment_form.html"),
            ),
            (
                "partials/thank_you.html",
                include_str!("theme/partials/thank_you.html"),
            ),
            (
                "partials/comments.html",
                include_str!("theme/partials/comments.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        let tz = config.tz();
        let format = config.datetime_format.clone();
        tera.register_filter(
            "date_format",
            move |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("date_format", "value", String, value);
                let formatted = DateTime::parse_from_rfc3339(&s)
                    .map(|date| local_datetime(&date.with_timezone(&Utc), tz, &format))
                    .unwrap_or(s);
                Ok(tera::Value::String(formatted))
            },
        );

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub favicon: String,
}

impl ConfigData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: url_for(config, "/"),
            favicon: url_for(config, "static/favicon.ico"),
        }
    }
}

/// A tile on the home page
#[derive(Debug, Clone, Serialize)]
pub struct PostTileData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub href: String,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    pub author_image_url: Option<String>,
    /// RFC 3339; formatted by the `date_format` filter
    pub created_at: String,
    pub body_html: String,
    pub comments: Vec<CommentData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub id: String,
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentFormData {
    pub action: String,
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
    /// Inline validation messages in form order
    pub errors: Vec<&'static str>,
    pub submitted: bool,
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let out = truncate_chars_filter(&tera::Value::from("hello world"), &args).unwrap();
        assert_eq!(out, tera::Value::from("hello..."));

        let out = truncate_chars_filter(&tera::Value::from("hi"), &args).unwrap();
        assert_eq!(out, tera::Value::from("hi"));
    }

    #[test]
    fn test_date_format_filter_uses_site_timezone() {
        let config = SiteConfig {
            timezone: "America/New_York".to_string(),
            ..Default::default()
        };
        let renderer = TemplateRenderer::new(&config).unwrap();
        let mut tera = renderer.tera;
        tera.add_raw_template("t.txt", "{{ d | date_format }}").unwrap();

        let mut context = Context::new();
        context.insert("d", "2022-03-04T15:20:30Z");
        assert_eq!(tera.render("t.txt", &context).unwrap(), "3/4/2022, 10:20:30 AM");

        context.insert("d", "not a date");
        assert_eq!(tera.render("t.txt", &context).unwrap(), "not a date");
    }
}
