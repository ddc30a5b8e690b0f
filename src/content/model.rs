//! Documents returned by the content store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::portable_text::Block;

/// URL-friendly post key (`slug.current` in the store)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.current
    }
}

/// Reference to another document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
}

/// Image field: a reference to an image asset plus optional alt text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<Reference>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Post author, dereferenced by the query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// A reader comment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub post: Option<Reference>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub comment: String,
    #[serde(default, deserialize_with = "nullable")]
    pub approved: bool,
}

impl Comment {
    /// Whether the comment references `post_id`
    pub fn is_on(&self, post_id: &str) -> bool {
        self.post.as_ref().is_some_and(|r| r.id == post_id)
    }
}

/// The list query's projection of a post
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    pub slug: Slug,
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub author: Option<Author>,
}

/// A post as returned by the detail query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    pub slug: Slug,
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "nullable")]
    pub body: Vec<Block>,
    /// Approved comments, in store order
    #[serde(default, deserialize_with = "nullable")]
    pub comments: Vec<Comment>,
}

/// Projections yield `null` for missing fields; treat it like an absent one.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
