//! Local dataset standing in for the hosted content store
//!
//! The dataset file holds raw documents the way the store keeps them
//! (`post`, `author` and `comment` documents with references between
//! them); lookups resolve author references and filter comments the same
//! way the detail query does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::RwLock;

use super::client::{collect_slugs, ContentError, ContentSource};
use super::model::{Author, Comment, ImageRef, Post, PostSummary, Reference, Slug};
use super::portable_text::Block;
use crate::comments::CommentDraft;

/// One stored document
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "_type", rename_all = "camelCase")]
pub enum Document {
    Post(PostDocument),
    Author(AuthorDocument),
    Comment(Comment),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Reference>,
    #[serde(default)]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    documents: Vec<Document>,
}

/// In-memory content source loaded from a JSON dataset
pub struct FixtureSource {
    documents: RwLock<Vec<Document>>,
}

impl FixtureSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Parse a dataset (`{"documents": [...]}`)
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::new(dataset.documents))
    }

    /// Read a dataset file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ContentError::Dataset {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_json(&json)?;
        tracing::info!(
            "Loaded {} documents from {:?}",
            source.read().len(),
            path
        );
        Ok(source)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Document>> {
        // a poisoned lock still holds a consistent Vec
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn author(documents: &[Document], reference: Option<&Reference>) -> Option<Author> {
        let reference = reference?;
        documents.iter().find_map(|doc| match doc {
            Document::Author(author) if author.id == reference.id => Some(Author {
                name: author.name.clone(),
                image: author.image.clone(),
            }),
            _ => None,
        })
    }

    fn posts(documents: &[Document]) -> impl Iterator<Item = &PostDocument> {
        documents.iter().filter_map(|doc| match doc {
            Document::Post(post) => Some(post),
            _ => None,
        })
    }
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn fetch_post_summaries(&self) -> Result<Vec<PostSummary>, ContentError> {
        let documents = self.read();
        Ok(Self::posts(&documents)
            .filter_map(|post| {
                Some(PostSummary {
                    id: post.id.clone(),
                    title: post.title.clone(),
                    description: post.description.clone(),
                    slug: post.slug.clone()?,
                    main_image: post.main_image.clone(),
                    author: Self::author(&documents, post.author.as_ref()),
                })
            })
            .collect())
    }

    async fn fetch_post_slugs(&self) -> Result<Vec<Slug>, ContentError> {
        let documents = self.read();
        Ok(collect_slugs(Self::posts(&documents).map(|p| p.slug.clone())))
    }

    async fn fetch_post_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        if slug.is_empty() {
            return Ok(None);
        }
        let documents = self.read();
        let Some(post) = Self::posts(&documents)
            .find(|p| p.slug.as_ref().map(Slug::as_str) == Some(slug))
        else {
            return Ok(None);
        };

        let comments = documents
            .iter()
            .filter_map(|doc| match doc {
                Document::Comment(c) if c.approved && c.is_on(&post.id) => Some(c.clone()),
                _ => None,
            })
            .collect();

        Ok(Some(Post {
            id: post.id.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            slug: Slug::new(slug),
            main_image: post.main_image.clone(),
            created_at: post.created_at,
            author: Self::author(&documents, post.author.as_ref()),
            body: post.body.clone(),
            comments,
        }))
    }

    async fn create_comment(&self, draft: &CommentDraft) -> Result<String, ContentError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = format!("comment-{}", documents.len() + 1);
        documents.push(Document::Comment(Comment {
            id: id.clone(),
            post: Some(Reference {
                id: draft.post_id.clone(),
            }),
            name: draft.name.clone(),
            email: draft.email.clone(),
            comment: draft.comment.clone(),
            approved: false,
        }));
        tracing::info!("Stored comment {} for post {}", id, draft.post_id);
        Ok(id)
    }
}
