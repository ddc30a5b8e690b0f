//! Comment form draft and validation

use serde::{Deserialize, Serialize};

/// The fields of one comment submission attempt
///
/// Serializes to the intake body `{_id, name, email, comment}`, where `_id`
/// is the post the comment belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentDraft {
    #[serde(rename = "_id", default)]
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
}

impl CommentDraft {
    /// An empty draft bound to a post
    pub fn for_post(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            ..Default::default()
        }
    }

    /// Check the required fields; each missing field sets its own flag
    pub fn validate(&self) -> FieldErrors {
        FieldErrors {
            name_required: self.name.trim().is_empty(),
            email_required: self.email.trim().is_empty(),
            comment_required: self.comment.trim().is_empty(),
        }
    }
}

/// Per-field validation flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub name_required: bool,
    pub email_required: bool,
    pub comment_required: bool,
}

impl FieldErrors {
    pub fn any(&self) -> bool {
        self.name_required || self.email_required || self.comment_required
    }

    /// Inline messages in form order
    pub fn messages(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if self.name_required {
            messages.push("Name is required");
        }
        if self.email_required {
            messages.push("Email is required");
        }
        if self.comment_required {
            messages.push("Comment is required");
        }
        messages
    }
}
