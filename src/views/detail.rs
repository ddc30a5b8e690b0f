//! Post page: article, comment form state and approved comments

use crate::comments::CommentFlow;
use crate::content::{Post, RichTextRenderer};
use crate::helpers::ImageUrlBuilder;
use crate::templates::{CommentData, CommentFormData, PostPageData};

pub fn build_post(
    post: &Post,
    images: &ImageUrlBuilder,
    rich_text: &RichTextRenderer,
) -> PostPageData {
    let author = post.author.as_ref();
    PostPageData {
        id: post.id.clone(),
        title: post.title.clone(),
        description: post.description.clone(),
        slug: post.slug.current.clone(),
        image_url: post.main_image.as_ref().and_then(|i| images.url(i)),
        author_name: author.map(|a| a.name.clone()).filter(|n| !n.is_empty()),
        author_image_url: author
            .and_then(|a| a.image.as_ref())
            .and_then(|i| images.url(i)),
        created_at: post.created_at.to_rfc3339(),
        body_html: rich_text.render_html(&post.body),
        // store order, no re-sorting
        comments: post
            .comments
            .iter()
            .map(|c| CommentData {
                id: c.id.clone(),
                name: c.name.clone(),
                comment: c.comment.clone(),
            })
            .collect(),
    }
}

pub fn build_form(flow: &CommentFlow, action: &str) -> CommentFormData {
    let draft = flow.draft();
    let errors = flow.errors();
    CommentFormData {
        action: action.to_string(),
        post_id: draft.post_id.clone(),
        name: draft.name.clone(),
        email: draft.email.clone(),
        comment: draft.comment.clone(),
        errors: errors.messages(),
        submitted: flow.submitted(),
        failed: flow.failure().is_some(),
    }
}
