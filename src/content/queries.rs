//! GROQ queries sent to the content store

/// Every post, projected for the home page
pub const POST_SUMMARIES: &str = r#"*[_type == "post"]{
  _id,
  title,
  description,
  mainImage,
  slug,
  author -> {
    name,
    image
  }
}"#;

/// Every post's slug, for path enumeration
pub const POST_SLUGS: &str = r#"*[_type == "post"]{
  _id,
  slug {
    current
  }
}"#;

/// One post by `$slug`, with its approved comments
pub const POST_BY_SLUG: &str = r#"*[_type == "post" && slug.current == $slug][0]{
  _id,
  title,
  description,
  mainImage,
  _createdAt,
  slug,
  body,
  author -> {
    name,
    image
  },
  "comments": *[_type == "comment" && post._ref == ^._id && approved == true]
}"#;
