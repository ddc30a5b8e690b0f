//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# memeboard configuration

# Site
title: Medium Memes
description: A place to create, enjoy and share memes.
language: en
timezone: ''
datetime_format: 'M/D/YYYY, h:mm:ss A'

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public

# Content store
## SANITY_PROJECT_ID, SANITY_DATASET and SANITY_API_TOKEN override these.
content:
  project_id: ''
  dataset: production
  api_version: '2021-10-21'
  use_cdn: true
  timeout_secs: 10
  # Serve a local dataset instead of the hosted API
  fixtures: dataset.json

# Comments
comments:
  # endpoint: https://example.com/api/createComment
  acceptance: status

# Server
server:
  revalidate_secs: 60
"#;

const DEFAULT_DATASET: &str = r#"{
  "documents": [
    {
      "_type": "author",
      "_id": "author-welcome",
      "name": "Meme Lord"
    },
    {
      "_type": "post",
      "_id": "post-welcome",
      "title": "Hello, memes",
      "description": "Your first post",
      "slug": { "current": "hello-memes" },
      "_createdAt": "2022-01-01T00:00:00Z",
      "author": { "_ref": "author-welcome" },
      "body": [
        {
          "_type": "block",
          "style": "h2",
          "children": [{ "_type": "span", "text": "Welcome" }]
        },
        {
          "_type": "block",
          "style": "normal",
          "children": [
            { "_type": "span", "text": "Edit " },
            { "_type": "span", "text": "dataset.json", "marks": ["code"] },
            { "_type": "span", "text": " or point the config at a hosted dataset." }
          ]
        }
      ]
    }
  ]
}
"#;

/// Initialize a new site in the given directory
///
/// Existing files are left untouched.
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("static"))?;

    write_if_missing(&target_dir.join("_config.yml"), DEFAULT_CONFIG)?;
    write_if_missing(&target_dir.join("dataset.json"), DEFAULT_DATASET)?;

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::warn!("Keeping existing {:?}", path);
        return Ok(());
    }
    fs::write(path, content)?;
    tracing::info!("Created: {:?}", path);
    Ok(())
}
