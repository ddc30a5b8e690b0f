//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,
    pub datetime_format: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Medium Memes".to_string(),
            description: "A place to create, enjoy and share memes.".to_string(),
            language: "en".to_string(),
            timezone: String::new(),
            datetime_format: "M/D/YYYY, h:mm:ss A".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            content: ContentConfig::default(),
            comments: CommentsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `SANITY_*` environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project_id) = lookup("SANITY_PROJECT_ID").filter(|v| !v.is_empty()) {
            self.content.project_id = project_id;
        }
        if let Some(dataset) = lookup("SANITY_DATASET").filter(|v| !v.is_empty()) {
            self.content.dataset = dataset;
        }
        if self.content.token.is_none() {
            self.content.token = lookup("SANITY_API_TOKEN").filter(|v| !v.is_empty());
        }
    }

    /// Parsed display timezone, UTC when unset or unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        if self.timezone.is_empty() {
            return chrono_tz::UTC;
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Unknown timezone {:?}, falling back to UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }
}

/// Hosted content store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    /// Overrides `https://{project_id}.api.sanity.io`
    pub api_host: Option<String>,
    /// Write token, needed only for comment mutations
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Local JSON dataset used instead of the hosted API
    pub fixtures: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: true,
            api_host: None,
            token: None,
            fixtures: None,
            timeout_secs: 10,
        }
    }
}

/// When a finished intake request counts as accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptancePolicy {
    /// Any completed request is accepted, whatever its status
    Transport,
    /// The intake must answer with a 2xx status
    #[default]
    Status,
}

/// Comment intake settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// Remote intake URL; the in-process intake is used when unset
    pub endpoint: Option<String>,
    pub acceptance: AcceptancePolicy,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub revalidate_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            revalidate_secs: 60,
        }
    }
}
