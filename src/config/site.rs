//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Environment variable overriding `prismic.endpoint`
pub const API_ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,
    pub url: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Date / Time format (chrono strftime)
    pub date_format: String,
    pub time_format: String,

    // Listing
    pub per_page: usize,
    pub words_per_minute: usize,

    // Content source
    #[serde(default)]
    pub prismic: PrismicConfig,

    // Comments widget
    #[serde(default)]
    pub comments: CommentsConfig,

    // Preview mode
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetravelling".to_string(),
            description: String::new(),
            language: "pt_BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            url: "http://localhost:3000".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            date_format: "%d %b %Y".to_string(),
            time_format: "%H:%M".to_string(),

            per_page: 5,
            words_per_minute: 200,

            prismic: PrismicConfig::default(),
            comments: CommentsConfig::default(),
            preview: PreviewConfig::default(),
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

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                self.prismic.access_token = Some(token);
            }
        }
        if let Ok(endpoint) = std::env::var(API_ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                tracing::debug!("Using API endpoint from {}", API_ENDPOINT_ENV);
                self.prismic.endpoint = endpoint;
            }
        }
    }

    /// Timezone used for displayed dates, UTC when unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone {:?}, falling back to UTC", self.timezone);
            chrono_tz::UTC
        })
    }
}

/// Headless CMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of blog posts
    pub document_type: String,
    pub timeout_secs: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            timeout_secs: 30,
        }
    }
}

/// utterances comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// GitHub repository (`owner/name`) holding the comment issues
    pub repo: Option<String>,
    pub theme: String,
    pub label: Option<String>,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: None,
            theme: "github-dark".to_string(),
            label: None,
        }
    }
}

impl CommentsConfig {
    pub fn enabled(&self) -> bool {
        self.repo.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Preview mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub cookie_name: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cookie_name: "io.prismic.preview".to_string(),
        }
    }
}
