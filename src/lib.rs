//! spacetravelling: a blog front-end for a headless CMS
//!
//! Posts are read from a Prismic repository and rendered with embedded Tera
//! templates, either into a static site or on demand by the built-in server.

pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod pages;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use cms::{ContentSource, PrismicClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
    /// Static assets copied into the output
    pub static_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new blog from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a blog rooted at `base_dir` with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        }
    }

    /// The configured CMS
    pub fn content_source(&self) -> Result<Arc<dyn ContentSource>> {
        if self.config.prismic.endpoint.is_empty() {
            anyhow::bail!(
                "No content source configured: set prismic.endpoint in _config.yml or {}",
                config::API_ENDPOINT_ENV
            );
        }
        Ok(Arc::new(PrismicClient::new(&self.config.prismic)?))
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
