//! Built-in spacetravelling templates using the Tera template engine
//!
//! Templates and the stylesheet are embedded in the binary.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Stylesheet served at `/css/style.css`
pub const STYLESHEET: &str = include_str!("spacetravelling/style.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetravelling/layout.html")),
            ("index.html", include_str!("spacetravelling/index.html")),
            ("post.html", include_str!("spacetravelling/post.html")),
            ("404.html", include_str!("spacetravelling/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetravelling/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("spacetravelling/partials/post_card.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetravelling/partials/comments.html"),
            ),
        ])?;

        tera.register_filter("reading_label", reading_label_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: minutes with a singular/plural label ("1 min", "4 mins")
fn reading_label_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let minutes = tera::try_get_value!("reading_label", "value", u64, value);
    Ok(tera::Value::String(reading_label(minutes)))
}

pub fn reading_label(minutes: u64) -> String {
    if minutes > 1 {
        format!("{} mins", minutes)
    } else {
        format!("{} min", minutes)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub url: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewData {
    pub active: bool,
    pub exit_path: String,
}

/// A post in the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Display date, empty for unpublished drafts
    pub date: String,
    pub datetime: String,
}

/// The "load more" control
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadMoreData {
    /// Listing chunk fetched by the page script
    pub endpoint: Option<String>,
    /// Link used without JavaScript
    pub href: Option<String>,
}

/// One page of the listing as returned to the page script
#[derive(Debug, Clone, Serialize)]
pub struct ListingChunk {
    pub posts: Vec<PostCard>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    /// Absolute URL, empty when the site url is not configured
    pub url: String,
    pub title: String,
    pub author: String,
    pub banner: Option<String>,
    pub date: String,
    pub datetime: String,
    pub edited: Option<EditedData>,
    pub reading_time: u32,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedData {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub enabled: bool,
    pub repo: String,
    pub theme: String,
    pub label: Option<String>,
    /// Issue term; one discussion per post uid
    pub term: String,
}
