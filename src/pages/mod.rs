//! Page rendering shared by static generation and the server
//!
//! Turns content models into template data and renders the templates.

use anyhow::Result;
use tera::Context;

use crate::cms::PreviewContext;
use crate::config::SiteConfig;
use crate::content::{reading_time, NavPost, Neighbors, PostDetail, PostSummary};
use crate::helpers::{date_xml, display_date, display_time, full_url_for, post_path};
use crate::templates::{
    CommentsData, EditedData, LoadMoreData, NavLink, PostCard, PostView, PreviewData,
    SectionView, SiteData, TemplateRenderer,
};

/// Route that leaves preview mode
pub const EXIT_PREVIEW_PATH: &str = "/api/exit-preview";

/// Renders the blog's pages for one site configuration
pub struct PageRenderer {
    config: SiteConfig,
    templates: TemplateRenderer,
}

impl PageRenderer {
    pub fn new(config: SiteConfig) -> Result<Self> {
        Ok(Self {
            config,
            templates: TemplateRenderer::new()?,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// The home page listing
    pub fn home(
        &self,
        posts: &[PostSummary],
        load_more: LoadMoreData,
        preview: &PreviewContext,
    ) -> Result<String> {
        let cards: Vec<PostCard> = posts.iter().map(|p| self.post_card(p)).collect();

        let mut context = self.base_context(preview);
        context.insert("posts", &cards);
        context.insert("load_more", &load_more);
        self.templates.render("index.html", &context)
    }

    /// A post page
    pub fn post(
        &self,
        post: &PostDetail,
        neighbors: &Neighbors,
        preview: &PreviewContext,
    ) -> Result<String> {
        let mut context = self.base_context(preview);
        context.insert("post", &self.post_view(post));
        context.insert("nav", &nav_data(neighbors));
        context.insert("comments", &self.comments_data(post.uid()));
        self.templates.render("post.html", &context)
    }

    /// The page shown for an unknown post
    pub fn not_found(&self, preview: &PreviewContext) -> Result<String> {
        self.templates
            .render("404.html", &self.base_context(preview))
    }

    /// Listing entry for one post
    pub fn post_card(&self, post: &PostSummary) -> PostCard {
        let (date, datetime) = self.dates(post);
        PostCard {
            uid: post.uid.clone(),
            path: post_path(&post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date,
            datetime,
        }
    }

    fn post_view(&self, post: &PostDetail) -> PostView {
        let (date, datetime) = self.dates(&post.summary);
        let edited = post.edited_at().map(|at| EditedData {
            date: display_date(&self.config, &at),
            time: display_time(&self.config, &at),
        });

        let url = if self.config.url.is_empty() {
            String::new()
        } else {
            full_url_for(&self.config, &post_path(post.uid()))
        };

        PostView {
            uid: post.summary.uid.clone(),
            url,
            title: post.summary.title.clone(),
            author: post.summary.author.clone(),
            banner: post.banner.clone(),
            date,
            datetime,
            edited,
            reading_time: reading_time(&post.content, self.config.words_per_minute),
            sections: post
                .content
                .iter()
                .map(|s| SectionView {
                    heading: s.heading.clone(),
                    html: s.body.as_html(),
                })
                .collect(),
        }
    }

    fn dates(&self, post: &PostSummary) -> (String, String) {
        match &post.first_publication_date {
            Some(at) => (display_date(&self.config, at), date_xml(at)),
            None => (String::new(), String::new()),
        }
    }

    fn comments_data(&self, uid: &str) -> CommentsData {
        let comments = &self.config.comments;
        CommentsData {
            enabled: comments.enabled(),
            repo: comments.repo.clone().unwrap_or_default(),
            theme: comments.theme.clone(),
            label: comments.label.clone(),
            term: uid.to_string(),
        }
    }

    fn base_context(&self, preview: &PreviewContext) -> Context {
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: self.config.title.clone(),
                description: self.config.description.clone(),
                url: self.config.url.clone(),
                language: self.config.language.clone(),
            },
        );
        context.insert(
            "preview",
            &PreviewData {
                active: preview.is_active(),
                exit_path: EXIT_PREVIEW_PATH.to_string(),
            },
        );
        context
    }
}

#[derive(serde::Serialize)]
struct NavData {
    prev: Option<NavLink>,
    next: Option<NavLink>,
}

fn nav_data(neighbors: &Neighbors) -> NavData {
    let link = |nav: &NavPost| NavLink {
        title: nav.title.clone(),
        path: post_path(&nav.uid),
    };
    NavData {
        prev: neighbors.prev.as_ref().map(link),
        next: neighbors.next.as_ref().map(link),
    }
}
