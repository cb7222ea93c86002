//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::PreviewConfig;
pub use site::PrismicConfig;
pub use site::SiteConfig;
pub use site::{ACCESS_TOKEN_ENV, API_ENDPOINT_ENV};
