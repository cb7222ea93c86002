//! Content module - post models and the transforms applied to fetched documents

mod feed;
mod neighbors;
mod pagination;
mod post;
mod reading_time;
mod richtext;

pub use feed::PostFeed;
pub use neighbors::{find_neighbors, NavPost, Neighbors};
pub use pagination::PostPagination;
pub use post::{ContentSection, PostDetail, PostSummary};
pub use reading_time::{estimate, reading_time, word_count};
pub use richtext::{Block, RichText, Span};
