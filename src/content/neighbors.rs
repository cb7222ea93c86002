//! Previous / next post lookup by publication date

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::PostSummary;
use crate::cms::{CmsError, ContentSource, Direction, PreviewContext, Query, SearchResponse};

/// Same-second posts considered when breaking publication date ties
const TIE_PAGE_SIZE: usize = 100;

/// Link to a neighboring post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
}

/// The posts published immediately before and after a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Neighbors {
    pub prev: Option<NavPost>,
    pub next: Option<NavPost>,
}

/// Find the neighbors of the post `uid` published at `published_at`
///
/// Runs two independent single-result queries, one per side, plus a lookup
/// of posts published in the same second. Posts are ordered by publication
/// date, then by uid, so same-second posts still link to each other.
/// Nothing ties the queries to the same content revision. A post without a
/// publication date has no neighbors.
pub async fn find_neighbors<S>(
    source: &S,
    document_type: &str,
    uid: &str,
    published_at: Option<DateTime<Utc>>,
    preview: &PreviewContext,
) -> Result<Neighbors, CmsError>
where
    S: ContentSource + ?Sized,
{
    let Some(published_at) = published_at else {
        return Ok(Neighbors::default());
    };

    let prev_query = Query::documents(document_type)
        .before(published_at)
        .excluding(uid)
        .ordered(Direction::Desc)
        .page_size(1);
    let next_query = Query::documents(document_type)
        .after(published_at)
        .excluding(uid)
        .ordered(Direction::Asc)
        .page_size(1);
    let tie_query = Query::documents(document_type)
        .after(published_at - Duration::milliseconds(1))
        .before(published_at + Duration::milliseconds(1))
        .excluding(uid)
        .ordered(Direction::Asc)
        .page_size(TIE_PAGE_SIZE);

    let (prev, next, ties) = tokio::try_join!(
        source.query(&prev_query, preview),
        source.query(&next_query, preview),
        source.query(&tie_query, preview)
    )?;

    let ties = summaries(ties)?;
    let tie_prev = ties
        .iter()
        .filter(|p| p.uid.as_str() < uid)
        .max_by(|a, b| a.uid.cmp(&b.uid));
    let tie_next = ties
        .iter()
        .filter(|p| p.uid.as_str() > uid)
        .min_by(|a, b| a.uid.cmp(&b.uid));

    Ok(Neighbors {
        prev: match tie_prev {
            Some(post) => Some(nav(post)),
            None => summaries(prev)?.first().map(nav),
        },
        next: match tie_next {
            Some(post) => Some(nav(post)),
            None => summaries(next)?.first().map(nav),
        },
    })
}

fn summaries(response: SearchResponse) -> Result<Vec<PostSummary>, CmsError> {
    response.results.iter().map(PostSummary::try_from).collect()
}

fn nav(post: &PostSummary) -> NavPost {
    NavPost {
        uid: post.uid.clone(),
        title: post.title.clone(),
    }
}
