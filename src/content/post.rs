//! Post models built from CMS documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::richtext::RichText;
use crate::cms::{CmsError, Document};

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique identifier, also the URL slug
    pub uid: String,

    /// Publication date, absent for never-published drafts
    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub summary: PostSummary,

    /// Banner image URL
    pub banner: Option<String>,

    /// Ordered content sections
    pub content: Vec<ContentSection>,

    /// Date of the latest published edit
    pub last_publication_date: Option<DateTime<Utc>>,
}

/// One section of a post: a heading over a rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    #[serde(default, deserialize_with = "text_field")]
    pub heading: String,
    #[serde(default)]
    pub body: RichText,
}

impl ContentSection {
    pub fn new(heading: &str, body: RichText) -> Self {
        Self {
            heading: heading.to_string(),
            body,
        }
    }
}

/// Custom type fields of a post document
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostFields {
    #[serde(deserialize_with = "text_field")]
    title: String,
    #[serde(deserialize_with = "text_field")]
    subtitle: String,
    #[serde(deserialize_with = "text_field")]
    author: String,
    banner: Option<Banner>,
    content: Vec<ContentSection>,
}

#[derive(Debug, Default, Deserialize)]
struct Banner {
    url: Option<String>,
}

impl PostFields {
    fn from_document(doc: &Document) -> Result<Self, CmsError> {
        if doc.data.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(doc.data.clone())?)
    }
}

impl TryFrom<&Document> for PostSummary {
    type Error = CmsError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        let fields = PostFields::from_document(doc)?;
        summary_from(doc, fields.title, fields.subtitle, fields.author)
    }
}

impl TryFrom<&Document> for PostDetail {
    type Error = CmsError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        let fields = PostFields::from_document(doc)?;
        let summary = summary_from(doc, fields.title, fields.subtitle, fields.author)?;
        Ok(Self {
            summary,
            banner: fields.banner.and_then(|b| b.url),
            content: fields.content,
            last_publication_date: doc.last_publication_date,
        })
    }
}

fn summary_from(
    doc: &Document,
    title: String,
    subtitle: String,
    author: String,
) -> Result<PostSummary, CmsError> {
    let uid = doc
        .uid
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CmsError::MissingField {
            id: doc.id.clone(),
            field: "uid",
        })?;

    Ok(PostSummary {
        uid,
        first_publication_date: doc.first_publication_date,
        title,
        subtitle,
        author,
    })
}

impl PostDetail {
    pub fn uid(&self) -> &str {
        &self.summary.uid
    }

    /// When the post was edited after its first publication
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        match (self.summary.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) if last > first => Some(last),
            _ => None,
        }
    }
}

/// Key text fields; a rich-text array is flattened to its plain text
fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrRich {
        Text(String),
        Rich(RichText),
    }

    Ok(match Option::<TextOrRich>::deserialize(deserializer)? {
        Some(TextOrRich::Text(text)) => text,
        Some(TextOrRich::Rich(rich)) => rich.as_text(),
        None => String::new(),
    })
}
