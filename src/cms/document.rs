//! Wire types of the Prismic REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API root response, lists the refs content can be read at
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    /// The ref of the currently published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

/// One page of a document search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub page: u32,
    pub results_per_page: u32,
    pub results_size: u32,
    pub total_results_size: u32,
    pub total_pages: u32,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// A CMS document; `data` holds the custom type's fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub document_type: String,
    #[serde(default, with = "publication_date")]
    pub first_publication_date: Option<DateTime<Utc>>,
    #[serde(default, with = "publication_date")]
    pub last_publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Prismic timestamps look like `2021-03-15T19:25:28+0000`
mod publication_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => DateTime::parse_from_str(&s, FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(&s))
                .map(|d| Some(d.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}
