//! Typed document queries, rendered to Prismic predicate syntax

use chrono::{DateTime, Utc};

/// Publication date every listing is ordered by
pub const PUBLICATION_DATE: &str = "document.first_publication_date";

/// Ordering direction on the publication date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// A search over documents of one custom type
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub document_type: String,
    /// Only documents published strictly before this instant
    pub published_before: Option<DateTime<Utc>>,
    /// Only documents published strictly after this instant
    pub published_after: Option<DateTime<Utc>>,
    /// Leave out the document with this uid
    pub exclude_uid: Option<String>,
    pub direction: Direction,
    pub page_size: usize,
    pub page: usize,
}

impl Query {
    /// Newest-first listing of every document of a type
    pub fn documents(document_type: &str) -> Self {
        Self {
            document_type: document_type.to_string(),
            published_before: None,
            published_after: None,
            exclude_uid: None,
            direction: Direction::Desc,
            page_size: 20,
            page: 1,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn ordered(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn before(mut self, date: DateTime<Utc>) -> Self {
        self.published_before = Some(date);
        self
    }

    pub fn after(mut self, date: DateTime<Utc>) -> Self {
        self.published_after = Some(date);
        self
    }

    pub fn excluding(mut self, uid: &str) -> Self {
        self.exclude_uid = Some(uid.to_string());
        self
    }

    /// The `q` parameter: every predicate wrapped in one outer list
    pub fn predicates(&self) -> String {
        let mut preds = vec![format!(
            r#"[at(document.type, "{}")]"#,
            escape(&self.document_type)
        )];
        if let Some(date) = self.published_before {
            preds.push(format!(
                "[date.before({}, {})]",
                PUBLICATION_DATE,
                date.timestamp_millis()
            ));
        }
        if let Some(date) = self.published_after {
            preds.push(format!(
                "[date.after({}, {})]",
                PUBLICATION_DATE,
                date.timestamp_millis()
            ));
        }
        if let Some(uid) = &self.exclude_uid {
            preds.push(format!(
                r#"[not(my.{}.uid, "{}")]"#,
                self.document_type,
                escape(uid)
            ));
        }
        format!("[{}]", preds.concat())
    }

    /// The `orderings` parameter
    pub fn orderings(&self) -> String {
        match self.direction {
            Direction::Asc => format!("[{}]", PUBLICATION_DATE),
            Direction::Desc => format!("[{} desc]", PUBLICATION_DATE),
        }
    }

    /// Query-string parameters, without `ref` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.predicates()),
            ("orderings", self.orderings()),
            ("pageSize", self.page_size.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

/// Predicate lookup of one document by uid
pub(crate) fn uid_predicate(document_type: &str, uid: &str) -> String {
    format!(
        r#"[[at(my.{}.uid, "{}")]]"#,
        document_type,
        escape(uid)
    )
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
