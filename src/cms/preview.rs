//! Preview mode - selects draft content through an explicit ref token

use percent_encoding::percent_decode_str;

/// Request-scoped preview state
///
/// Carries the ref of a preview session when one is active. Published
/// content is read at the master ref otherwise; once pinned with
/// [`PreviewContext::at_master_ref`], every query of the request reads the
/// same master ref without looking it up again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewContext {
    reference: Option<String>,
    master_ref: Option<String>,
}

impl PreviewContext {
    /// Published content only
    pub fn published() -> Self {
        Self::default()
    }

    /// Read content at the given preview ref
    pub fn with_ref(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Self::default();
        }
        Self {
            reference: Some(reference),
            master_ref: None,
        }
    }

    /// Pin the master ref published content is read at
    pub fn at_master_ref(mut self, master_ref: impl Into<String>) -> Self {
        self.master_ref = Some(master_ref.into());
        self
    }

    /// The preview ref, when preview mode is active
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// The ref queries read at: the preview ref, else the pinned master ref
    pub fn content_ref(&self) -> Option<&str> {
        self.reference.as_deref().or(self.master_ref.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.reference.is_some()
    }

    /// Extract the preview ref from a `Cookie` request header
    ///
    /// The cookie value is URL-encoded and is either the ref itself or the
    /// toolbar's JSON form `{"<repo>.prismic.io": {"preview": "<ref>"}}`.
    pub fn from_cookie_header(header: &str, cookie_name: &str) -> Self {
        let raw = header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == cookie_name).then_some(value)
        });

        let Some(raw) = raw else {
            return Self::default();
        };

        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        let decoded = decoded.trim_matches('"');

        if decoded.starts_with('{') {
            match serde_json::from_str::<serde_json::Value>(decoded) {
                Ok(serde_json::Value::Object(repos)) => repos
                    .values()
                    .find_map(|v| v.get("preview").and_then(|p| p.as_str()))
                    .map(Self::with_ref)
                    .unwrap_or_default(),
                _ => {
                    tracing::warn!("Ignoring malformed preview cookie");
                    Self::default()
                }
            }
        } else {
            Self::with_ref(decoded)
        }
    }
}
