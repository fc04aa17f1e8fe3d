use serde::{Deserialize, Serialize};

/// Plain page metadata: `<title>`, canonical link and bare `<meta name=...>`
/// tags. Absent fields are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Open Graph and Twitter Card fields, plus the best favicon as `logo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// An inline `<img>` resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub meta: Meta,
    pub og: OpenGraph,
    /// Document order, duplicates kept.
    pub images: Vec<ImageRef>,
}

/// Result of a single extraction.
///
/// `Empty` is returned when the input does not look like an http(s) URL and
/// serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    Page(PageMetadata),
    Empty {},
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, ExtractionResult::Empty {})
    }

    pub fn page(&self) -> Option<&PageMetadata> {
        match self {
            ExtractionResult::Page(page) => Some(page),
            ExtractionResult::Empty {} => None,
        }
    }

    pub fn into_page(self) -> Option<PageMetadata> {
        match self {
            ExtractionResult::Page(page) => Some(page),
            ExtractionResult::Empty {} => None,
        }
    }
}

impl From<PageMetadata> for ExtractionResult {
    fn from(page: PageMetadata) -> Self {
        ExtractionResult::Page(page)
    }
}
