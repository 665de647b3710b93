//! Canonical paper record and the mapping from raw search results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Prefix that marks a failed analysis in a record's `analysis` field.
pub const ERROR_SENTINEL_PREFIX: &str = "Error: ";

/// A raw metadata record as yielded by the search collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Entry URI, e.g. `http://arxiv.org/abs/1706.03762v7`.
    pub entry_id: String,
    pub pdf_url: String,
    pub categories: Vec<String>,
    pub primary_category: String,
}

/// One retrieved publication in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "summary")]
    pub r#abstract: String,
    pub published: NaiveDate,
    pub updated: NaiveDate,
    #[serde(rename = "arxiv_id")]
    pub id: String,
    pub pdf_url: String,
    pub categories: Vec<String>,
    pub primary_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<String>,
}

impl PaperRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let epoch = NaiveDate::default();
        Self {
            title: title.into(),
            authors: Vec::new(),
            r#abstract: String::new(),
            published: epoch,
            updated: epoch,
            id: id.into(),
            pdf_url: String::new(),
            categories: Vec::new(),
            primary_category: String::new(),
            analysis: None,
        }
    }

    pub fn authors_str(&self) -> String {
        self.authors.join(", ")
    }

    pub fn categories_str(&self) -> String {
        self.categories.join(", ")
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    /// Replace the analysis wholesale.
    pub fn set_analysis(&mut self, analysis: impl Into<String>) {
        self.analysis = Some(analysis.into());
    }

    /// Return a copy of this record carrying `analysis`.
    pub fn with_analysis(&self, analysis: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.set_analysis(analysis);
        copy
    }

    /// Attach an error sentinel (`"Error: <reason>"`) in place of analysis text.
    pub fn with_error(&self, reason: impl std::fmt::Display) -> Self {
        self.with_analysis(error_sentinel(reason))
    }

    /// Whether the analysis field holds an error sentinel.
    pub fn has_failed_analysis(&self) -> bool {
        self.analysis
            .as_deref()
            .is_some_and(|a| a.starts_with(ERROR_SENTINEL_PREFIX))
    }
}

impl From<RawPaper> for PaperRecord {
    fn from(raw: RawPaper) -> Self {
        let mut categories: Vec<String> = Vec::with_capacity(raw.categories.len());
        for category in raw.categories {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        Self {
            id: canonical_id(&raw.entry_id),
            title: raw.title,
            authors: raw.authors,
            r#abstract: raw.summary,
            published: raw.published.date_naive(),
            updated: raw.updated.date_naive(),
            pdf_url: raw.pdf_url,
            categories,
            primary_category: raw.primary_category,
            analysis: None,
        }
    }
}

/// Derive the canonical identifier from an entry URI: its final path segment.
///
/// `http://arxiv.org/abs/2301.12345v2` → `2301.12345v2`. Old-style ids such as
/// `hep-th/9901001v1` keep only the trailing segment, matching what the search
/// service reports as the entry's short id.
pub fn canonical_id(entry_id: &str) -> String {
    let trimmed = entry_id.trim().trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

/// Render the error sentinel for a failure reason.
pub fn error_sentinel(reason: impl std::fmt::Display) -> String {
    format!("{}{}", ERROR_SENTINEL_PREFIX, reason)
}
