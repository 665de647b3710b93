//! ArXiv API client — search, single-paper fetch, PDF download, and Atom parsing.

use crate::error::SearchError;
use crate::paper::RawPaper;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf";
const USER_AGENT: &str = concat!("paperlens/", env!("CARGO_PKG_VERSION"));

/// Minimum spacing between requests to arXiv.
const REQUEST_SPACING: Duration = Duration::from_secs(3);

/// Sort criteria for arXiv search. Results are always returned in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriterion {
    #[default]
    Relevance,
    LastUpdated,
    Submitted,
}

impl SortCriterion {
    pub fn as_api_str(&self) -> &str {
        match self {
            SortCriterion::Relevance => "relevance",
            SortCriterion::LastUpdated => "lastUpdatedDate",
            SortCriterion::Submitted => "submittedDate",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "date" | "submitted" | "submitteddate" => SortCriterion::Submitted,
            "updated" | "lastupdated" | "lastupdateddate" => SortCriterion::LastUpdated,
            _ => SortCriterion::Relevance,
        }
    }
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub sort: SortCriterion,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn with_sort(mut self, sort: SortCriterion) -> Self {
        self.sort = sort;
        self
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: 5,
            sort: SortCriterion::Relevance,
        }
    }
}

/// Anything that can turn a query into raw paper metadata.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPaper>, SearchError>;
}

/// HTTP client for the arXiv API.
pub struct ArxivClient {
    client: reqwest::Client,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivClient {
    pub fn new() -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Request {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            last_request: Mutex::new(None),
        })
    }

    /// Enforce the minimum delay between arXiv requests.
    async fn rate_limit(&self) {
        let wait_duration = {
            let last = self.last_request.lock().unwrap_or_else(PoisonError::into_inner);
            last.and_then(|instant| REQUEST_SPACING.checked_sub(instant.elapsed()))
        }; // guard dropped before the await

        if let Some(wait) = wait_duration {
            tokio::time::sleep(wait).await;
        }

        let mut last = self.last_request.lock().unwrap_or_else(PoisonError::into_inner);
        *last = Some(Instant::now());
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SearchError> {
        self.rate_limit().await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Request {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_feed(&self, url: &str) -> Result<Vec<RawPaper>, SearchError> {
        debug!(url, "ArXiv request");
        let body = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|e| SearchError::Request {
                message: format!("Failed to read arXiv response: {}", e),
            })?;
        Ok(parse_atom_feed(&body))
    }

    /// Search arXiv; results arrive in the service's order.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPaper>, SearchError> {
        let url = build_search_url(query);
        let papers = self.get_feed(&url).await?;
        info!(query = query.query.as_str(), count = papers.len(), "ArXiv search complete");
        Ok(papers)
    }

    /// Fetch a single paper by its arXiv id.
    pub async fn fetch(&self, arxiv_id: &str) -> Result<RawPaper, SearchError> {
        let clean_id = arxiv_id.trim();
        validate_arxiv_id(clean_id)?;

        let url = format!("{}?id_list={}", ARXIV_API_BASE, urlencoding::encode(clean_id));
        self.get_feed(&url)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NotFound {
                id: clean_id.to_string(),
            })
    }

    /// Download the PDF for `arxiv_id` into `dir`, returning the written path.
    pub async fn download_pdf(&self, arxiv_id: &str, dir: &Path) -> Result<PathBuf, SearchError> {
        let clean_id = arxiv_id.trim();
        validate_arxiv_id(clean_id)?;

        let url = format!("{}/{}", ARXIV_PDF_BASE, clean_id);
        debug!(url = url.as_str(), "ArXiv PDF download");
        let bytes = self
            .get(&url)
            .await?
            .bytes()
            .await
            .map_err(|e| SearchError::Request {
                message: format!("Failed to read PDF body: {}", e),
            })?;

        if !looks_like_pdf(&bytes) {
            return Err(SearchError::NotPdf { url });
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SearchError::Write {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;

        let path = dir.join(pdf_file_name(clean_id));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SearchError::Write {
                path: path.clone(),
                message: e.to_string(),
            })?;

        info!(path = %path.display(), bytes = bytes.len(), "Downloaded PDF");
        Ok(path)
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPaper>, SearchError> {
        ArxivClient::search(self, query).await
    }
}

// ── URL Building ──────────────────────────────────────────────

/// Build the arXiv API search URL.
pub fn build_search_url(query: &SearchQuery) -> String {
    let search_query = if query.query.trim().is_empty() {
        "all:*".to_string()
    } else {
        format!("all:{}", query.query.trim())
    };

    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy={}&sortOrder=descending",
        ARXIV_API_BASE,
        urlencoding::encode(&search_query),
        query.max_results.max(1),
        query.sort.as_api_str(),
    )
}

/// File name for a downloaded PDF. Old-style ids contain a slash.
pub fn pdf_file_name(arxiv_id: &str) -> String {
    format!("{}.pdf", arxiv_id.replace('/', "_"))
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

// ── XML Parsing ───────────────────────────────────────────────

/// Parse an arXiv Atom feed into raw paper records, in feed order.
///
/// Entries without an id, title, or publication timestamp are skipped.
pub fn parse_atom_feed(xml: &str) -> Vec<RawPaper> {
    extract_entries(xml)
        .iter()
        .filter_map(|entry| {
            let paper = parse_entry(entry);
            if paper.is_none() {
                debug!("Skipping malformed Atom entry");
            }
            paper
        })
        .collect()
}

/// Extract all <entry>...</entry> blocks from the XML.
fn extract_entries(xml: &str) -> Vec<&str> {
    const START_TAG: &str = "<entry>";
    const END_TAG: &str = "</entry>";

    let mut entries = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = xml[search_from..].find(START_TAG) {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find(END_TAG) else {
            break;
        };
        let end = start + end_pos + END_TAG.len();
        entries.push(&xml[start..end]);
        search_from = end;
    }
    entries
}

/// Find each `<tag .../>` or `<tag ...>` opening tag in `xml`.
fn opening_tags<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let mut tags = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = xml[search_from..].find(&open) {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find('>') else {
            break;
        };
        let end = start + end_pos + 1;
        // `<category` must not match `<categoryfoo`
        if xml[start + open.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '/' || c == '>')
        {
            tags.push(&xml[start..end]);
        }
        search_from = end;
    }
    tags
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a single <entry> block.
fn parse_entry(entry: &str) -> Option<RawPaper> {
    let entry_id = extract_tag_text(entry, "id")?;
    let title = normalize_whitespace(&decode_entities(&extract_tag_text(entry, "title")?));
    let published = parse_timestamp(&extract_tag_text(entry, "published")?)?;
    let updated = extract_tag_text(entry, "updated")
        .and_then(|u| parse_timestamp(&u))
        .unwrap_or(published);

    let mut authors = Vec::new();
    let mut author_search = 0;
    while let Some(pos) = entry[author_search..].find("<author>") {
        let author_start = author_search + pos;
        let Some(end_pos) = entry[author_start..].find("</author>") else {
            break;
        };
        let author_end = author_start + end_pos + "</author>".len();
        if let Some(name) = extract_tag_text(&entry[author_start..author_end], "name") {
            authors.push(decode_entities(&name));
        }
        author_search = author_end;
    }

    let summary = normalize_whitespace(&decode_entities(
        &extract_tag_text(entry, "summary").unwrap_or_default(),
    ));

    let categories: Vec<String> = opening_tags(entry, "category")
        .into_iter()
        .filter_map(|tag| extract_attribute(tag, "term"))
        .collect();

    let primary_category = opening_tags(entry, "arxiv:primary_category")
        .into_iter()
        .find_map(|tag| extract_attribute(tag, "term"))
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    let pdf_url = opening_tags(entry, "link")
        .into_iter()
        .find(|tag| {
            extract_attribute(tag, "title").as_deref() == Some("pdf")
                || extract_attribute(tag, "type").as_deref() == Some("application/pdf")
        })
        .and_then(|tag| extract_attribute(tag, "href"))
        .unwrap_or_else(|| {
            let id = entry_id
                .rsplit_once("/abs/")
                .map(|(_, id)| id.to_string())
                .unwrap_or_else(|| crate::paper::canonical_id(&entry_id));
            format!("{}/{}", ARXIV_PDF_BASE, id)
        });

    Some(RawPaper {
        title,
        authors,
        summary,
        published,
        updated,
        entry_id,
        pdf_url,
        categories,
        primary_category,
    })
}

/// Extract the text content of the first occurrence of <tag>text</tag>.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let start_pos = xml.find(&open)?;
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    Some(xml[content_start..content_end].trim().to_string())
}

/// Extract an attribute value from a tag string.
pub fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!(" {}=\"", attr);
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(decode_entities(&tag[start..end]))
}

/// Decode the predefined XML entities and numeric character references.
///
/// Unknown or malformed references are kept as written.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve the body of one `&...;` reference.
fn decode_reference(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── ID Validation ─────────────────────────────────────────────

/// Validate that a string looks like an arXiv id.
///
/// Accepts the new format (`YYMM.NNNNN[vN]`) and the old format
/// (`category/NNNNNNN[vN]`).
pub fn validate_arxiv_id(id: &str) -> Result<(), SearchError> {
    let id = id.trim();
    if !id.is_empty() && (is_new_style_id(id) || is_old_style_id(id)) {
        Ok(())
    } else {
        Err(SearchError::InvalidId { id: id.to_string() })
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Split off an optional `vN` version suffix.
fn strip_version(id: &str) -> Option<&str> {
    match id.rsplit_once('v') {
        Some((base, version)) if all_digits(version) => Some(base),
        Some(_) => None,
        None => Some(id),
    }
}

fn is_new_style_id(id: &str) -> bool {
    let Some(base) = strip_version(id) else {
        return false;
    };
    match base.split_once('.') {
        Some((yymm, number)) => {
            yymm.len() == 4 && all_digits(yymm) && number.len() <= 5 && all_digits(number)
        }
        None => false,
    }
}

fn is_old_style_id(id: &str) -> bool {
    let Some((category, rest)) = id.split_once('/') else {
        return false;
    };
    let category_ok = !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    category_ok && strip_version(rest).is_some_and(all_digits)
}

// ── Tests ─────────────────────────────────────────────────────
