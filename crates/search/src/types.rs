//! Wire types for search requests/responses (spec.md §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Filename,
    Content,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Filename,
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub page: usize,
    pub size: usize,
    pub search_type: SearchType,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            page: 1,
            size: 20,
            search_type,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub score: f32,
    pub snippet: Option<String>,
    pub line_number: Option<usize>,
    pub match_type: Option<MatchType>,
    pub metadata: Option<BTreeMap<String, JsonValue>>,
}

impl SearchResult {
    pub fn new(path: impl Into<String>, score: f32) -> Self {
        Self {
            path: path.into(),
            score,
            snippet: None,
            line_number: None,
            match_type: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub search_type: SearchType,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn empty(query: impl Into<String>, page: usize, size: usize, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            page,
            size,
            total: 0,
            search_type,
            results: Vec::new(),
        }
    }
}

/// Paginates an already-sorted, already-filtered result set, computing
/// `total` from the pre-pagination length (spec.md §9's pinning of the
/// hybrid `total` field generalizes to every channel).
pub fn paginate(results: Vec<SearchResult>, page: usize, size: usize) -> (usize, Vec<SearchResult>) {
    let total = results.len();
    let offset = page.saturating_sub(1) * size;
    let page_results = results.into_iter().skip(offset).take(size).collect();
    (total, page_results)
}
