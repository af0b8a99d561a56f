//! Fuses the filename and semantic channels (spec.md §4.7), grounded in
//! `HybridSearchAdapter`'s weighted-score merge.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use context_extract::ExtractionRouter;
use context_indexer::{BackgroundIndexer, SemanticIndexer};
use context_protocol::{Config, HybridSearchConfig};
use context_vector_store::VectorStore;
use serde_json::json;

use crate::filename::FilenameSearch;
use crate::types::{paginate, MatchType, SearchRequest, SearchResponse, SearchResult, SearchType};

const FAN_OUT_SIZE: usize = 1000;

/// What `HybridPlanner` needs to trigger the one-shot background sync
/// described in spec.md §4.7: the store to check for emptiness, and enough
/// of the original config to hand a fresh `BackgroundIndexer` its own copy.
struct AutoIndex {
    config: Config,
    extraction_router: Arc<ExtractionRouter>,
    store: Arc<dyn VectorStore>,
    triggered: AtomicBool,
}

pub struct HybridPlanner {
    filename: FilenameSearch,
    indexer: Arc<SemanticIndexer>,
    config: HybridSearchConfig,
    auto_index: Option<AutoIndex>,
}

impl HybridPlanner {
    pub fn new(filename: FilenameSearch, indexer: Arc<SemanticIndexer>, config: HybridSearchConfig) -> Self {
        Self {
            filename,
            indexer,
            config,
            auto_index: None,
        }
    }

    /// Enables spec.md §4.7's empty-store auto-index: the first `search()`
    /// call that finds the store empty spawns a background full sync over
    /// `config.root`, same as the CLI's own `sync` subcommand would run.
    /// Fires at most once per planner instance.
    pub fn with_auto_index(
        mut self,
        config: Config,
        extraction_router: Arc<ExtractionRouter>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        self.auto_index = Some(AutoIndex {
            config,
            extraction_router,
            store,
            triggered: AtomicBool::new(false),
        });
        self
    }

    async fn maybe_trigger_auto_index(&self) {
        let Some(auto_index) = &self.auto_index else {
            return;
        };
        if !auto_index.config.index.auto_index_on_search {
            return;
        }
        if auto_index.store.len().await > 0 {
            return;
        }
        if auto_index.triggered.swap(true, Ordering::SeqCst) {
            return;
        }

        log::info!("store is empty and auto_index_on_search is enabled, triggering background sync");
        BackgroundIndexer::start(
            auto_index.config.clone(),
            auto_index.extraction_router.clone(),
            auto_index.store.clone(),
            self.indexer.clone(),
            false,
        );
    }

    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        self.maybe_trigger_auto_index().await;

        if !self.config.enabled {
            return self.filename.search(request).await;
        }

        let mut filename_request = SearchRequest::new(request.query.clone(), SearchType::Filename);
        filename_request.page = 1;
        filename_request.size = FAN_OUT_SIZE;

        let (filename_response, content_results) = tokio::join!(
            self.filename.search(&filename_request),
            self.search_content(&request.query, FAN_OUT_SIZE),
        );

        let merged = self.merge(filename_response.results, content_results);
        let (total, page_results) = paginate(merged, request.page, request.size);

        SearchResponse {
            query: request.query.clone(),
            page: request.page,
            size: request.size,
            total,
            search_type: SearchType::Hybrid,
            results: page_results,
        }
    }

    async fn search_content(&self, query: &str, k: usize) -> Vec<SearchResult> {
        match self.indexer.search(query, k, None).await {
            Ok(hits) => hits
                .into_iter()
                .map(|(entry, score)| {
                    let path = entry
                        .metadata
                        .get("path")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let mut result = SearchResult::new(path, score);
                    result.snippet = Some(entry.page_content.chars().take(280).collect());
                    result.match_type = Some(MatchType::Content);
                    result
                })
                .collect(),
            Err(e) => {
                log::warn!("content search channel failed: {e}");
                Vec::new()
            }
        }
    }

    /// Weighted merge-by-path, spec.md §4.7 step 4 — one group per absolute
    /// path, highest weighted score wins when `deduplicate` is set.
    fn merge(&self, filename_results: Vec<SearchResult>, content_results: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut by_path: BTreeMap<String, Vec<SearchResult>> = BTreeMap::new();

        for mut result in filename_results {
            let original_score = result.score;
            result.score *= self.config.filename_match_weight;
            tag_source(&mut result, "filename", original_score, self.config.filename_match_weight);
            by_path.entry(result.path.clone()).or_default().push(result);
        }

        for mut result in content_results {
            let original_score = result.score;
            result.score *= self.config.content_match_weight;
            tag_source(&mut result, "content", original_score, self.config.content_match_weight);
            by_path.entry(result.path.clone()).or_default().push(result);
        }

        let mut merged: Vec<SearchResult> = Vec::with_capacity(by_path.len());

        for (_path, mut group) in by_path {
            if !self.config.deduplicate {
                merged.extend(group);
                continue;
            }

            group.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            let mut best = group.remove(0);

            if !group.is_empty() {
                let sources: Vec<String> = std::iter::once(&best)
                    .chain(group.iter())
                    .filter_map(|r| r.metadata.as_ref().and_then(|m| m.get("source")).and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect();
                let match_types: Vec<&'static str> = std::iter::once(&best)
                    .chain(group.iter())
                    .filter_map(|r| r.match_type)
                    .map(|m| match m {
                        MatchType::Filename => "filename",
                        MatchType::Content => "content",
                    })
                    .collect();

                if best.snippet.is_none() {
                    if let Some(with_snippet) = group.iter().find(|r| r.snippet.is_some()) {
                        best.snippet = with_snippet.snippet.clone();
                        best.line_number = with_snippet.line_number;
                    }
                }

                let mut metadata = best.metadata.take().unwrap_or_default();
                metadata.insert("matched_in".to_string(), json!(sources));
                metadata.insert("match_types".to_string(), json!(match_types));
                metadata.insert("combined".to_string(), json!(true));
                best.metadata = Some(metadata);
            }

            merged.push(best);
        }

        merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        merged
    }
}

fn tag_source(result: &mut SearchResult, source: &str, original_score: f32, weight: f32) {
    let mut metadata = result.metadata.take().unwrap_or_default();
    metadata.insert("original_score".to_string(), json!(original_score));
    metadata.insert("weight".to_string(), json!(weight));
    metadata.insert("source".to_string(), json!(source));
    result.metadata = Some(metadata);
}
