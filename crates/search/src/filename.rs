//! Filename search over host OS metadata indexes (spec.md §4.6), grounded in
//! `SpotlightAdapter`'s `mdfind` invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use context_protocol::policy;
use tokio::process::Command;
use tokio::time::timeout;

use crate::types::{paginate, MatchType, SearchRequest, SearchResponse, SearchResult, SearchType};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The OS-native metadata search boundary (spec.md §6 external tool (a)).
/// Pinned as a trait so non-macOS backends (Everything, `locate`) can be
/// swapped in without touching [`FilenameSearch`] or the hybrid planner.
#[async_trait::async_trait]
pub trait MetadataSearchTool: Send + Sync {
    async fn search(&self, query: &str, roots: &[PathBuf], timeout: Duration) -> Vec<PathBuf>;
}

/// macOS `mdfind` adapter: newline-delimited absolute paths on stdout,
/// empty result on timeout or non-zero exit.
pub struct MdfindTool;

#[async_trait::async_trait]
impl MetadataSearchTool for MdfindTool {
    async fn search(&self, query: &str, roots: &[PathBuf], duration: Duration) -> Vec<PathBuf> {
        let mut cmd = Command::new("mdfind");
        if roots.is_empty() {
            cmd.arg(query);
        } else {
            for root in roots {
                cmd.arg("-onlyin").arg(root);
            }
            cmd.arg(query);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let run = async {
            let output = cmd.output().await.ok()?;
            if !output.status.success() {
                return Some(Vec::new());
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            Some(
                stdout
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(PathBuf::from)
                    .collect(),
            )
        };

        match timeout(duration, run).await {
            Ok(Some(paths)) => paths,
            Ok(None) | Err(_) => Vec::new(),
        }
    }
}

pub struct FilenameSearch {
    tool: Box<dyn MetadataSearchTool>,
    root: PathBuf,
    allowed_list: Vec<String>,
    block_list: Vec<String>,
    timeout: Duration,
}

impl FilenameSearch {
    pub fn new(tool: Box<dyn MetadataSearchTool>, root: PathBuf, allowed_list: Vec<String>, block_list: Vec<String>) -> Self {
        Self {
            tool,
            root,
            allowed_list,
            block_list,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let (scope_roots, glob_patterns) = split_allowed_list(&self.allowed_list, &self.root);

        let found = self.tool.search(&request.query, &scope_roots, self.timeout).await;

        let filtered: Vec<PathBuf> = found
            .into_iter()
            .filter(|p| {
                let path_str = p.to_string_lossy();
                policy::admitted(&path_str, &glob_patterns, &self.block_list)
            })
            .collect();

        let total = filtered.len();
        let results: Vec<SearchResult> = filtered
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let score = if total > 0 { 1.0 - (i as f32 / total as f32) } else { 1.0 };
                let mut result = SearchResult::new(path.to_string_lossy().to_string(), score);
                result.match_type = Some(MatchType::Filename);
                result
            })
            .collect();

        let offset = request.offset();
        let page_results: Vec<SearchResult> = results.into_iter().skip(offset).take(request.size).collect();

        SearchResponse {
            query: request.query.clone(),
            page: request.page,
            size: request.size,
            total,
            search_type: SearchType::Filename,
            results: page_results,
        }
    }
}

/// Splits the allowed-list into concrete directory scopes (passed to the
/// tool as `-onlyin`-style restrictions) and glob patterns (kept for
/// post-hoc filtering), per spec.md §4.6 step 1.
fn split_allowed_list(allowed_list: &[String], default_root: &Path) -> (Vec<PathBuf>, Vec<String>) {
    let mut roots = Vec::new();
    let mut patterns = Vec::new();

    for entry in allowed_list {
        if is_glob(entry) {
            patterns.push(entry.clone());
        } else {
            roots.push(PathBuf::from(entry));
        }
    }

    // A glob-only allowed_list (e.g. `["**/*.rs"]`) still yields zero
    // concrete `-onlyin` scopes; fall back to the configured root whenever
    // there's no concrete directory to scope to, regardless of patterns.
    if roots.is_empty() {
        roots.push(default_root.to_path_buf());
    }

    (roots, patterns)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeTool(Mutex<Vec<PathBuf>>);

    #[async_trait]
    impl MetadataSearchTool for FakeTool {
        async fn search(&self, _query: &str, _roots: &[PathBuf], _timeout: Duration) -> Vec<PathBuf> {
            self.0.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn scores_decrease_with_rank() {
        let tool = FakeTool(Mutex::new(vec![
            PathBuf::from("/repo/a.rs"),
            PathBuf::from("/repo/b.rs"),
            PathBuf::from("/repo/c.rs"),
            PathBuf::from("/repo/d.rs"),
        ]));
        let search = FilenameSearch::new(Box::new(tool), PathBuf::from("/repo"), vec![], vec![]);
        let request = SearchRequest::new("rs", SearchType::Filename);

        let response = search.search(&request).await;
        assert_eq!(response.total, 4);
        assert!(response.results[0].score > response.results[1].score);
    }

    #[tokio::test]
    async fn block_list_filters_out_matches() {
        let tool = FakeTool(Mutex::new(vec![
            PathBuf::from("/repo/src/a.rs"),
            PathBuf::from("/repo/node_modules/pkg/index.js"),
        ]));
        let search = FilenameSearch::new(
            Box::new(tool),
            PathBuf::from("/repo"),
            vec![],
            vec!["**/node_modules/**".to_string()],
        );
        let request = SearchRequest::new("anything", SearchType::Filename);

        let response = search.search(&request).await;
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].path, "/repo/src/a.rs");
    }

    #[tokio::test]
    async fn pagination_slices_by_offset_and_size() {
        let paths: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("/repo/f{i}.rs"))).collect();
        let tool = FakeTool(Mutex::new(paths));
        let search = FilenameSearch::new(Box::new(tool), PathBuf::from("/repo"), vec![], vec![]);
        let mut request = SearchRequest::new("f", SearchType::Filename);
        request.page = 2;
        request.size = 3;

        let response = search.search(&request).await;
        assert_eq!(response.total, 10);
        assert_eq!(response.results.len(), 3);
    }
}
