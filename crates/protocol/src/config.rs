use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_debounce_ms() -> u64 {
    750
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f32 {
    1.0
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    150
}

/// Indexing behavior: watcher cadence, size caps, auto-index-on-search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub db_path: PathBuf,
    pub enable_watcher: bool,
    pub debounce_ms: u64,
    pub max_file_size: u64,
    pub auto_index_on_search: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("index.json"),
            enable_watcher: true,
            debounce_ms: default_debounce_ms(),
            max_file_size: default_max_file_size(),
            auto_index_on_search: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "bge-small-en-v1.5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub use_ast_chunks: bool,
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            use_ast_chunks: true,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                ", ".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub allowed_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub extraction: ExtractionConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchConfig {
    pub enabled: bool,
    pub filename_match_weight: f32,
    pub content_match_weight: f32,
    pub deduplicate: bool,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename_match_weight: default_weight(),
            content_match_weight: default_weight(),
            deduplicate: true,
        }
    }
}

/// Top-level configuration, the single value threaded through constructors.
///
/// No process-wide mutable singleton: callers load a `Config` once (see
/// [`Config::load`]) and pass it explicitly to every component that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: PathBuf,
    pub allowed_list: Vec<String>,
    pub block_list: Vec<String>,
    pub text_extensions: Vec<String>,
    pub index: IndexConfig,
    pub indexer: IndexerConfig,
    pub hybrid_search: HybridSearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default(),
            allowed_list: Vec::new(),
            block_list: Vec::new(),
            text_extensions: default_text_extensions(),
            index: IndexConfig::default(),
            indexer: IndexerConfig::default(),
            hybrid_search: HybridSearchConfig::default(),
        }
    }
}

fn default_text_extensions() -> Vec<String> {
    [
        ".txt", ".md", ".rst", ".rs", ".py", ".js", ".ts", ".tsx", ".jsx", ".go", ".java", ".c",
        ".cpp", ".h", ".hpp", ".rb", ".php", ".json", ".toml", ".yaml", ".yml",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path} as TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist, then overlay an env-provided allow-list.
    ///
    /// Mirrors the original `ConfigManager`: a `SEARCH_ALLOWED_LIST`
    /// environment variable (comma-separated paths) is merged into whatever
    /// the file specifies rather than replacing it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Config::default()
        };

        config.overlay_env_allowed_list();
        Ok(config)
    }

    fn overlay_env_allowed_list(&mut self) {
        let Ok(raw) = std::env::var("SEARCH_ALLOWED_LIST") else {
            return;
        };
        for entry in raw.split(',') {
            let trimmed = entry.trim();
            if !trimmed.is_empty() && !self.allowed_list.iter().any(|p| p == trimmed) {
                self.allowed_list.push(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_defaults_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.index.debounce_ms, 750);
        assert!(config.hybrid_search.enabled);
    }

    #[test]
    fn parses_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(
            &path,
            r#"
root = "/tmp/project"
allowed_list = ["src"]

[hybrid_search]
filename_match_weight = 2.0
content_match_weight = 0.5
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.root, PathBuf::from("/tmp/project"));
        assert_eq!(config.allowed_list, vec!["src".to_string()]);
        assert_eq!(config.hybrid_search.filename_match_weight, 2.0);
        assert_eq!(config.hybrid_search.content_match_weight, 0.5);
    }

    #[test]
    fn env_allowed_list_merges_with_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(&path, "allowed_list = [\"src\"]\n").unwrap();

        std::env::set_var("SEARCH_ALLOWED_LIST", "docs, src");
        let config = Config::load(&path).unwrap();
        std::env::remove_var("SEARCH_ALLOWED_LIST");

        assert!(config.allowed_list.contains(&"src".to_string()));
        assert!(config.allowed_list.contains(&"docs".to_string()));
        assert_eq!(config.allowed_list.len(), 2);
    }
}
