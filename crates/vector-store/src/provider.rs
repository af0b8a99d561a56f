//! Embedding provider: the abstract boundary spec.md §4.3/§6 calls out as
//! "embedding backend (local or remote) exposing `embed(list<string>) ->
//! list<vector>`". One concrete adapter is provided, [`OnnxEmbeddingProvider`],
//! running a sentence-embedding ONNX model via `ort` + `tokenizers` — the
//! same stack the teacher uses for its own embedding backend, trimmed of the
//! teacher's multi-model registry and CUDA execution-provider selection
//! (out of scope for this system's "interface + one adapter" sizing).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::error::{Result, VectorStoreError};

/// Maps a batch of strings to fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct ModelManifest {
    dimension: usize,
    max_length: usize,
    #[serde(default = "default_max_batch")]
    max_batch: usize,
}

fn default_max_batch() -> usize {
    32
}

struct OnnxBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

/// Loads a single sentence-embedding model (`model.onnx` + `tokenizer.json`
/// + `manifest.json` describing its dimension) from a directory and serves
/// `embed()` batches through it. The model is loaded lazily on first use and
/// kept for the provider's lifetime; there is no multi-model hot-swap here —
/// a deployment that needs one runs multiple providers.
pub struct OnnxEmbeddingProvider {
    model_dir: PathBuf,
    backend: OnceLock<Result<OnnxBackend>>,
}

impl OnnxEmbeddingProvider {
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            backend: OnceLock::new(),
        }
    }

    fn backend(&self) -> Result<&OnnxBackend> {
        let result = self
            .backend
            .get_or_init(|| Self::load(&self.model_dir).map_err(|e| e));
        match result {
            Ok(backend) => Ok(backend),
            Err(e) => Err(VectorStoreError::EmbeddingError(e.to_string())),
        }
    }

    fn load(model_dir: &Path) -> Result<OnnxBackend> {
        let manifest_path = model_dir.join("manifest.json");
        let raw = std::fs::read_to_string(&manifest_path).map_err(|e| {
            VectorStoreError::EmbeddingError(format!(
                "failed to read model manifest {}: {e}",
                manifest_path.display()
            ))
        })?;
        let manifest: ModelManifest = serde_json::from_str(&raw).map_err(|e| {
            VectorStoreError::EmbeddingError(format!("invalid model manifest: {e}"))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VectorStoreError::EmbeddingError(format!("tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: manifest.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| VectorStoreError::EmbeddingError(format!("tokenizer truncation: {e}")))?;

        let session = Session::builder()
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("failed to load ONNX model: {e}"))
            })?;

        Ok(OnnxBackend {
            session: Mutex::new(session),
            tokenizer,
            max_length: manifest.max_length,
            max_batch: manifest.max_batch,
            dimension: manifest.dimension,
        })
    }
}

impl OnnxBackend {
    fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("tokenize failed: {e}")))?;
            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len().min(self.max_length);
            let mut ids = Vec::with_capacity(batch.len() * seq_len);
            let mut masks = Vec::with_capacity(batch.len() * seq_len);
            let mut mask_rows = Vec::with_capacity(batch.len());
            for encoding in &encodings {
                let e_ids = encoding.get_ids();
                let e_masks = encoding.get_attention_mask();
                let mut row = Vec::with_capacity(seq_len);
                for idx in 0..seq_len {
                    ids.push(i64::from(*e_ids.get(idx).unwrap_or(&0)));
                    let m = i64::from(*e_masks.get(idx).unwrap_or(&0));
                    masks.push(m);
                    row.push(m);
                }
                mask_rows.push(row);
            }

            let batch_len = batch.len();
            let ids_tensor = Tensor::from_array(([batch_len, seq_len], ids.into_boxed_slice()))
                .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;
            let mask_tensor = Tensor::from_array(([batch_len, seq_len], masks.into_boxed_slice()))
                .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;

            let (shape, data) = {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| VectorStoreError::EmbeddingError("session lock poisoned".into()))?;

                let inputs = ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor,
                ]
                .map_err(|e| VectorStoreError::EmbeddingError(format!("input binding failed: {e}")))?;

                let outputs = session
                    .run(inputs)
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("forward failed: {e}")))?;
                if outputs.len() == 0 {
                    return Err(VectorStoreError::EmbeddingError(
                        "model returned no outputs".to_string(),
                    ));
                }
                let (shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("decode failed: {e}")))?;
                (shape.to_vec(), data.to_vec())
            };

            out.extend(pool_and_normalize(&shape, &data, &mask_rows, self.dimension)?);
        }
        Ok(out)
    }
}

/// Mean-pools `data` (flattened in row-major order per `shape`) over the
/// token axis, masking out padding, and L2-normalizes each resulting vector.
/// `shape` is either `[batch, hidden]` (model already pooled) or
/// `[batch, seq_len, hidden]` (raw token embeddings).
fn pool_and_normalize(
    shape: &[i64],
    data: &[f32],
    mask_rows: &[Vec<i64>],
    expected_dim: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match shape {
        [batch, hidden] => {
            let (batch, hidden) = (*batch as usize, *hidden as usize);
            for row in data.chunks(hidden).take(batch) {
                let mut v = row.to_vec();
                check_dimension(&v, expected_dim)?;
                normalize(&mut v);
                out.push(v);
            }
        }
        [batch, seq_len, hidden] => {
            let (batch, seq_len, hidden) = (*batch as usize, *seq_len as usize, *hidden as usize);
            for (idx, sample) in data.chunks(seq_len * hidden).take(batch).enumerate() {
                let mask = mask_rows.get(idx).cloned().unwrap_or_default();
                let mut sum = vec![0.0f32; hidden];
                let mut count = 0.0f32;
                for (token_idx, token) in sample.chunks(hidden).enumerate() {
                    if *mask.get(token_idx).unwrap_or(&0) == 0 {
                        continue;
                    }
                    count += 1.0;
                    for (d, value) in token.iter().enumerate() {
                        sum[d] += value;
                    }
                }
                if count > 0.0 {
                    for v in &mut sum {
                        *v /= count;
                    }
                }
                check_dimension(&sum, expected_dim)?;
                normalize(&mut sum);
                out.push(sum);
            }
        }
        other => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "unexpected model output shape {other:?}"
            )))
        }
    }
    Ok(out)
}

fn check_dimension(v: &[f32], expected: usize) -> Result<()> {
    if v.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: v.len(),
        });
    }
    Ok(())
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in v {
            *value /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.backend()?.embed_blocking(texts)
    }

    fn dimension(&self) -> usize {
        self.backend().map(|b| b.dimension).unwrap_or(0)
    }
}

/// Deterministic hash-based embedding used by tests and by callers running
/// without a downloaded model (`CONTEXT_EMBEDDING_MODE=stub`, mirroring the
/// teacher's own stub mode).
pub struct StubEmbeddingProvider {
    dimension: usize,
}

impl StubEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| stub_embed(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state = fnv1a_64(text.as_bytes());
    let mut v = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        state = splitmix64(state);
        let unit = ((state >> 40) as f32) / (1u64 << 24) as f32;
        v.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut v);
    v
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embed_is_deterministic_and_normalized() {
        let provider = StubEmbeddingProvider::new(16);
        let a = provider.embed(&["hello world".to_string()]).await.unwrap();
        let b = provider.embed(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn stub_embed_differs_for_different_text() {
        let provider = StubEmbeddingProvider::new(8);
        let a = provider.embed(&["alpha".to_string()]).await.unwrap();
        let b = provider.embed(&["beta".to_string()]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let provider = StubEmbeddingProvider::new(8);
        let out = provider.embed(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
