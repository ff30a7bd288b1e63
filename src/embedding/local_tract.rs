//! Tract-based local embedding (fallback for musl and Intel Mac).
//!
//! Pure-Rust path: loads the ONNX model with tract-onnx, tokenizes with the
//! tokenizers crate, runs inference in spawn_blocking. No ONNX Runtime or
//! system deps.
#![cfg_attr(
    all(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract"),
    allow(dead_code)
)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tract_onnx::prelude::*;

use super::{normalize_l2, EmbeddingProvider};

const ALL_MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const ALL_MINILM_DIMS: usize = 384;
const DEFAULT_MAX_LEN: usize = 256;

type Plan = TypedRunnableModel<TypedModel>;

struct Loaded {
    plan: Plan,
    tokenizer: tokenizers::Tokenizer,
}

/// A loaded tract model and tokenizer.
pub struct TractProvider {
    inner: Arc<Mutex<Loaded>>,
    model_name: String,
    dims: usize,
    batch_size: usize,
}

/// Model manifest: name -> (onnx path in repo, tokenizer path in repo, dims).
fn model_manifest(model_name: &str) -> Result<(&'static str, &'static str, usize)> {
    match model_name {
        "all-minilm-l6-v2" => Ok(("onnx/model.onnx", "tokenizer.json", ALL_MINILM_DIMS)),
        _ => bail!(
            "Tract backend supports only all-minilm-l6-v2 for now. Requested: '{}'",
            model_name
        ),
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(base)
        .join(".cache")
        .join("convkit")
        .join("models");
    std::fs::create_dir_all(&dir).map_err(|e| anyhow::anyhow!("Create cache dir: {}", e))?;
    Ok(dir)
}

fn download_to_cache(repo: &str, path: &str, cache_path: &Path) -> Result<()> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        path.replace(' ', "%20")
    );
    tracing::info!(%url, "downloading model file");
    let resp = reqwest::blocking::get(&url)
        .map_err(|e| anyhow::anyhow!("Download {}: {}", url, e))?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download {}: {}", url, e))?;
    let bytes = resp
        .bytes()
        .map_err(|e| anyhow::anyhow!("Read body: {}", e))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Create cache parent: {}", e))?;
    }
    std::fs::write(cache_path, &bytes).map_err(|e| anyhow::anyhow!("Write cache: {}", e))?;
    Ok(())
}

/// Ensure model and tokenizer are in cache; return (onnx path, tokenizer path).
fn ensure_cached(model_name: &str) -> Result<(PathBuf, PathBuf)> {
    let (onnx_rel, tokenizer_rel, _) = model_manifest(model_name)?;
    let model_dir = cache_dir()?.join(model_name);
    let onnx_path = model_dir.join(onnx_rel);
    let tokenizer_path = model_dir.join(tokenizer_rel);
    download_to_cache(ALL_MINILM_REPO, onnx_rel, &onnx_path)?;
    download_to_cache(ALL_MINILM_REPO, tokenizer_rel, &tokenizer_path)?;
    Ok((onnx_path, tokenizer_path))
}

/// Locate `model.onnx` and `tokenizer.json` in a fine-tuned export directory.
fn local_files(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    if !dir.is_dir() {
        bail!("Fine-tuned model directory not found: {}", dir.display());
    }
    let onnx = [dir.join("model.onnx"), dir.join("onnx").join("model.onnx")]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow::anyhow!("No model.onnx in {}", dir.display()))?;
    let tokenizer = dir.join("tokenizer.json");
    if !tokenizer.is_file() {
        bail!("No tokenizer.json in {}", dir.display());
    }
    Ok((onnx, tokenizer))
}

fn load(onnx_path: &Path, tokenizer_path: &Path) -> Result<Loaded> {
    let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow::anyhow!("Load tokenizer: {}", e))?;

    let plan = tract_onnx::onnx()
        .model_for_path(onnx_path)
        .map_err(|e| anyhow::anyhow!("Load ONNX: {}", e))?
        .into_optimized()
        .map_err(|e| anyhow::anyhow!("Optimize: {}", e))?
        .into_runnable()
        .map_err(|e| anyhow::anyhow!("Build tract runnable: {}", e))?;

    Ok(Loaded { plan, tokenizer })
}

impl TractProvider {
    /// Download (once) and load a supported pretrained model.
    pub async fn pretrained(name: &str, batch_size: usize) -> Result<Self> {
        let (_, _, dims) = model_manifest(name)?;
        let owned = name.to_string();
        let loaded = tokio::task::spawn_blocking(move || {
            let (onnx, tokenizer) = ensure_cached(&owned)?;
            load(&onnx, &tokenizer)
        })
        .await??;

        Ok(Self {
            inner: Arc::new(Mutex::new(loaded)),
            model_name: name.to_string(),
            dims,
            batch_size,
        })
    }

    /// Load a fine-tuned export; its dimension is read off a probe sentence.
    pub async fn from_dir(dir: &Path, batch_size: usize) -> Result<Self> {
        let (onnx, tokenizer) = local_files(dir)?;
        let (loaded, dims) = tokio::task::spawn_blocking(move || -> Result<_> {
            let loaded = load(&onnx, &tokenizer)?;
            let probe = run_tract_embed(&loaded, 1, &["dimension probe".to_string()])?;
            let dims = probe.first().map(|v| v.len()).unwrap_or(0);
            if dims == 0 {
                bail!("Fine-tuned model produced an empty embedding");
            }
            Ok((loaded, dims))
        })
        .await??;

        Ok(Self {
            inner: Arc::new(Mutex::new(loaded)),
            model_name: format!("fine-tuned:{}", dir.display()),
            dims,
            batch_size,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for TractProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let loaded = inner
                .lock()
                .map_err(|_| anyhow::anyhow!("Embedding model lock poisoned"))?;
            run_tract_embed(&loaded, batch_size, &texts)
        })
        .await?
    }
}

fn run_tract_embed(loaded: &Loaded, batch_size: usize, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let wants_token_types = loaded.plan.model().inputs.len() > 2;
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let encodings: Vec<_> = chunk
            .iter()
            .map(|s| {
                loaded
                    .tokenizer
                    .encode(s.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenize: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(1)
            .min(DEFAULT_MAX_LEN);

        let rows = encodings.len();
        let mut input_ids = vec![0i64; rows * max_len];
        let mut attention_mask = vec![0i64; rows * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let ids = enc.get_ids();
            let len = ids.len().min(max_len);
            for (j, &id) in ids.iter().take(len).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = 1;
            }
        }

        let input_ids_t: Tensor = ndarray::Array2::from_shape_vec((rows, max_len), input_ids)
            .map_err(|e| anyhow::anyhow!("Input ids shape: {}", e))?
            .into();
        let attention_mask_t: Tensor =
            ndarray::Array2::from_shape_vec((rows, max_len), attention_mask)
                .map_err(|e| anyhow::anyhow!("Attention mask shape: {}", e))?
                .into();

        let mut inputs: TVec<TValue> = tvec!(input_ids_t.into(), attention_mask_t.into());
        if wants_token_types {
            let token_types: Tensor = ndarray::Array2::<i64>::zeros((rows, max_len)).into();
            inputs.push(token_types.into());
        }
        let result = loaded.plan.run(inputs)?;

        let output = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No output tensor"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| anyhow::anyhow!("Output to array: {}", e))?;

        // [batch, hidden] is already pooled; [batch, seq, hidden] gets masked mean pooling.
        let shape = view.shape();
        if shape.len() == 2 {
            for i in 0..shape[0] {
                let row = view.slice(ndarray::s![i, ..]);
                all_embeddings.push(normalize_l2(row.iter().copied().collect()));
            }
        } else if shape.len() == 3 {
            let seq_len = shape[1];
            let hidden = shape[2];
            for (i, enc) in encodings.iter().enumerate() {
                let valid_len = enc.get_ids().len().min(seq_len).min(max_len);
                let mut sum = vec![0f32; hidden];
                for j in 0..valid_len {
                    for (k, &v) in view.slice(ndarray::s![i, j, ..]).iter().enumerate() {
                        sum[k] += v;
                    }
                }
                if valid_len > 0 {
                    for x in &mut sum {
                        *x /= valid_len as f32;
                    }
                }
                all_embeddings.push(normalize_l2(sum));
            }
        } else {
            bail!("Unexpected output shape: {:?}", shape);
        }
    }

    Ok(all_embeddings)
}
