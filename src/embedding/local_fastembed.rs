//! fastembed-based local embedding (primary platforms).
//!
//! Pretrained models are downloaded from Hugging Face on first use and
//! cached by fastembed. Fine-tuned models are read from a local
//! sentence-transformers export directory.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{model_dims, EmbeddingProvider};

/// A loaded fastembed model. Inference needs `&mut`, hence the mutex.
pub struct FastembedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    model_name: String,
    dims: usize,
    batch_size: usize,
}

fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        other => bail!("Unknown local embedding model: '{}'", other),
    }
}

/// Files of a sentence-transformers ONNX export.
struct ExportFiles {
    onnx: PathBuf,
    tokenizer: PathBuf,
    config: PathBuf,
    special_tokens_map: PathBuf,
    tokenizer_config: PathBuf,
}

fn export_files(dir: &Path) -> Result<ExportFiles> {
    if !dir.is_dir() {
        bail!("Fine-tuned model directory not found: {}", dir.display());
    }
    let onnx = [dir.join("model.onnx"), dir.join("onnx").join("model.onnx")]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow::anyhow!("No model.onnx in {}", dir.display()))?;
    Ok(ExportFiles {
        onnx,
        tokenizer: dir.join("tokenizer.json"),
        config: dir.join("config.json"),
        special_tokens_map: dir.join("special_tokens_map.json"),
        tokenizer_config: dir.join("tokenizer_config.json"),
    })
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

impl FastembedProvider {
    /// Load a supported pretrained model.
    pub async fn pretrained(name: &str, batch_size: usize) -> Result<Self> {
        let fastembed_model = config_to_fastembed_model(name)?;
        let dims = model_dims(name)?;

        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))
        })
        .await??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: name.to_string(),
            dims,
            batch_size,
        })
    }

    /// Load a fine-tuned model from a sentence-transformers export directory.
    ///
    /// The dimension is not known up front, so one probe sentence is embedded
    /// at load time.
    pub async fn from_dir(dir: &Path, batch_size: usize) -> Result<Self> {
        let files = export_files(dir)?;
        let model_name = format!("fine-tuned:{}", dir.display());

        let (model, dims) = tokio::task::spawn_blocking(move || -> Result<_> {
            let tokenizer_files = fastembed::TokenizerFiles {
                tokenizer_file: read(&files.tokenizer)?,
                config_file: read(&files.config)?,
                special_tokens_map_file: read(&files.special_tokens_map)?,
                tokenizer_config_file: read(&files.tokenizer_config)?,
            };
            let user_model =
                fastembed::UserDefinedEmbeddingModel::new(read(&files.onnx)?, tokenizer_files)
                    .with_pooling(fastembed::Pooling::Mean);

            let mut model = fastembed::TextEmbedding::try_new_from_user_defined(
                user_model,
                fastembed::InitOptionsUserDefined::default(),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize fine-tuned model: {}", e))?;

            let probe = model
                .embed(vec!["dimension probe"], None)
                .map_err(|e| anyhow::anyhow!("Fine-tuned model probe failed: {}", e))?;
            let dims = probe.first().map(|v| v.len()).unwrap_or(0);
            if dims == 0 {
                bail!("Fine-tuned model produced an empty embedding");
            }
            Ok((model, dims))
        })
        .await??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name,
            dims,
            batch_size,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastembedProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow::anyhow!("Embedding model lock poisoned"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models_map() {
        for (name, _) in super::super::SUPPORTED_MODELS {
            assert!(config_to_fastembed_model(name).is_ok(), "{}", name);
        }
        assert!(config_to_fastembed_model("word2vec").is_err());
    }

    #[tokio::test]
    async fn test_missing_dir_fails_fast() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = FastembedProvider::from_dir(&tmp.path().join("absent"), 8)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_dir_without_onnx_fails_fast() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = FastembedProvider::from_dir(tmp.path(), 8).await.err().unwrap();
        assert!(err.to_string().contains("No model.onnx"));
    }
}
