//! Concrete embedding providers and variant selection.
//!
//! Providers implement [`EmbeddingProvider`] from `convkit-core`:
//! - **[`KeywordProvider`]**: offline bag-of-words over the corpus vocabulary.
//! - **`FastembedProvider`**: local ONNX inference via fastembed (default feature).
//! - **`TractProvider`**: pure-Rust tract inference (musl / Intel Mac feature).
//!
//! # Variant Selection
//!
//! The `local` provider has two variants. The fine-tuned model in
//! `embedding.fine_tuned_path` is tried first; if it is not configured or
//! fails to load for any reason, the generic pretrained
//! `embedding.fallback_model` is loaded instead. There is no retry. If the
//! fallback fails as well, the error is returned and the chat feature cannot
//! start.
//!
//! Model loading happens once, in [`create_provider`], inside
//! `spawn_blocking`; the loaded model is then reused for every query.

#[cfg(feature = "local-embeddings-fastembed")]
mod local_fastembed;
#[cfg(feature = "local-embeddings-tract")]
mod local_tract;

use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::Path;

use crate::config::EmbeddingConfig;
use convkit_core::corpus::ReferenceEntry;

pub use convkit_core::embedding::{cosine_similarity, EmbeddingProvider, KeywordProvider};
#[cfg(feature = "local-embeddings-fastembed")]
pub use local_fastembed::FastembedProvider;
#[cfg(feature = "local-embeddings-tract")]
pub use local_tract::TractProvider;

/// Pretrained models usable as the fallback variant, with their dimensions.
pub const SUPPORTED_MODELS: &[(&str, usize)] = &[
    ("all-minilm-l6-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
];

/// Which local model variant a provider was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    FineTuned,
    Pretrained,
}

pub type BoxedProvider = Box<dyn EmbeddingProvider>;

/// Create the provider named by `config.provider`.
///
/// `entries` is the corpus the provider will serve; the `keyword` provider
/// builds its vocabulary from it.
///
/// # Errors
///
/// Unknown provider names, and a `local` provider whose fallback model
/// cannot be loaded either.
pub async fn create_provider(
    config: &EmbeddingConfig,
    entries: &[ReferenceEntry],
) -> Result<BoxedProvider> {
    match config.provider.as_str() {
        "keyword" => Ok(Box::new(KeywordProvider::from_entries(entries))),
        "local" => {
            let fine_tuned = config
                .fine_tuned_path
                .as_deref()
                .map(|path| load_variant(Variant::FineTuned, config, Some(path)));
            let pretrained = load_variant(Variant::Pretrained, config, None);
            with_fallback(fine_tuned, pretrained)
                .await
                .with_context(|| {
                    format!(
                        "No embedding model could be loaded (fallback '{}')",
                        config.fallback_model
                    )
                })
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Await `primary` if present; on failure (or absence) await `fallback`.
///
/// The fallback future is not polled unless it is needed, so no model is
/// loaded twice. A primary failure is logged and otherwise swallowed.
pub async fn with_fallback<P, F>(primary: Option<P>, fallback: F) -> Result<BoxedProvider>
where
    P: Future<Output = Result<BoxedProvider>>,
    F: Future<Output = Result<BoxedProvider>>,
{
    if let Some(primary) = primary {
        match primary.await {
            Ok(provider) => return Ok(provider),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "fine-tuned embedding model unavailable, using pretrained fallback");
            }
        }
    }
    fallback.await
}

async fn load_variant(
    variant: Variant,
    config: &EmbeddingConfig,
    path: Option<&Path>,
) -> Result<BoxedProvider> {
    let provider = match (variant, path) {
        (Variant::FineTuned, Some(path)) => load_fine_tuned(path, config.batch_size).await?,
        (Variant::FineTuned, None) => bail!("No fine-tuned model path configured"),
        (Variant::Pretrained, _) => {
            load_pretrained(&config.fallback_model, config.batch_size).await?
        }
    };
    tracing::info!(
        model = provider.model_name(),
        dims = provider.dims(),
        ?variant,
        "embedding model loaded"
    );
    Ok(provider)
}

#[cfg(feature = "local-embeddings-fastembed")]
async fn load_fine_tuned(path: &Path, batch_size: usize) -> Result<BoxedProvider> {
    Ok(Box::new(FastembedProvider::from_dir(path, batch_size).await?))
}

#[cfg(all(
    feature = "local-embeddings-tract",
    not(feature = "local-embeddings-fastembed")
))]
async fn load_fine_tuned(path: &Path, batch_size: usize) -> Result<BoxedProvider> {
    Ok(Box::new(TractProvider::from_dir(path, batch_size).await?))
}

#[cfg(not(any(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract")))]
async fn load_fine_tuned(_path: &Path, _batch_size: usize) -> Result<BoxedProvider> {
    bail!(
        "Local embedding models require one of: --features local-embeddings-fastembed, --features local-embeddings-tract"
    )
}

#[cfg(feature = "local-embeddings-fastembed")]
async fn load_pretrained(name: &str, batch_size: usize) -> Result<BoxedProvider> {
    Ok(Box::new(FastembedProvider::pretrained(name, batch_size).await?))
}

#[cfg(all(
    feature = "local-embeddings-tract",
    not(feature = "local-embeddings-fastembed")
))]
async fn load_pretrained(name: &str, batch_size: usize) -> Result<BoxedProvider> {
    Ok(Box::new(TractProvider::pretrained(name, batch_size).await?))
}

#[cfg(not(any(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract")))]
async fn load_pretrained(_name: &str, _batch_size: usize) -> Result<BoxedProvider> {
    bail!(
        "Local embedding models require one of: --features local-embeddings-fastembed, --features local-embeddings-tract"
    )
}

/// Dimensions of a supported pretrained model.
pub fn model_dims(name: &str) -> Result<usize> {
    SUPPORTED_MODELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, dims)| *dims)
        .ok_or_else(|| anyhow::anyhow!("Unknown local embedding model: '{}'", name))
}

/// L2-normalize in place; zero vectors are left untouched.
pub fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Named(&'static str);

    #[async_trait]
    impl EmbeddingProvider for Named {
        fn model_name(&self) -> &str {
            self.0
        }
        fn dims(&self) -> usize {
            1
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    async fn ok(name: &'static str) -> Result<BoxedProvider> {
        Ok(Box::new(Named(name)))
    }

    async fn fail(msg: &'static str) -> Result<BoxedProvider> {
        bail!(msg)
    }

    #[tokio::test]
    async fn test_primary_wins_when_it_loads() {
        let p = with_fallback(Some(ok("fine-tuned")), ok("generic")).await.unwrap();
        assert_eq!(p.model_name(), "fine-tuned");
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_fails() {
        let p = with_fallback(Some(fail("corrupt model")), ok("generic"))
            .await
            .unwrap();
        assert_eq!(p.model_name(), "generic");
    }

    #[tokio::test]
    async fn test_no_primary_uses_fallback() {
        let p = with_fallback(None::<std::future::Ready<Result<BoxedProvider>>>, ok("generic"))
            .await
            .unwrap();
        assert_eq!(p.model_name(), "generic");
    }

    #[tokio::test]
    async fn test_both_failing_is_fatal() {
        let err = with_fallback(Some(fail("corrupt model")), fail("offline"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("offline"));
    }

    #[tokio::test]
    async fn test_fallback_not_loaded_when_primary_succeeds() {
        let touched = AtomicBool::new(false);
        let fallback = async {
            touched.store(true, Ordering::SeqCst);
            ok("generic").await
        };
        with_fallback(Some(ok("fine-tuned")), fallback).await.unwrap();
        assert!(!touched.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_default_fine_tuned_dir_falls_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = EmbeddingConfig {
            fine_tuned_path: Some(tmp.path().join("models/fine-tuned")),
            ..EmbeddingConfig::default()
        };
        assert!(EmbeddingConfig::default().fine_tuned_path.is_some());

        let path = config.fine_tuned_path.as_deref();
        let primary = load_variant(Variant::FineTuned, &config, path);
        let p = with_fallback(Some(primary), ok("generic")).await.unwrap();
        assert_eq!(p.model_name(), "generic");
    }

    #[tokio::test]
    async fn test_keyword_provider_needs_no_model() {
        let config = EmbeddingConfig {
            provider: "keyword".to_string(),
            ..EmbeddingConfig::default()
        };
        let entries = convkit_core::corpus::default_entries();
        let p = create_provider(&config, &entries).await.unwrap();
        assert_eq!(p.model_name(), "keyword");
        assert!(p.dims() > 0);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config, &[]).await.is_err());
    }

    #[test]
    fn test_model_dims() {
        assert_eq!(model_dims("all-minilm-l6-v2").unwrap(), 384);
        assert_eq!(model_dims("bge-base-en-v1.5").unwrap(), 768);
        assert!(model_dims("word2vec").is_err());
    }

    #[test]
    fn test_normalize_l2() {
        let v = normalize_l2(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize_l2(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
