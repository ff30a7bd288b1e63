//! Embedding provider trait and vector similarity.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement. Concrete providers (fastembed, tract) live in the `convkit`
//! app crate; this crate only needs the capability `embed(texts) -> vectors`.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// A provider is constructed once, with its model already loaded, and then
/// shared by every query for the lifetime of the process.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one<P: EmbeddingProvider + ?Sized>(provider: &P, text: &str) -> Result<Vec<f32>> {
    provider
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "from", "that", "this", "what", "with", "you", "your", "are", "how",
    "can", "does", "about", "which", "into", "its", "our", "was",
];

/// Lowercased alphanumeric words of at least three characters, minus stopwords.
fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Offline bag-of-words provider.
///
/// Each dimension counts one vocabulary word. Needs no model download, so it
/// backs the `keyword` provider setting and the test suites.
pub struct KeywordProvider {
    vocab: Vec<String>,
}

impl KeywordProvider {
    pub fn new(mut vocab: Vec<String>) -> Self {
        vocab.sort();
        vocab.dedup();
        Self { vocab }
    }

    /// Build the vocabulary from the words of a corpus.
    pub fn from_entries(entries: &[crate::corpus::ReferenceEntry]) -> Self {
        let vocab = entries
            .iter()
            .flat_map(|e| content_words(&e.section).chain(content_words(&e.content)))
            .collect();
        Self::new(vocab)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.vocab.len()];
        for word in content_words(text) {
            if let Ok(i) = self.vocab.binary_search(&word) {
                v[i] += 1.0;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model_name(&self) -> &str {
        "keyword"
    }
    fn dims(&self) -> usize {
        self.vocab.len()
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
