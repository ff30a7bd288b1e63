//! The chatbot's reference corpus and its precomputed embeddings.
//!
//! A [`Corpus`] is built once at startup by embedding every
//! [`ReferenceEntry`] with the active provider. It is immutable afterwards
//! and carries a SHA-256 fingerprint of its content, which identifies the
//! embeddings it holds.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::embedding::EmbeddingProvider;

/// One static reference text the chatbot can answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub section: String,
    pub content: String,
}

impl ReferenceEntry {
    pub fn new(section: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            content: content.into(),
        }
    }
}

/// A reference entry together with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedEntry {
    pub entry: ReferenceEntry,
    pub embedding: Vec<f32>,
}

/// Immutable, embedded corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Vec<EmbeddedEntry>,
    fingerprint: String,
    model: String,
    dims: usize,
}

impl Corpus {
    /// Embed `entries` with `provider` and freeze the result.
    ///
    /// # Errors
    ///
    /// Propagates provider failures, and rejects responses with the wrong
    /// number of vectors or with vectors of the wrong dimension.
    pub async fn build<P: EmbeddingProvider + ?Sized>(
        provider: &P,
        entries: Vec<ReferenceEntry>,
    ) -> Result<Self> {
        let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            provider.embed(&texts).await?
        };

        if vectors.len() != entries.len() {
            bail!(
                "Embedding provider returned {} vectors for {} corpus entries",
                vectors.len(),
                entries.len()
            );
        }

        let dims = provider.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            bail!(
                "Embedding provider '{}' returned a {}-dim vector, expected {}",
                provider.model_name(),
                bad.len(),
                dims
            );
        }

        let embedded = entries
            .into_iter()
            .zip(vectors)
            .map(|(entry, embedding)| EmbeddedEntry { entry, embedding })
            .collect();

        Self::from_embedded(embedded, provider.model_name())
    }

    /// Assemble a corpus from entries whose embeddings are already known.
    pub fn from_embedded(entries: Vec<EmbeddedEntry>, model: &str) -> Result<Self> {
        let dims = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if entries.iter().any(|e| e.embedding.len() != dims) {
            bail!("Corpus embeddings must all have the same dimension");
        }
        let plain: Vec<ReferenceEntry> = entries.iter().map(|e| e.entry.clone()).collect();
        Ok(Self {
            fingerprint: fingerprint(&plain),
            entries,
            model: model.to_string(),
            dims,
        })
    }

    pub fn entries(&self) -> &[EmbeddedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 hex digest of the corpus content.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Name of the model that produced the embeddings.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Embedding dimensionality (0 for an empty corpus).
    pub fn dims(&self) -> usize {
        self.dims
    }
}

/// SHA-256 over each entry's section and content, length-prefixed so that
/// moving text between fields changes the digest.
pub fn fingerprint(entries: &[ReferenceEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        for field in [&entry.section, &entry.content] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// The five built-in reference sentences describing the demo site.
pub fn default_entries() -> Vec<ReferenceEntry> {
    vec![
        ReferenceEntry::new(
            "About",
            "This website is a small collection of demo tools: a unit converter, \
             a question answering chatbot and a BMI calculator.",
        ),
        ReferenceEntry::new(
            "Unit Converter",
            "The unit converter changes values between units of length, mass, \
             temperature and time, for example meters to feet or Celsius to Fahrenheit.",
        ),
        ReferenceEntry::new(
            "Chatbot",
            "The chatbot answers questions about this website by finding the reference \
             sentence that is most similar in meaning to your question.",
        ),
        ReferenceEntry::new(
            "BMI Calculator",
            "The BMI calculator computes your body mass index from your weight and height \
             and plots how the index changes with height.",
        ),
        ReferenceEntry::new(
            "Help",
            "If a result looks wrong, check that you entered a valid number and picked \
             units from the same category.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::KeywordProvider;
    use async_trait::async_trait;

    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    #[test]
    fn test_default_entries() {
        let entries = default_entries();
        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| !e.content.is_empty()));
    }

    #[test]
    fn test_fingerprint_stable_and_content_sensitive() {
        let a = default_entries();
        let mut b = default_entries();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);

        b[0].content.push('!');
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = vec![ReferenceEntry::new("ab", "c")];
        let b = vec![ReferenceEntry::new("a", "bc")];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[tokio::test]
    async fn test_build_embeds_every_entry() {
        let entries = default_entries();
        let provider = KeywordProvider::from_entries(&entries);
        let corpus = Corpus::build(&provider, entries.clone()).await.unwrap();

        assert_eq!(corpus.len(), 5);
        assert_eq!(corpus.dims(), provider.dims());
        assert_eq!(corpus.model_name(), "keyword");
        assert_eq!(corpus.fingerprint(), fingerprint(&entries));
        assert_eq!(corpus.entries()[3].entry.section, "BMI Calculator");
    }

    #[tokio::test]
    async fn test_build_rejects_short_response() {
        let err = Corpus::build(&ShortProvider, default_entries()).await.unwrap_err();
        assert!(err.to_string().contains("4 vectors for 5"));
    }

    #[test]
    fn test_from_embedded_rejects_mixed_dims() {
        let entries = vec![
            EmbeddedEntry {
                entry: ReferenceEntry::new("a", "a"),
                embedding: vec![1.0, 0.0],
            },
            EmbeddedEntry {
                entry: ReferenceEntry::new("b", "b"),
                embedding: vec![1.0],
            },
        ];
        assert!(Corpus::from_embedded(entries, "test").is_err());
    }
}
