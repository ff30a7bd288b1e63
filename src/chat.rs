//! The chatbot service.
//!
//! [`ChatService`] is built once at startup: it loads the embedding model
//! and embeds the reference corpus, then answers any number of questions
//! without touching either again. It holds no mutable state.

use anyhow::Result;
use serde::Serialize;

use convkit_core::corpus::{default_entries, Corpus, ReferenceEntry};
use convkit_core::selector::{find_best_match, looks_like_conversion_query, MatchOutcome};

use crate::config::Config;
use crate::embedding::{create_provider, BoxedProvider};

/// How the chatbot responds to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// The question looks like a unit conversion; use the converter.
    UseConverter,
    Matched {
        section: String,
        content: String,
        score: f32,
    },
    NoAnswer { best_score: Option<f32> },
}

impl Answer {
    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Answer::UseConverter => {
                "That looks like a unit conversion. Try: convkit convert <value> <from> <to>"
                    .to_string()
            }
            Answer::Matched { content, .. } => content.clone(),
            Answer::NoAnswer { .. } => "Sorry, I could not find an answer to that.".to_string(),
        }
    }
}

/// Immutable chatbot: provider + embedded corpus + relevance threshold.
pub struct ChatService {
    provider: BoxedProvider,
    corpus: Corpus,
    threshold: f32,
}

impl ChatService {
    /// Embed `entries` with `provider` once and keep both for later queries.
    pub async fn new(
        provider: BoxedProvider,
        entries: Vec<ReferenceEntry>,
        threshold: f32,
    ) -> Result<Self> {
        let corpus = Corpus::build(provider.as_ref(), entries).await?;
        tracing::info!(
            model = corpus.model_name(),
            entries = corpus.len(),
            fingerprint = corpus.fingerprint(),
            "reference corpus embedded"
        );
        Ok(Self {
            provider,
            corpus,
            threshold,
        })
    }

    /// Build the service for the built-in corpus from configuration.
    ///
    /// Fails if no embedding model can be loaded.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let entries = default_entries();
        let provider = create_provider(&config.embedding, &entries).await?;
        Self::new(provider, entries, config.chat.threshold).await
    }

    /// Answer a question, routing conversion-looking questions away.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        if looks_like_conversion_query(question) {
            return Ok(Answer::UseConverter);
        }
        self.answer(question).await
    }

    /// Run the selector without the conversion gate.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let outcome =
            find_best_match(self.provider.as_ref(), question, &self.corpus, self.threshold).await?;
        Ok(match outcome {
            MatchOutcome::Found { entry, score, .. } => Answer::Matched {
                section: entry.section.clone(),
                content: entry.content.clone(),
                score,
            },
            MatchOutcome::NoMatch { best_score } => Answer::NoAnswer { best_score },
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn fingerprint(&self) -> &str {
        self.corpus.fingerprint()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// CLI entry point for `convkit ask`.
///
/// The conversion gate runs before any model is loaded, so conversion-like
/// questions are answered instantly.
pub async fn run_ask(
    config: &Config,
    question: &str,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let answer = if looks_like_conversion_query(question) {
        Answer::UseConverter
    } else {
        let mut config = config.clone();
        if let Some(t) = threshold {
            if !(-1.0..=1.0).contains(&t) {
                anyhow::bail!("--threshold must be in [-1.0, 1.0], got {}", t);
            }
            config.chat.threshold = t;
        }
        let service = ChatService::from_config(&config).await?;
        service.ask(question).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    match &answer {
        Answer::Matched { section, score, .. } => {
            println!("[{}] {}", section, answer.message());
            tracing::debug!(score, "answer score");
        }
        _ => println!("{}", answer.message()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convkit_core::embedding::{EmbeddingProvider, KeywordProvider};
    use std::sync::{Arc, Mutex};

    async fn keyword_service(threshold: f32) -> ChatService {
        let entries = default_entries();
        let provider = Box::new(KeywordProvider::from_entries(&entries));
        ChatService::new(provider, entries, threshold).await.unwrap()
    }

    #[tokio::test]
    async fn test_answers_from_corpus() {
        let service = keyword_service(0.35).await;
        match service.ask("how is my body mass index calculated?").await.unwrap() {
            Answer::Matched { section, score, .. } => {
                assert_eq!(section, "BMI Calculator");
                assert!(score >= 0.35);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_conversion_questions_are_redirected() {
        let service = keyword_service(0.35).await;
        assert_eq!(
            service.ask("convert 5 km to miles").await.unwrap(),
            Answer::UseConverter
        );
    }

    #[tokio::test]
    async fn test_unrelated_question_has_no_answer() {
        let service = keyword_service(0.35).await;
        assert!(matches!(
            service.ask("who won the football match yesterday").await.unwrap(),
            Answer::NoAnswer { .. }
        ));
    }

    /// Wraps the keyword provider and records the size of every embed call.
    struct CountingProvider {
        inner: KeywordProvider,
        batches: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.lock().unwrap().push(texts.len());
            self.inner.embed(texts).await
        }
    }

    #[tokio::test]
    async fn test_corpus_embedded_once_at_construction() {
        let entries = default_entries();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let provider = Box::new(CountingProvider {
            inner: KeywordProvider::from_entries(&entries),
            batches: Arc::clone(&batches),
        });
        let service = ChatService::new(provider, entries, 0.35).await.unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![5]);

        service.ask("tell me about the chatbot").await.unwrap();
        service.ask("what tools does this website have").await.unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![5, 1, 1]);

        // Redirected questions never reach the model.
        service.ask("convert 5 km to miles").await.unwrap();
        assert_eq!(batches.lock().unwrap().len(), 3);
        assert_eq!(service.corpus().len(), 5);
    }

    #[test]
    fn test_answer_json_shape() {
        let json = serde_json::to_value(Answer::NoAnswer { best_score: None }).unwrap();
        assert_eq!(json["kind"], "no_answer");
        let json = serde_json::to_value(Answer::UseConverter).unwrap();
        assert_eq!(json["kind"], "use_converter");
    }
}
