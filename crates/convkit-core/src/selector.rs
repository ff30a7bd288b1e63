//! Best-match selection over the reference corpus.
//!
//! # Algorithm
//!
//! 1. Embed the query with the active provider.
//! 2. Cosine similarity against every corpus embedding.
//! 3. Argmax by linear scan; on ties the earliest entry in corpus order wins.
//! 4. If the best similarity is strictly below the threshold, report no match.
//!
//! [`looks_like_conversion_query`] is a cheap heuristic gate run before the
//! selector: queries that look like unit conversions are sent to the
//! converter instead. False positives and negatives are possible.

use anyhow::{bail, Result};

use crate::corpus::{Corpus, ReferenceEntry};
use crate::embedding::{cosine_similarity, embed_one, EmbeddingProvider};

/// Similarity below which the chatbot reports that it has no answer.
pub const DEFAULT_THRESHOLD: f32 = 0.35;

/// Unit words that, together with a digit, mark a query as a conversion request.
pub const CONVERSION_KEYWORDS: &[&str] = &["m", "cm", "km", "mm", "inch", "foot", "yard", "mile"];

/// Result of a best-match query.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    Found {
        entry: &'a ReferenceEntry,
        index: usize,
        score: f32,
    },
    /// Nothing cleared the threshold. `best_score` is `None` when nothing
    /// was scored at all (empty corpus or blank query).
    NoMatch { best_score: Option<f32> },
}

impl MatchOutcome<'_> {
    pub fn entry(&self) -> Option<&ReferenceEntry> {
        match self {
            MatchOutcome::Found { entry, .. } => Some(entry),
            MatchOutcome::NoMatch { .. } => None,
        }
    }
}

/// Index and similarity of the closest corpus entry, first maximum wins.
/// Entries whose score is NaN are never selected.
pub fn best_match(query_vec: &[f32], corpus: &Corpus) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, e) in corpus.entries().iter().enumerate() {
        let score = cosine_similarity(query_vec, &e.embedding);
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

/// Apply the threshold to a precomputed query vector.
pub fn select<'a>(query_vec: &[f32], corpus: &'a Corpus, threshold: f32) -> MatchOutcome<'a> {
    match best_match(query_vec, corpus) {
        Some((index, score)) if score >= threshold => MatchOutcome::Found {
            entry: &corpus.entries()[index].entry,
            index,
            score,
        },
        Some((_, score)) => MatchOutcome::NoMatch {
            best_score: Some(score),
        },
        None => MatchOutcome::NoMatch { best_score: None },
    }
}

/// Embed `query` and find the closest corpus entry above `threshold`.
///
/// # Errors
///
/// Provider failures propagate unchanged; they are never turned into a
/// `NoMatch`. A query vector whose dimension differs from the corpus is an
/// error too.
pub async fn find_best_match<'a, P: EmbeddingProvider + ?Sized>(
    provider: &P,
    query: &str,
    corpus: &'a Corpus,
    threshold: f32,
) -> Result<MatchOutcome<'a>> {
    if query.trim().is_empty() || corpus.is_empty() {
        return Ok(MatchOutcome::NoMatch { best_score: None });
    }

    let query_vec = embed_one(provider, query).await?;
    if query_vec.len() != corpus.dims() {
        bail!(
            "Query embedding has {} dims but corpus was embedded with {} ({})",
            query_vec.len(),
            corpus.dims(),
            corpus.model_name()
        );
    }

    let outcome = select(&query_vec, corpus, threshold);
    tracing::debug!(?outcome, threshold, "best match");
    Ok(outcome)
}

/// Heuristic: does `text` look like a unit-conversion request?
///
/// True when the text has at least one ASCII digit and at least one word from
/// [`CONVERSION_KEYWORDS`]. Words are alphanumeric runs with leading digits
/// stripped, so `5km` counts as `km`; plurals of the long names count too.
pub fn looks_like_conversion_query(text: &str) -> bool {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.trim_start_matches(|c: char| c.is_ascii_digit()).to_lowercase())
        .any(|w| is_conversion_keyword(&w))
}

fn is_conversion_keyword(word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    if CONVERSION_KEYWORDS.contains(&word) || word == "feet" {
        return true;
    }
    let singular = word
        .strip_suffix("es")
        .filter(|s| *s == "inch")
        .or_else(|| word.strip_suffix('s'));
    matches!(singular, Some("inch" | "yard" | "mile"))
}
